//! 提取到宿主文件系统
//!
//! 目录和符号链接在调用线程中按遍历顺序创建；普通文件分给多个工作线程
//! 并行组装和写出。工作线程共享同一个只读数据源，各自使用定位读取。

use super::filesystem::Jffs2Fs;
use crate::error::{Error, ErrorKind, Result};
use crate::file::FileAssembler;
use crate::source::ImageSource;
use crate::tree::{Entry, EntryKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 提取报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// 创建的目录数（包括目标根目录）
    pub dirs: usize,
    /// 写出的普通文件数
    pub files: usize,
    /// 创建的符号链接数
    pub symlinks: usize,
    /// 跳过的条目数（设备、FIFO、socket、非法名字）
    pub skipped: usize,
    /// 组装时被跳过的数据片段总数
    pub failed_spans: usize,
    /// 内容不完整的文件（镜像内路径）
    pub incomplete: Vec<String>,
}

impl ExtractReport {
    fn merge(&mut self, other: ExtractReport) {
        self.dirs += other.dirs;
        self.files += other.files;
        self.symlinks += other.symlinks;
        self.skipped += other.skipped;
        self.failed_spans += other.failed_spans;
        self.incomplete.extend(other.incomplete);
    }
}

/// 一个待写出的普通文件
struct FileJob<'a> {
    image_path: String,
    host_path: PathBuf,
    entry: &'a Entry,
}

impl<S: ImageSource + Sync> Jffs2Fs<S> {
    /// 把可到达的层次结构重建到 `dest` 目录下
    ///
    /// # 参数
    ///
    /// * `dest` - 目标目录（不存在时创建）
    /// * `workers` - 组装普通文件的线程数（0 按 1 处理）
    ///
    /// # 错误
    ///
    /// 宿主文件系统写入失败或数据源读取失败时返回错误；
    /// 镜像本身的损坏只体现在报告中。
    pub fn extract_to<P: AsRef<Path>>(&self, dest: P, workers: usize) -> Result<ExtractReport> {
        let dest = dest.as_ref();
        std::fs::create_dir_all(dest)?;

        let mut report = ExtractReport {
            dirs: 1,
            ..ExtractReport::default()
        };
        let mut jobs = Vec::new();
        // 已在宿主上创建的目录（镜像内路径）
        let mut created: HashSet<String> = HashSet::from([String::from("/")]);

        for (image_path, entry) in self.tree().walk() {
            if entry.is_root() {
                continue;
            }
            if !created.contains(parent_path(&image_path)) {
                log::warn!("[EXTRACT] skipping {:?}: parent was not extracted as a directory", image_path);
                report.skipped += 1;
                continue;
            }
            let Some(host_path) = host_path(dest, &image_path) else {
                log::warn!("[EXTRACT] skipping unsafe path {:?}", image_path);
                report.skipped += 1;
                continue;
            };

            match entry.kind() {
                EntryKind::Directory => {
                    if is_symlink(&host_path)? {
                        std::fs::remove_file(&host_path)?;
                    }
                    std::fs::create_dir_all(&host_path)?;
                    created.insert(image_path);
                    report.dirs += 1;
                }
                EntryKind::RegularFile => {
                    if !make_room(&host_path)? {
                        log::warn!("[EXTRACT] skipping {:?}: a directory is in the way", image_path);
                        report.skipped += 1;
                        continue;
                    }
                    jobs.push(FileJob {
                        image_path,
                        host_path,
                        entry,
                    });
                }
                EntryKind::Symlink => {
                    if !make_room(&host_path)? {
                        log::warn!("[EXTRACT] skipping {:?}: a directory is in the way", image_path);
                        report.skipped += 1;
                        continue;
                    }
                    let target = self.assembler().read_link(entry)?;
                    create_symlink(&target, &host_path)?;
                    report.symlinks += 1;
                }
                other => {
                    log::debug!("[EXTRACT] skipping {:?} {}", other, image_path);
                    report.skipped += 1;
                }
            }
        }

        let workers = workers.clamp(1, jobs.len().max(1));
        log::info!("[EXTRACT] {} files across {} workers", jobs.len(), workers);

        let mut shards: Vec<Vec<FileJob<'_>>> = (0..workers).map(|_| Vec::new()).collect();
        for (i, job) in jobs.into_iter().enumerate() {
            shards[i % workers].push(job);
        }

        let assembler = self.assembler();
        std::thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(shards.len());
            for shard in shards {
                let assembler = &assembler;
                handles.push(scope.spawn(move || write_files(assembler, shard)));
            }

            for handle in handles {
                let shard = handle
                    .join()
                    .map_err(|_| Error::new(ErrorKind::Io, "Extraction worker panicked"))??;
                report.merge(shard);
            }
            Ok(())
        })?;

        report.incomplete.sort();
        log::info!(
            "[EXTRACT] {} dirs, {} files, {} symlinks, {} skipped, {} failed spans",
            report.dirs,
            report.files,
            report.symlinks,
            report.skipped,
            report.failed_spans
        );
        Ok(report)
    }
}

fn write_files<S: ImageSource + ?Sized>(
    assembler: &FileAssembler<'_, S>,
    jobs: Vec<FileJob<'_>>,
) -> Result<ExtractReport> {
    let mut report = ExtractReport::default();
    for job in jobs {
        let content = assembler.assemble(job.entry)?;
        if !content.is_complete() {
            report.incomplete.push(job.image_path);
        }
        report.failed_spans += content.failures.len();
        std::fs::write(&job.host_path, &content.data)?;
        report.files += 1;
    }
    Ok(report)
}

/// 镜像内路径的父目录路径
fn parent_path(image_path: &str) -> &str {
    match image_path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &image_path[..idx],
    }
}

fn is_symlink(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => Ok(meta.file_type().is_symlink()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// 清除上次提取留下的文件或链接，链接本身被删除而不跟随；
/// 目标位置已有目录时返回 `false`
fn make_room(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => {
            std::fs::remove_file(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// 把镜像内路径映射到 `dest` 下；含 `.`、`..` 或空字节的路径被拒绝
fn host_path(dest: &Path, image_path: &str) -> Option<PathBuf> {
    let mut path = dest.to_path_buf();
    for component in image_path.split('/').filter(|c| !c.is_empty()) {
        if component == "." || component == ".." || component.contains('\0') || component.contains('\\') {
            return None;
        }
        path.push(component);
    }
    Some(path)
}

#[cfg(unix)]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::fs::write(link, target.as_bytes())?;
    Ok(())
}
