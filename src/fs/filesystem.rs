//! JFFS2 镜像核心结构

use super::config::Jffs2Config;
use crate::{
    error::{Error, ErrorKind, Result},
    file::{FileAssembler, FileContent},
    scan::{ScanStats, Scanner},
    source::{CachedSource, FileSource, ImageSource},
    tree::{Entry, EntryKind, EntryMetadata, Tree},
    types::Endian,
};
use std::path::Path;

/// 目录列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// inode 编号
    pub ino: u32,
    /// 名字
    pub name: String,
    /// 条目类型
    pub kind: EntryKind,
}

/// 重建后的 JFFS2 镜像
///
/// 构建时扫描一次整个镜像并合并出文件树，之后所有查询都是只读的；
/// 文件内容在读取时才组装。
///
/// # 示例
///
/// ```rust,ignore
/// use jffs2_core::{Jffs2Config, Jffs2Fs};
///
/// let fs = Jffs2Fs::open("rootfs.jffs2", Jffs2Config::default())?;
///
/// // 读取目录
/// for entry in fs.read_dir("/etc")? {
///     println!("{}", entry.name);
/// }
///
/// // 读取文件
/// let passwd = fs.read_file("/etc/passwd")?;
///
/// // 获取文件元数据
/// let metadata = fs.metadata("/etc/passwd")?;
/// println!("File size: {} bytes", metadata.size);
/// ```
pub struct Jffs2Fs<S: ImageSource> {
    pub(crate) source: S,
    config: Jffs2Config,
    tree: Tree,
    stats: ScanStats,
    endian: Endian,
}

impl Jffs2Fs<CachedSource<FileSource>> {
    /// 打开镜像文件（带页缓存）
    ///
    /// # 错误
    ///
    /// - `ErrorKind::NotFound` - 文件不存在
    /// - `ErrorKind::Io` - 读取失败
    pub fn open<P: AsRef<Path>>(path: P, config: Jffs2Config) -> Result<Self> {
        let file = FileSource::open(path)?;
        Self::new(CachedSource::new(file, config.cache_pages), config)
    }
}

impl<S: ImageSource> Jffs2Fs<S> {
    /// 扫描数据源并构建文件树
    ///
    /// 损坏的闪存数据不会导致失败，只有数据源的 I/O 错误会返回 `Err`。
    pub fn new(source: S, config: Jffs2Config) -> Result<Self> {
        let output = Scanner::new()
            .with_endian(config.endian)
            .with_crc_policy(config.crc_policy)
            .include_obsolete(config.include_obsolete)
            .scan(&source)?;
        let tree = Tree::from_scan(&output, config.unlink_policy);

        Ok(Self {
            source,
            config,
            tree,
            stats: output.stats,
            endian: output.endian,
        })
    }

    /// 数据源
    pub fn source(&self) -> &S {
        &self.source
    }

    /// 取回数据源
    pub fn into_source(self) -> S {
        self.source
    }

    /// 配置
    pub fn config(&self) -> &Jffs2Config {
        &self.config
    }

    /// 文件树
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// 根目录
    pub fn root(&self) -> &Entry {
        self.tree.root()
    }

    /// 扫描统计
    pub fn scan_stats(&self) -> &ScanStats {
        &self.stats
    }

    /// 镜像字节序
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// 按 inode 编号获取条目
    pub fn entry(&self, ino: u32) -> Result<&Entry> {
        self.tree
            .entry(ino)
            .ok_or(Error::new(ErrorKind::NotFound, "No such inode"))
    }

    /// 按路径查找条目
    pub fn lookup_path(&self, path: &str) -> Result<&Entry> {
        self.tree.resolve_path(path)
    }

    /// 获取文件元数据
    pub fn metadata(&self, path: &str) -> Result<EntryMetadata> {
        Ok(self.lookup_path(path)?.metadata())
    }

    /// 读取目录
    ///
    /// # 错误
    ///
    /// - `ErrorKind::NotFound` - 路径不存在
    /// - `ErrorKind::NotDirectory` - 不是目录
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.lookup_path(path)?;
        if !dir.is_dir() {
            return Err(Error::new(ErrorKind::NotDirectory, "Not a directory"));
        }

        Ok(self
            .tree
            .children(dir.ino())
            .map(|child| DirEntry {
                ino: child.ino(),
                name: child.name().to_string(),
                kind: child.kind(),
            })
            .collect())
    }

    /// 读取文件的完整内容
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self.lookup_path(path)?;
        Ok(self.read_entry(entry)?.into_data())
    }

    /// 组装条目内容，附带覆盖图和失败片段
    pub fn read_entry(&self, entry: &Entry) -> Result<FileContent> {
        self.assembler().assemble(entry)
    }

    /// 读取符号链接目标
    pub fn read_link(&self, path: &str) -> Result<String> {
        let entry = self.lookup_path(path)?;
        self.assembler().read_link(entry)
    }

    pub(crate) fn assembler(&self) -> FileAssembler<'_, S> {
        FileAssembler::new(&self.source)
            .with_order(self.config.assembly_order)
            .with_crc_policy(self.config.crc_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::test_util::{docs_image, ImageBuilder, InodeNode};

    #[test]
    fn test_end_to_end_docs() {
        for endian in [Endian::Little, Endian::Big] {
            let fs = Jffs2Fs::new(docs_image(endian), Jffs2Config::default()).unwrap();
            assert_eq!(fs.endian(), endian);

            let root = fs.read_dir("/").unwrap();
            assert_eq!(root.len(), 1);
            assert_eq!(root[0].name, "docs");
            assert_eq!(root[0].ino, 10);
            assert_eq!(root[0].kind, EntryKind::Directory);

            let docs = fs.read_dir("/docs").unwrap();
            assert_eq!(docs.len(), 1);
            assert_eq!((docs[0].ino, docs[0].name.as_str()), (11, "a.txt"));

            let file = fs.entry(11).unwrap();
            assert_eq!(file.parent(), 10);
            assert_eq!(fs.read_file("/docs/a.txt").unwrap(), b"hello world");
            assert_eq!(fs.metadata("/docs/a.txt").unwrap().size, 11);
        }
    }

    #[test]
    fn test_errors() {
        let fs = Jffs2Fs::new(docs_image(Endian::Little), Jffs2Config::default()).unwrap();
        assert_eq!(fs.read_dir("/docs/a.txt").unwrap_err().kind(), ErrorKind::NotDirectory);
        assert_eq!(fs.read_file("/docs").unwrap_err().kind(), ErrorKind::IsDirectory);
        assert_eq!(fs.read_file("/nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.entry(12345).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.read_link("/docs/a.txt").unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_metadata_and_stats() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.cleanmarker();
        img.dirent(1, 1, 2, DT_REG, "owned");
        img.inode(&InodeNode::plain(2, 1, 0, b"x", 1).with_owner(1000, 100).with_mode(S_IFREG | 0o640));
        let fs = Jffs2Fs::new(img.build(), Jffs2Config::default()).unwrap();

        let meta = fs.metadata("/owned").unwrap();
        assert_eq!((meta.uid, meta.gid), (1000, 100));
        assert_eq!(meta.permissions(), 0o640);
        assert_eq!(meta.kind, EntryKind::RegularFile);

        let stats = fs.scan_stats();
        assert_eq!((stats.dirents, stats.inodes, stats.skipped), (1, 1, 1));
    }

    #[test]
    fn test_legacy_config_keeps_deleted_names() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 2, DT_REG, "old");
        img.inode(&InodeNode::plain(2, 1, 0, b"data", 4));
        img.dirent(1, 2, 0, DT_REG, "old");
        let image = img.build();

        let strict = Jffs2Fs::new(image.clone(), Jffs2Config::default()).unwrap();
        assert!(strict.read_file("/old").is_err());
        // 按 inode 仍可恢复
        let entry = strict.entry(2).unwrap();
        assert_eq!(strict.read_entry(entry).unwrap().data, b"data");

        let legacy = Jffs2Fs::new(image, Jffs2Config::legacy()).unwrap();
        assert_eq!(legacy.read_file("/old").unwrap(), b"data");
    }

    #[test]
    fn test_open_image_file() {
        let path = std::env::temp_dir().join(format!("jffs2_core_fs_{}.img", std::process::id()));
        std::fs::write(&path, docs_image(Endian::Big)).unwrap();

        let config = Jffs2Config {
            cache_pages: 2,
            ..Jffs2Config::default()
        };
        let fs = Jffs2Fs::open(&path, config).unwrap();
        assert_eq!(fs.read_file("/docs/a.txt").unwrap(), b"hello world");
        assert!(fs.source().stats().hits + fs.source().stats().misses > 0);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            Jffs2Fs::open(&path, Jffs2Config::default()).err().map(|e| e.kind()),
            Some(ErrorKind::NotFound)
        );
    }
}
