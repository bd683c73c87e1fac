//! 文件组装器
//!
//! 组装器只借用只读数据源，每次调用拥有自己的输出缓冲区，
//! 因此多个线程可以用各自的组装器同时组装不同的文件。

use super::{AssemblyOrder, Coverage, FileContent, SpanFailure, SpanFailureKind};
use crate::compr::decompress;
use crate::consts::*;
use crate::crc::jffs2_crc32;
use crate::error::{Error, ErrorKind, Result};
use crate::scan::{CrcPolicy, RawInode};
use crate::source::ImageSource;
use crate::tree::{Entry, EntryKind};

/// 文件组装器
pub struct FileAssembler<'a, S: ImageSource + ?Sized> {
    source: &'a S,
    order: AssemblyOrder,
    crc_policy: CrcPolicy,
}

impl<'a, S: ImageSource + ?Sized> FileAssembler<'a, S> {
    /// 创建组装器（按版本排序，不校验数据 CRC）
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            order: AssemblyOrder::default(),
            crc_policy: CrcPolicy::default(),
        }
    }

    /// 设置记录写入顺序
    pub fn with_order(mut self, order: AssemblyOrder) -> Self {
        self.order = order;
        self
    }

    /// 设置数据 CRC 策略
    pub fn with_crc_policy(mut self, policy: CrcPolicy) -> Self {
        self.crc_policy = policy;
        self
    }

    /// 组装条目的完整内容
    ///
    /// # 错误
    ///
    /// - `IsDirectory` - 条目是目录
    /// - `Io` - 读取数据源失败
    pub fn assemble(&self, entry: &Entry) -> Result<FileContent> {
        if entry.is_dir() {
            return Err(Error::new(ErrorKind::IsDirectory, "Cannot read a directory"));
        }
        log::debug!(
            "[ASSEMBLE] inode {} ('{}'): {} records, size {}",
            entry.ino(),
            entry.name(),
            entry.records().len(),
            entry.size()
        );
        self.assemble_records(entry.records(), entry.size())
    }

    /// 读取符号链接目标
    pub fn read_link(&self, entry: &Entry) -> Result<String> {
        if entry.kind() != EntryKind::Symlink {
            return Err(Error::new(ErrorKind::InvalidInput, "Not a symbolic link"));
        }
        let content = self.assemble(entry)?;
        Ok(String::from_utf8_lossy(&content.data).into_owned())
    }

    /// 把一组记录组装成 `size` 字节的内容
    pub fn assemble_records(&self, records: &[RawInode], size: u64) -> Result<FileContent> {
        let size_usize = usize::try_from(size)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "File size exceeds address space"))?;

        let mut ordered: Vec<&RawInode> = records.iter().collect();
        if self.order == AssemblyOrder::Version {
            ordered.sort_by_key(|r| r.version);
        }

        let mut content = FileContent {
            data: vec![0u8; size_usize],
            coverage: Coverage::new(size),
            failures: Vec::new(),
            crc_mismatches: Vec::new(),
        };

        for record in ordered {
            self.apply_record(record, &mut content)?;
        }

        if !content.coverage.is_complete() {
            log::debug!(
                "[ASSEMBLE] {} of {} bytes written, holes: {:?}",
                content.coverage.written_bytes(),
                size,
                content.coverage.holes()
            );
        }
        Ok(content)
    }

    fn apply_record(&self, record: &RawInode, content: &mut FileContent) -> Result<()> {
        let size = content.data.len() as u64;
        let start = record.offset as u64;
        if start >= size || record.dsize == 0 {
            return Ok(());
        }
        let window = (record.dsize as u64).min(size - start);

        let mut payload = vec![0u8; record.csize as usize];
        self.source.read_exact_at(record.data_offset, &mut payload)?;

        if self.crc_policy.verifies() {
            let computed = jffs2_crc32(&payload);
            if computed != record.data_crc {
                log::warn!(
                    "[ASSEMBLE] data CRC mismatch in node at {:#x} (ino {}, version {})",
                    node_offset(record),
                    record.ino,
                    record.version
                );
                if self.crc_policy == CrcPolicy::Enforce {
                    content.failures.push(failure(
                        record,
                        SpanFailureKind::DataCrc {
                            stored: record.data_crc,
                            computed,
                        },
                    ));
                    return Ok(());
                }
                content.crc_mismatches.push(node_offset(record));
            }
        }

        // 无数据的 ZERO 片段只需生成落在文件内的部分
        let dsize = if record.compr == JFFS2_COMPR_ZERO && payload.is_empty() {
            window as u32
        } else {
            record.dsize
        };

        let decoded = match decompress(&payload, dsize, record.compr) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!(
                    "[ASSEMBLE] codec {} failed for node at {:#x} (ino {}, offset {}): {}",
                    record.compr,
                    node_offset(record),
                    record.ino,
                    record.offset,
                    err
                );
                content.failures.push(failure(record, SpanFailureKind::Decompress(err)));
                return Ok(());
            }
        };

        if decoded.len() != dsize as usize {
            log::trace!(
                "[ASSEMBLE] node at {:#x} decoded {} bytes, declared {}",
                node_offset(record),
                decoded.len(),
                dsize
            );
        }

        let written = (decoded.len() as u64).min(window) as usize;
        let start = start as usize;
        content.data[start..start + written].copy_from_slice(&decoded[..written]);
        content
            .coverage
            .record(start as u64..(start + written) as u64, record.version);
        Ok(())
    }
}

fn node_offset(record: &RawInode) -> u64 {
    record.data_offset - JFFS2_RAW_INODE_SIZE as u64
}

fn failure(record: &RawInode, kind: SpanFailureKind) -> SpanFailure {
    SpanFailure {
        node_offset: node_offset(record),
        file_offset: record.offset as u64,
        version: record.version,
        codec: record.compr,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compr::CompressError;
    use crate::scan::Scanner;
    use crate::test_util::{ImageBuilder, InodeNode};
    use crate::tree::{Tree, UnlinkPolicy};
    use crate::types::Endian;

    fn build(img: &ImageBuilder) -> (Vec<u8>, Tree) {
        let image = img.build();
        let out = Scanner::new().scan(&image).unwrap();
        let tree = Tree::from_scan(&out, UnlinkPolicy::Apply);
        (image, tree)
    }

    #[test]
    fn test_two_adjacent_records() {
        let first: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let second: Vec<u8> = (0..4096u32).map(|i| (i % 13) as u8 + 100).collect();

        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 5, DT_REG, "blob");
        img.inode(&InodeNode::zlib(5, 2, 4096, &second, 8192));
        img.inode(&InodeNode::plain(5, 1, 0, &first, 8192));
        let (image, tree) = build(&img);

        let content = FileAssembler::new(&image).assemble(tree.entry(5).unwrap()).unwrap();
        assert_eq!(content.data.len(), 8192);
        assert_eq!(&content.data[..4096], first.as_slice());
        assert_eq!(&content.data[4096..], second.as_slice());
        assert!(content.is_complete());
    }

    #[test]
    fn test_overlap_resolved_by_version() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 6, DT_REG, "f");
        // 版本 2 先出现在流中
        img.inode(&InodeNode::plain(6, 2, 0, b"NEWER", 5));
        img.inode(&InodeNode::plain(6, 1, 0, b"older", 5));
        let (image, tree) = build(&img);
        let entry = tree.entry(6).unwrap();

        let by_version = FileAssembler::new(&image).assemble(entry).unwrap();
        assert_eq!(by_version.data, b"NEWER");
        assert_eq!(by_version.coverage.version_regressions(), 0);

        let by_scan = FileAssembler::new(&image)
            .with_order(AssemblyOrder::ScanOrder)
            .assemble(entry)
            .unwrap();
        assert_eq!(by_scan.data, b"older");
        assert_eq!(by_scan.coverage.version_regressions(), 1);
    }

    #[test]
    fn test_span_clipped_to_size() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 7, DT_REG, "short");
        img.inode(&InodeNode::plain(7, 1, 0, b"0123456789", 6));
        img.inode(&InodeNode::plain(7, 2, 100, b"beyond", 6));
        let (image, tree) = build(&img);

        let content = FileAssembler::new(&image).assemble(tree.entry(7).unwrap()).unwrap();
        assert_eq!(content.data, b"012345");
        assert!(content.is_complete());
    }

    #[test]
    fn test_failed_span_leaves_zeros() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 8, DT_REG, "damaged");
        img.inode(&InodeNode::plain(8, 1, 0, b"head", 12));
        img.inode(&InodeNode::raw(8, 2, 4, JFFS2_COMPR_ZLIB, &[1, 2, 3, 4], 4, 12));
        img.inode(&InodeNode::raw(8, 3, 8, JFFS2_COMPR_DYNRUBIN, &[9, 9], 4, 12));
        let (image, tree) = build(&img);

        let content = FileAssembler::new(&image).assemble(tree.entry(8).unwrap()).unwrap();
        assert_eq!(content.data, b"head\0\0\0\0\0\0\0\0");
        assert_eq!(content.failures.len(), 2);
        assert_eq!(content.failures[0].kind, SpanFailureKind::Decompress(CompressError::Inflate));
        assert_eq!(
            content.failures[1].kind,
            SpanFailureKind::Decompress(CompressError::UnsupportedCodec(JFFS2_COMPR_DYNRUBIN))
        );
        assert_eq!(content.failures[1].file_offset, 8);
        assert_eq!(content.coverage.holes(), vec![4..12]);
        assert!(!content.is_complete());
    }

    #[test]
    fn test_zero_node_and_sparse_hole() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 9, DT_REG, "sparse");
        img.inode(&InodeNode::plain(9, 1, 0, b"abcdefgh", 8));
        // 截断后扩展：ZERO 节点把 [4, 8) 清零
        img.inode(&InodeNode::raw(9, 2, 4, JFFS2_COMPR_ZERO, &[], 4, 8));
        img.inode(&InodeNode::plain(9, 3, 16, b"tail", 20));
        let (image, tree) = build(&img);

        let content = FileAssembler::new(&image).assemble(tree.entry(9).unwrap()).unwrap();
        assert_eq!(content.data, b"abcd\0\0\0\0\0\0\0\0\0\0\0\0tail");
        assert_eq!(content.coverage.holes(), vec![8..16]);
        assert!(content.failures.is_empty());
    }

    #[test]
    fn test_data_crc_policies() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 4, DT_REG, "crc");
        let node = img.inode(&InodeNode::plain(4, 1, 0, b"payload", 7));
        img.corrupt(node + JFFS2_RAW_INODE_SIZE as u64);
        let (image, tree) = build(&img);
        let entry = tree.entry(4).unwrap();

        let lenient = FileAssembler::new(&image).assemble(entry).unwrap();
        assert_eq!(&lenient.data[1..], b"ayload");
        assert!(lenient.crc_mismatches.is_empty());

        let report = FileAssembler::new(&image)
            .with_crc_policy(CrcPolicy::Report)
            .assemble(entry)
            .unwrap();
        assert_eq!(report.crc_mismatches, vec![node]);
        assert!(report.failures.is_empty());

        let enforce = FileAssembler::new(&image)
            .with_crc_policy(CrcPolicy::Enforce)
            .assemble(entry)
            .unwrap();
        assert_eq!(enforce.data, vec![0u8; 7]);
        assert!(matches!(enforce.failures[0].kind, SpanFailureKind::DataCrc { .. }));
    }

    #[test]
    fn test_directory_and_symlink() {
        let mut img = ImageBuilder::new(Endian::Little);
        img.dirent(1, 1, 2, DT_DIR, "etc");
        img.dirent(1, 2, 3, DT_LNK, "link");
        img.inode(&InodeNode::plain(3, 1, 0, b"etc/passwd", 10).with_mode(S_IFLNK | 0o777));
        let (image, tree) = build(&img);
        let asm = FileAssembler::new(&image);

        let err = asm.assemble(tree.entry(2).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsDirectory);
        assert_eq!(asm.read_link(tree.entry(3).unwrap()).unwrap(), "etc/passwd");
        let err = asm.read_link(tree.entry(2).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
