//! 节点扫描器
//!
//! 扫描过程严格顺序：每个节点的起始位置依赖前一个节点的长度。
//!
//! 1. 在偏移 0 处读取两个字节探测字节序（可由调用方强制指定）
//! 2. 在每个 4 字节对齐的位置读取节点头，魔数不匹配时前进 4 字节重新同步
//! 3. 目录项 / inode 节点被解析成 [`RawNode`]，其他类型按长度跳过
//! 4. 长度小于节点头或超出镜像末尾的记录被丢弃，同样前进 4 字节

use super::node::{NodeBody, RawDirent, RawInode, RawNode};
use super::CrcPolicy;
use crate::consts::*;
use crate::crc::jffs2_crc32;
use crate::error::Result;
use crate::source::ImageSource;
use crate::types::{accurate_node_type, jffs2_raw_dirent, jffs2_raw_inode, jffs2_unknown_node, Endian};

/// 扫描统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// 产出的目录项节点数
    pub dirents: usize,
    /// 产出的 inode 节点数
    pub inodes: usize,
    /// 跳过的其他类型节点数（cleanmarker、padding、summary、xattr 等）
    pub skipped: usize,
    /// 跳过的废弃节点数
    pub obsolete: usize,
    /// 被丢弃的截断/长度非法记录数
    pub truncated: usize,
    /// 为重新同步跳过的字节数
    pub resync_bytes: u64,
    /// CRC 校验失败数
    pub crc_failures: usize,
    /// 带早期魔数 0x1984 的节点头数（不解析）
    pub old_magic: usize,
}

/// 扫描结果
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// 按偏移递增排列的节点
    pub nodes: Vec<RawNode>,
    /// 统计信息
    pub stats: ScanStats,
    /// 使用的字节序
    pub endian: Endian,
}

impl ScanOutput {
    /// 所有目录项记录
    pub fn dirents(&self) -> impl Iterator<Item = &RawDirent> + '_ {
        self.nodes.iter().filter_map(RawNode::as_dirent)
    }

    /// 所有 inode 数据记录
    pub fn inodes(&self) -> impl Iterator<Item = &RawInode> + '_ {
        self.nodes.iter().filter_map(RawNode::as_inode)
    }
}

/// 一次节点解析的结果
enum Step {
    /// 产出节点，下一个位置由 `totlen` 决定
    Emit(RawNode),
    /// 不产出节点，按 `totlen` 跳过
    Skip,
    /// 记录无效，前进 4 字节重新同步
    Resync,
}

/// 节点扫描器
///
/// # 示例
///
/// ```rust,ignore
/// use jffs2_core::{CrcPolicy, Scanner};
///
/// let image = std::fs::read("rootfs.jffs2")?;
/// let output = Scanner::new().with_crc_policy(CrcPolicy::Report).scan(&image)?;
/// println!("{} nodes", output.nodes.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    endian: Option<Endian>,
    crc_policy: CrcPolicy,
    include_obsolete: bool,
}

impl Scanner {
    /// 创建扫描器（自动探测字节序，不校验 CRC，跳过废弃节点）
    pub fn new() -> Self {
        Self::default()
    }

    /// 强制字节序
    pub fn with_endian(mut self, endian: Option<Endian>) -> Self {
        self.endian = endian;
        self
    }

    /// 设置 CRC 策略
    pub fn with_crc_policy(mut self, policy: CrcPolicy) -> Self {
        self.crc_policy = policy;
        self
    }

    /// 是否保留废弃节点
    pub fn include_obsolete(mut self, include: bool) -> Self {
        self.include_obsolete = include;
        self
    }

    /// 扫描整个镜像
    ///
    /// 损坏的数据从不返回错误，只有数据源的 I/O 失败才会返回 `Err`。
    pub fn scan<S: ImageSource + ?Sized>(&self, source: &S) -> Result<ScanOutput> {
        let len = source.len();
        let endian = match self.endian {
            Some(endian) => endian,
            None => {
                let mut head = [0u8; 2];
                let n = source.read_at(0, &mut head)?;
                Endian::detect(&head[..n])
            }
        };
        log::debug!("[SCAN] image length {} bytes, {:?} endian", len, endian);

        let mut nodes = Vec::new();
        let mut stats = ScanStats::default();
        let mut hdr = [0u8; JFFS2_UNKNOWN_NODE_SIZE];
        let mut pos = 0u64;

        while pos + 4 <= len {
            let want = (len - pos).min(JFFS2_UNKNOWN_NODE_SIZE as u64) as usize;
            let n = source.read_at(pos, &mut hdr[..want])?;
            if n < 4 {
                break;
            }

            let magic = endian.read_u16(&hdr[0..2]);
            if magic != JFFS2_MAGIC_BITMASK {
                if magic == JFFS2_OLD_MAGIC_BITMASK {
                    log::debug!("[SCAN] old-format node header at {:#x}", pos);
                    stats.old_magic += 1;
                }
                pos += 4;
                stats.resync_bytes += 4;
                continue;
            }

            let header = match jffs2_unknown_node::decode(&hdr[..n], endian) {
                Some(header) => header,
                None => {
                    // 镜像末尾不足一个节点头
                    stats.truncated += 1;
                    break;
                }
            };

            let totlen = header.totlen as u64;
            if totlen < JFFS2_UNKNOWN_NODE_SIZE as u64 || pos + totlen > len {
                log::trace!("[SCAN] bad totlen {} at {:#x}", totlen, pos);
                stats.truncated += 1;
                pos += 4;
                stats.resync_bytes += 4;
                continue;
            }

            let mut hdr_ok = true;
            if self.crc_policy.verifies() {
                let expected = jffs2_crc32(&hdr[..JFFS2_HEADER_CRC_LEN]);
                if expected != header.hdr_crc {
                    hdr_ok = false;
                    stats.crc_failures += 1;
                    log::warn!(
                        "[SCAN] header CRC mismatch at {:#x}: stored {:#010x}, computed {:#010x}",
                        pos,
                        header.hdr_crc,
                        expected
                    );
                    if self.crc_policy == CrcPolicy::Enforce {
                        pos += 4;
                        stats.resync_bytes += 4;
                        continue;
                    }
                }
            }

            if header.is_obsolete() && !self.include_obsolete {
                stats.obsolete += 1;
                pos = next_node_offset(pos, totlen);
                continue;
            }

            let step = match accurate_node_type(header.nodetype) {
                JFFS2_NODETYPE_DIRENT => self.read_dirent(source, pos, &header, endian, &mut stats)?,
                JFFS2_NODETYPE_INODE => self.read_inode(source, pos, &header, endian, &mut stats)?,
                JFFS2_NODETYPE_CLEANMARKER
                | JFFS2_NODETYPE_PADDING
                | JFFS2_NODETYPE_SUMMARY
                | JFFS2_NODETYPE_XATTR
                | JFFS2_NODETYPE_XREF => {
                    stats.skipped += 1;
                    Step::Skip
                }
                other => {
                    log::trace!("[SCAN] unknown node type {:#06x} at {:#x}", other, pos);
                    stats.skipped += 1;
                    Step::Skip
                }
            };

            match step {
                Step::Emit(mut node) => {
                    if !hdr_ok {
                        node.crc_ok = Some(false);
                    }
                    log::trace!("[SCAN] {:?} node at {:#x}, totlen {}", node.kind(), pos, totlen);
                    match node.body {
                        NodeBody::Dirent(_) => stats.dirents += 1,
                        NodeBody::Inode(_) => stats.inodes += 1,
                    }
                    nodes.push(node);
                    pos = next_node_offset(pos, totlen);
                }
                Step::Skip => pos = next_node_offset(pos, totlen),
                Step::Resync => {
                    pos += 4;
                    stats.resync_bytes += 4;
                }
            }
        }

        if stats.old_magic > 0 {
            log::warn!(
                "[SCAN] {} node headers carry the old 0x1984 magic; this format is not supported",
                stats.old_magic
            );
        }
        log::info!(
            "[SCAN] {} dirents, {} inodes, {} skipped, {} obsolete, {} truncated, {} resync bytes, {} CRC failures",
            stats.dirents,
            stats.inodes,
            stats.skipped,
            stats.obsolete,
            stats.truncated,
            stats.resync_bytes,
            stats.crc_failures
        );

        Ok(ScanOutput { nodes, stats, endian })
    }

    fn read_dirent<S: ImageSource + ?Sized>(
        &self,
        source: &S,
        pos: u64,
        header: &jffs2_unknown_node,
        endian: Endian,
        stats: &mut ScanStats,
    ) -> Result<Step> {
        if (header.totlen as usize) < JFFS2_RAW_DIRENT_SIZE {
            stats.truncated += 1;
            return Ok(Step::Resync);
        }

        let mut buf = [0u8; JFFS2_RAW_DIRENT_SIZE];
        source.read_exact_at(pos, &mut buf)?;
        let raw = match jffs2_raw_dirent::decode(&buf, endian) {
            Some(raw) => raw,
            None => return Ok(Step::Resync),
        };

        let nsize = raw.nsize as usize;
        if JFFS2_RAW_DIRENT_SIZE + nsize > header.totlen as usize {
            log::trace!("[SCAN] dirent name overruns node at {:#x}", pos);
            stats.truncated += 1;
            return Ok(Step::Resync);
        }

        let mut name = vec![0u8; nsize];
        source.read_exact_at(pos + JFFS2_RAW_DIRENT_SIZE as u64, &mut name)?;

        let crc_ok = if self.crc_policy.verifies() {
            let node_ok = jffs2_crc32(&buf[..JFFS2_DIRENT_NODE_CRC_LEN]) == raw.node_crc;
            let name_ok = jffs2_crc32(&name) == raw.name_crc;
            if !(node_ok && name_ok) {
                stats.crc_failures += 1;
                log::warn!(
                    "[SCAN] dirent CRC mismatch at {:#x} (node ok: {}, name ok: {})",
                    pos,
                    node_ok,
                    name_ok
                );
                if self.crc_policy == CrcPolicy::Enforce {
                    return Ok(Step::Skip);
                }
            }
            Some(node_ok && name_ok)
        } else {
            None
        };

        Ok(Step::Emit(RawNode {
            offset: pos,
            totlen: header.totlen,
            obsolete: header.is_obsolete(),
            crc_ok,
            body: NodeBody::Dirent(RawDirent::from_raw(&raw, &name)),
        }))
    }

    fn read_inode<S: ImageSource + ?Sized>(
        &self,
        source: &S,
        pos: u64,
        header: &jffs2_unknown_node,
        endian: Endian,
        stats: &mut ScanStats,
    ) -> Result<Step> {
        if (header.totlen as usize) < JFFS2_RAW_INODE_SIZE {
            stats.truncated += 1;
            return Ok(Step::Resync);
        }

        let mut buf = [0u8; JFFS2_RAW_INODE_SIZE];
        source.read_exact_at(pos, &mut buf)?;
        let raw = match jffs2_raw_inode::decode(&buf, endian) {
            Some(raw) => raw,
            None => return Ok(Step::Resync),
        };

        if JFFS2_RAW_INODE_SIZE as u64 + raw.csize as u64 > header.totlen as u64 {
            log::trace!("[SCAN] inode payload overruns node at {:#x}", pos);
            stats.truncated += 1;
            return Ok(Step::Resync);
        }

        let crc_ok = if self.crc_policy.verifies() {
            let ok = jffs2_crc32(&buf[..JFFS2_INODE_NODE_CRC_LEN]) == raw.node_crc;
            if !ok {
                stats.crc_failures += 1;
                log::warn!("[SCAN] inode node CRC mismatch at {:#x} (ino {})", pos, raw.ino);
                if self.crc_policy == CrcPolicy::Enforce {
                    return Ok(Step::Skip);
                }
            }
            Some(ok)
        } else {
            None
        };

        Ok(Step::Emit(RawNode {
            offset: pos,
            totlen: header.totlen,
            obsolete: header.is_obsolete(),
            crc_ok,
            body: NodeBody::Inode(RawInode::from_raw(&raw, pos)),
        }))
    }
}

/// 下一个节点位置：`pos + totlen` 向上对齐到 4 字节，至少前进 4 字节
fn next_node_offset(pos: u64, totlen: u64) -> u64 {
    let align = JFFS2_NODE_ALIGN;
    let next = (pos + totlen + align - 1) & !(align - 1);
    next.max(pos + align)
}
