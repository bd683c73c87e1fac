//! 文件系统配置

use crate::file::AssemblyOrder;
use crate::scan::CrcPolicy;
use crate::source::DEFAULT_PAGE_COUNT;
use crate::tree::UnlinkPolicy;
use crate::types::Endian;

/// 文件系统配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jffs2Config {
    /// 强制字节序；`None` 表示按镜像开头探测
    pub endian: Option<Endian>,
    /// CRC 校验策略
    pub crc_policy: CrcPolicy,
    /// 是否保留 ACCURATE 位被清除的废弃节点
    pub include_obsolete: bool,
    /// 删除记录的处理策略
    pub unlink_policy: UnlinkPolicy,
    /// 组装时记录的写入顺序
    pub assembly_order: AssemblyOrder,
    /// 文件镜像页缓存大小（页数）
    pub cache_pages: usize,
}

impl Default for Jffs2Config {
    fn default() -> Self {
        Self {
            endian: None,
            crc_policy: CrcPolicy::Ignore,
            include_obsolete: false,
            unlink_policy: UnlinkPolicy::Apply,
            assembly_order: AssemblyOrder::Version,
            cache_pages: DEFAULT_PAGE_COUNT, // 默认 256 页
        }
    }
}

impl Jffs2Config {
    /// 兼容配置：只记录删除，按收集顺序组装
    pub fn legacy() -> Self {
        Self {
            unlink_policy: UnlinkPolicy::Record,
            assembly_order: AssemblyOrder::ScanOrder,
            ..Self::default()
        }
    }
}
