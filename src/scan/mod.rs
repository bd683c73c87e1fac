//! 节点扫描
//!
//! 在原始闪存转储中查找有效的 JFFS2 节点头，跳过损坏或无法识别的区域，
//! 产出按偏移递增排列的节点记录序列。
//!
//! # 模块结构
//!
//! - `node` - 节点记录（目录项 / inode 数据）
//! - `scanner` - 扫描器与重新同步逻辑

mod node;
mod scanner;

pub use node::{NodeBody, NodeKind, RawDirent, RawInode, RawNode};
pub use scanner::{ScanOutput, ScanStats, Scanner};

/// CRC 校验策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcPolicy {
    /// 不计算 CRC（最宽松，能容忍损坏的转储）
    #[default]
    Ignore,
    /// 计算并记录结果，但保留校验失败的节点
    Report,
    /// 丢弃头部/节点 CRC 不匹配的节点，跳过数据 CRC 不匹配的片段
    Enforce,
}

impl CrcPolicy {
    /// 是否需要计算 CRC
    pub fn verifies(self) -> bool {
        self != CrcPolicy::Ignore
    }
}
