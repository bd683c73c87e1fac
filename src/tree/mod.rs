//! 节点树模型
//!
//! 把扫描器产出的扁平节点序列合并成一棵文件/目录树。
//!
//! ## 合并规则
//!
//! 1. 根目录（inode 1）总是预先存在
//! 2. 目录项按版本号递增处理，同一个 inode 的名字和父目录以最新版本为准
//! 3. inode 数据记录按收集顺序附加到对应条目，文件大小取最大的 isize
//! 4. 父目录从未出现的条目成为孤立条目，不在层次结构中，但仍可按 inode 访问
//!
//! ## 模块结构
//!
//! - `entry` - 条目、条目类型与元数据
//! - `build` - 合并算法
//! - `lookup` - 查询（按 inode / 按名字 / 按路径 / 遍历）

mod build;
mod entry;
mod lookup;

pub use entry::{Entry, EntryKind, EntryMetadata};
pub use lookup::Walk;

use std::collections::{BTreeMap, BTreeSet};

/// 删除记录的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlinkPolicy {
    /// 只记录删除，不从层次结构中移除任何条目
    Record,
    /// 名字的最新目录项是删除记录（或指向其他 inode）时，条目从层次结构中移除
    #[default]
    Apply,
}

/// 尚未应用的删除记录（目标 inode 为 0 的目录项）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnlink {
    /// 父目录 inode
    pub parent: u32,
    /// 被删除的名字
    pub name: String,
    /// 删除记录的版本号
    pub version: u32,
}

/// 重建的文件树
///
/// 构建后只读。
#[derive(Debug, Clone)]
pub struct Tree {
    root: Entry,
    entries: BTreeMap<u32, Entry>,
    reachable: BTreeSet<u32>,
    pending_unlinks: Vec<PendingUnlink>,
}
