//! jffs2_core: JFFS2 flash dump reconstruction in pure Rust
//!
//! 这是一个从原始闪存转储中重建 JFFS2 文件系统的库，旨在提供：
//! - **容错扫描**：在损坏、擦除或无法识别的区域之后重新同步
//! - **版本合并**：同一对象的新版本日志记录覆盖旧版本
//! - **逐字节精确的解压**：none / zero / zlib / rtime / lzo
//! - **零 unsafe 代码**
//!
//! # 示例
//!
//! ```rust,ignore
//! use jffs2_core::{Jffs2Config, Jffs2Fs, Result};
//!
//! fn main() -> Result<()> {
//!     let fs = Jffs2Fs::open("mtdblock3.bin", Jffs2Config::default())?;
//!
//!     for (path, entry) in fs.tree().walk() {
//!         println!("{} ({} bytes)", path, entry.size());
//!     }
//!
//!     let report = fs.extract_to("out", 4)?;
//!     println!("{} files, {} failed spans", report.files, report.failed_spans);
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 闪存节点格式与字节序
//! - [`source`] - 镜像数据源抽象和页缓存
//! - [`scan`] - 节点扫描器
//! - [`compr`] - 压缩框架
//! - [`tree`] - 节点树模型
//! - [`file`] - 文件组装
//! - [`fs`] - 高级 API 与提取

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// JFFS2 CRC32 计算
pub mod crc;

/// 镜像数据源
pub mod source;

/// 节点扫描
pub mod scan;

/// 压缩框架
pub mod compr;

/// 节点树模型
pub mod tree;

/// 文件组装
pub mod file;

/// 高级 API
pub mod fs;

#[cfg(test)]
mod test_util;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 数据源
pub use source::{CachedSource, FileSource, ImageSource, PageCacheStats};

// 格式
pub use types::{Endian, NodeTypeFlags};

// 扫描
pub use scan::{CrcPolicy, NodeBody, NodeKind, RawDirent, RawInode, RawNode, ScanOutput, ScanStats, Scanner};

// 压缩
pub use compr::{decompress, CompressError, CompressionType};

// 树
pub use tree::{Entry, EntryKind, EntryMetadata, PendingUnlink, Tree, UnlinkPolicy};

// 文件
pub use file::{AssemblyOrder, Coverage, FileAssembler, FileContent, SpanFailure, SpanFailureKind};

// 文件系统
pub use fs::{DirEntry, ExtractReport, Jffs2Config, Jffs2Fs};
