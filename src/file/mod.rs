//! 文件组装
//!
//! 对一个条目收集到的所有数据记录：读取压缩数据、解压、写入文件缓冲区的
//! 逻辑偏移处。单个片段失败只跳过该片段，从不中止整个文件。
//!
//! ## 模块结构
//!
//! - `assemble` - 组装器
//! - `coverage` - 覆盖图（完整性诊断）

mod assemble;
mod coverage;

pub use assemble::FileAssembler;
pub use coverage::{CoveredSpan, Coverage};

use crate::compr::CompressError;
use core::fmt;

/// 记录写入顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyOrder {
    /// 按版本号稳定排序，重叠区域由最新版本决定
    #[default]
    Version,
    /// 按收集顺序，重叠区域由后处理的记录决定
    ScanOrder,
}

/// 片段失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanFailureKind {
    /// 解压失败
    Decompress(CompressError),
    /// 数据 CRC 不匹配（仅在 `CrcPolicy::Enforce` 下跳过片段）
    DataCrc {
        /// 记录中存储的 CRC
        stored: u32,
        /// 计算得到的 CRC
        computed: u32,
    },
}

impl fmt::Display for SpanFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanFailureKind::Decompress(err) => write!(f, "{}", err),
            SpanFailureKind::DataCrc { stored, computed } => {
                write!(f, "data CRC mismatch: stored {:#010x}, computed {:#010x}", stored, computed)
            }
        }
    }
}

/// 一个被跳过的数据片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanFailure {
    /// 节点在镜像中的偏移
    pub node_offset: u64,
    /// 片段在文件中的偏移
    pub file_offset: u64,
    /// 记录版本
    pub version: u32,
    /// 压缩类型
    pub codec: u8,
    /// 失败原因
    pub kind: SpanFailureKind,
}

/// 组装结果
#[derive(Debug, Clone)]
pub struct FileContent {
    /// 文件内容，长度等于条目大小
    pub data: Vec<u8>,
    /// 覆盖图
    pub coverage: Coverage,
    /// 被跳过的片段
    pub failures: Vec<SpanFailure>,
    /// 数据 CRC 不匹配但仍被写入的节点偏移（`CrcPolicy::Report`）
    pub crc_mismatches: Vec<u64>,
}

impl FileContent {
    /// 每个字节都被成功写入且没有片段失败
    pub fn is_complete(&self) -> bool {
        self.coverage.is_complete() && self.failures.is_empty()
    }

    /// 取出文件内容
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
