//! 压缩框架
//!
//! 以一字节的压缩类型为键，分发到四种解压算法：
//!
//! | 类型 | 算法 |
//! |------|------|
//! | `NONE` / `ZERO` | 原样返回 |
//! | `ZLIB` | 带 zlib 头的 deflate 流 |
//! | `RTIME` | 游程/回溯编码 |
//! | `LZO` | LZO1X 字节流解码 |
//!
//! `RUBINMIPS`、`DYNRUBIN` 以及未知类型返回 [`CompressError::UnsupportedCodec`]。
//!
//! 所有解码器都是纯函数，调用之间不共享状态。解码失败只影响当前数据片段，
//! 由调用方（文件组装器）决定如何降级。

mod lzo;
mod rtime;
mod zlib;

pub use lzo::lzo1x_decompress;
pub use rtime::rtime_decompress;
pub use zlib::zlib_decompress;

use crate::consts::*;
use core::fmt;

/// 压缩层错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressError {
    /// 不支持的压缩类型
    UnsupportedCodec(u8),
    /// 压缩输入在指令中途耗尽
    InputOverrun,
    /// 输出超过声明的解压长度
    OutputOverrun,
    /// 回溯距离超出已输出的数据
    LookBehindOverrun,
    /// zlib 流错误
    Inflate,
}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressError::UnsupportedCodec(id) => write!(f, "unsupported compression type {:#04x}", id),
            CompressError::InputOverrun => write!(f, "compressed input overrun"),
            CompressError::OutputOverrun => write!(f, "decompressed output overrun"),
            CompressError::LookBehindOverrun => write!(f, "match distance before start of output"),
            CompressError::Inflate => write!(f, "malformed zlib stream"),
        }
    }
}

impl std::error::Error for CompressError {}

/// 输出缓冲区预分配上限，避免损坏的 `dsize` 触发巨大分配
pub(crate) const PREALLOC_LIMIT: usize = 64 * 1024;

/// 解压结果
pub type DecompressResult = core::result::Result<Vec<u8>, CompressError>;

/// 压缩类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// 无压缩
    None = JFFS2_COMPR_NONE,
    /// 全零
    Zero = JFFS2_COMPR_ZERO,
    /// rtime
    Rtime = JFFS2_COMPR_RTIME,
    /// rubin MIPS（不支持）
    RubinMips = JFFS2_COMPR_RUBINMIPS,
    /// copy（不支持）
    Copy = JFFS2_COMPR_COPY,
    /// 动态 rubin（不支持）
    DynRubin = JFFS2_COMPR_DYNRUBIN,
    /// zlib
    Zlib = JFFS2_COMPR_ZLIB,
    /// LZO1X
    Lzo = JFFS2_COMPR_LZO,
}

impl CompressionType {
    /// 从压缩类型字节转换
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            JFFS2_COMPR_NONE => Some(CompressionType::None),
            JFFS2_COMPR_ZERO => Some(CompressionType::Zero),
            JFFS2_COMPR_RTIME => Some(CompressionType::Rtime),
            JFFS2_COMPR_RUBINMIPS => Some(CompressionType::RubinMips),
            JFFS2_COMPR_COPY => Some(CompressionType::Copy),
            JFFS2_COMPR_DYNRUBIN => Some(CompressionType::DynRubin),
            JFFS2_COMPR_ZLIB => Some(CompressionType::Zlib),
            JFFS2_COMPR_LZO => Some(CompressionType::Lzo),
            _ => None,
        }
    }

    /// 压缩类型字节
    pub fn id(self) -> u8 {
        self as u8
    }

    /// 是否有可用的解码器
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            CompressionType::RubinMips | CompressionType::Copy | CompressionType::DynRubin
        )
    }

    /// 名称（用于日志）
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Zero => "zero",
            CompressionType::Rtime => "rtime",
            CompressionType::RubinMips => "rubinmips",
            CompressionType::Copy => "copy",
            CompressionType::DynRubin => "dynrubin",
            CompressionType::Zlib => "zlib",
            CompressionType::Lzo => "lzo",
        }
    }
}

/// 解压一个数据片段
///
/// # 参数
///
/// * `payload` - 压缩数据（`csize` 字节）
/// * `dsize` - 声明的解压长度
/// * `codec` - 压缩类型字节
///
/// # 说明
///
/// `ZERO` 片段在闪存上通常不带数据（`csize == 0`），此时返回 `dsize` 个零字节；
/// 带数据时与 `NONE` 一样原样返回。
pub fn decompress(payload: &[u8], dsize: u32, codec: u8) -> DecompressResult {
    let kind = CompressionType::from_id(codec).ok_or(CompressError::UnsupportedCodec(codec))?;

    match kind {
        CompressionType::None => Ok(payload.to_vec()),
        CompressionType::Zero => {
            if payload.is_empty() {
                Ok(vec![0u8; dsize as usize])
            } else {
                Ok(payload.to_vec())
            }
        }
        CompressionType::Zlib => zlib_decompress(payload, dsize as usize),
        CompressionType::Rtime => Ok(rtime_decompress(payload, dsize as usize)),
        CompressionType::Lzo => lzo1x_decompress(payload, dsize as usize),
        CompressionType::RubinMips | CompressionType::Copy | CompressionType::DynRubin => {
            log::debug!("[COMPR] {} payloads are not supported", kind.name());
            Err(CompressError::UnsupportedCodec(codec))
        }
    }
}
