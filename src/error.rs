//! 错误类型定义
//!
//! 提供 JFFS2 镜像解析操作的错误类型。
//!
//! 注意：损坏的闪存数据本身从不作为错误返回（扫描器会重新同步，
//! 解压失败只影响单个数据片段）。这里的错误只覆盖底层 I/O
//! 失败和 API 误用。

use core::fmt;

/// JFFS2 操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误
    Io,
    /// 无效参数
    InvalidInput,
    /// 数据损坏（解压流错误等）
    Corrupted,
    /// 条目不存在
    NotFound,
    /// 不支持的压缩类型
    Unsupported,
    /// 不是目录
    NotDirectory,
    /// 是目录
    IsDirectory,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        log::debug!("[IO] {}", err);
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::new(ErrorKind::NotFound, "Image file not found"),
            std::io::ErrorKind::UnexpectedEof => Error::new(ErrorKind::Io, "Unexpected end of image"),
            _ => Error::new(ErrorKind::Io, "Image I/O error"),
        }
    }
}

// 压缩层错误转换
impl From<crate::compr::CompressError> for Error {
    fn from(err: crate::compr::CompressError) -> Self {
        use crate::compr::CompressError;
        match err {
            CompressError::UnsupportedCodec(_) => {
                Error::new(ErrorKind::Unsupported, "Unsupported compression type")
            }
            CompressError::InputOverrun => Error::new(ErrorKind::Corrupted, "Compressed input overrun"),
            CompressError::OutputOverrun => Error::new(ErrorKind::Corrupted, "Decompressed output overrun"),
            CompressError::LookBehindOverrun => {
                Error::new(ErrorKind::Corrupted, "Match distance before start of output")
            }
            CompressError::Inflate => Error::new(ErrorKind::Corrupted, "Malformed zlib stream"),
        }
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
