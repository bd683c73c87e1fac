//! 镜像数据源抽象
//!
//! 提供对原始闪存转储的按字节随机读取接口。
//!
//! source/mod.rs 定义 `ImageSource` trait 以及内存和文件两种实现；
//! source/cache.rs 提供基于 LRU 的页缓存包装器，用于文件镜像上大量的小节点读取。
//!
//! 所有读取都是定位读取（`&self`），不共享游标，因此多个线程可以同时在同一个
//! 只读数据源上组装不同的文件。

mod cache;

pub use cache::{CachedSource, PageCacheStats, DEFAULT_PAGE_COUNT, PAGE_SIZE};

use crate::error::{Error, ErrorKind, Result};
use std::fs::File;
use std::path::Path;

/// 镜像数据源接口
///
/// 实现此 trait 以提供底层镜像访问。
///
/// # 示例
///
/// ```rust,ignore
/// use jffs2_core::{ImageSource, Result};
///
/// struct MtdDump {
///     // ...
/// }
///
/// impl ImageSource for MtdDump {
///     fn len(&self) -> u64 {
///         16 * 1024 * 1024
///     }
///
///     fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
///         // 从 offset 开始读取，返回实际读取的字节数
///         Ok(buf.len())
///     }
/// }
/// ```
pub trait ImageSource {
    /// 镜像总长度（字节）
    fn len(&self) -> u64;

    /// 从 `offset` 开始读取最多 `buf.len()` 字节
    ///
    /// # 返回
    ///
    /// 实际读取的字节数；到达镜像末尾时可能小于 `buf.len()`
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// 镜像是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 精确读取 `buf.len()` 字节
    ///
    /// 超出镜像末尾时返回 `ErrorKind::Io` 错误。
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut done = 0usize;
        while done < buf.len() {
            let n = self.read_at(offset + done as u64, &mut buf[done..])?;
            if n == 0 {
                return Err(Error::new(ErrorKind::Io, "Read past end of image"));
            }
            done += n;
        }
        Ok(())
    }
}

impl ImageSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let total = <[u8]>::len(self) as u64;
        if offset >= total {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(<[u8]>::len(self) - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ImageSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.as_slice().read_at(offset, buf)
    }
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// 文件镜像数据源
///
/// 使用定位读取（Unix `pread` / Windows `seek_read`），不依赖文件游标。
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// 以只读方式打开镜像文件
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    /// 包装已打开的文件
    pub fn from_file(file: File) -> Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ImageSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let want = buf.len().min((self.len - offset) as usize);
        Ok(positioned_read(&self.file, offset, &mut buf[..want])?)
    }
}

#[cfg(unix)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
