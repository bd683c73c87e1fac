//! 镜像页缓存（使用 lru crate）
//!
//! 扫描器按顺序读取大量 12~68 字节的节点头，文件组装再随机读取小段压缩数据。
//! 直接在文件上做这些读取会产生大量系统调用，因此按固定大小的页缓存镜像内容。
//!
//! ```text
//! struct CachedSource<S> {
//!     inner: S,                                  // 底层数据源
//!     pages: Mutex<LruCache<u64, Box<[u8]>>>,    // 页号 -> 页内容，自动LRU
//!     stats: Mutex<PageCacheStats>,
//! }
//! ```
//!
//! 镜像是只读的，没有脏页和写回。

use super::ImageSource;
use crate::error::{Error, ErrorKind, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// 页大小（字节）
pub const PAGE_SIZE: usize = 4096;

/// 默认缓存页数量
pub const DEFAULT_PAGE_COUNT: usize = 256;

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCacheStats {
    /// 总访问次数（按页计）
    pub total_accesses: u64,
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
}

impl PageCacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }
}

struct CacheState {
    pages: LruCache<u64, Box<[u8]>>,
    stats: PageCacheStats,
}

/// 带页缓存的数据源包装器
pub struct CachedSource<S> {
    inner: S,
    state: Mutex<CacheState>,
}

impl<S: ImageSource> CachedSource<S> {
    /// 创建新的页缓存
    ///
    /// # 参数
    ///
    /// * `inner` - 底层数据源
    /// * `capacity` - 缓存页数量（为 0 时按 1 处理）
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: Mutex::new(CacheState {
                pages: LruCache::new(capacity),
                stats: PageCacheStats::default(),
            }),
        }
    }

    /// 使用默认页数创建
    pub fn with_default_cache(inner: S) -> Self {
        Self::new(inner, DEFAULT_PAGE_COUNT)
    }

    /// 获取底层数据源的引用
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// 获取统计信息
    pub fn stats(&self) -> PageCacheStats {
        match self.state.lock() {
            Ok(state) => state.stats,
            Err(poisoned) => poisoned.into_inner().stats,
        }
    }

    /// 清空缓存
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.pages.clear();
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|_| Error::new(ErrorKind::Io, "Page cache lock poisoned"))
    }

    /// 从缓存（或底层数据源）复制一页中的一段
    ///
    /// 未命中时在锁外读取底层数据源，多个线程的读取可以并行。
    fn copy_from_page(&self, page_no: u64, in_page: usize, out: &mut [u8]) -> Result<usize> {
        {
            let mut state = self.lock()?;
            state.stats.total_accesses += 1;

            if let Some(page) = state.pages.get(&page_no) {
                let n = out.len().min(page.len().saturating_sub(in_page));
                out[..n].copy_from_slice(&page[in_page..in_page + n]);
                state.stats.hits += 1;
                log::trace!("[CACHE] page {:#x} HIT", page_no);
                return Ok(n);
            }

            state.stats.misses += 1;
            log::trace!(
                "[CACHE] page {:#x} MISS, cache={}/{}",
                page_no,
                state.pages.len(),
                state.pages.cap().get()
            );
        }

        let start = page_no * PAGE_SIZE as u64;
        let page_len = (self.inner.len().saturating_sub(start)).min(PAGE_SIZE as u64) as usize;
        let mut page = vec![0u8; page_len].into_boxed_slice();
        self.inner.read_exact_at(start, &mut page)?;

        let n = out.len().min(page_len.saturating_sub(in_page));
        out[..n].copy_from_slice(&page[in_page..in_page + n]);
        self.lock()?.pages.put(page_no, page);
        Ok(n)
    }
}

impl<S: ImageSource> ImageSource for CachedSource<S> {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let total = self.inner.len();
        if offset >= total {
            return Ok(0);
        }
        let want = buf.len().min((total - offset) as usize);

        let mut done = 0usize;
        while done < want {
            let pos = offset + done as u64;
            let page_no = pos / PAGE_SIZE as u64;
            let in_page = (pos % PAGE_SIZE as u64) as usize;
            let n = self.copy_from_page(page_no, in_page, &mut buf[done..want])?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_cross_page_read() {
        let data = image(PAGE_SIZE * 3 + 100);
        let cached = CachedSource::new(data.clone(), 2);

        let mut buf = vec![0u8; 200];
        let off = PAGE_SIZE as u64 - 50;
        assert_eq!(cached.read_at(off, &mut buf).unwrap(), 200);
        assert_eq!(&buf[..], &data[off as usize..off as usize + 200]);
    }

    #[test]
    fn test_hits_and_misses() {
        let data = image(PAGE_SIZE * 2);
        let cached = CachedSource::new(data, 4);
        let mut buf = [0u8; 16];

        cached.read_at(0, &mut buf).unwrap();
        cached.read_at(32, &mut buf).unwrap();
        cached.read_at(64, &mut buf).unwrap();

        let stats = cached.stats();
        assert_eq!(stats.total_accesses, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!(stats.hit_rate() > 0.6);
    }

    #[test]
    fn test_eviction_keeps_content_correct() {
        let data = image(PAGE_SIZE * 4);
        let cached = CachedSource::new(data.clone(), 1);
        let mut buf = [0u8; 8];

        for page in [0u64, 3, 1, 3, 0] {
            let off = page * PAGE_SIZE as u64 + 10;
            cached.read_exact_at(off, &mut buf).unwrap();
            assert_eq!(&buf[..], &data[off as usize..off as usize + 8]);
        }
        assert_eq!(cached.stats().misses, 5);
    }

    #[test]
    fn test_short_tail_page() {
        let data = image(PAGE_SIZE + 10);
        let cached = CachedSource::with_default_cache(data);
        let mut buf = [0u8; 32];
        assert_eq!(cached.read_at(PAGE_SIZE as u64, &mut buf).unwrap(), 10);
        assert_eq!(cached.read_at(PAGE_SIZE as u64 + 10, &mut buf).unwrap(), 0);
    }

    /// 每次读取都等待另一个线程也进入读取，最多等待两秒
    struct Rendezvous {
        data: Vec<u8>,
        inside: std::sync::Mutex<usize>,
        met: std::sync::Condvar,
    }

    impl ImageSource for Rendezvous {
        fn len(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let mut inside = self.inside.lock().unwrap();
            *inside += 1;
            self.met.notify_all();
            let (inside, timeout) = self
                .met
                .wait_timeout_while(inside, std::time::Duration::from_secs(2), |n| *n < 2)
                .unwrap();
            drop(inside);
            if timeout.timed_out() {
                return Err(Error::new(ErrorKind::Io, "reads were serialized"));
            }
            self.data.as_slice().read_at(offset, buf)
        }
    }

    #[test]
    fn test_misses_read_outside_lock() {
        let cached = CachedSource::new(
            Rendezvous {
                data: image(PAGE_SIZE * 2),
                inside: std::sync::Mutex::new(0),
                met: std::sync::Condvar::new(),
            },
            4,
        );

        std::thread::scope(|scope| {
            let a = scope.spawn(|| {
                let mut buf = [0u8; 8];
                cached.read_exact_at(0, &mut buf)
            });
            let b = scope.spawn(|| {
                let mut buf = [0u8; 8];
                cached.read_exact_at(PAGE_SIZE as u64, &mut buf)
            });
            assert!(a.join().unwrap().is_ok());
            assert!(b.join().unwrap().is_ok());
        });
        assert_eq!(cached.stats().misses, 2);
    }
}
