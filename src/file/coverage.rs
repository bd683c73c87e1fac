//! 覆盖图
//!
//! 记录文件中每段已写入字节由哪个版本的记录写入，
//! 用于判断重建是否完整以及是否出现旧版本覆盖新版本。

use std::collections::BTreeMap;
use std::ops::Range;

/// 一段被同一条记录写入的字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoveredSpan {
    /// 起始偏移
    pub start: u64,
    /// 结束偏移（不含）
    pub end: u64,
    /// 写入该段的记录版本
    pub version: u32,
}

impl CoveredSpan {
    /// 长度
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 文件覆盖图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    size: u64,
    // 起始偏移 -> 段，段之间互不重叠
    spans: BTreeMap<u64, CoveredSpan>,
    regressions: usize,
}

impl Coverage {
    /// 创建大小为 `size` 的空覆盖图
    pub fn new(size: u64) -> Self {
        Self {
            size,
            spans: BTreeMap::new(),
            regressions: 0,
        }
    }

    /// 文件大小
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 记录 `range` 被版本 `version` 写入，超出文件大小的部分被忽略
    pub fn record(&mut self, range: Range<u64>, version: u32) {
        let start = range.start;
        let end = range.end.min(self.size);
        if start >= end {
            return;
        }

        let mut overlapping = Vec::new();
        if let Some((&key, span)) = self.spans.range(..start).next_back() {
            if span.end > start {
                overlapping.push(key);
            }
        }
        overlapping.extend(self.spans.range(start..end).map(|(&key, _)| key));

        for key in overlapping {
            let Some(old) = self.spans.remove(&key) else {
                continue;
            };
            if old.version > version {
                self.regressions += 1;
            }
            if old.start < start {
                self.insert(old.start, start, old.version);
            }
            if old.end > end {
                self.insert(end, old.end, old.version);
            }
        }

        self.insert(start, end, version);
    }

    fn insert(&mut self, start: u64, end: u64, version: u32) {
        self.spans.insert(start, CoveredSpan { start, end, version });
    }

    /// 已写入的段，按偏移排列
    pub fn spans(&self) -> impl Iterator<Item = &CoveredSpan> + '_ {
        self.spans.values()
    }

    /// 写入 `offset` 处字节的记录版本
    pub fn version_at(&self, offset: u64) -> Option<u32> {
        let (_, span) = self.spans.range(..=offset).next_back()?;
        (offset < span.end).then_some(span.version)
    }

    /// 已写入的字节数
    pub fn written_bytes(&self) -> u64 {
        self.spans.values().map(CoveredSpan::len).sum()
    }

    /// 未被任何记录写入的区间
    pub fn holes(&self) -> Vec<Range<u64>> {
        let mut holes = Vec::new();
        let mut cursor = 0u64;
        for span in self.spans.values() {
            if span.start > cursor {
                holes.push(cursor..span.start);
            }
            cursor = span.end;
        }
        if cursor < self.size {
            holes.push(cursor..self.size);
        }
        holes
    }

    /// 每个字节是否都被写入
    pub fn is_complete(&self) -> bool {
        self.written_bytes() == self.size
    }

    /// 旧版本记录覆盖新版本数据的次数
    ///
    /// 按版本排序组装时始终为 0。
    pub fn version_regressions(&self) -> usize {
        self.regressions
    }
}
