//! zlib 解压
//!
//! JFFS2 的 zlib 片段是完整的、带 zlib 头（通常 `78 9C` / `78 DA`）的 deflate 流。
//! 使用 flate2 的底层 `Decompress`，要求流必须以 StreamEnd 结束，
//! 截断的流视为错误而不是静默返回部分数据。

use super::{CompressError, DecompressResult, PREALLOC_LIMIT};
use flate2::{Decompress, FlushDecompress, Status};

/// 输出缓冲区的最小增长量
const GROW_STEP: usize = 4096;

/// 解压 zlib 片段
///
/// 流中任何错误都使整个片段失败。
pub fn zlib_decompress(payload: &[u8], dsize: usize) -> DecompressResult {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(dsize.clamp(64, PREALLOC_LIMIT));

    loop {
        let consumed = inflater.total_in() as usize;
        let produced = out.len();

        let status = inflater
            .decompress_vec(&payload[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|err| {
                log::debug!("[COMPR] zlib stream error: {}", err);
                CompressError::Inflate
            })?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                if out.len() == out.capacity() {
                    out.reserve(GROW_STEP.max(out.len() / 2));
                    continue;
                }
                // 输入耗尽后 inflater 内部仍可能有待输出的数据，只有毫无进展才算截断
                let progressed =
                    inflater.total_in() as usize != consumed || out.len() != produced;
                if !progressed {
                    log::debug!("[COMPR] zlib stream truncated after {} bytes", out.len());
                    return Err(CompressError::Inflate);
                }
            }
        }
    }
}
