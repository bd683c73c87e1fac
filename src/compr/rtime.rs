//! rtime 解压
//!
//! 输入是 `(字面字节, 重复次数)` 对的序列。解码器维护一张 256 项的表，
//! 记录每个字节值上一次出现后的输出位置；重复次数非零时，从该位置开始
//! 逐字节复制。源区间和目标区间可能重叠，必须按顺序一个字节一个字节地复制。
//!
//! 表项保存的是字面字节写入**之后**的输出位置，与内核
//! `jffs2_rtime_compress`/`jffs2_rtime_decompress` 一致。

use super::PREALLOC_LIMIT;

/// 解压 rtime 片段
///
/// 输出达到 `dsize` 或输入耗尽时停止，不会失败。
pub fn rtime_decompress(payload: &[u8], dsize: usize) -> Vec<u8> {
    let mut positions = [0usize; 256];
    let mut out: Vec<u8> = Vec::with_capacity(dsize.min(PREALLOC_LIMIT));
    let mut pos = 0usize;

    while out.len() < dsize && pos < payload.len() {
        let value = payload[pos];
        pos += 1;
        out.push(value);

        let repeat = match payload.get(pos) {
            Some(&r) => {
                pos += 1;
                r as usize
            }
            None => 0,
        };

        let mut backoffs = positions[value as usize];
        positions[value as usize] = out.len();

        for _ in 0..repeat {
            if out.len() >= dsize {
                break;
            }
            let byte = out[backoffs];
            out.push(byte);
            backoffs += 1;
        }
    }

    out
}
