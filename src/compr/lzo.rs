//! LZO1X 解压
//!
//! JFFS2 使用内核的 `lzo1x_1_compress` 压缩数据片段。这里把 LZO1X 的字节流
//! 解码写成一个显式状态机：
//!
//! | 状态 | 动作 | 下一个状态 |
//! |------|------|------------|
//! | `ReadCommand(ctx)` | 读取指令字节；`ctx == Fresh` 且指令 < 16 时为字面量游程 | `CopyLiteralRun` / `DecodeMatchDistance` / `Done`（输入耗尽） |
//! | `CopyLiteralRun` | 复制 `len` 个字面量 | `ReadCommand(AfterLiteralRun)` |
//! | `DecodeMatchDistance` | 按指令范围解析长度和距离 | `CopyMatch` / `Done`（结束标记） |
//! | `CopyMatch` | 从 `output[pos - distance..]` 逐字节复制 | `TrailingLiterals` / `ReadCommand(Fresh)` |
//! | `TrailingLiterals` | 复制 1~3 个尾随字面量 | `ReadCommand(AfterTrailingLiterals)` |
//!
//! 指令字节的四个范围：
//!
//! - `>= 64`：近距离匹配，长度 3~8，距离 1~2048
//! - `32..64`：中距离匹配，长度用 5 位字段，全零时用 8 位扩展
//! - `16..32`：远距离匹配（距离 16K~48K），长度 3 位字段；算出的距离
//!   恰好等于 0 时表示流结束
//! - `< 16`：含义取决于上下文。在 `Fresh` 中是字面量游程，在字面量游程之后是
//!   距离 2049~3072 的 3 字节匹配，在尾随字面量之后是距离 1~1024 的 2 字节匹配
//!
//! 尾随字面量的个数取自匹配描述中倒数第二个字节（即距离低字节或指令字节本身）
//! 的低 2 位。
//!
//! 流的第一个字节大于 17 时，它直接编码一段初始字面量：长度小于 4 时按尾随
//! 字面量处理，否则按字面量游程处理。这个特例复用已有状态，不需要单独的分支。

use super::{CompressError, DecompressResult, PREALLOC_LIMIT};

/// 字面量游程之后的 3 字节匹配的距离偏置
const M2_MAX_OFFSET: usize = 0x0800;

/// 远距离匹配的距离偏置
const M4_BASE_OFFSET: usize = 0x4000;

/// 指令字节 `< 16` 的解释上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// 上一个匹配没有尾随字面量（或位于流开头）
    Fresh,
    /// 刚复制完一段字面量游程
    AfterLiteralRun,
    /// 刚复制完尾随字面量
    AfterTrailingLiterals,
}

/// 解码器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadCommand(Context),
    CopyLiteralRun { len: usize },
    DecodeMatchDistance { cmd: u8, ctx: Context },
    CopyMatch { distance: usize, len: usize, trailing: usize },
    TrailingLiterals { count: usize },
    Done,
}

struct Lzo1xDecoder<'a> {
    input: &'a [u8],
    ip: usize,
    out: Vec<u8>,
    limit: usize,
}

impl<'a> Lzo1xDecoder<'a> {
    fn new(input: &'a [u8], limit: usize) -> Self {
        Self {
            input,
            ip: 0,
            out: Vec::with_capacity(limit.min(PREALLOC_LIMIT)),
            limit,
        }
    }

    fn next_byte(&mut self) -> Result<u8, CompressError> {
        let b = *self.input.get(self.ip).ok_or(CompressError::InputOverrun)?;
        self.ip += 1;
        Ok(b)
    }

    /// 读取长度扩展：每个零字节加 255，最后一个非零字节加上 `base`
    fn extended_length(&mut self, base: usize) -> Result<usize, CompressError> {
        let mut len = 0usize;
        loop {
            match self.next_byte()? {
                0 => len += 255,
                b => return Ok(len + base + b as usize),
            }
        }
    }

    fn copy_literals(&mut self, count: usize) -> Result<(), CompressError> {
        let end = self.ip.checked_add(count).ok_or(CompressError::InputOverrun)?;
        if end > self.input.len() {
            return Err(CompressError::InputOverrun);
        }
        if self.out.len() + count > self.limit {
            return Err(CompressError::OutputOverrun);
        }
        self.out.extend_from_slice(&self.input[self.ip..end]);
        self.ip = end;
        Ok(())
    }

    /// 源和目标可能重叠，逐字节复制
    fn copy_match(&mut self, distance: usize, len: usize) -> Result<(), CompressError> {
        if distance == 0 || distance > self.out.len() {
            return Err(CompressError::LookBehindOverrun);
        }
        if self.out.len() + len > self.limit {
            return Err(CompressError::OutputOverrun);
        }
        let mut from = self.out.len() - distance;
        for _ in 0..len {
            let b = self.out[from];
            self.out.push(b);
            from += 1;
        }
        Ok(())
    }

    fn initial_state(&mut self) -> Result<State, CompressError> {
        match self.input.first() {
            Some(&first) if first > 17 => {
                self.ip = 1;
                let t = (first - 17) as usize;
                if t < 4 {
                    Ok(State::TrailingLiterals { count: t })
                } else {
                    Ok(State::CopyLiteralRun { len: t })
                }
            }
            _ => Ok(State::ReadCommand(Context::Fresh)),
        }
    }

    fn read_command(&mut self, ctx: Context) -> Result<State, CompressError> {
        if self.ip >= self.input.len() {
            return Ok(State::Done);
        }
        let cmd = self.next_byte()?;
        if cmd < 16 && ctx == Context::Fresh {
            let len = if cmd == 0 {
                self.extended_length(15)?
            } else {
                cmd as usize
            };
            return Ok(State::CopyLiteralRun { len: len + 3 });
        }
        Ok(State::DecodeMatchDistance { cmd, ctx })
    }

    fn decode_match(&mut self, cmd: u8, ctx: Context) -> Result<State, CompressError> {
        let t = cmd as usize;
        let (distance, len, trailing) = if t >= 64 {
            let b = self.next_byte()? as usize;
            (1 + ((t >> 2) & 7) + (b << 3), (t >> 5) + 1, t & 3)
        } else if t >= 32 {
            let len = match t & 31 {
                0 => self.extended_length(31)?,
                n => n,
            };
            let b0 = self.next_byte()? as usize;
            let b1 = self.next_byte()? as usize;
            (1 + (b0 >> 2) + (b1 << 6), len + 2, b0 & 3)
        } else if t >= 16 {
            let high = (t & 8) << 11;
            let len = match t & 7 {
                0 => self.extended_length(7)?,
                n => n,
            };
            let b0 = self.next_byte()? as usize;
            let b1 = self.next_byte()? as usize;
            let d = high + (b0 >> 2) + (b1 << 6);
            if d == 0 {
                return Ok(State::Done);
            }
            (d + M4_BASE_OFFSET, len + 2, b0 & 3)
        } else {
            let b = self.next_byte()? as usize;
            match ctx {
                Context::AfterLiteralRun => (1 + M2_MAX_OFFSET + (t >> 2) + (b << 2), 3, t & 3),
                _ => (1 + (t >> 2) + (b << 2), 2, t & 3),
            }
        };
        Ok(State::CopyMatch {
            distance,
            len,
            trailing,
        })
    }

    fn run(mut self) -> DecompressResult {
        let mut state = self.initial_state()?;
        loop {
            state = match state {
                State::ReadCommand(ctx) => self.read_command(ctx)?,
                State::CopyLiteralRun { len } => {
                    self.copy_literals(len)?;
                    State::ReadCommand(Context::AfterLiteralRun)
                }
                State::DecodeMatchDistance { cmd, ctx } => self.decode_match(cmd, ctx)?,
                State::CopyMatch {
                    distance,
                    len,
                    trailing,
                } => {
                    self.copy_match(distance, len)?;
                    if trailing > 0 {
                        State::TrailingLiterals { count: trailing }
                    } else {
                        State::ReadCommand(Context::Fresh)
                    }
                }
                State::TrailingLiterals { count } => {
                    self.copy_literals(count)?;
                    State::ReadCommand(Context::AfterTrailingLiterals)
                }
                State::Done => return Ok(self.out),
            };
        }
    }
}

/// 解压 LZO1X 片段
///
/// # 参数
///
/// * `payload` - 压缩数据
/// * `dsize` - 声明的解压长度，输出超过它时失败
///
/// 输入在指令边界处耗尽（没有结束标记）时返回已解出的数据。
pub fn lzo1x_decompress(payload: &[u8], dsize: usize) -> DecompressResult {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    Lzo1xDecoder::new(payload, dsize).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOF_MARKER: [u8; 3] = [0x11, 0x00, 0x00];

    #[test]
    fn test_initial_literal_run_then_eof() {
        let mut stream = vec![17 + 4];
        stream.extend_from_slice(b"abcd");
        stream.extend_from_slice(&EOF_MARKER);
        assert_eq!(lzo1x_decompress(&stream, 4).unwrap(), b"abcd".to_vec());
    }

    #[test]
    fn test_short_initial_literals_then_near_match() {
        // 初始 2 个字面量按尾随字面量处理，随后指令 0 是距离 1 的 2 字节匹配
        let mut stream = vec![17 + 2, b'h', b'i', 0x00, 0x00];
        stream.extend_from_slice(&EOF_MARKER);
        assert_eq!(lzo1x_decompress(&stream, 16).unwrap(), b"hiii".to_vec());
    }

    #[test]
    fn test_all_command_branches() {
        let mut stream = vec![17 + 5];
        stream.extend_from_slice(b"ABCDE");
        // >= 64：距离 5，长度 3，1 个尾随字面量
        stream.extend_from_slice(&[0x51, 0x00, b'x']);
        // < 16（尾随字面量之后）：距离 4，长度 2
        stream.extend_from_slice(&[12, 0x00]);
        // 32..64：距离 11，长度 4，2 个尾随字面量
        stream.extend_from_slice(&[34, 42, 0x00, b'y', b'z']);
        // >= 64：距离 1，长度 3，无尾随字面量
        stream.extend_from_slice(&[64, 0x00]);
        // < 16（Fresh）：4 个字面量
        stream.extend_from_slice(&[1, b'1', b'2', b'3', b'4']);
        // 32..64 扩展长度：31 + 1 + 2 = 34，距离 1
        stream.extend_from_slice(&[32, 1, 0x00, 0x00]);
        // 16..32：结束标记
        stream.extend_from_slice(&EOF_MARKER);

        let mut expected = b"ABCDEABCxABABCDyzzzz1234".to_vec();
        expected.extend_from_slice(&[b'4'; 34]);
        assert_eq!(lzo1x_decompress(&stream, expected.len()).unwrap(), expected);
    }

    #[test]
    fn test_far_matches() {
        let l1: Vec<u8> = (0..2100u32).map(|i| ((i * 7 + 3) % 251) as u8).collect();
        let l2: Vec<u8> = (0..14400u32).map(|i| ((i * 13 + 5) % 253) as u8).collect();

        let mut stream = vec![0u8];
        // 2100 个字面量：255 * 8 + 15 + 42 + 3
        stream.extend_from_slice(&[0u8; 8]);
        stream.push(42);
        stream.extend_from_slice(&l1);
        // 字面量游程之后的 < 16 指令：距离 0x801，长度 3
        stream.extend_from_slice(&[0x00, 0x00]);
        // 14400 个字面量：255 * 56 + 15 + 102 + 3
        stream.push(0);
        stream.extend_from_slice(&[0u8; 56]);
        stream.push(102);
        stream.extend_from_slice(&l2);
        // 16..32：距离 0x4000 + 5，长度 5
        stream.extend_from_slice(&[19, 20, 0x00]);
        stream.extend_from_slice(&EOF_MARKER);

        let mut expected = l1.clone();
        expected.extend_from_slice(&l1[51..54]);
        expected.extend_from_slice(&l2);
        let tail = expected[114..119].to_vec();
        expected.extend_from_slice(&tail);

        let out = lzo1x_decompress(&stream, expected.len()).unwrap();
        assert_eq!(out.len(), 16508);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_bad_distance() {
        // 只有 4 个字节输出，却要求距离 9
        let mut stream = vec![17 + 4];
        stream.extend_from_slice(b"abcd");
        stream.extend_from_slice(&[0x40 | (4 << 2), 0x00, 0x00]);
        // 距离 = 1 + 4 + 0 = 5 > 4
        assert_eq!(
            lzo1x_decompress(&stream, 64).unwrap_err(),
            CompressError::LookBehindOverrun
        );
    }

    #[test]
    fn test_output_overrun() {
        let mut stream = vec![17 + 4];
        stream.extend_from_slice(b"abcd");
        stream.extend_from_slice(&EOF_MARKER);
        assert_eq!(
            lzo1x_decompress(&stream, 3).unwrap_err(),
            CompressError::OutputOverrun
        );
    }

    #[test]
    fn test_truncated_input() {
        let stream = [17 + 8, b'a', b'b'];
        assert_eq!(
            lzo1x_decompress(&stream, 16).unwrap_err(),
            CompressError::InputOverrun
        );
    }

    #[test]
    fn test_missing_eof_marker() {
        let mut stream = vec![17 + 4];
        stream.extend_from_slice(b"wxyz");
        assert_eq!(lzo1x_decompress(&stream, 4).unwrap(), b"wxyz".to_vec());
    }
}
