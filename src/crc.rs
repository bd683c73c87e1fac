//! JFFS2 CRC32 校验和计算
//!
//! JFFS2 使用 Linux 内核的 `crc32(0, data, len)`：初始值为 0，
//! 结果不取反。crc32fast 计算的是标准 CRC32（初始值和结果都取反），
//! 两者只差首尾两次取反。

use crc32fast::Hasher;

/// 标准 CRC32 的初始值
const CRC32_INIT: u32 = !0u32;

/// 计算 JFFS2 CRC32
///
/// # 参数
/// * `data` - 要计算校验和的数据
///
/// # 返回
/// 与闪存上 `hdr_crc`/`node_crc`/`name_crc`/`data_crc` 字段相同含义的值
#[inline]
pub fn jffs2_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(CRC32_INIT);
    hasher.update(data);
    !hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_of_empty_is_zero() {
        assert_eq!(jffs2_crc32(&[]), 0);
    }

    #[test]
    fn test_relation_to_standard_crc32() {
        // 标准 CRC32("123456789") = 0xCBF43926
        // 初始值 0 且不取反时，等于对 0xFFFFFFFF 起点的结果再整体取反
        let data = b"123456789";
        assert_eq!(crc32fast::hash(data), 0xCBF43926);
        assert_ne!(jffs2_crc32(data), crc32fast::hash(data));
    }

    #[test]
    fn test_known_jffs2_header_crc() {
        // 小端 cleanmarker 头部：85 19 03 20 0C 00 00 00，
        // mkfs.jffs2 写出的 hdr_crc 为 0xE41EB0B1
        let header = [0x85, 0x19, 0x03, 0x20, 0x0C, 0x00, 0x00, 0x00];
        assert_eq!(jffs2_crc32(&header), 0xE41E_B0B1);
    }
}
