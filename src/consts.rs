//! JFFS2 常量定义
//!
//! 这个模块包含了 JFFS2 磁盘格式的常量定义，包括：
//! - 魔数和节点类型
//! - 节点头大小
//! - 压缩类型
//! - 目录项类型和 mode 位
//!
//! 数值取自 Linux `include/uapi/linux/jffs2.h`。

//=============================================================================
// 基础常量
//=============================================================================

/// JFFS2 节点魔数
pub const JFFS2_MAGIC_BITMASK: u16 = 0x1985;

/// 早期（不兼容）JFFS2 魔数，扫描时只计数不解析
pub const JFFS2_OLD_MAGIC_BITMASK: u16 = 0x1984;

/// 节点对齐（字节）
pub const JFFS2_NODE_ALIGN: u64 = 4;

/// 根目录 inode 编号
pub const JFFS2_ROOT_INO: u32 = 1;

/// 删除目录项使用的目标 inode（unlink 标记）
pub const JFFS2_UNLINK_INO: u32 = 0;

//=============================================================================
// 节点头
//=============================================================================

/// 通用节点头大小（magic + nodetype + totlen + hdr_crc）
pub const JFFS2_UNKNOWN_NODE_SIZE: usize = 12;

/// 参与头部 CRC 计算的字节数（magic + nodetype + totlen）
pub const JFFS2_HEADER_CRC_LEN: usize = 8;

/// 目录项节点头大小（不含名字）
pub const JFFS2_RAW_DIRENT_SIZE: usize = 40;

/// 参与目录项 node_crc 计算的字节数
pub const JFFS2_DIRENT_NODE_CRC_LEN: usize = JFFS2_RAW_DIRENT_SIZE - 8;

/// Inode 数据节点头大小（不含数据）
pub const JFFS2_RAW_INODE_SIZE: usize = 68;

/// 参与 inode node_crc 计算的字节数
pub const JFFS2_INODE_NODE_CRC_LEN: usize = JFFS2_RAW_INODE_SIZE - 8;

//=============================================================================
// 节点类型
//=============================================================================

/// 目录项节点
pub const JFFS2_NODETYPE_DIRENT: u16 = 0xE001;

/// Inode 数据节点
pub const JFFS2_NODETYPE_INODE: u16 = 0xE002;

/// 擦除块清洁标记
pub const JFFS2_NODETYPE_CLEANMARKER: u16 = 0x2003;

/// 填充节点
pub const JFFS2_NODETYPE_PADDING: u16 = 0x2004;

/// 擦除块摘要节点
pub const JFFS2_NODETYPE_SUMMARY: u16 = 0x2006;

/// 扩展属性节点
pub const JFFS2_NODETYPE_XATTR: u16 = 0xE008;

/// 扩展属性引用节点
pub const JFFS2_NODETYPE_XREF: u16 = 0xE009;

/// 节点类型中的兼容性位掩码
pub const JFFS2_COMPAT_MASK: u16 = 0xC000;

/// 节点有效位（被废弃的节点会清除此位）
pub const JFFS2_NODE_ACCURATE: u16 = 0x2000;

//=============================================================================
// 压缩类型
//=============================================================================

/// 无压缩
pub const JFFS2_COMPR_NONE: u8 = 0x00;
/// 全零数据
pub const JFFS2_COMPR_ZERO: u8 = 0x01;
/// rtime 游程/回溯编码
pub const JFFS2_COMPR_RTIME: u8 = 0x02;
/// rubin（MIPS 变体），不支持
pub const JFFS2_COMPR_RUBINMIPS: u8 = 0x03;
/// copy，不支持
pub const JFFS2_COMPR_COPY: u8 = 0x04;
/// 动态 rubin，不支持
pub const JFFS2_COMPR_DYNRUBIN: u8 = 0x05;
/// zlib
pub const JFFS2_COMPR_ZLIB: u8 = 0x06;
/// LZO1X
pub const JFFS2_COMPR_LZO: u8 = 0x07;

//=============================================================================
// 目录项类型（DT_*）
//=============================================================================

/// FIFO
pub const DT_FIFO: u8 = 1;
/// 字符设备
pub const DT_CHR: u8 = 2;
/// 目录
pub const DT_DIR: u8 = 4;
/// 块设备
pub const DT_BLK: u8 = 6;
/// 普通文件
pub const DT_REG: u8 = 8;
/// 符号链接
pub const DT_LNK: u8 = 10;
/// Socket
pub const DT_SOCK: u8 = 12;

//=============================================================================
// Inode mode 位
//=============================================================================

/// 文件类型掩码
pub const S_IFMT: u32 = 0o170000;
/// Socket
pub const S_IFSOCK: u32 = 0o140000;
/// 符号链接
pub const S_IFLNK: u32 = 0o120000;
/// 普通文件
pub const S_IFREG: u32 = 0o100000;
/// 块设备
pub const S_IFBLK: u32 = 0o060000;
/// 目录
pub const S_IFDIR: u32 = 0o040000;
/// 字符设备
pub const S_IFCHR: u32 = 0o020000;
/// FIFO
pub const S_IFIFO: u32 = 0o010000;
