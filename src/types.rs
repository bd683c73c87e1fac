//! JFFS2 磁盘格式结构定义
//!
//! 这个模块包含了直接对应闪存上节点格式的数据结构。
//!
//! ## 设计原则
//!
//! 1. **磁盘格式结构** - 保留 C 风格命名（便于对照 jffs2.h）
//! 2. **显式解码** - JFFS2 镜像可能是大端也可能是小端，因此不做内存
//!    重解释（`read_unaligned`），每个结构都提供 `decode(buf, endian)`，
//!    逐字段按探测到的字节序解码
//! 3. **辅助方法** - 提供 Rust 风格的访问器和工具函数

#![allow(non_camel_case_types)] // 允许C风格命名

use crate::consts::*;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

//=============================================================================
// 字节序
//=============================================================================

/// 镜像字节序
///
/// 整个镜像只探测一次，之后所有多字节字段都通过它解码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// 小端（默认）
    #[default]
    Little,
    /// 大端
    Big,
}

impl Endian {
    /// 根据流开头的两个字节探测字节序
    ///
    /// 两种字节序都不匹配魔数时返回小端。
    pub fn detect(head: &[u8]) -> Self {
        if head.len() < 2 {
            return Endian::Little;
        }
        if LittleEndian::read_u16(head) == JFFS2_MAGIC_BITMASK {
            Endian::Little
        } else if BigEndian::read_u16(head) == JFFS2_MAGIC_BITMASK {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// 解码 u16
    #[inline]
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    /// 解码 u32
    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    /// 编码 u16
    #[inline]
    pub fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, value),
            Endian::Big => BigEndian::write_u16(buf, value),
        }
    }

    /// 编码 u32
    #[inline]
    pub fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, value),
            Endian::Big => BigEndian::write_u32(buf, value),
        }
    }
}

//=============================================================================
// 节点类型标志
//=============================================================================

bitflags! {
    /// 节点类型高位标志
    ///
    /// 对应 jffs2.h 的 `JFFS2_FEATURE_*` 和 `JFFS2_NODE_ACCURATE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeTypeFlags: u16 {
        /// 不认识此类型的实现必须拒绝挂载
        const INCOMPAT      = JFFS2_COMPAT_MASK;
        /// 不认识时只读挂载
        const ROCOMPAT      = 0x8000;
        /// 不认识时垃圾回收需原样复制
        const RWCOMPAT_COPY = 0x4000;
        /// 节点有效；被废弃的节点在闪存上清除此位
        const ACCURATE      = 0x2000;
    }
}

impl NodeTypeFlags {
    /// 从节点类型中提取标志位
    pub fn from_node_type(node_type: u16) -> Self {
        Self::from_bits_truncate(node_type)
    }
}

/// 将节点类型规范化为带 ACCURATE 位的形式
///
/// 废弃节点（ACCURATE 位被清除）规范化后与有效节点类型相同。
#[inline]
pub fn accurate_node_type(node_type: u16) -> u16 {
    node_type | JFFS2_NODE_ACCURATE
}

//=============================================================================
// 磁盘格式结构定义
//=============================================================================

/// 通用节点头
///
/// 对应 `struct jffs2_unknown_node`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct jffs2_unknown_node {
    pub magic: u16,    // 0: 魔数 (0x1985)
    pub nodetype: u16, // 2: 节点类型
    pub totlen: u32,   // 4: 节点总长度（头 + 数据）
    pub hdr_crc: u32,  // 8: 头部 CRC
}

impl jffs2_unknown_node {
    /// 按指定字节序解码，`buf` 至少 12 字节
    pub fn decode(buf: &[u8], endian: Endian) -> Option<Self> {
        if buf.len() < JFFS2_UNKNOWN_NODE_SIZE {
            return None;
        }
        Some(Self {
            magic: endian.read_u16(&buf[0..2]),
            nodetype: endian.read_u16(&buf[2..4]),
            totlen: endian.read_u32(&buf[4..8]),
            hdr_crc: endian.read_u32(&buf[8..12]),
        })
    }

    /// 魔数是否有效
    pub fn is_valid_magic(&self) -> bool {
        self.magic == JFFS2_MAGIC_BITMASK
    }

    /// 节点类型标志
    pub fn flags(&self) -> NodeTypeFlags {
        NodeTypeFlags::from_node_type(self.nodetype)
    }

    /// 节点是否已被废弃
    pub fn is_obsolete(&self) -> bool {
        !self.flags().contains(NodeTypeFlags::ACCURATE)
    }
}

/// 目录项节点
///
/// 对应 `struct jffs2_raw_dirent`，后跟 `nsize` 字节的名字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct jffs2_raw_dirent {
    pub header: jffs2_unknown_node, // 0: 通用节点头
    pub pino: u32,                  // 12: 父目录 inode
    pub version: u32,               // 16: 版本号
    pub ino: u32,                   // 20: 目标 inode（0 表示删除）
    pub mctime: u32,                // 24: 修改/创建时间
    pub nsize: u8,                  // 28: 名字长度
    pub type_: u8,                  // 29: 目录项类型（DT_*）
    pub unused: [u8; 2],            // 30: 保留
    pub node_crc: u32,              // 32: 节点 CRC
    pub name_crc: u32,              // 36: 名字 CRC
}

impl jffs2_raw_dirent {
    /// 按指定字节序解码，`buf` 至少 40 字节
    pub fn decode(buf: &[u8], endian: Endian) -> Option<Self> {
        if buf.len() < JFFS2_RAW_DIRENT_SIZE {
            return None;
        }
        Some(Self {
            header: jffs2_unknown_node::decode(buf, endian)?,
            pino: endian.read_u32(&buf[12..16]),
            version: endian.read_u32(&buf[16..20]),
            ino: endian.read_u32(&buf[20..24]),
            mctime: endian.read_u32(&buf[24..28]),
            nsize: buf[28],
            type_: buf[29],
            unused: [buf[30], buf[31]],
            node_crc: endian.read_u32(&buf[32..36]),
            name_crc: endian.read_u32(&buf[36..40]),
        })
    }
}

/// Inode 数据节点
///
/// 对应 `struct jffs2_raw_inode`，后跟 `csize` 字节的压缩数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct jffs2_raw_inode {
    pub header: jffs2_unknown_node, // 0: 通用节点头
    pub ino: u32,                   // 12: inode 编号
    pub version: u32,               // 16: 版本号
    pub mode: u32,                  // 20: 文件模式
    pub uid: u16,                   // 24: 用户 ID
    pub gid: u16,                   // 26: 组 ID
    pub isize: u32,                 // 28: 该版本时的文件大小
    pub atime: u32,                 // 32: 访问时间
    pub mtime: u32,                 // 36: 修改时间
    pub ctime: u32,                 // 40: 状态改变时间
    pub offset: u32,                // 44: 数据在文件中的偏移
    pub csize: u32,                 // 48: 压缩后大小
    pub dsize: u32,                 // 52: 解压后大小
    pub compr: u8,                  // 56: 压缩类型
    pub usercompr: u8,              // 57: 用户指定的压缩类型
    pub flags: u16,                 // 58: 标志
    pub data_crc: u32,              // 60: 数据 CRC
    pub node_crc: u32,              // 64: 节点 CRC
}

impl jffs2_raw_inode {
    /// 按指定字节序解码，`buf` 至少 68 字节
    pub fn decode(buf: &[u8], endian: Endian) -> Option<Self> {
        if buf.len() < JFFS2_RAW_INODE_SIZE {
            return None;
        }
        Some(Self {
            header: jffs2_unknown_node::decode(buf, endian)?,
            ino: endian.read_u32(&buf[12..16]),
            version: endian.read_u32(&buf[16..20]),
            mode: endian.read_u32(&buf[20..24]),
            uid: endian.read_u16(&buf[24..26]),
            gid: endian.read_u16(&buf[26..28]),
            isize: endian.read_u32(&buf[28..32]),
            atime: endian.read_u32(&buf[32..36]),
            mtime: endian.read_u32(&buf[36..40]),
            ctime: endian.read_u32(&buf[40..44]),
            offset: endian.read_u32(&buf[44..48]),
            csize: endian.read_u32(&buf[48..52]),
            dsize: endian.read_u32(&buf[52..56]),
            compr: buf[56],
            usercompr: buf[57],
            flags: endian.read_u16(&buf[58..60]),
            data_crc: endian.read_u32(&buf[60..64]),
            node_crc: endian.read_u32(&buf[64..68]),
        })
    }
}
