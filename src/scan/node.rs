//! 扫描得到的节点记录

use crate::consts::*;
use crate::types::{jffs2_raw_dirent, jffs2_raw_inode};

/// 节点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// 目录项节点
    Dirent,
    /// Inode 数据节点
    Inode,
}

/// 目录项记录
///
/// 把 `(父目录 inode, 名字)` 映射到目标 inode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirent {
    /// 父目录 inode
    pub pino: u32,
    /// 版本号
    pub version: u32,
    /// 目标 inode（0 表示删除）
    pub ino: u32,
    /// 修改/创建时间
    pub mctime: u32,
    /// 目录项类型（DT_*）
    pub dtype: u8,
    /// 名字（非法 UTF-8 被替换）
    pub name: String,
}

impl RawDirent {
    pub(crate) fn from_raw(raw: &jffs2_raw_dirent, name_bytes: &[u8]) -> Self {
        Self {
            pino: raw.pino,
            version: raw.version,
            ino: raw.ino,
            mctime: raw.mctime,
            dtype: raw.type_,
            name: String::from_utf8_lossy(name_bytes).into_owned(),
        }
    }

    /// 是否是删除记录
    pub fn is_unlink(&self) -> bool {
        self.ino == JFFS2_UNLINK_INO
    }

    /// 目标是否是目录
    pub fn is_dir(&self) -> bool {
        self.dtype == DT_DIR
    }
}

/// Inode 数据记录
///
/// 描述一个文件中一段连续的数据，压缩数据本身不在扫描时读取
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInode {
    /// inode 编号
    pub ino: u32,
    /// 版本号（每个 inode 单调递增）
    pub version: u32,
    /// 文件模式
    pub mode: u32,
    /// 用户 ID
    pub uid: u16,
    /// 组 ID
    pub gid: u16,
    /// 该版本时的文件大小
    pub isize: u32,
    /// 访问时间
    pub atime: u32,
    /// 修改时间
    pub mtime: u32,
    /// 状态改变时间
    pub ctime: u32,
    /// 数据在文件中的偏移
    pub offset: u32,
    /// 压缩后大小
    pub csize: u32,
    /// 解压后大小
    pub dsize: u32,
    /// 压缩类型
    pub compr: u8,
    /// 用户指定的压缩类型
    pub usercompr: u8,
    /// 标志
    pub flags: u16,
    /// 数据 CRC（延迟到组装时校验）
    pub data_crc: u32,
    /// 压缩数据在镜像中的绝对偏移
    pub data_offset: u64,
}

impl RawInode {
    pub(crate) fn from_raw(raw: &jffs2_raw_inode, node_offset: u64) -> Self {
        Self {
            ino: raw.ino,
            version: raw.version,
            mode: raw.mode,
            uid: raw.uid,
            gid: raw.gid,
            isize: raw.isize,
            atime: raw.atime,
            mtime: raw.mtime,
            ctime: raw.ctime,
            offset: raw.offset,
            csize: raw.csize,
            dsize: raw.dsize,
            compr: raw.compr,
            usercompr: raw.usercompr,
            flags: raw.flags,
            data_crc: raw.data_crc,
            data_offset: node_offset + JFFS2_RAW_INODE_SIZE as u64,
        }
    }

    /// 数据片段覆盖的文件区间 `[offset, offset + dsize)`
    pub fn file_range(&self) -> core::ops::Range<u64> {
        self.offset as u64..self.offset as u64 + self.dsize as u64
    }
}

/// 节点内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    /// 目录项
    Dirent(RawDirent),
    /// Inode 数据
    Inode(RawInode),
}

/// 一个被识别的节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    /// 节点在镜像中的偏移
    pub offset: u64,
    /// 节点总长度（来自节点头）
    pub totlen: u32,
    /// 节点是否已被废弃（ACCURATE 位被清除）
    pub obsolete: bool,
    /// CRC 是否通过；未校验时为 `None`
    pub crc_ok: Option<bool>,
    /// 节点内容
    pub body: NodeBody,
}

impl RawNode {
    /// 节点种类
    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Dirent(_) => NodeKind::Dirent,
            NodeBody::Inode(_) => NodeKind::Inode,
        }
    }

    /// 作为目录项访问
    pub fn as_dirent(&self) -> Option<&RawDirent> {
        match &self.body {
            NodeBody::Dirent(d) => Some(d),
            NodeBody::Inode(_) => None,
        }
    }

    /// 作为 inode 数据访问
    pub fn as_inode(&self) -> Option<&RawInode> {
        match &self.body {
            NodeBody::Inode(i) => Some(i),
            NodeBody::Dirent(_) => None,
        }
    }

    /// 节点结束位置（不含对齐填充）
    pub fn end(&self) -> u64 {
        self.offset + self.totlen as u64
    }
}
