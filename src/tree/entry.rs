//! 条目与元数据

use crate::consts::*;
use crate::scan::{RawDirent, RawInode};

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// 普通文件
    RegularFile,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
    /// 字符设备
    CharDevice,
    /// 块设备
    BlockDevice,
    /// FIFO（命名管道）
    Fifo,
    /// Socket
    Socket,
    /// 未知类型
    Unknown,
}

impl EntryKind {
    /// 从目录项类型字节（`DT_*`）解析
    pub fn from_dtype(dtype: u8) -> Self {
        match dtype {
            DT_REG => EntryKind::RegularFile,
            DT_DIR => EntryKind::Directory,
            DT_LNK => EntryKind::Symlink,
            DT_CHR => EntryKind::CharDevice,
            DT_BLK => EntryKind::BlockDevice,
            DT_FIFO => EntryKind::Fifo,
            DT_SOCK => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }

    /// 从 inode 模式解析
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => EntryKind::RegularFile,
            S_IFDIR => EntryKind::Directory,
            S_IFLNK => EntryKind::Symlink,
            S_IFCHR => EntryKind::CharDevice,
            S_IFBLK => EntryKind::BlockDevice,
            S_IFIFO => EntryKind::Fifo,
            S_IFSOCK => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }

    /// 对应的 `S_IFMT` 位
    pub fn mode_bits(self) -> u32 {
        match self {
            EntryKind::RegularFile => S_IFREG,
            EntryKind::Directory => S_IFDIR,
            EntryKind::Symlink => S_IFLNK,
            EntryKind::CharDevice => S_IFCHR,
            EntryKind::BlockDevice => S_IFBLK,
            EntryKind::Fifo => S_IFIFO,
            EntryKind::Socket => S_IFSOCK,
            EntryKind::Unknown => 0,
        }
    }

    /// 是否是目录
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// 是否是普通文件
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::RegularFile)
    }

    /// 是否是符号链接
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink)
    }
}

/// 条目元数据
///
/// 取自版本号最高的 inode 数据记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// 条目类型
    pub kind: EntryKind,
    /// 文件模式（类型位 + 权限位）
    pub mode: u32,
    /// 用户 ID
    pub uid: u16,
    /// 组 ID
    pub gid: u16,
    /// 文件大小（所有记录中最大的 isize）
    pub size: u64,
    /// 访问时间（Unix 时间戳）
    pub atime: u32,
    /// 修改时间（Unix 时间戳）
    pub mtime: u32,
    /// 状态改变时间（Unix 时间戳）
    pub ctime: u32,
    /// 提供元数据的记录版本；没有数据记录时为 0
    pub version: u32,
}

impl EntryMetadata {
    /// 访问权限位
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// 重建后的文件或目录
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) ino: u32,
    pub(crate) name: String,
    pub(crate) parent: u32,
    pub(crate) kind: EntryKind,
    pub(crate) named: bool,
    pub(crate) unlinked: bool,
    pub(crate) dirent_version: u32,
    pub(crate) mctime: u32,
    pub(crate) size: u64,
    pub(crate) records: Vec<RawInode>,
    pub(crate) children: Vec<u32>,
}

impl Entry {
    /// 根目录
    pub(crate) fn root() -> Self {
        Self {
            ino: JFFS2_ROOT_INO,
            name: String::new(),
            parent: JFFS2_ROOT_INO,
            kind: EntryKind::Directory,
            named: true,
            unlinked: false,
            dirent_version: 0,
            mctime: 0,
            size: 0,
            records: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 由目录项创建
    pub(crate) fn from_dirent(dirent: &RawDirent) -> Self {
        let mut entry = Self::orphan(dirent.ino, EntryKind::Unknown);
        entry.apply_dirent(dirent);
        entry
    }

    /// 没有任何目录项指向的条目
    pub(crate) fn orphan(ino: u32, kind: EntryKind) -> Self {
        Self {
            ino,
            name: String::new(),
            parent: 0,
            kind,
            named: false,
            unlinked: false,
            dirent_version: 0,
            mctime: 0,
            size: 0,
            records: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 用更新的目录项覆盖名字、父目录和类型
    pub(crate) fn apply_dirent(&mut self, dirent: &RawDirent) {
        self.name.clone_from(&dirent.name);
        self.parent = dirent.pino;
        self.named = true;
        self.dirent_version = dirent.version;
        self.mctime = dirent.mctime;
        let kind = EntryKind::from_dtype(dirent.dtype);
        if kind != EntryKind::Unknown {
            self.kind = kind;
        }
    }

    /// 附加一条数据记录
    pub(crate) fn push_record(&mut self, record: &RawInode) {
        self.size = self.size.max(record.isize as u64);
        if self.kind == EntryKind::Unknown {
            self.kind = EntryKind::from_mode(record.mode);
        }
        self.records.push(record.clone());
    }

    /// inode 编号
    pub fn ino(&self) -> u32 {
        self.ino
    }

    /// 名字；根目录和孤立条目为空
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 父目录 inode 编号；孤立条目为 0
    pub fn parent(&self) -> u32 {
        self.parent
    }

    /// 条目类型
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// 是否是目录
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// 是否是根目录
    pub fn is_root(&self) -> bool {
        self.ino == JFFS2_ROOT_INO
    }

    /// 是否有目录项为它命名
    pub fn is_named(&self) -> bool {
        self.named
    }

    /// 最新的目录项是否已被删除或指向其他 inode
    pub fn is_unlinked(&self) -> bool {
        self.unlinked
    }

    /// 文件大小
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 按收集顺序排列的数据记录
    pub fn records(&self) -> &[RawInode] {
        &self.records
    }

    /// 子条目的 inode 编号（按名字排序）
    pub fn child_inos(&self) -> &[u32] {
        &self.children
    }

    /// 最新的数据记录
    pub fn latest_record(&self) -> Option<&RawInode> {
        // max_by_key 在版本相同时返回最后一个，即后收集的记录
        self.records.iter().max_by_key(|r| r.version)
    }

    /// 元数据
    ///
    /// 没有数据记录时只有类型和目录项时间可用。
    pub fn metadata(&self) -> EntryMetadata {
        match self.latest_record() {
            Some(record) => EntryMetadata {
                kind: self.kind,
                mode: record.mode,
                uid: record.uid,
                gid: record.gid,
                size: self.size,
                atime: record.atime,
                mtime: record.mtime,
                ctime: record.ctime,
                version: record.version,
            },
            None => EntryMetadata {
                kind: self.kind,
                mode: self.kind.mode_bits(),
                uid: 0,
                gid: 0,
                size: self.size,
                atime: self.mctime,
                mtime: self.mctime,
                ctime: self.mctime,
                version: 0,
            },
        }
    }
}
