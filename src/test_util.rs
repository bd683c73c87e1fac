//! 测试用镜像构造器
//!
//! 按指定字节序写出格式正确、CRC 正确的节点。

use crate::consts::*;
use crate::crc::jffs2_crc32;
use crate::types::Endian;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// 一个 inode 数据节点的描述
#[derive(Debug, Clone)]
pub(crate) struct InodeNode {
    pub ino: u32,
    pub version: u32,
    pub mode: u32,
    pub uid: u16,
    pub gid: u16,
    pub isize: u32,
    pub mtime: u32,
    pub offset: u32,
    pub dsize: u32,
    pub compr: u8,
    pub payload: Vec<u8>,
}

impl InodeNode {
    /// 未压缩的普通文件片段
    pub fn plain(ino: u32, version: u32, offset: u32, data: &[u8], isize: u32) -> Self {
        Self {
            ino,
            version,
            mode: S_IFREG | 0o644,
            uid: 0,
            gid: 0,
            isize,
            mtime: 1_600_000_000 + version,
            offset,
            dsize: data.len() as u32,
            compr: JFFS2_COMPR_NONE,
            payload: data.to_vec(),
        }
    }

    /// zlib 压缩的普通文件片段
    pub fn zlib(ino: u32, version: u32, offset: u32, data: &[u8], isize: u32) -> Self {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        Self {
            compr: JFFS2_COMPR_ZLIB,
            payload: enc.finish().unwrap(),
            ..Self::plain(ino, version, offset, data, isize)
        }
    }

    /// 任意压缩类型和负载
    pub fn raw(ino: u32, version: u32, offset: u32, compr: u8, payload: &[u8], dsize: u32, isize: u32) -> Self {
        Self {
            compr,
            dsize,
            payload: payload.to_vec(),
            ..Self::plain(ino, version, offset, &[], isize)
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_owner(mut self, uid: u16, gid: u16) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

/// 镜像构造器
pub(crate) struct ImageBuilder {
    endian: Endian,
    buf: Vec<u8>,
}

impl ImageBuilder {
    pub fn new(endian: Endian) -> Self {
        Self { endian, buf: Vec::new() }
    }

    /// 当前写入位置
    pub fn offset(&self) -> u64 {
        self.buf.len() as u64
    }

    fn header(&self, buf: &mut [u8], nodetype: u16, totlen: u32) {
        let e = self.endian;
        e.write_u16(&mut buf[0..2], JFFS2_MAGIC_BITMASK);
        e.write_u16(&mut buf[2..4], nodetype);
        e.write_u32(&mut buf[4..8], totlen);
        let crc = jffs2_crc32(&buf[..JFFS2_HEADER_CRC_LEN]);
        e.write_u32(&mut buf[8..12], crc);
    }

    fn push_node(&mut self, node: &[u8]) -> u64 {
        let offset = self.offset();
        self.buf.extend_from_slice(node);
        self.align();
        offset
    }

    fn align(&mut self) {
        while self.buf.len() % JFFS2_NODE_ALIGN as usize != 0 {
            self.buf.push(0xFF);
        }
    }

    /// 写入 cleanmarker
    pub fn cleanmarker(&mut self) -> u64 {
        let mut node = [0u8; JFFS2_UNKNOWN_NODE_SIZE];
        self.header(&mut node, JFFS2_NODETYPE_CLEANMARKER, JFFS2_UNKNOWN_NODE_SIZE as u32);
        self.push_node(&node)
    }

    /// 写入 `len` 字节的 padding 节点
    pub fn padding(&mut self, len: usize) -> u64 {
        let mut node = vec![0u8; len.max(JFFS2_UNKNOWN_NODE_SIZE)];
        let totlen = node.len() as u32;
        self.header(&mut node, JFFS2_NODETYPE_PADDING, totlen);
        self.push_node(&node)
    }

    /// 写入任意字节，之后补齐到 4 字节
    pub fn garbage(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self.align();
        self
    }

    /// 写入 `len` 字节擦除区（0xFF）
    pub fn erased(&mut self, len: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + len, 0xFF);
        self.align();
        self
    }

    /// 写入目录项节点，返回节点偏移
    pub fn dirent(&mut self, pino: u32, version: u32, ino: u32, dtype: u8, name: &str) -> u64 {
        self.dirent_bytes(pino, version, ino, dtype, name.as_bytes())
    }

    /// 写入名字为任意字节的目录项节点
    pub fn dirent_bytes(&mut self, pino: u32, version: u32, ino: u32, dtype: u8, name: &[u8]) -> u64 {
        let e = self.endian;
        let totlen = JFFS2_RAW_DIRENT_SIZE + name.len();
        let mut node = vec![0u8; totlen];
        self.header(&mut node, JFFS2_NODETYPE_DIRENT, totlen as u32);
        e.write_u32(&mut node[12..16], pino);
        e.write_u32(&mut node[16..20], version);
        e.write_u32(&mut node[20..24], ino);
        e.write_u32(&mut node[24..28], 1_600_000_000 + version);
        node[28] = name.len() as u8;
        node[29] = dtype;
        let node_crc = jffs2_crc32(&node[..JFFS2_DIRENT_NODE_CRC_LEN]);
        e.write_u32(&mut node[32..36], node_crc);
        e.write_u32(&mut node[36..40], jffs2_crc32(name));
        node[JFFS2_RAW_DIRENT_SIZE..].copy_from_slice(name);
        self.push_node(&node)
    }

    /// 写入 inode 数据节点，返回节点偏移
    pub fn inode(&mut self, desc: &InodeNode) -> u64 {
        let e = self.endian;
        let totlen = JFFS2_RAW_INODE_SIZE + desc.payload.len();
        let mut node = vec![0u8; totlen];
        self.header(&mut node, JFFS2_NODETYPE_INODE, totlen as u32);
        e.write_u32(&mut node[12..16], desc.ino);
        e.write_u32(&mut node[16..20], desc.version);
        e.write_u32(&mut node[20..24], desc.mode);
        e.write_u16(&mut node[24..26], desc.uid);
        e.write_u16(&mut node[26..28], desc.gid);
        e.write_u32(&mut node[28..32], desc.isize);
        e.write_u32(&mut node[32..36], desc.mtime);
        e.write_u32(&mut node[36..40], desc.mtime);
        e.write_u32(&mut node[40..44], desc.mtime);
        e.write_u32(&mut node[44..48], desc.offset);
        e.write_u32(&mut node[48..52], desc.payload.len() as u32);
        e.write_u32(&mut node[52..56], desc.dsize);
        node[56] = desc.compr;
        node[57] = desc.compr;
        e.write_u32(&mut node[60..64], jffs2_crc32(&desc.payload));
        let node_crc = jffs2_crc32(&node[..JFFS2_INODE_NODE_CRC_LEN]);
        e.write_u32(&mut node[64..68], node_crc);
        node[JFFS2_RAW_INODE_SIZE..].copy_from_slice(&desc.payload);
        self.push_node(&node)
    }

    /// 清除节点的 ACCURATE 位（与闪存上废弃节点一样，不重算头部 CRC）
    pub fn mark_obsolete(&mut self, offset: u64) {
        let at = offset as usize + 2;
        let nodetype = self.endian.read_u16(&self.buf[at..at + 2]);
        self.endian.write_u16(&mut self.buf[at..at + 2], nodetype & !JFFS2_NODE_ACCURATE);
    }

    /// 翻转一个字节
    pub fn corrupt(&mut self, offset: u64) {
        self.buf[offset as usize] ^= 0xFF;
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// 构造一个小文件系统：`/docs/a.txt`（zlib "hello world"）
pub(crate) fn docs_image(endian: Endian) -> Vec<u8> {
    let mut img = ImageBuilder::new(endian);
    img.cleanmarker();
    img.inode(&InodeNode::plain(1, 1, 0, b"", 0).with_mode(S_IFDIR | 0o755));
    img.dirent(1, 1, 10, DT_DIR, "docs");
    img.inode(&InodeNode::plain(10, 1, 0, b"", 0).with_mode(S_IFDIR | 0o755));
    img.dirent(10, 2, 11, DT_REG, "a.txt");
    img.inode(&InodeNode::zlib(11, 1, 0, b"hello world", 11));
    img.build()
}
