//! 树查询
//!
//! 路径解析与 ext4 的路径查找一致：按 `/` 分割，忽略空组件和 `.`；
//! 这里父目录已知，因此 `..` 也可以解析（根目录的 `..` 仍是根目录）。

use super::entry::Entry;
use super::{PendingUnlink, Tree};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};

impl Tree {
    /// 根目录
    pub fn root(&self) -> &Entry {
        &self.root
    }

    /// 按 inode 编号查找条目（包括孤立条目）
    pub fn entry(&self, ino: u32) -> Option<&Entry> {
        if ino == JFFS2_ROOT_INO {
            Some(&self.root)
        } else {
            self.entries.get(&ino)
        }
    }

    /// 条目总数（包括根目录）
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    /// 除根目录外是否没有任何条目
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有条目，按 inode 编号排列
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        core::iter::once(&self.root).chain(self.entries.values())
    }

    /// 条目是否能从根目录到达
    pub fn is_reachable(&self, ino: u32) -> bool {
        self.reachable.contains(&ino)
    }

    /// 不在层次结构中的条目
    pub fn orphans(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.values().filter(move |e| !self.reachable.contains(&e.ino))
    }

    /// 目录的子条目（按名字排序）；不是目录或不存在时为空
    pub fn children(&self, ino: u32) -> impl Iterator<Item = &Entry> + '_ {
        let inos: &[u32] = match self.entry(ino) {
            Some(entry) => &entry.children,
            None => &[],
        };
        inos.iter().filter_map(move |&child| self.entry(child))
    }

    /// 在目录中按名字查找
    pub fn lookup(&self, parent: u32, name: &str) -> Option<&Entry> {
        self.children(parent).find(|e| e.name == name)
    }

    /// 按绝对路径查找
    ///
    /// # 错误
    ///
    /// - `NotFound` - 路径组件不存在
    /// - `NotDirectory` - 中间组件不是目录
    pub fn resolve_path(&self, path: &str) -> Result<&Entry> {
        let mut current = &self.root;

        for component in path.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    current = self
                        .entry(current.parent)
                        .ok_or(Error::new(ErrorKind::NotFound, "Parent directory not found"))?;
                }
                name => {
                    if !current.is_dir() {
                        return Err(Error::new(ErrorKind::NotDirectory, "Not a directory"));
                    }
                    current = self
                        .lookup(current.ino, name)
                        .ok_or(Error::new(ErrorKind::NotFound, "Path component not found"))?;
                }
            }
        }

        Ok(current)
    }

    /// 条目的绝对路径；不可到达的条目返回 `None`
    pub fn path_of(&self, ino: u32) -> Option<String> {
        if !self.is_reachable(ino) {
            return None;
        }

        let mut parts = Vec::new();
        let mut current = self.entry(ino)?;
        while !current.is_root() {
            parts.push(current.name.as_str());
            current = self.entry(current.parent)?;
        }

        if parts.is_empty() {
            return Some(String::from("/"));
        }
        let mut path = String::new();
        for part in parts.iter().rev() {
            path.push('/');
            path.push_str(part);
        }
        Some(path)
    }

    /// 深度优先遍历可到达的条目（先序，从根目录开始）
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![(String::from("/"), &self.root)],
        }
    }

    /// 尚未应用的删除记录
    pub fn pending_unlinks(&self) -> &[PendingUnlink] {
        &self.pending_unlinks
    }
}

/// 深度优先遍历器，产出 `(路径, 条目)`
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<(String, &'a Entry)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, entry) = self.stack.pop()?;

        // 逆序压栈，保证按名字顺序弹出
        for &child in entry.children.iter().rev() {
            if let Some(child) = self.tree.entry(child) {
                let child_path = if entry.is_root() {
                    format!("/{}", child.name)
                } else {
                    format!("{}/{}", path, child.name)
                };
                self.stack.push((child_path, child));
            }
        }

        Some((path, entry))
    }
}
