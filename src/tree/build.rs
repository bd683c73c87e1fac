//! 合并算法

use super::entry::{Entry, EntryKind};
use super::{PendingUnlink, Tree, UnlinkPolicy};
use crate::consts::*;
use crate::scan::{RawDirent, RawNode, ScanOutput};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

impl Tree {
    /// 从扫描结果构建
    pub fn from_scan(output: &ScanOutput, policy: UnlinkPolicy) -> Self {
        Self::build(&output.nodes, policy)
    }

    /// 从节点序列构建
    pub fn build(nodes: &[RawNode], policy: UnlinkPolicy) -> Self {
        let mut entries: BTreeMap<u32, Entry> = BTreeMap::new();
        entries.insert(JFFS2_ROOT_INO, Entry::root());

        // 第一遍：目录项，按版本号稳定排序
        let mut dirents: Vec<&RawDirent> = nodes.iter().filter_map(RawNode::as_dirent).collect();
        dirents.sort_by_key(|d| d.version);

        let mut newest: HashMap<(u32, &str), u32> = HashMap::new();
        let mut pending_unlinks = Vec::new();

        for dirent in &dirents {
            newest.insert((dirent.pino, dirent.name.as_str()), dirent.ino);

            if dirent.is_unlink() {
                log::debug!(
                    "[TREE] unlink of '{}' under {} (version {})",
                    dirent.name,
                    dirent.pino,
                    dirent.version
                );
                pending_unlinks.push(PendingUnlink {
                    parent: dirent.pino,
                    name: dirent.name.clone(),
                    version: dirent.version,
                });
                continue;
            }
            if dirent.ino == JFFS2_ROOT_INO {
                log::debug!("[TREE] ignoring dirent '{}' naming the root inode", dirent.name);
                continue;
            }

            entries
                .entry(dirent.ino)
                .and_modify(|entry| entry.apply_dirent(dirent))
                .or_insert_with(|| Entry::from_dirent(dirent));
        }

        if policy == UnlinkPolicy::Apply {
            for entry in entries.values_mut() {
                if !entry.named || entry.is_root() {
                    continue;
                }
                let current = newest.get(&(entry.parent, entry.name.as_str())).copied();
                if current != Some(entry.ino) {
                    log::debug!(
                        "[TREE] inode {} ('{}') no longer linked under {}",
                        entry.ino,
                        entry.name,
                        entry.parent
                    );
                    entry.unlinked = true;
                }
            }
        }

        // 第二遍：数据记录，按收集顺序
        for record in nodes.iter().filter_map(RawNode::as_inode) {
            if record.ino == JFFS2_UNLINK_INO {
                continue;
            }
            entries
                .entry(record.ino)
                .or_insert_with(|| {
                    log::debug!("[TREE] inode {} has data but no dirent", record.ino);
                    Entry::orphan(record.ino, EntryKind::Unknown)
                })
                .push_record(record);
        }

        // 第三遍：父子关系
        let mut edges: Vec<(u32, u32)> = Vec::new();
        for entry in entries.values() {
            if entry.is_root() || !entry.named || entry.unlinked {
                continue;
            }
            match entries.get(&entry.parent) {
                Some(parent) if parent.is_dir() => edges.push((entry.parent, entry.ino)),
                Some(parent) => log::debug!(
                    "[TREE] inode {} ('{}') names non-directory parent {} ({:?})",
                    entry.ino,
                    entry.name,
                    entry.parent,
                    parent.kind()
                ),
                None => log::debug!(
                    "[TREE] inode {} ('{}') has unknown parent {}",
                    entry.ino,
                    entry.name,
                    entry.parent
                ),
            }
        }
        for (parent, child) in edges {
            if let Some(entry) = entries.get_mut(&parent) {
                entry.children.push(child);
            }
        }

        let names: HashMap<u32, String> = entries.iter().map(|(&ino, e)| (ino, e.name.clone())).collect();
        for entry in entries.values_mut() {
            entry.children.sort_by(|a, b| names[a].cmp(&names[b]).then(a.cmp(b)));
        }

        let reachable = reachable_from_root(&entries);
        let root = entries.remove(&JFFS2_ROOT_INO).unwrap_or_else(Entry::root);

        log::info!(
            "[TREE] {} entries, {} reachable, {} pending unlinks",
            entries.len() + 1,
            reachable.len(),
            pending_unlinks.len()
        );

        Self {
            root,
            entries,
            reachable,
            pending_unlinks,
        }
    }
}

/// 从根目录沿父子边做广度优先遍历
fn reachable_from_root(entries: &BTreeMap<u32, Entry>) -> BTreeSet<u32> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([JFFS2_ROOT_INO]);
    seen.insert(JFFS2_ROOT_INO);

    while let Some(ino) = queue.pop_front() {
        let Some(entry) = entries.get(&ino) else {
            continue;
        };
        for &child in &entry.children {
            if seen.insert(child) {
                queue.push_back(child);
            }
        }
    }
    seen
}
