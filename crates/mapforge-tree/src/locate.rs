//! Read-only tree queries.
//!
//! All functions are total: a missing id yields `None` (or `0` for counts),
//! never a panic. Lookups follow the pre-order of [`crate::walk`] and return
//! the first match.

use std::collections::BTreeSet;

use crate::node::{Node, NodeId, NodeKind};
use crate::walk::{self, NodePath};

/// Parent and position of a located node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement<'a> {
    /// Owning group, or `None` at root level.
    pub parent: Option<&'a Node>,
    pub index: usize,
}

/// First node with `id`.
#[must_use]
pub fn find<'a>(tree: &'a [Node], id: &str) -> Option<&'a Node> {
    walk::iter(tree).find(|node| node.id.as_str() == id)
}

/// Whether `id` occurs anywhere in `tree`.
#[must_use]
pub fn contains(tree: &[Node], id: &str) -> bool {
    find(tree, id).is_some()
}

/// Parent group (or root) and sibling index of `id`.
#[must_use]
pub fn find_parent_and_index<'a>(tree: &'a [Node], id: &str) -> Option<Placement<'a>> {
    let path = walk::path_of(tree, id)?;
    let parent = match path.parent() {
        Some(parent_path) => Some(walk::node_at(tree, &parent_path)?),
        None => None,
    };
    Some(Placement {
        parent,
        index: path.index(),
    })
}

/// Every id in `tree`.
#[must_use]
pub fn collect_ids(tree: &[Node]) -> BTreeSet<NodeId> {
    walk::iter(tree).map(|node| node.id.clone()).collect()
}

/// Index of `id` among its siblings.
#[must_use]
pub fn position_of(tree: &[Node], id: &str) -> Option<usize> {
    walk::path_of(tree, id).map(|path| path.index())
}

/// Length of the sibling list holding `id`, or 0 when absent.
#[must_use]
pub fn sibling_count(tree: &[Node], id: &str) -> usize {
    walk::path_of(tree, id)
        .and_then(|path| walk::siblings_at(tree, &path).map(<[Node]>::len))
        .unwrap_or(0)
}

/// True when `id` exists and is not the first of its siblings.
#[must_use]
pub fn can_move_up(tree: &[Node], id: &str) -> bool {
    position_of(tree, id).is_some_and(|position| position > 0)
}

/// True when `id` exists and is not the last of its siblings.
#[must_use]
pub fn can_move_down(tree: &[Node], id: &str) -> bool {
    position_of(tree, id).is_some_and(|position| position + 1 < sibling_count(tree, id))
}

/// Total node count at every depth.
#[must_use]
pub fn node_count(tree: &[Node]) -> usize {
    walk::iter(tree).count()
}

/// Path of the first group with `id`; other kinds with that id are skipped.
#[must_use]
pub fn group_path(tree: &[Node], id: &str) -> Option<NodePath> {
    walk::find_path(tree, |node| node.kind == NodeKind::Group && node.id.as_str() == id)
}

/// Deterministic FNV-1a structural hash of a tree, for logs and replay
/// diagnostics.
#[must_use]
pub fn state_hash(tree: &[Node]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        for byte in value.to_le_bytes() {
            mix(hash, byte);
        }
    }

    fn mix_str(hash: &mut u64, value: &str) {
        mix_u64(hash, value.len() as u64);
        for byte in value.as_bytes() {
            mix(hash, *byte);
        }
    }

    fn mix_level(hash: &mut u64, nodes: &[Node]) {
        mix_u64(hash, nodes.len() as u64);
        for node in nodes {
            mix_str(hash, node.id.as_str());
            mix_str(hash, &node.name);
            mix(
                hash,
                match node.kind {
                    NodeKind::Group => 1,
                    NodeKind::Layer => 2,
                    NodeKind::Tool => 3,
                },
            );
            match &node.children {
                Some(children) => {
                    mix(hash, 1);
                    mix_level(hash, children);
                }
                None => mix(hash, 0),
            }
        }
    }

    let mut hash = OFFSET_BASIS;
    mix_level(&mut hash, tree);
    hash
}
