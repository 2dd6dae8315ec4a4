//! Mutation engine: pure functions from one tree to the next.
//!
//! Inputs are never modified; every function returns a fresh tree that has
//! been passed through [`enforce_in_place`]. A mutation whose target cannot be
//! resolved returns an unchanged copy instead of failing, so callers that
//! care must compare (or use [`TreeOperation::apply`], which reports
//! `changed`).
//!
//! Inserts refuse to create duplicate ids: if any id of the incoming subtree
//! already exists in the tree, the insert is a no-op.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::enforce::enforce_in_place;
use crate::locate::{self, state_hash};
use crate::node::{Node, NodeId};
use crate::walk::{self, siblings_at_mut};

/// Result of [`remove_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// The detached subtree, if `id` was found.
    pub removed: Option<Node>,
    pub tree: Vec<Node>,
}

fn finish(mut tree: Vec<Node>) -> Vec<Node> {
    enforce_in_place(&mut tree);
    tree
}

fn collides(tree: &[Node], incoming: &Node) -> bool {
    let existing: FxHashSet<&str> = walk::iter(tree).map(|n| n.id.as_str()).collect();
    walk::iter(std::slice::from_ref(incoming)).any(|n| existing.contains(n.id.as_str()))
}

/// Append `node` as the last root-level entry.
#[must_use]
pub fn insert_at_root(tree: &[Node], node: Node) -> Vec<Node> {
    if collides(tree, &node) {
        return tree.to_vec();
    }
    let mut working = tree.to_vec();
    working.push(node);
    finish(working)
}

/// Append `node` to the children of the first group with `group_id`, at any
/// depth. No-op when no such group exists.
#[must_use]
pub fn insert_into_group(tree: &[Node], group_id: &str, node: Node) -> Vec<Node> {
    let Some(path) = locate::group_path(tree, group_id) else {
        return tree.to_vec();
    };
    if collides(tree, &node) {
        return tree.to_vec();
    }
    let mut working = tree.to_vec();
    if let Some(group) = siblings_at_mut(&mut working, &path).and_then(|s| s.get_mut(path.index()))
    {
        group.children.get_or_insert_with(Vec::new).push(node);
    }
    finish(working)
}

/// Insert `node` immediately before `target_id` in whichever list (root or
/// group) holds the target. No-op when the target is missing.
#[must_use]
pub fn insert_at(tree: &[Node], target_id: &str, node: Node) -> Vec<Node> {
    let Some(path) = walk::path_of(tree, target_id) else {
        return tree.to_vec();
    };
    if collides(tree, &node) {
        return tree.to_vec();
    }
    finish(walk::edit_siblings(tree, &path, |siblings, index| {
        siblings.insert(index, node);
    }))
}

/// Detach the first node with `id`, together with its subtree.
#[must_use]
pub fn remove_by_id(tree: &[Node], id: &str) -> Removal {
    let Some(path) = walk::path_of(tree, id) else {
        return Removal {
            removed: None,
            tree: tree.to_vec(),
        };
    };
    let mut removed = None;
    let working = walk::edit_siblings(tree, &path, |siblings, index| {
        removed = Some(siblings.remove(index));
    });
    Removal {
        removed,
        tree: finish(working),
    }
}

/// Swap `id` with its preceding sibling; no-op when first or missing.
#[must_use]
pub fn move_up(tree: &[Node], id: &str) -> Vec<Node> {
    match walk::path_of(tree, id) {
        Some(path) if path.index() > 0 => finish(walk::edit_siblings(tree, &path, |s, i| {
            s.swap(i - 1, i);
        })),
        _ => tree.to_vec(),
    }
}

/// Swap `id` with its following sibling; no-op when last or missing.
#[must_use]
pub fn move_down(tree: &[Node], id: &str) -> Vec<Node> {
    match walk::path_of(tree, id) {
        Some(path) if locate::can_move_down(tree, id) => {
            finish(walk::edit_siblings(tree, &path, |s, i| s.swap(i, i + 1)))
        }
        _ => tree.to_vec(),
    }
}

/// Move `id` to `index` within its own sibling list.
///
/// Array-move semantics: the node ends up at `index` (clamped to the last
/// position) and the others keep their relative order.
#[must_use]
pub fn move_to_index(tree: &[Node], id: &str, index: usize) -> Vec<Node> {
    let Some(path) = walk::path_of(tree, id) else {
        return tree.to_vec();
    };
    if path.index() == index {
        return tree.to_vec();
    }
    finish(walk::edit_siblings(tree, &path, |siblings, from| {
        let node = siblings.remove(from);
        let to = index.min(siblings.len());
        siblings.insert(to, node);
    }))
}

/// Move `id` (with its subtree) to sit immediately before `target_id`,
/// wherever the target lives in the same tree.
#[must_use]
pub fn move_before(tree: &[Node], id: &str, target_id: &str) -> Vec<Node> {
    let (Some(source), Some(target)) = (walk::path_of(tree, id), walk::path_of(tree, target_id))
    else {
        return tree.to_vec();
    };
    if target.is_within(&source) {
        return tree.to_vec();
    }
    let detached = remove_by_id(tree, id);
    let Some(node) = detached.removed else {
        return tree.to_vec();
    };
    insert_at(&detached.tree, target_id, node)
}

/// Move `id` (with its subtree) to the end of group `group_id`.
///
/// No-op when either is missing or the group lies inside the moved subtree.
#[must_use]
pub fn move_into_group(tree: &[Node], id: &str, group_id: &str) -> Vec<Node> {
    let (Some(source), Some(group)) = (walk::path_of(tree, id), locate::group_path(tree, group_id))
    else {
        return tree.to_vec();
    };
    if group.is_within(&source) {
        return tree.to_vec();
    }
    let detached = remove_by_id(tree, id);
    let Some(node) = detached.removed else {
        return tree.to_vec();
    };
    insert_into_group(&detached.tree, group_id, node)
}

/// One serializable mutation, for journals, scripts, and replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TreeOperation {
    InsertAtRoot { node: Node },
    InsertIntoGroup { group: NodeId, node: Node },
    InsertBefore { target: NodeId, node: Node },
    Remove { id: NodeId },
    MoveUp { id: NodeId },
    MoveDown { id: NodeId },
    MoveToIndex { id: NodeId, index: usize },
    MoveBefore { id: NodeId, target: NodeId },
    MoveIntoGroup { id: NodeId, group: NodeId },
}

/// Stable operation discriminator used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    InsertAtRoot,
    InsertIntoGroup,
    InsertBefore,
    Remove,
    MoveUp,
    MoveDown,
    MoveToIndex,
    MoveBefore,
    MoveIntoGroup,
}

/// Result of [`TreeOperation::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    pub tree: Vec<Node>,
    /// Subtree detached by `Remove`.
    pub removed: Option<Node>,
    pub changed: bool,
    pub before_hash: u64,
    pub after_hash: u64,
}

impl TreeOperation {
    /// Operation family.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::InsertAtRoot { .. } => OperationKind::InsertAtRoot,
            Self::InsertIntoGroup { .. } => OperationKind::InsertIntoGroup,
            Self::InsertBefore { .. } => OperationKind::InsertBefore,
            Self::Remove { .. } => OperationKind::Remove,
            Self::MoveUp { .. } => OperationKind::MoveUp,
            Self::MoveDown { .. } => OperationKind::MoveDown,
            Self::MoveToIndex { .. } => OperationKind::MoveToIndex,
            Self::MoveBefore { .. } => OperationKind::MoveBefore,
            Self::MoveIntoGroup { .. } => OperationKind::MoveIntoGroup,
        }
    }

    /// Apply to `tree`, reporting whether anything changed.
    #[must_use]
    pub fn apply(&self, tree: &[Node]) -> OperationOutcome {
        let kind = self.kind();
        let before_hash = state_hash(tree);
        let mut removed = None;
        let next = match self {
            Self::InsertAtRoot { node } => insert_at_root(tree, node.clone()),
            Self::InsertIntoGroup { group, node } => {
                insert_into_group(tree, group.as_str(), node.clone())
            }
            Self::InsertBefore { target, node } => insert_at(tree, target.as_str(), node.clone()),
            Self::Remove { id } => {
                let removal = remove_by_id(tree, id.as_str());
                removed = removal.removed;
                removal.tree
            }
            Self::MoveUp { id } => move_up(tree, id.as_str()),
            Self::MoveDown { id } => move_down(tree, id.as_str()),
            Self::MoveToIndex { id, index } => move_to_index(tree, id.as_str(), *index),
            Self::MoveBefore { id, target } => move_before(tree, id.as_str(), target.as_str()),
            Self::MoveIntoGroup { id, group } => {
                move_into_group(tree, id.as_str(), group.as_str())
            }
        };
        let changed = next.as_slice() != tree;
        let after_hash = state_hash(&next);
        tracing::debug!(op = ?kind, changed, before_hash, after_hash, "tree operation");
        OperationOutcome {
            kind,
            tree: next,
            removed,
            changed,
            before_hash,
            after_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use proptest::prelude::*;

    fn ids(tree: &[Node]) -> Vec<&str> {
        tree.iter().map(|n| n.id.as_str()).collect()
    }

    fn abc() -> Vec<Node> {
        vec![Node::layer("A", "A"), Node::layer("B", "B"), Node::layer("C", "C")]
    }

    #[test]
    fn insert_into_empty_group() {
        let tree = vec![Node::group("g1", "G1", vec![])];
        let next = insert_into_group(&tree, "g1", Node::layer("L1", "L1"));
        assert_eq!(
            next,
            vec![Node::group("g1", "G1", vec![Node::layer("L1", "L1")])]
        );
    }

    #[test]
    fn insert_into_nested_group() {
        let tree = vec![Node::group("outer", "O", vec![Node::group("inner", "I", vec![])])];
        let next = insert_into_group(&tree, "inner", Node::tool("t", "T"));
        assert_eq!(next[0].children()[0].children()[0].id.as_str(), "t");
    }

    #[test]
    fn insert_into_missing_or_leaf_group_is_noop() {
        let tree = vec![Node::layer("g1", "not a group")];
        assert_eq!(insert_into_group(&tree, "g1", Node::layer("x", "X")), tree);
        assert_eq!(insert_into_group(&tree, "nope", Node::layer("x", "X")), tree);
    }

    #[test]
    fn insert_normalizes_incoming_node() {
        let malformed = Node {
            id: "l".into(),
            name: "L".into(),
            kind: NodeKind::Layer,
            children: Some(vec![]),
        };
        let next = insert_at_root(&[], malformed);
        assert_eq!(next, vec![Node::layer("l", "L")]);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let tree = vec![Node::group("g", "G", vec![Node::layer("a", "A")])];
        assert_eq!(insert_at_root(&tree, Node::layer("a", "again")), tree);
        let carrying_dup = Node::group("h", "H", vec![Node::layer("a", "A")]);
        assert_eq!(insert_at_root(&tree, carrying_dup), tree);
    }

    #[test]
    fn move_down_walks_to_the_end_then_stops() {
        let once = move_down(&abc(), "A");
        assert_eq!(ids(&once), vec!["B", "A", "C"]);
        let twice = move_down(&once, "A");
        assert_eq!(ids(&twice), vec!["B", "C", "A"]);
        let thrice = move_down(&twice, "A");
        assert_eq!(thrice, twice);
    }

    #[test]
    fn move_up_boundary_is_noop() {
        let tree = abc();
        assert_eq!(move_up(&tree, "A"), tree);
        assert_eq!(ids(&move_up(&tree, "C")), vec!["A", "C", "B"]);
        assert_eq!(move_up(&tree, "missing"), tree);
    }

    #[test]
    fn moves_act_at_nested_depth() {
        let tree = vec![Node::group(
            "g",
            "G",
            vec![Node::layer("x", "X"), Node::layer("y", "Y")],
        )];
        let next = move_up(&tree, "y");
        assert_eq!(ids(next[0].children()), vec!["y", "x"]);
    }

    #[test]
    fn remove_returns_subtree() {
        let tree = vec![
            Node::group("g", "G", vec![Node::layer("a", "A"), Node::layer("b", "B")]),
            Node::layer("c", "C"),
        ];
        let removal = remove_by_id(&tree, "g");
        assert_eq!(removal.removed.map(|n| n.subtree_len()), Some(3));
        assert_eq!(ids(&removal.tree), vec!["c"]);

        let missing = remove_by_id(&tree, "zzz");
        assert!(missing.removed.is_none());
        assert_eq!(missing.tree, tree);
    }

    #[test]
    fn insert_at_places_before_target_in_its_parent() {
        let tree = vec![Node::group(
            "g",
            "G",
            vec![Node::layer("a", "A"), Node::layer("b", "B")],
        )];
        let next = insert_at(&tree, "b", Node::layer("new", "N"));
        assert_eq!(ids(next[0].children()), vec!["a", "new", "b"]);
        assert_eq!(insert_at(&tree, "missing", Node::layer("new", "N")), tree);
    }

    #[test]
    fn move_to_index_uses_array_move() {
        assert_eq!(ids(&move_to_index(&abc(), "A", 2)), vec!["B", "C", "A"]);
        assert_eq!(ids(&move_to_index(&abc(), "C", 0)), vec!["C", "A", "B"]);
        assert_eq!(ids(&move_to_index(&abc(), "A", 99)), vec!["B", "C", "A"]);
        assert_eq!(move_to_index(&abc(), "B", 1), abc());
    }

    #[test]
    fn move_before_crosses_levels() {
        let tree = vec![
            Node::layer("a", "A"),
            Node::group("g", "G", vec![Node::layer("b", "B")]),
        ];
        let next = move_before(&tree, "a", "b");
        assert_eq!(ids(&next), vec!["g"]);
        assert_eq!(ids(next[0].children()), vec!["a", "b"]);
    }

    #[test]
    fn move_before_into_own_subtree_is_noop() {
        let tree = vec![Node::group("g", "G", vec![Node::layer("b", "B")])];
        assert_eq!(move_before(&tree, "g", "b"), tree);
        assert_eq!(move_before(&tree, "g", "g"), tree);
    }

    #[test]
    fn move_into_group_rejects_cycles() {
        let tree = vec![
            Node::group("g", "G", vec![Node::group("h", "H", vec![])]),
            Node::layer("a", "A"),
        ];
        assert_eq!(move_into_group(&tree, "g", "h"), tree);
        assert_eq!(move_into_group(&tree, "g", "g"), tree);
        let next = move_into_group(&tree, "a", "h");
        assert_eq!(next[0].children()[0].children()[0].id.as_str(), "a");
        assert_eq!(locate::node_count(&next), locate::node_count(&tree));
    }

    #[test]
    fn operation_reports_change_and_hashes() {
        let tree = abc();
        let outcome = TreeOperation::MoveDown { id: "A".into() }.apply(&tree);
        assert!(outcome.changed);
        assert_ne!(outcome.before_hash, outcome.after_hash);
        assert_eq!(outcome.kind, OperationKind::MoveDown);

        let noop = TreeOperation::MoveUp { id: "A".into() }.apply(&tree);
        assert!(!noop.changed);
        assert_eq!(noop.before_hash, noop.after_hash);

        let removal = TreeOperation::Remove { id: "B".into() }.apply(&tree);
        assert_eq!(removal.removed.map(|n| n.id), Some(NodeId::new("B")));
    }

    #[test]
    fn operation_serializes_with_op_tag() {
        let op = TreeOperation::MoveToIndex {
            id: "A".into(),
            index: 2,
        };
        let json = serde_json::to_value(&op).expect("serialize");
        assert_eq!(json["op"], "move_to_index");
        let back: TreeOperation = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, op);
    }

    fn flat_tree(len: usize) -> Vec<Node> {
        (0..len)
            .map(|i| Node::layer(format!("n{i}"), format!("N{i}")))
            .collect()
    }

    proptest! {
        #[test]
        fn reorders_preserve_cardinality(len in 1usize..12, pick in 0usize..12, to in 0usize..14) {
            let tree = flat_tree(len);
            let id = format!("n{}", pick % len);
            let count = locate::node_count(&tree);
            prop_assert_eq!(locate::node_count(&move_up(&tree, &id)), count);
            prop_assert_eq!(locate::node_count(&move_down(&tree, &id)), count);
            prop_assert_eq!(locate::node_count(&move_to_index(&tree, &id, to)), count);
        }

        #[test]
        fn insert_and_remove_change_count_by_subtree_size(
            len in 0usize..8,
            group_size in 0usize..5,
        ) {
            let tree = flat_tree(len);
            let incoming = Node::group(
                "incoming",
                "In",
                (0..group_size).map(|i| Node::tool(format!("t{i}"), "T")).collect(),
            );
            let size = incoming.subtree_len();
            let grown = insert_at_root(&tree, incoming);
            prop_assert_eq!(locate::node_count(&grown), len + size);
            let shrunk = remove_by_id(&grown, "incoming");
            prop_assert_eq!(locate::node_count(&shrunk.tree), len);
        }
    }
}
