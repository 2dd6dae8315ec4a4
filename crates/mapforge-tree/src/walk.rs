//! Depth-first traversal shared by the locator, the enforcer, and the
//! mutation engine.
//!
//! Order is pre-order: a node is visited before its children, and its whole
//! subtree before its later siblings. Every "first match" in this crate means
//! first in this order.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Index path from the root sequence to one node.
///
/// `[2]` is the third root entry, `[2, 0]` its first child. A path is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path of a root-level entry.
    #[must_use]
    pub fn root_entry(index: usize) -> Self {
        Self(vec![index])
    }

    /// Build from raw indices; `None` when empty.
    #[must_use]
    pub fn from_indices(indices: Vec<usize>) -> Option<Self> {
        (!indices.is_empty()).then_some(Self(indices))
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Nesting depth; root entries are depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    /// Position among siblings.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Path of the parent group, or `None` at root level.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_vec()))
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Same path with the last index replaced.
    #[must_use]
    pub fn with_index(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        let last = indices.len() - 1;
        indices[last] = index;
        Self(indices)
    }

    /// True when `self` is `ancestor` or lies inside its subtree.
    #[must_use]
    pub fn is_within(&self, ancestor: &Self) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// True when both paths share the same parent list.
    #[must_use]
    pub fn is_sibling_of(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0[..self.0.len() - 1] == other.0[..other.0.len() - 1]
    }
}

/// Visit every node in pre-order until `visit` breaks.
pub fn walk<'a, B>(
    tree: &'a [Node],
    mut visit: impl FnMut(&NodePath, &'a Node) -> ControlFlow<B>,
) -> Option<B> {
    let mut path = NodePath(Vec::new());
    walk_level(tree, &mut path, &mut visit)
}

fn walk_level<'a, B>(
    nodes: &'a [Node],
    path: &mut NodePath,
    visit: &mut impl FnMut(&NodePath, &'a Node) -> ControlFlow<B>,
) -> Option<B> {
    for (index, node) in nodes.iter().enumerate() {
        path.0.push(index);
        if let ControlFlow::Break(found) = visit(path, node) {
            path.0.pop();
            return Some(found);
        }
        if let Some(found) = walk_level(node.children(), path, visit) {
            path.0.pop();
            return Some(found);
        }
        path.0.pop();
    }
    None
}

/// Path of the first node matching `pred`.
pub fn find_path(tree: &[Node], mut pred: impl FnMut(&Node) -> bool) -> Option<NodePath> {
    walk(tree, |path, node| {
        if pred(node) {
            ControlFlow::Break(path.clone())
        } else {
            ControlFlow::Continue(())
        }
    })
}

/// Path of the first node with the given id.
#[must_use]
pub fn path_of(tree: &[Node], id: &str) -> Option<NodePath> {
    find_path(tree, |node| node.id.as_str() == id)
}

/// Node addressed by `path`.
#[must_use]
pub fn node_at<'a>(tree: &'a [Node], path: &NodePath) -> Option<&'a Node> {
    let siblings = siblings_at(tree, path)?;
    siblings.get(path.index())
}

/// The sibling list (root sequence or parent's children) holding `path`.
#[must_use]
pub fn siblings_at<'a>(tree: &'a [Node], path: &NodePath) -> Option<&'a [Node]> {
    let mut level = tree;
    for &index in &path.0[..path.0.len() - 1] {
        level = level.get(index)?.children.as_deref()?;
    }
    Some(level)
}

/// Mutable sibling list holding `path`.
pub(crate) fn siblings_at_mut<'a>(
    tree: &'a mut Vec<Node>,
    path: &NodePath,
) -> Option<&'a mut Vec<Node>> {
    let mut level = tree;
    for &index in &path.0[..path.0.len() - 1] {
        level = level.get_mut(index)?.children.as_mut()?;
    }
    Some(level)
}

/// Copy `tree` and let `edit` change the sibling list holding `path`.
///
/// `edit` receives the list and the node's index in it. If the path does not
/// resolve the copy is returned untouched.
pub fn edit_siblings(
    tree: &[Node],
    path: &NodePath,
    edit: impl FnOnce(&mut Vec<Node>, usize),
) -> Vec<Node> {
    let mut working = tree.to_vec();
    if let Some(siblings) = siblings_at_mut(&mut working, path)
        && path.index() < siblings.len()
    {
        edit(siblings, path.index());
    }
    working
}

/// Apply `visit` to every node in pre-order, parents before children.
///
/// `visit` may replace a node's `children`; traversal continues into the
/// updated list.
pub fn visit_mut(tree: &mut [Node], visit: &mut impl FnMut(&mut Node)) {
    for node in tree.iter_mut() {
        visit(node);
        if let Some(children) = node.children.as_mut() {
            visit_mut(children, visit);
        }
    }
}

/// Pre-order iterator over every node.
#[must_use]
pub fn iter(tree: &[Node]) -> Preorder<'_> {
    Preorder {
        stack: vec![tree.iter()],
    }
}

/// Iterator returned by [`iter`].
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    if !node.children().is_empty() {
                        self.stack.push(node.children().iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Node> {
        vec![
            Node::group(
                "g1",
                "G1",
                vec![
                    Node::layer("a", "A"),
                    Node::group("g2", "G2", vec![Node::layer("b", "B")]),
                ],
            ),
            Node::layer("c", "C"),
        ]
    }

    #[test]
    fn preorder_visits_children_before_later_siblings() {
        let tree = sample();
        let ids: Vec<_> = iter(&tree).map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "a", "g2", "b", "c"]);
    }

    #[test]
    fn walk_reports_paths() {
        let tree = sample();
        assert_eq!(path_of(&tree, "b").map(|p| p.indices().to_vec()), Some(vec![0, 1, 0]));
        assert_eq!(path_of(&tree, "c").map(|p| p.indices().to_vec()), Some(vec![1]));
        assert_eq!(path_of(&tree, "zzz"), None);
    }

    #[test]
    fn first_match_wins_on_duplicates() {
        let tree = vec![
            Node::group("g", "G", vec![Node::layer("dup", "inner")]),
            Node::layer("dup", "outer"),
        ];
        let path = path_of(&tree, "dup").expect("present");
        assert_eq!(node_at(&tree, &path).map(|n| n.name.as_str()), Some("inner"));
    }

    #[test]
    fn path_relations() {
        let a = NodePath::from_indices(vec![0, 1]).expect("non-empty");
        let b = NodePath::from_indices(vec![0, 1, 3]).expect("non-empty");
        assert!(b.is_within(&a));
        assert!(!a.is_within(&b));
        assert_eq!(b.parent(), Some(a.clone()));
        assert_eq!(a.with_index(4).indices(), &[0, 4]);
        assert!(a.is_sibling_of(&a.with_index(0)));
        assert!(!a.is_sibling_of(&b));
        assert_eq!(NodePath::root_entry(3).parent(), None);
        assert_eq!(NodePath::from_indices(Vec::new()), None);
    }

    #[test]
    fn edit_siblings_leaves_input_untouched() {
        let tree = sample();
        let path = path_of(&tree, "a").expect("present");
        let edited = edit_siblings(&tree, &path, |list, index| {
            list.remove(index);
        });
        assert_eq!(tree[0].children().len(), 2);
        assert_eq!(edited[0].children().len(), 1);
    }

    #[test]
    fn visit_mut_reaches_every_node() {
        let mut tree = sample();
        let mut seen = 0;
        visit_mut(&mut tree, &mut |node| {
            node.name.make_ascii_lowercase();
            seen += 1;
        });
        assert_eq!(seen, 5);
        assert_eq!(tree[0].children()[1].name, "g2");
    }
}
