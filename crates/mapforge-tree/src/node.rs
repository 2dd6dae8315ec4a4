//! Typed tree nodes, identifiers, and the per-kind capability table.
//!
//! A container tree is an ordered `[Node]` forest. Only [`NodeKind::Group`]
//! nodes own a `children` list; layers and tools carry no `children` field at
//! all (serialized output omits it rather than emitting an empty array).
//!
//! Identifiers are plain strings, but catalog-derived nodes use the composite
//! form `<kind>:<catalogId>` so the same catalog entry can be recognized in
//! any container. [`NodeId::catalog_key`] is the single place that parses it.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between kind and catalog id inside a composite [`NodeId`].
pub const COMPOSITE_SEPARATOR: char = ':';

/// Closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Group,
    Layer,
    Tool,
}

impl NodeKind {
    /// Every kind, in catalog display order.
    pub const ALL: [Self; 3] = [Self::Layer, Self::Group, Self::Tool];

    /// Stable lowercase tag used in composite ids and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Layer => "layer",
            Self::Tool => "tool",
        }
    }

    /// Structural capabilities of this kind.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        capabilities(self)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ItemKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(Self::Group),
            "layer" => Ok(Self::Layer),
            "tool" => Ok(Self::Tool),
            other => Err(ItemKeyError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Structural capabilities of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_have_children: bool,
}

/// The capability table.
#[must_use]
pub const fn capabilities(kind: NodeKind) -> Capabilities {
    match kind {
        NodeKind::Group => Capabilities {
            can_have_children: true,
        },
        NodeKind::Layer | NodeKind::Tool => Capabilities {
            can_have_children: false,
        },
    }
}

/// Identifier of a node, unique within one container tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build the composite `<kind>:<catalogId>` id for a catalog entry.
    #[must_use]
    pub fn composite(kind: NodeKind, catalog_id: &str) -> Self {
        Self(format!("{}{COMPOSITE_SEPARATOR}{catalog_id}", kind.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the composite form. Returns `None` for ids that are not
    /// `<kind>:<catalogId>` with a known kind and a non-empty catalog id.
    #[must_use]
    pub fn catalog_key(&self) -> Option<CatalogKey> {
        let (kind, catalog_id) = self.0.split_once(COMPOSITE_SEPARATOR)?;
        let kind = kind.parse().ok()?;
        if catalog_id.is_empty() {
            return None;
        }
        Some(CatalogKey {
            kind,
            catalog_id: catalog_id.to_string(),
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Parsed form of a composite id: which catalog entry a node wraps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    pub kind: NodeKind,
    pub catalog_id: String,
}

impl CatalogKey {
    #[must_use]
    pub fn new(kind: NodeKind, catalog_id: impl Into<String>) -> Self {
        Self {
            kind,
            catalog_id: catalog_id.into(),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::composite(self.kind, &self.catalog_id)
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{COMPOSITE_SEPARATOR}{}", self.kind, self.catalog_id)
    }
}

/// Identifier of a drop zone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Origin tag reserved for the source catalog; no container may use it.
    pub const RESERVED_CATALOG: &'static str = "catalog";

    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ContainerId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// One tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Build a node whose `children` presence matches its kind.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            children: kind.capabilities().can_have_children.then(Vec::new),
        }
    }

    #[must_use]
    pub fn group(id: impl Into<NodeId>, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Group,
            children: Some(children),
        }
    }

    #[must_use]
    pub fn layer(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeKind::Layer)
    }

    #[must_use]
    pub fn tool(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeKind::Tool)
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }

    /// Children as a slice; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(Self::subtree_len).sum::<usize>()
    }

    /// Whether `id` names this node or any descendant.
    #[must_use]
    pub fn subtree_contains(&self, id: &str) -> bool {
        self.id.as_str() == id || self.children().iter().any(|c| c.subtree_contains(id))
    }
}

/// Failure to parse a boundary identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKeyError {
    Empty,
    UnknownKind { kind: String },
    MissingSeparator { raw: String },
    EmptyCatalogId { raw: String },
    /// A bare id that names no placed node.
    NotPlaced { id: String },
}

impl fmt::Display for ItemKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier is empty"),
            Self::UnknownKind { kind } => write!(f, "unknown node kind {kind:?}"),
            Self::MissingSeparator { raw } => {
                write!(f, "identifier {raw:?} is missing a separator")
            }
            Self::EmptyCatalogId { raw } => {
                write!(f, "identifier {raw:?} has an empty catalog id")
            }
            Self::NotPlaced { id } => write!(f, "no placed node with id {id:?}"),
        }
    }
}

impl std::error::Error for ItemKeyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table_only_lets_groups_nest() {
        assert!(capabilities(NodeKind::Group).can_have_children);
        assert!(!capabilities(NodeKind::Layer).can_have_children);
        assert!(!capabilities(NodeKind::Tool).can_have_children);
    }

    #[test]
    fn constructors_match_capabilities() {
        assert_eq!(Node::new("g", "G", NodeKind::Group).children, Some(Vec::new()));
        assert_eq!(Node::layer("l", "L").children, None);
        assert_eq!(Node::tool("t", "T").children, None);
    }

    #[test]
    fn composite_id_parses_back() {
        let id = NodeId::composite(NodeKind::Layer, "42");
        assert_eq!(id.as_str(), "layer:42");
        assert_eq!(id.catalog_key(), Some(CatalogKey::new(NodeKind::Layer, "42")));
    }

    #[test]
    fn catalog_id_may_contain_separator() {
        let key = NodeId::new("tool:ns:measure").catalog_key().expect("composite");
        assert_eq!(key.kind, NodeKind::Tool);
        assert_eq!(key.catalog_id, "ns:measure");
    }

    #[test]
    fn plain_ids_have_no_catalog_key() {
        assert_eq!(NodeId::new("g1").catalog_key(), None);
        assert_eq!(NodeId::new("widget:7").catalog_key(), None);
        assert_eq!(NodeId::new("layer:").catalog_key(), None);
    }

    #[test]
    fn leaf_serializes_without_children_field() {
        let json = serde_json::to_string(&Node::layer("a", "A")).expect("serialize");
        assert_eq!(json, r#"{"id":"a","name":"A","kind":"layer"}"#);
        let group = serde_json::to_string(&Node::group("g", "G", vec![])).expect("serialize");
        assert_eq!(group, r#"{"id":"g","name":"G","kind":"group","children":[]}"#);
    }

    #[test]
    fn subtree_len_counts_descendants() {
        let tree = Node::group(
            "g",
            "G",
            vec![Node::layer("a", "A"), Node::group("h", "H", vec![Node::tool("t", "T")])],
        );
        assert_eq!(tree.subtree_len(), 4);
        assert!(tree.subtree_contains("t"));
        assert!(!tree.subtree_contains("x"));
    }
}
