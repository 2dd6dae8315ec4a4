//! Source catalog and the "still available" filter.
//!
//! The catalog lists every layer, group, and tool the publisher knows about.
//! A catalog entry is available while no container holds a node whose id is
//! the entry's composite `kind:catalogId`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::container::ContainerSet;
use crate::node::{CatalogKey, Node, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}

/// Entries per kind, in publisher order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub layers: Vec<CatalogEntry>,
    #[serde(default)]
    pub groups: Vec<CatalogEntry>,
    #[serde(default)]
    pub tools: Vec<CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn entries(&self, kind: NodeKind) -> &[CatalogEntry] {
        match kind {
            NodeKind::Layer => &self.layers,
            NodeKind::Group => &self.groups,
            NodeKind::Tool => &self.tools,
        }
    }

    /// Swap in a freshly fetched list for one kind.
    pub fn replace(&mut self, kind: NodeKind, entries: Vec<CatalogEntry>) {
        let slot = match kind {
            NodeKind::Layer => &mut self.layers,
            NodeKind::Group => &mut self.groups,
            NodeKind::Tool => &mut self.tools,
        };
        tracing::debug!(%kind, count = entries.len(), "catalog refreshed");
        *slot = entries;
    }

    #[must_use]
    pub fn lookup(&self, key: &CatalogKey) -> Option<&CatalogEntry> {
        self.entries(key.kind)
            .iter()
            .find(|entry| entry.id == key.catalog_id)
    }

    /// Fresh node for a catalog entry, with the composite id and capability
    /// defaults for its kind.
    #[must_use]
    pub fn node_for(&self, key: &CatalogKey) -> Option<Node> {
        self.lookup(key)
            .map(|entry| Node::new(key.node_id(), entry.name.clone(), key.kind))
    }
}

/// Entries of `kind` that no container holds, narrowed by a
/// case-insensitive substring match on the name. An empty `search` matches
/// everything.
#[must_use]
pub fn available<'a>(
    entries: &'a [CatalogEntry],
    kind: NodeKind,
    containers: &ContainerSet,
    search: &str,
) -> Vec<&'a CatalogEntry> {
    filter_entries(entries, kind, &containers.collect_ids(), &search.to_lowercase())
}

fn filter_entries<'a>(
    entries: &'a [CatalogEntry],
    kind: NodeKind,
    placed: &BTreeSet<NodeId>,
    needle: &str,
) -> Vec<&'a CatalogEntry> {
    entries
        .iter()
        .filter(|entry| !placed.contains(&NodeId::composite(kind, &entry.id)))
        .filter(|entry| entry.matches(needle))
        .collect()
}

/// All three filtered lists at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableCatalog<'a> {
    pub layers: Vec<&'a CatalogEntry>,
    pub groups: Vec<&'a CatalogEntry>,
    pub tools: Vec<&'a CatalogEntry>,
}

impl AvailableCatalog<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len() + self.groups.len() + self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`available`] for every kind, collecting placed ids once.
#[must_use]
pub fn available_all<'a>(
    catalog: &'a Catalog,
    containers: &ContainerSet,
    search: &str,
) -> AvailableCatalog<'a> {
    let placed = containers.collect_ids();
    let needle = search.to_lowercase();
    AvailableCatalog {
        layers: filter_entries(&catalog.layers, NodeKind::Layer, &placed, &needle),
        groups: filter_entries(&catalog.groups, NodeKind::Group, &placed, &needle),
        tools: filter_entries(&catalog.tools, NodeKind::Tool, &placed, &needle),
    }
}
