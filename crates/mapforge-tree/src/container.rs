//! Multi-container coordinator.
//!
//! A [`ContainerSet`] is an ordered list of named drop zones. Each zone owns
//! one tree behind an `Arc`, so cloning the set is a reference-count bump per
//! zone and an untouched zone stays pointer-identical across mutations.
//!
//! [`ContainerSet::transfer`] moves a node between zones (or creates it from
//! the catalog). Every rejection is decided before anything is detached from
//! the source zone: a rejected transfer returns no new set at all.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::enforce::enforce;
use crate::locate;
use crate::mutate::{self, OperationOutcome, TreeOperation};
use crate::node::{ContainerId, Node, NodeId, NodeKind};
use crate::walk;

/// One drop zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub label: String,
    /// Maximum node count (all depths).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Kinds this zone takes; `None` takes everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<NodeKind>>,
    #[serde(default)]
    root: Arc<[Node]>,
}

impl Container {
    #[must_use]
    pub fn new(id: impl Into<ContainerId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            capacity: None,
            accepts: None,
            root: Arc::from(Vec::<Node>::new()),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_accepts(mut self, kinds: impl Into<Vec<NodeKind>>) -> Self {
        self.accepts = Some(kinds.into());
        self
    }

    /// Replace the tree; it is normalized on the way in.
    #[must_use]
    pub fn with_root(mut self, root: Vec<Node>) -> Self {
        self.root = Arc::from(enforce(&root));
        self
    }

    #[must_use]
    pub fn root(&self) -> &[Node] {
        &self.root
    }

    /// True when both containers hold the very same tree allocation.
    #[must_use]
    pub fn shares_root(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        locate::node_count(&self.root)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        locate::contains(&self.root, id)
    }

    #[must_use]
    pub fn accepts_kind(&self, kind: NodeKind) -> bool {
        self.accepts
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&kind))
    }

    /// Remaining room, or `None` when unbounded.
    #[must_use]
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.node_count()))
    }

    fn replace_root(&mut self, root: Vec<Node>) {
        self.root = Arc::from(root);
    }
}

/// Where a transferred node lands inside the target zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "at", content = "id", rename_all = "snake_case")]
pub enum Placement {
    /// Appended at root level.
    End,
    /// Immediately before this node, in whichever list holds it.
    Before(NodeId),
    /// Appended to this group's children.
    IntoGroup(NodeId),
}

/// How a successful transfer sourced its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    NewFromCatalog,
    SameContainer,
    CrossContainer,
}

/// Why a transfer was refused. The container set is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    UnknownContainer {
        container: ContainerId,
    },
    /// The id is in no container and does not name a catalog entry.
    NotPlaceable {
        id: NodeId,
    },
    CatalogEntryMissing {
        id: NodeId,
    },
    KindNotAccepted {
        container: ContainerId,
        kind: NodeKind,
    },
    CapacityExceeded {
        container: ContainerId,
        capacity: usize,
        required: usize,
    },
    TargetNotFound {
        container: ContainerId,
        target: NodeId,
    },
    TargetInsideSubtree {
        id: NodeId,
        target: NodeId,
    },
    AlreadyPresent {
        container: ContainerId,
        id: NodeId,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownContainer { container } => write!(f, "unknown container {container}"),
            Self::NotPlaceable { id } => {
                write!(f, "{id} is not placed anywhere and is not a catalog id")
            }
            Self::CatalogEntryMissing { id } => write!(f, "no catalog entry for {id}"),
            Self::KindNotAccepted { container, kind } => {
                write!(f, "container {container} does not accept {kind} nodes")
            }
            Self::CapacityExceeded {
                container,
                capacity,
                required,
            } => write!(
                f,
                "container {container} holds at most {capacity} node(s), transfer needs {required}"
            ),
            Self::TargetNotFound { container, target } => {
                write!(f, "target {target} not found in container {container}")
            }
            Self::TargetInsideSubtree { id, target } => {
                write!(f, "cannot place {id} relative to its own descendant {target}")
            }
            Self::AlreadyPresent { container, id } => {
                write!(f, "{id} already exists in container {container}")
            }
        }
    }
}

impl std::error::Error for RejectReason {}

/// Result of a coordinator transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Applied {
        containers: ContainerSet,
        kind: TransferKind,
        changed: bool,
    },
    Rejected(RejectReason),
}

impl TransferOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The resulting set, if applied.
    #[must_use]
    pub fn containers(&self) -> Option<&ContainerSet> {
        match self {
            Self::Applied { containers, .. } => Some(containers),
            Self::Rejected(_) => None,
        }
    }
}

/// Node detached by [`ContainerSet::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub containers: ContainerSet,
    pub from: ContainerId,
    pub node: Node,
}

/// Ordered collection of drop zones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerSet {
    containers: Vec<Container>,
}

impl ContainerSet {
    #[must_use]
    pub fn new(containers: Vec<Container>) -> Self {
        Self { containers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.iter().find(|c| &c.id == id)
    }

    fn position(&self, id: &ContainerId) -> Option<usize> {
        self.containers.iter().position(|c| &c.id == id)
    }

    /// First container, in declaration order, whose tree holds `id`.
    #[must_use]
    pub fn locate_container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.contains(id))
    }

    /// Union of every container's ids.
    #[must_use]
    pub fn collect_ids(&self) -> BTreeSet<NodeId> {
        self.containers
            .iter()
            .flat_map(|c| locate::collect_ids(c.root()))
            .collect()
    }

    /// True when both sets hold the same zones with pointer-identical trees.
    #[must_use]
    pub fn shares_roots(&self, other: &Self) -> bool {
        self.containers.len() == other.containers.len()
            && self
                .containers
                .iter()
                .zip(&other.containers)
                .all(|(a, b)| a.id == b.id && a.shares_root(b))
    }

    /// Ids of containers whose trees differ from `previous`, in declaration
    /// order.
    #[must_use]
    pub fn changed_since(&self, previous: &Self) -> Vec<ContainerId> {
        self.containers
            .iter()
            .filter(|c| {
                previous
                    .get(&c.id)
                    .is_none_or(|old| !old.shares_root(c) && old.root() != c.root())
            })
            .map(|c| c.id.clone())
            .collect()
    }

    fn with_root(&self, index: usize, root: Vec<Node>) -> Self {
        let mut next = self.clone();
        next.containers[index].replace_root(root);
        next
    }

    /// [`transfer_to`](Self::transfer_to) with the drop-onto-item /
    /// drop-onto-container shorthand: before `sibling` when given, else at
    /// the end.
    #[must_use]
    pub fn transfer(
        &self,
        catalog: &Catalog,
        id: &NodeId,
        target: &ContainerId,
        sibling: Option<&NodeId>,
    ) -> TransferOutcome {
        let placement = sibling.map_or(Placement::End, |s| Placement::Before(s.clone()));
        self.transfer_to(catalog, id, target, &placement)
    }

    /// Move `id` into `target` at `placement`.
    ///
    /// An id already placed somewhere is moved with its subtree; otherwise a
    /// fresh node is built from the catalog entry named by its composite id.
    #[must_use]
    pub fn transfer_to(
        &self,
        catalog: &Catalog,
        id: &NodeId,
        target: &ContainerId,
        placement: &Placement,
    ) -> TransferOutcome {
        match self.plan_transfer(catalog, id, target, placement) {
            Ok(outcome) => outcome,
            Err(reason) => {
                tracing::warn!(%id, %target, %reason, "transfer rejected");
                TransferOutcome::Rejected(reason)
            }
        }
    }

    fn plan_transfer(
        &self,
        catalog: &Catalog,
        id: &NodeId,
        target: &ContainerId,
        placement: &Placement,
    ) -> Result<TransferOutcome, RejectReason> {
        let target_index = self
            .position(target)
            .ok_or_else(|| RejectReason::UnknownContainer {
                container: target.clone(),
            })?;
        let target_zone = &self.containers[target_index];

        let source_index = self.containers.iter().position(|c| c.contains(id.as_str()));
        let node = match source_index {
            Some(index) => locate::find(self.containers[index].root(), id.as_str())
                .cloned()
                .ok_or_else(|| RejectReason::NotPlaceable { id: id.clone() })?,
            None => {
                let key = id
                    .catalog_key()
                    .ok_or_else(|| RejectReason::NotPlaceable { id: id.clone() })?;
                catalog
                    .node_for(&key)
                    .ok_or_else(|| RejectReason::CatalogEntryMissing { id: id.clone() })?
            }
        };
        let kind = match source_index {
            None => TransferKind::NewFromCatalog,
            Some(index) if index == target_index => TransferKind::SameContainer,
            Some(_) => TransferKind::CrossContainer,
        };
        let incoming = std::slice::from_ref(&node);

        if let Some(refused) = walk::iter(incoming).find(|n| !target_zone.accepts_kind(n.kind)) {
            return Err(RejectReason::KindNotAccepted {
                container: target.clone(),
                kind: refused.kind,
            });
        }

        match placement {
            Placement::End => {}
            Placement::Before(anchor) | Placement::IntoGroup(anchor) => {
                let found = match placement {
                    Placement::IntoGroup(_) => {
                        locate::group_path(target_zone.root(), anchor.as_str()).is_some()
                    }
                    _ => target_zone.contains(anchor.as_str()),
                };
                if !found {
                    return Err(RejectReason::TargetNotFound {
                        container: target.clone(),
                        target: anchor.clone(),
                    });
                }
                if kind == TransferKind::SameContainer && node.subtree_contains(anchor.as_str()) {
                    if anchor == id && matches!(placement, Placement::Before(_)) {
                        return Ok(TransferOutcome::Applied {
                            containers: self.clone(),
                            kind,
                            changed: false,
                        });
                    }
                    return Err(RejectReason::TargetInsideSubtree {
                        id: id.clone(),
                        target: anchor.clone(),
                    });
                }
            }
        }

        if kind != TransferKind::SameContainer {
            if let Some(clash) = walk::iter(incoming).find(|n| target_zone.contains(n.id.as_str()))
            {
                return Err(RejectReason::AlreadyPresent {
                    container: target.clone(),
                    id: clash.id.clone(),
                });
            }
            if let Some(capacity) = target_zone.capacity {
                let required = target_zone.node_count() + node.subtree_len();
                if required > capacity {
                    return Err(RejectReason::CapacityExceeded {
                        container: target.clone(),
                        capacity,
                        required,
                    });
                }
            }
        }

        let containers = match source_index {
            Some(index) if index == target_index => {
                let root = target_zone.root();
                let next = match placement {
                    Placement::End => {
                        let detached = mutate::remove_by_id(root, id.as_str());
                        mutate::insert_at_root(&detached.tree, node)
                    }
                    Placement::Before(anchor) => {
                        mutate::move_before(root, id.as_str(), anchor.as_str())
                    }
                    Placement::IntoGroup(group) => {
                        mutate::move_into_group(root, id.as_str(), group.as_str())
                    }
                };
                self.with_root(target_index, next)
            }
            Some(index) => {
                let detached = mutate::remove_by_id(self.containers[index].root(), id.as_str());
                let inserted = insert_with(target_zone.root(), placement, node);
                self.with_root(index, detached.tree)
                    .with_root(target_index, inserted)
            }
            None => {
                let inserted = insert_with(target_zone.root(), placement, node);
                self.with_root(target_index, inserted)
            }
        };

        let changed = !containers.changed_since(self).is_empty();
        tracing::debug!(%id, %target, ?kind, changed, "transfer applied");
        Ok(TransferOutcome::Applied {
            containers,
            kind,
            changed,
        })
    }

    /// Detach `id` from whichever container holds it.
    #[must_use]
    pub fn remove(&self, id: &str) -> Option<Detached> {
        let index = self.containers.iter().position(|c| c.contains(id))?;
        let removal = mutate::remove_by_id(self.containers[index].root(), id);
        let node = removal.removed?;
        Some(Detached {
            containers: self.with_root(index, removal.tree),
            from: self.containers[index].id.clone(),
            node,
        })
    }

    /// Empty one container. Unknown ids leave the set as is.
    #[must_use]
    pub fn clear(&self, container: &ContainerId) -> Self {
        match self.position(container) {
            Some(index) => self.with_root(index, Vec::new()),
            None => self.clone(),
        }
    }

    /// Apply one tree operation inside a single container.
    ///
    /// Inserts are subject to the zone's capacity and kind filter, and are
    /// refused when any incoming id is already placed in some container. A
    /// refused insert reports `changed == false`. Returns `None` for unknown
    /// containers.
    #[must_use]
    pub fn apply_operation(
        &self,
        container: &ContainerId,
        operation: &TreeOperation,
    ) -> Option<(Self, OperationOutcome)> {
        let index = self.position(container)?;
        let zone = &self.containers[index];
        let incoming = match operation {
            TreeOperation::InsertAtRoot { node }
            | TreeOperation::InsertIntoGroup { node, .. }
            | TreeOperation::InsertBefore { node, .. } => Some(node),
            _ => None,
        };
        if let Some(node) = incoming {
            let over_capacity = zone
                .capacity
                .is_some_and(|capacity| zone.node_count() + node.subtree_len() > capacity);
            let incoming = std::slice::from_ref(node);
            let refused_kind = walk::iter(incoming).any(|n| !zone.accepts_kind(n.kind));
            let placed = walk::iter(incoming)
                .any(|n| self.locate_container(n.id.as_str()).is_some());
            if over_capacity || refused_kind || placed {
                let hash = locate::state_hash(zone.root());
                return Some((
                    self.clone(),
                    OperationOutcome {
                        kind: operation.kind(),
                        tree: zone.root().to_vec(),
                        removed: None,
                        changed: false,
                        before_hash: hash,
                        after_hash: hash,
                    },
                ));
            }
        }
        let outcome = operation.apply(zone.root());
        let next = if outcome.changed {
            self.with_root(index, outcome.tree.clone())
        } else {
            self.clone()
        };
        Some((next, outcome))
    }
}

fn insert_with(root: &[Node], placement: &Placement, node: Node) -> Vec<Node> {
    match placement {
        Placement::End => mutate::insert_at_root(root, node),
        Placement::Before(anchor) => mutate::insert_at(root, anchor.as_str(), node),
        Placement::IntoGroup(group) => mutate::insert_into_group(root, group.as_str(), node),
    }
}
