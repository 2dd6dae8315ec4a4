//! Drag session state machine.
//!
//! ```text
//! Idle -> Dragging -> Idle                      (drop: committed, rejected, cancelled)
//!            \-----> AwaitingDecision -> Idle   (group onto group: resolve or cancel)
//! ```
//!
//! The session snapshots the [`ContainerSet`] when a gesture starts. Every
//! classification and candidate result is computed against that snapshot,
//! and cancelling hands it back unchanged. Because container trees are
//! shared behind `Arc`, the snapshot costs one reference bump per zone and a
//! rollback returns the very same allocations.
//!
//! Each step yields a [`DragTransition`] with a monotonically increasing
//! `transition_id`, suitable for deterministic replay logs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::container::{ContainerSet, Placement, RejectReason, TransferOutcome};
use crate::locate;
use crate::mutate::TreeOperation;
use crate::node::{COMPOSITE_SEPARATOR, ContainerId, ItemKeyError, NodeId, NodeKind};

/// Separator between origin and composite id in a drag key.
pub const ORIGIN_SEPARATOR: &str = "::";

/// Where a dragged item was picked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "from", content = "container", rename_all = "snake_case")]
pub enum DragOrigin {
    Catalog,
    Container(ContainerId),
}

impl fmt::Display for DragOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str(ContainerId::RESERVED_CATALOG),
            Self::Container(id) => write!(f, "{id}"),
        }
    }
}

/// Identity of the thing being dragged, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DragItem {
    pub origin: DragOrigin,
    pub id: NodeId,
    pub kind: NodeKind,
}

impl DragItem {
    #[must_use]
    pub fn new(origin: DragOrigin, id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            origin,
            id: id.into(),
            kind,
        }
    }

    /// Parse `<origin>::<kind>:<catalogId>`, where `<origin>` is `catalog`
    /// or a container id.
    pub fn parse(raw: &str) -> Result<Self, ItemKeyError> {
        if raw.is_empty() {
            return Err(ItemKeyError::Empty);
        }
        let (origin, composite) =
            raw.split_once(ORIGIN_SEPARATOR)
                .ok_or_else(|| ItemKeyError::MissingSeparator {
                    raw: raw.to_string(),
                })?;
        if origin.is_empty() {
            return Err(ItemKeyError::Empty);
        }
        let (kind, catalog_id) = composite.split_once(COMPOSITE_SEPARATOR).ok_or_else(|| {
            ItemKeyError::MissingSeparator {
                raw: raw.to_string(),
            }
        })?;
        let kind: NodeKind = kind.parse()?;
        if catalog_id.is_empty() {
            return Err(ItemKeyError::EmptyCatalogId {
                raw: raw.to_string(),
            });
        }
        let origin = if origin == ContainerId::RESERVED_CATALOG {
            DragOrigin::Catalog
        } else {
            DragOrigin::Container(ContainerId::new(origin))
        };
        Ok(Self {
            origin,
            id: NodeId::composite(kind, catalog_id),
            kind,
        })
    }
}

impl fmt::Display for DragItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ORIGIN_SEPARATOR}{}", self.origin, self.id)
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum DropTarget {
    /// A specific node inside a container.
    Node {
        container: ContainerId,
        node: NodeId,
    },
    /// The container itself rather than any of its nodes.
    ContainerRoot { container: ContainerId },
    /// Back onto the catalog list: removes a placed node.
    Catalog,
    Nothing,
}

/// How a drop was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropClassification {
    /// Sibling position change under the same parent.
    Reorder,
    /// Placed immediately before the target, in the target's list.
    ReorderAtTargetsLevel,
    InsertAsChildOfTarget,
    InsertAtContainerEnd,
    MoveToRootOfContainer,
    RemoveToCatalog,
}

/// Operator's answer to a [`PendingDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionChoice {
    Reorder,
    Nest,
}

impl DecisionChoice {
    #[must_use]
    pub const fn classification(self) -> DropClassification {
        match self {
            Self::Reorder => DropClassification::ReorderAtTargetsLevel,
            Self::Nest => DropClassification::InsertAsChildOfTarget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    NoTarget,
    DroppedOnSelf,
    TargetMissing,
    TargetInsideSubtree,
    /// Dropped on the catalog without having been placed.
    NotPlaced,
    /// Host cancel signal.
    External,
    Forced,
}

/// Group dropped onto group: both interpretations, computed up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDecision {
    pub item: DragItem,
    pub container: ContainerId,
    pub target: NodeId,
    /// Result of placing the item before the target.
    pub reorder: TransferOutcome,
    /// Result of appending the item to the target's children.
    pub nest: TransferOutcome,
}

impl PendingDecision {
    #[must_use]
    pub fn candidate(&self, choice: DecisionChoice) -> &TransferOutcome {
        match choice {
            DecisionChoice::Reorder => &self.reorder,
            DecisionChoice::Nest => &self.nest,
        }
    }
}

/// What the host should do after a drop, resolve, or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DropOutcome {
    Committed {
        item: DragItem,
        classification: DropClassification,
        containers: ContainerSet,
        /// Containers whose tree changed, in declaration order.
        changed: Vec<ContainerId>,
    },
    Pending(PendingDecision),
    Rejected {
        item: DragItem,
        reason: RejectReason,
        containers: ContainerSet,
    },
    Cancelled {
        reason: CancelReason,
        containers: ContainerSet,
    },
}

impl DropOutcome {
    /// Container set the host should show after this outcome. `None` while a
    /// decision is pending.
    #[must_use]
    pub fn containers(&self) -> Option<&ContainerSet> {
        match self {
            Self::Committed { containers, .. }
            | Self::Rejected { containers, .. }
            | Self::Cancelled { containers, .. } => Some(containers),
            Self::Pending(_) => None,
        }
    }

    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Lifecycle state, as reported in transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Dragging,
    AwaitingDecision,
}

/// Events that were safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    DragAlreadyInProgress,
    /// The item's origin tag disagrees with where the node actually is.
    OriginMismatch,
    DecisionPending,
    NoPendingDecision,
}

/// Hover-time guess at what a drop would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "preview", content = "value", rename_all = "snake_case")]
pub enum HoverPreview {
    Classified(DropClassification),
    NeedsDecision,
    Cancel(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Started {
        item: DragItem,
    },
    Hovered {
        target: DropTarget,
        preview: HoverPreview,
    },
    Dropped {
        classification: DropClassification,
    },
    Deferred {
        container: ContainerId,
        target: NodeId,
    },
    Resolved {
        choice: DecisionChoice,
        classification: DropClassification,
    },
    Rejected {
        reason: RejectReason,
    },
    Cancelled {
        reason: CancelReason,
    },
    Noop {
        reason: DragNoopReason,
    },
}

/// One state-machine step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

/// Transition plus the outcome, when the step ends (or defers) a gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropStep {
    pub transition: DragTransition,
    pub outcome: Option<DropOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Dragging {
        item: DragItem,
        snapshot: ContainerSet,
        hover: Option<DropTarget>,
    },
    AwaitingDecision {
        snapshot: ContainerSet,
        decision: PendingDecision,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DropPlan {
    Cancel(CancelReason),
    Remove,
    Reorder {
        container: ContainerId,
        index: usize,
    },
    Transfer {
        classification: DropClassification,
        container: ContainerId,
        placement: Placement,
    },
    Decide {
        container: ContainerId,
        target: NodeId,
    },
}

impl DropPlan {
    fn preview(&self) -> HoverPreview {
        match self {
            Self::Cancel(reason) => HoverPreview::Cancel(*reason),
            Self::Remove => HoverPreview::Classified(DropClassification::RemoveToCatalog),
            Self::Reorder { .. } => HoverPreview::Classified(DropClassification::Reorder),
            Self::Transfer { classification, .. } => HoverPreview::Classified(*classification),
            Self::Decide { .. } => HoverPreview::NeedsDecision,
        }
    }
}

/// Classify a drop against `containers`, in rule priority order.
fn plan_drop(item: &DragItem, target: &DropTarget, containers: &ContainerSet) -> DropPlan {
    let source = containers.locate_container(item.id.as_str());
    let dragged = source.and_then(|c| locate::find(c.root(), item.id.as_str()));
    match target {
        DropTarget::Nothing => DropPlan::Cancel(CancelReason::NoTarget),
        DropTarget::Catalog => match source {
            Some(_) => DropPlan::Remove,
            None => DropPlan::Cancel(CancelReason::NotPlaced),
        },
        DropTarget::ContainerRoot { container } => {
            if containers.get(container).is_none() {
                return DropPlan::Cancel(CancelReason::TargetMissing);
            }
            DropPlan::Transfer {
                classification: if source.is_some() {
                    DropClassification::MoveToRootOfContainer
                } else {
                    DropClassification::InsertAtContainerEnd
                },
                container: container.clone(),
                placement: Placement::End,
            }
        }
        DropTarget::Node { container, node } => {
            if *node == item.id {
                return DropPlan::Cancel(CancelReason::DroppedOnSelf);
            }
            let Some(target_zone) = containers.get(container) else {
                return DropPlan::Cancel(CancelReason::TargetMissing);
            };
            let Some(target_node) = locate::find(target_zone.root(), node.as_str()) else {
                return DropPlan::Cancel(CancelReason::TargetMissing);
            };
            let same_zone = source.is_some_and(|s| s.id == *container);
            if same_zone && dragged.is_some_and(|d| d.subtree_contains(node.as_str())) {
                return DropPlan::Cancel(CancelReason::TargetInsideSubtree);
            }

            if !target_node.is_group() && same_zone {
                let root = target_zone.root();
                if let (Some(from), Some(to)) = (
                    locate::find_parent_and_index(root, item.id.as_str()),
                    locate::find_parent_and_index(root, node.as_str()),
                ) {
                    let same_parent = match (from.parent, to.parent) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.id == b.id,
                        _ => false,
                    };
                    if same_parent {
                        return DropPlan::Reorder {
                            container: container.clone(),
                            index: to.index,
                        };
                    }
                }
            }

            if target_node.is_group() {
                let kind = dragged.map_or(item.kind, |d| d.kind);
                if kind == NodeKind::Group {
                    return DropPlan::Decide {
                        container: container.clone(),
                        target: node.clone(),
                    };
                }
                return DropPlan::Transfer {
                    classification: DropClassification::InsertAsChildOfTarget,
                    container: container.clone(),
                    placement: Placement::IntoGroup(node.clone()),
                };
            }

            DropPlan::Transfer {
                classification: DropClassification::ReorderAtTargetsLevel,
                container: container.clone(),
                placement: Placement::Before(node.clone()),
            }
        }
    }
}

/// Explicit per-gesture drag state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    phase: Phase,
    transition_counter: u64,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DragSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            transition_counter: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        match self.phase {
            Phase::Idle => DragState::Idle,
            Phase::Dragging { .. } => DragState::Dragging,
            Phase::AwaitingDecision { .. } => DragState::AwaitingDecision,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    #[must_use]
    pub fn item(&self) -> Option<&DragItem> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Dragging { item, .. } => Some(item),
            Phase::AwaitingDecision { decision, .. } => Some(&decision.item),
        }
    }

    /// Container set captured at gesture start.
    #[must_use]
    pub fn snapshot(&self) -> Option<&ContainerSet> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Dragging { snapshot, .. } | Phase::AwaitingDecision { snapshot, .. } => {
                Some(snapshot)
            }
        }
    }

    /// Last hovered target while dragging.
    #[must_use]
    pub fn hover_target(&self) -> Option<&DropTarget> {
        match &self.phase {
            Phase::Dragging { hover, .. } => hover.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingDecision> {
        match &self.phase {
            Phase::AwaitingDecision { decision, .. } => Some(decision),
            _ => None,
        }
    }

    #[must_use]
    pub const fn transition_count(&self) -> u64 {
        self.transition_counter
    }

    fn record(&mut self, from: DragState, effect: DragEffect) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        let transition = DragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state(),
            effect,
        };
        tracing::debug!(
            transition_id = transition.transition_id,
            from = ?transition.from,
            to = ?transition.to,
            effect = ?transition.effect,
            "drag transition"
        );
        transition
    }

    fn noop(&mut self, reason: DragNoopReason) -> DropStep {
        let from = self.state();
        DropStep {
            transition: self.record(from, DragEffect::Noop { reason }),
            outcome: None,
        }
    }

    /// Begin a gesture, snapshotting `containers`.
    ///
    /// The origin tag must agree with the set: a catalog item must not be
    /// placed yet, a container item must live in the named container.
    pub fn start(&mut self, item: DragItem, containers: &ContainerSet) -> DragTransition {
        if self.is_active() {
            return self.noop(DragNoopReason::DragAlreadyInProgress).transition;
        }
        let placed_in = containers
            .locate_container(item.id.as_str())
            .map(|c| &c.id);
        let consistent = match &item.origin {
            DragOrigin::Catalog => placed_in.is_none(),
            DragOrigin::Container(container) => placed_in == Some(container),
        };
        if !consistent {
            return self.noop(DragNoopReason::OriginMismatch).transition;
        }
        let from = self.state();
        self.phase = Phase::Dragging {
            item: item.clone(),
            snapshot: containers.clone(),
            hover: None,
        };
        self.record(from, DragEffect::Started { item })
    }

    /// Record the hovered target and preview its classification. Never
    /// mutates anything.
    pub fn hover(&mut self, target: DropTarget) -> DragTransition {
        let from = self.state();
        let preview = match &mut self.phase {
            Phase::Idle => return self.noop(DragNoopReason::IdleWithoutActiveDrag).transition,
            Phase::AwaitingDecision { .. } => {
                return self.noop(DragNoopReason::DecisionPending).transition;
            }
            Phase::Dragging {
                item,
                snapshot,
                hover,
            } => {
                let preview = plan_drop(item, &target, snapshot).preview();
                *hover = Some(target.clone());
                preview
            }
        };
        self.record(from, DragEffect::Hovered { target, preview })
    }

    /// End the gesture over `target`.
    pub fn drop_on(&mut self, target: &DropTarget, catalog: &Catalog) -> DropStep {
        let (item, snapshot) = match &self.phase {
            Phase::Idle => return self.noop(DragNoopReason::IdleWithoutActiveDrag),
            Phase::AwaitingDecision { .. } => return self.noop(DragNoopReason::DecisionPending),
            Phase::Dragging { item, snapshot, .. } => (item.clone(), snapshot.clone()),
        };
        let from = self.state();

        let applied = match plan_drop(&item, target, &snapshot) {
            DropPlan::Cancel(reason) => return self.finish_cancel(from, reason, snapshot),
            DropPlan::Decide {
                container,
                target: group,
            } => {
                let reorder = snapshot.transfer_to(
                    catalog,
                    &item.id,
                    &container,
                    &Placement::Before(group.clone()),
                );
                let nest = snapshot.transfer_to(
                    catalog,
                    &item.id,
                    &container,
                    &Placement::IntoGroup(group.clone()),
                );
                let decision = PendingDecision {
                    item,
                    container: container.clone(),
                    target: group.clone(),
                    reorder,
                    nest,
                };
                self.phase = Phase::AwaitingDecision {
                    snapshot,
                    decision: decision.clone(),
                };
                let transition = self.record(
                    from,
                    DragEffect::Deferred {
                        container,
                        target: group,
                    },
                );
                return DropStep {
                    transition,
                    outcome: Some(DropOutcome::Pending(decision)),
                };
            }
            DropPlan::Remove => snapshot
                .remove(item.id.as_str())
                .map(|detached| (DropClassification::RemoveToCatalog, detached.containers))
                .ok_or_else(|| RejectReason::NotPlaceable {
                    id: item.id.clone(),
                }),
            DropPlan::Reorder { container, index } => snapshot
                .apply_operation(
                    &container,
                    &TreeOperation::MoveToIndex {
                        id: item.id.clone(),
                        index,
                    },
                )
                .map(|(next, _)| (DropClassification::Reorder, next))
                .ok_or(RejectReason::UnknownContainer { container }),
            DropPlan::Transfer {
                classification,
                container,
                placement,
            } => match snapshot.transfer_to(catalog, &item.id, &container, &placement) {
                TransferOutcome::Applied { containers, .. } => Ok((classification, containers)),
                TransferOutcome::Rejected(reason) => Err(reason),
            },
        };

        match applied {
            Ok((classification, containers)) => self.finish_commit(
                from,
                item,
                classification,
                containers,
                &snapshot,
                DragEffect::Dropped { classification },
            ),
            Err(reason) => self.finish_reject(from, item, reason, snapshot),
        }
    }

    /// Settle a pending group-on-group drop.
    pub fn resolve(&mut self, choice: DecisionChoice) -> DropStep {
        let (snapshot, decision) = match &self.phase {
            Phase::AwaitingDecision { snapshot, decision } => (snapshot.clone(), decision.clone()),
            _ => return self.noop(DragNoopReason::NoPendingDecision),
        };
        let from = self.state();
        let classification = choice.classification();
        match decision.candidate(choice).clone() {
            TransferOutcome::Applied { containers, .. } => self.finish_commit(
                from,
                decision.item,
                classification,
                containers,
                &snapshot,
                DragEffect::Resolved {
                    choice,
                    classification,
                },
            ),
            TransferOutcome::Rejected(reason) => {
                self.finish_reject(from, decision.item, reason, snapshot)
            }
        }
    }

    /// Host cancel signal: the pre-gesture snapshot comes back unchanged.
    pub fn cancel(&mut self) -> DropStep {
        let Some(snapshot) = self.snapshot().cloned() else {
            return self.noop(DragNoopReason::IdleWithoutActiveDrag);
        };
        let from = self.state();
        self.finish_cancel(from, CancelReason::External, snapshot)
    }

    /// Reset to idle from any active state, returning the snapshot. `None`
    /// when already idle.
    pub fn force_cancel(&mut self) -> Option<(DragTransition, ContainerSet)> {
        let snapshot = self.snapshot().cloned()?;
        let from = self.state();
        self.phase = Phase::Idle;
        let transition = self.record(
            from,
            DragEffect::Cancelled {
                reason: CancelReason::Forced,
            },
        );
        Some((transition, snapshot))
    }

    fn finish_cancel(
        &mut self,
        from: DragState,
        reason: CancelReason,
        snapshot: ContainerSet,
    ) -> DropStep {
        self.phase = Phase::Idle;
        let transition = self.record(from, DragEffect::Cancelled { reason });
        DropStep {
            transition,
            outcome: Some(DropOutcome::Cancelled {
                reason,
                containers: snapshot,
            }),
        }
    }

    fn finish_reject(
        &mut self,
        from: DragState,
        item: DragItem,
        reason: RejectReason,
        snapshot: ContainerSet,
    ) -> DropStep {
        self.phase = Phase::Idle;
        let transition = self.record(
            from,
            DragEffect::Rejected {
                reason: reason.clone(),
            },
        );
        DropStep {
            transition,
            outcome: Some(DropOutcome::Rejected {
                item,
                reason,
                containers: snapshot,
            }),
        }
    }

    fn finish_commit(
        &mut self,
        from: DragState,
        item: DragItem,
        classification: DropClassification,
        containers: ContainerSet,
        snapshot: &ContainerSet,
        effect: DragEffect,
    ) -> DropStep {
        self.phase = Phase::Idle;
        let changed = containers.changed_since(snapshot);
        tracing::info!(
            item = %item,
            classification = ?classification,
            changed = changed.len(),
            "drop committed"
        );
        let transition = self.record(from, effect);
        DropStep {
            transition,
            outcome: Some(DropOutcome::Committed {
                item,
                classification,
                containers,
                changed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::container::Container;
    use crate::node::Node;

    fn catalog() -> Catalog {
        Catalog {
            layers: vec![CatalogEntry::new("1", "Roads")],
            groups: vec![CatalogEntry::new("5", "Basemaps")],
            tools: vec![CatalogEntry::new("T2", "Print")],
        }
    }

    fn tree_zone(root: Vec<Node>) -> ContainerSet {
        ContainerSet::new(vec![Container::new("tree", "Tree").with_root(root)])
    }

    fn on(node: &str) -> DropTarget {
        DropTarget::Node {
            container: "tree".into(),
            node: node.into(),
        }
    }

    fn placed(id: &str, kind: NodeKind) -> DragItem {
        DragItem::new(DragOrigin::Container("tree".into()), id, kind)
    }

    #[test]
    fn parse_drag_keys() {
        let item = DragItem::parse("catalog::layer:42").expect("valid key");
        assert_eq!(item.origin, DragOrigin::Catalog);
        assert_eq!(item.id.as_str(), "layer:42");
        assert_eq!(item.kind, NodeKind::Layer);
        assert_eq!(item.to_string(), "catalog::layer:42");

        let item = DragItem::parse("widget::tool:T1").expect("valid key");
        assert_eq!(item.origin, DragOrigin::Container("widget".into()));

        assert_eq!(DragItem::parse(""), Err(ItemKeyError::Empty));
        assert!(matches!(
            DragItem::parse("layer:1"),
            Err(ItemKeyError::MissingSeparator { .. })
        ));
        assert!(matches!(
            DragItem::parse("catalog::widget:1"),
            Err(ItemKeyError::UnknownKind { .. })
        ));
        assert!(matches!(
            DragItem::parse("catalog::layer:"),
            Err(ItemKeyError::EmptyCatalogId { .. })
        ));
    }

    #[test]
    fn group_on_group_defers_with_both_candidates() {
        let set = tree_zone(vec![
            Node::group("g1", "G1", vec![]),
            Node::group("g2", "G2", vec![]),
        ]);
        let mut session = DragSession::new();
        session.start(placed("g1", NodeKind::Group), &set);
        let step = session.drop_on(&on("g2"), &catalog());
        assert_eq!(step.transition.to, DragState::AwaitingDecision);
        let Some(DropOutcome::Pending(decision)) = step.outcome else {
            panic!("expected a pending decision");
        };
        assert!(decision.reorder.is_applied());
        assert!(decision.nest.is_applied());
        assert!(session.snapshot().is_some_and(|s| s.shares_roots(&set)));

        let step = session.resolve(DecisionChoice::Nest);
        let Some(DropOutcome::Committed { containers, .. }) = step.outcome else {
            panic!("expected commit");
        };
        let root = containers.get(&"tree".into()).expect("tree").root().to_vec();
        assert_eq!(
            root,
            vec![Node::group("g2", "G2", vec![Node::group("g1", "G1", vec![])])]
        );
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn same_parent_drop_is_array_move_reorder() {
        let set = tree_zone(vec![
            Node::layer("a", "A"),
            Node::layer("b", "B"),
            Node::layer("c", "C"),
        ]);
        let mut session = DragSession::new();
        session.start(placed("a", NodeKind::Layer), &set);
        let step = session.drop_on(&on("c"), &catalog());
        let Some(DropOutcome::Committed {
            classification,
            containers,
            changed,
            ..
        }) = step.outcome
        else {
            panic!("expected commit");
        };
        assert_eq!(classification, DropClassification::Reorder);
        assert_eq!(changed, vec![ContainerId::from("tree")]);
        let ids: Vec<_> = containers
            .get(&"tree".into())
            .expect("tree")
            .root()
            .iter()
            .map(|n| n.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn unknown_container_root_cancels_like_missing_node() {
        let set = tree_zone(vec![Node::layer("a", "A")]);
        let missing = DropTarget::ContainerRoot {
            container: "nowhere".into(),
        };
        let mut session = DragSession::new();
        session.start(placed("a", NodeKind::Layer), &set);
        let hover = session.hover(missing.clone());
        assert_eq!(
            hover.effect,
            DragEffect::Hovered {
                target: missing.clone(),
                preview: HoverPreview::Cancel(CancelReason::TargetMissing),
            }
        );
        let step = session.drop_on(&missing, &catalog());
        let Some(DropOutcome::Cancelled { reason, containers }) = step.outcome else {
            panic!("expected cancel");
        };
        assert_eq!(reason, CancelReason::TargetMissing);
        assert!(containers.shares_roots(&set));
        assert!(!session.is_active());
    }

    #[test]
    fn layer_onto_group_nests() {
        let set = tree_zone(vec![Node::group("g", "G", vec![])]);
        let mut session = DragSession::new();
        session.start(
            DragItem::new(DragOrigin::Catalog, "layer:1", NodeKind::Layer),
            &set,
        );
        let step = session.drop_on(&on("g"), &catalog());
        assert!(matches!(
            step.transition.effect,
            DragEffect::Dropped {
                classification: DropClassification::InsertAsChildOfTarget
            }
        ));
    }

    #[test]
    fn invalid_drops_roll_back_to_the_snapshot() {
        let set = tree_zone(vec![Node::group("g", "G", vec![Node::group("h", "H", vec![])])]);
        for target in [DropTarget::Nothing, on("g"), on("h"), on("ghost")] {
            let mut session = DragSession::new();
            session.start(placed("g", NodeKind::Group), &set);
            let step = session.drop_on(&target, &catalog());
            let Some(DropOutcome::Cancelled { containers, .. }) = step.outcome else {
                panic!("expected cancel for {target:?}");
            };
            assert!(containers.shares_roots(&set));
        }
    }

    #[test]
    fn hover_previews_without_mutating() {
        let set = tree_zone(vec![Node::group("g", "G", vec![])]);
        let mut session = DragSession::new();
        session.start(
            DragItem::new(DragOrigin::Catalog, "group:5", NodeKind::Group),
            &set,
        );
        let transition = session.hover(on("g"));
        assert_eq!(
            transition.effect,
            DragEffect::Hovered {
                target: on("g"),
                preview: HoverPreview::NeedsDecision,
            }
        );
        assert_eq!(session.hover_target(), Some(&on("g")));
        assert!(session.snapshot().is_some_and(|s| s.shares_roots(&set)));
    }

    #[test]
    fn origin_tag_must_match_placement() {
        let set = tree_zone(vec![Node::layer("layer:1", "Roads")]);
        let mut session = DragSession::new();
        let transition = session.start(
            DragItem::new(DragOrigin::Catalog, "layer:1", NodeKind::Layer),
            &set,
        );
        assert_eq!(
            transition.effect,
            DragEffect::Noop {
                reason: DragNoopReason::OriginMismatch
            }
        );
        assert!(!session.is_active());
    }

    #[test]
    fn idle_events_are_noops_and_ids_increase() {
        let mut session = DragSession::new();
        let first = session.drop_on(&DropTarget::Nothing, &catalog());
        let second = session.resolve(DecisionChoice::Reorder);
        assert!(first.outcome.is_none());
        assert!(matches!(second.transition.effect, DragEffect::Noop { .. }));
        assert!(second.transition.transition_id > first.transition.transition_id);
        assert!(session.force_cancel().is_none());
    }

    #[test]
    fn drag_back_to_catalog_removes() {
        let set = tree_zone(vec![Node::layer("layer:1", "Roads")]);
        let mut session = DragSession::new();
        session.start(placed("layer:1", NodeKind::Layer), &set);
        let step = session.drop_on(&DropTarget::Catalog, &catalog());
        let Some(DropOutcome::Committed { containers, .. }) = step.outcome else {
            panic!("expected commit");
        };
        assert!(containers.collect_ids().is_empty());
    }

    #[test]
    fn force_cancel_returns_snapshot_from_pending() {
        let set = tree_zone(vec![
            Node::group("g1", "G1", vec![]),
            Node::group("g2", "G2", vec![]),
        ]);
        let mut session = DragSession::new();
        session.start(placed("g1", NodeKind::Group), &set);
        session.drop_on(&on("g2"), &catalog());
        let (transition, snapshot) = session.force_cancel().expect("active");
        assert_eq!(transition.from, DragState::AwaitingDecision);
        assert!(snapshot.shares_roots(&set));
        assert_eq!(session.state(), DragState::Idle);
    }
}
