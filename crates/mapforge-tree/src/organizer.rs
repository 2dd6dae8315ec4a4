//! Host-facing facade over one container set and its drag session.
//!
//! [`Organizer`] is what a UI binds to: it turns raw drag keys into
//! [`DragItem`]s, feeds gestures through the [`DragSession`], swaps in the
//! resulting container set, and reports every committed change to a
//! [`ChangeSink`], once per changed container and in declaration order.
//! Rejected, cancelled, and pending results never reach the sink.

use std::fmt;

use serde::Serialize;

use crate::catalog::{self, AvailableCatalog, Catalog, CatalogEntry};
use crate::config::{ConfigError, OrganizerConfig};
use crate::container::{ContainerSet, RejectReason};
use crate::locate;
use crate::mutate::TreeOperation;
use crate::node::{ContainerId, ItemKeyError, Node, NodeKind};
use crate::session::{
    CancelReason, DecisionChoice, DragEffect, DragItem, DragNoopReason, DragOrigin, DragSession,
    DragTransition, DropClassification, DropOutcome, DropStep, DropTarget, ORIGIN_SEPARATOR,
    PendingDecision,
};
use crate::workspace::WorkspaceSnapshot;

/// Persistence callback for committed changes.
pub trait ChangeSink {
    fn on_change(&mut self, container: &ContainerId, tree: &[Node]);
}

impl<F> ChangeSink for F
where
    F: FnMut(&ContainerId, &[Node]),
{
    fn on_change(&mut self, container: &ContainerId, tree: &[Node]) {
        self(container, tree);
    }
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ChangeSink for LogSink {
    fn on_change(&mut self, container: &ContainerId, tree: &[Node]) {
        tracing::info!(
            %container,
            nodes = locate::node_count(tree),
            hash = locate::state_hash(tree),
            "container changed"
        );
    }
}

/// Direct edit issued outside a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    MoveUp,
    MoveDown,
    Remove,
    Clear,
}

/// What happened to the organizer's containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MutationResult {
    /// A drop was applied.
    Committed {
        classification: DropClassification,
        changed: Vec<ContainerId>,
    },
    /// A direct edit ran. `changed` is empty when it was a no-op.
    Applied {
        edit: EditKind,
        changed: Vec<ContainerId>,
    },
    /// Group onto group: call [`Organizer::resolve`].
    Pending(PendingDecision),
    Rejected {
        reason: RejectReason,
    },
    Cancelled {
        reason: CancelReason,
    },
    /// The event did not fit the session state.
    Ignored {
        reason: DragNoopReason,
    },
}

impl MutationResult {
    /// Containers whose trees changed.
    #[must_use]
    pub fn changed(&self) -> &[ContainerId] {
        match self {
            Self::Committed { changed, .. } | Self::Applied { changed, .. } => changed,
            _ => &[],
        }
    }
}

pub struct Organizer {
    containers: ContainerSet,
    catalog: Catalog,
    search: String,
    session: DragSession,
    last_transition: Option<DragTransition>,
    sink: Box<dyn ChangeSink>,
}

impl fmt::Debug for Organizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organizer")
            .field("containers", &self.containers)
            .field("catalog", &self.catalog)
            .field("search", &self.search)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Organizer {
    #[must_use]
    pub fn new(containers: ContainerSet, catalog: Catalog) -> Self {
        Self {
            containers,
            catalog,
            search: String::new(),
            session: DragSession::new(),
            last_transition: None,
            sink: Box::new(LogSink),
        }
    }

    /// Empty zones as declared by `config`.
    pub fn from_config(config: &OrganizerConfig, catalog: Catalog) -> Result<Self, ConfigError> {
        Ok(Self::new(config.container_set()?, catalog))
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl ChangeSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn containers(&self) -> &ContainerSet {
        &self.containers
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Replace the catalog snapshot with a fresh fetch.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    pub fn refresh_catalog(&mut self, kind: NodeKind, entries: Vec<CatalogEntry>) {
        self.catalog.replace(kind, entries);
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    #[must_use]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    #[must_use]
    pub fn last_transition(&self) -> Option<&DragTransition> {
        self.last_transition.as_ref()
    }

    /// Catalog entries of `kind` still free to drag, under the current
    /// search text.
    #[must_use]
    pub fn available(&self, kind: NodeKind) -> Vec<&CatalogEntry> {
        catalog::available(
            self.catalog.entries(kind),
            kind,
            &self.containers,
            &self.search,
        )
    }

    #[must_use]
    pub fn available_all(&self) -> AvailableCatalog<'_> {
        catalog::available_all(&self.catalog, &self.containers, &self.search)
    }

    #[must_use]
    pub fn can_move_up(&self, container: &ContainerId, id: &str) -> bool {
        self.containers
            .get(container)
            .is_some_and(|zone| locate::can_move_up(zone.root(), id))
    }

    #[must_use]
    pub fn can_move_down(&self, container: &ContainerId, id: &str) -> bool {
        self.containers
            .get(container)
            .is_some_and(|zone| locate::can_move_down(zone.root(), id))
    }

    #[must_use]
    pub fn snapshot(&self, name: impl Into<String>) -> WorkspaceSnapshot {
        WorkspaceSnapshot::from_container_set(name, &self.containers)
    }

    /// Turn a raw drag key into a [`DragItem`].
    ///
    /// Accepts `<origin>::<kind>:<catalogId>` keys, and falls back to looking
    /// up the part after `::` (or the whole string) as a placed node id, so
    /// nodes with non-composite ids can still be dragged. A supplied origin
    /// prefix is kept as given; [`DragSession::start`] checks it against
    /// where the node actually lives.
    pub fn resolve_item(&self, raw: &str) -> Result<DragItem, ItemKeyError> {
        let parsed = DragItem::parse(raw);
        if parsed.is_ok() {
            return parsed;
        }
        let (prefix, bare) = match raw.split_once(ORIGIN_SEPARATOR) {
            Some(("", _)) => return Err(ItemKeyError::Empty),
            Some((prefix, id)) => (Some(prefix), id),
            None => (None, raw),
        };
        let placed = self.containers.locate_container(bare).and_then(|zone| {
            locate::find(zone.root(), bare).map(|node| (zone.id.clone(), node.kind))
        });
        match placed {
            Some((zone, kind)) => {
                let origin = match prefix {
                    None => DragOrigin::Container(zone),
                    Some(ContainerId::RESERVED_CATALOG) => DragOrigin::Catalog,
                    Some(prefix) => DragOrigin::Container(ContainerId::new(prefix)),
                };
                Ok(DragItem::new(origin, bare, kind))
            }
            None if prefix.is_some() => parsed,
            None if raw.is_empty() => Err(ItemKeyError::Empty),
            None => Err(ItemKeyError::NotPlaced {
                id: raw.to_string(),
            }),
        }
    }

    pub fn on_drag_start(&mut self, raw: &str) -> Result<DragTransition, ItemKeyError> {
        let item = self.resolve_item(raw)?;
        let transition = self.session.start(item, &self.containers);
        self.last_transition = Some(transition.clone());
        Ok(transition)
    }

    pub fn on_drag_over(&mut self, target: DropTarget) -> DragTransition {
        let transition = self.session.hover(target);
        self.last_transition = Some(transition.clone());
        transition
    }

    pub fn on_drag_end(&mut self, target: &DropTarget) -> MutationResult {
        let step = self.session.drop_on(target, &self.catalog);
        self.settle(step)
    }

    pub fn resolve(&mut self, choice: DecisionChoice) -> MutationResult {
        let step = self.session.resolve(choice);
        self.settle(step)
    }

    pub fn cancel(&mut self) -> MutationResult {
        let step = self.session.cancel();
        self.settle(step)
    }

    pub fn move_up(&mut self, container: &ContainerId, id: &str) -> MutationResult {
        self.edit(
            container,
            EditKind::MoveUp,
            &TreeOperation::MoveUp { id: id.into() },
        )
    }

    pub fn move_down(&mut self, container: &ContainerId, id: &str) -> MutationResult {
        self.edit(
            container,
            EditKind::MoveDown,
            &TreeOperation::MoveDown { id: id.into() },
        )
    }

    /// Remove `id` from whichever container holds it.
    pub fn remove(&mut self, id: &str) -> MutationResult {
        if self.session.is_active() {
            return Self::busy();
        }
        let changed = match self.containers.remove(id) {
            Some(detached) => {
                let changed = vec![detached.from];
                self.commit(detached.containers, &changed);
                changed
            }
            None => Vec::new(),
        };
        MutationResult::Applied {
            edit: EditKind::Remove,
            changed,
        }
    }

    pub fn clear(&mut self, container: &ContainerId) -> MutationResult {
        if self.session.is_active() {
            return Self::busy();
        }
        if self.containers.get(container).is_none() {
            return MutationResult::Rejected {
                reason: RejectReason::UnknownContainer {
                    container: container.clone(),
                },
            };
        }
        let next = self.containers.clear(container);
        let changed = next.changed_since(&self.containers);
        self.commit(next, &changed);
        MutationResult::Applied {
            edit: EditKind::Clear,
            changed,
        }
    }

    fn busy() -> MutationResult {
        MutationResult::Ignored {
            reason: DragNoopReason::DragAlreadyInProgress,
        }
    }

    fn edit(
        &mut self,
        container: &ContainerId,
        edit: EditKind,
        operation: &TreeOperation,
    ) -> MutationResult {
        if self.session.is_active() {
            return Self::busy();
        }
        let Some((next, outcome)) = self.containers.apply_operation(container, operation) else {
            return MutationResult::Rejected {
                reason: RejectReason::UnknownContainer {
                    container: container.clone(),
                },
            };
        };
        let changed = if outcome.changed {
            vec![container.clone()]
        } else {
            Vec::new()
        };
        self.commit(next, &changed);
        MutationResult::Applied { edit, changed }
    }

    fn commit(&mut self, next: ContainerSet, changed: &[ContainerId]) {
        self.containers = next;
        for id in changed {
            if let Some(zone) = self.containers.get(id) {
                self.sink.on_change(id, zone.root());
            }
        }
    }

    fn settle(&mut self, step: DropStep) -> MutationResult {
        let DropStep {
            transition,
            outcome,
        } = step;
        let result = match outcome {
            None => MutationResult::Ignored {
                reason: match transition.effect {
                    DragEffect::Noop { reason } => reason,
                    _ => DragNoopReason::IdleWithoutActiveDrag,
                },
            },
            Some(DropOutcome::Committed {
                classification,
                containers,
                changed,
                ..
            }) => {
                self.commit(containers, &changed);
                MutationResult::Committed {
                    classification,
                    changed,
                }
            }
            Some(DropOutcome::Pending(decision)) => MutationResult::Pending(decision),
            Some(DropOutcome::Rejected {
                reason, containers, ..
            }) => {
                self.containers = containers;
                MutationResult::Rejected { reason }
            }
            Some(DropOutcome::Cancelled { reason, containers }) => {
                self.containers = containers;
                MutationResult::Cancelled { reason }
            }
        };
        self.last_transition = Some(transition);
        result
    }
}
