#![forbid(unsafe_code)]

//! Typed tree organization for map layer, group, and tool drop zones.
//!
//! Layers bottom-up:
//!
//! - [`node`]: nodes, ids, and the capability table.
//! - [`walk`] / [`locate`]: one depth-first traversal and the read-only
//!   queries built on it.
//! - [`enforce`]: capability normalization and invariant audits.
//! - [`mutate`]: pure tree-to-tree mutations.
//! - [`container`]: several named zones sharing one uniqueness rule.
//! - [`catalog`]: the source catalog and its "still available" filter.
//! - [`session`]: the per-gesture drag state machine.
//! - [`organizer`]: the host facade tying it all together.
//!
//! Tree operations never fail. Missing targets are no-ops, structural
//! violations are normalized, and refusals come back as values
//! ([`RejectReason`], [`PendingDecision`]) rather than errors.

pub mod catalog;
pub mod config;
pub mod container;
pub mod enforce;
pub mod locate;
pub mod mutate;
pub mod node;
pub mod organizer;
pub mod session;
pub mod walk;
pub mod workspace;

pub use catalog::{AvailableCatalog, Catalog, CatalogEntry, available, available_all};
pub use config::{ConfigError, ContainerConfig, OrganizerConfig};
pub use container::{
    Container, ContainerSet, Detached, Placement, RejectReason, TransferKind, TransferOutcome,
};
pub use enforce::{
    InvariantCode, InvariantIssue, InvariantReport, InvariantSeverity, audit, enforce,
};
pub use mutate::{OperationKind, OperationOutcome, Removal, TreeOperation};
pub use node::{
    COMPOSITE_SEPARATOR, CatalogKey, Capabilities, ContainerId, ItemKeyError, Node, NodeId,
    NodeKind, capabilities,
};
pub use organizer::{ChangeSink, EditKind, LogSink, MutationResult, Organizer};
pub use session::{
    CancelReason, DecisionChoice, DragEffect, DragItem, DragNoopReason, DragOrigin, DragSession,
    DragState, DragTransition, DropClassification, DropOutcome, DropStep, DropTarget,
    HoverPreview, PendingDecision,
};
pub use walk::NodePath;
pub use workspace::{
    ContainerSnapshot, WORKSPACE_SCHEMA_VERSION, WorkspaceSnapshot, WorkspaceValidationError,
};
