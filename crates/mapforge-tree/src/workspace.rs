//! Persisted workspace schema with versioning.
//!
//! A [`WorkspaceSnapshot`] is the stable JSON form of a container set: zone
//! metadata plus each zone's tree. Loaders reject unknown schema versions;
//! additive data rides in `extensions` without a version bump.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::config::OrganizerConfig;
use crate::container::{Container, ContainerSet};
use crate::enforce::{self, InvariantCode};
use crate::locate;
use crate::node::{ContainerId, Node, NodeId, NodeKind};
use crate::session::ORIGIN_SEPARATOR;
use crate::walk;

/// Current workspace schema version.
pub const WORKSPACE_SCHEMA_VERSION: u16 = 1;

fn default_workspace_version() -> u16 {
    WORKSPACE_SCHEMA_VERSION
}

/// One persisted zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<NodeKind>>,
    #[serde(default)]
    pub root: Vec<Node>,
}

impl From<&Container> for ContainerSnapshot {
    fn from(container: &Container) -> Self {
        Self {
            id: container.id.clone(),
            label: container.label.clone(),
            capacity: container.capacity,
            accepts: container.accepts.clone(),
            root: container.root().to_vec(),
        }
    }
}

/// Persisted organizer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default = "default_workspace_version")]
    pub schema_version: u16,
    pub name: String,
    #[serde(default)]
    pub containers: Vec<ContainerSnapshot>,
    /// Forward-compatible extension bag.
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

impl WorkspaceSnapshot {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_version: WORKSPACE_SCHEMA_VERSION,
            name: name.into(),
            containers: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Capture a live container set.
    #[must_use]
    pub fn from_container_set(name: impl Into<String>, containers: &ContainerSet) -> Self {
        Self {
            containers: containers.iter().map(ContainerSnapshot::from).collect(),
            ..Self::new(name)
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the schema version and cross-container invariants.
    ///
    /// Capability violations are not errors here; they are repaired by
    /// [`normalize`](Self::normalize) and on
    /// [`into_container_set`](Self::into_container_set).
    pub fn validate(&self) -> Result<(), WorkspaceValidationError> {
        if self.schema_version != WORKSPACE_SCHEMA_VERSION {
            return Err(WorkspaceValidationError::UnsupportedVersion {
                found: self.schema_version,
                expected: WORKSPACE_SCHEMA_VERSION,
            });
        }
        if self.name.trim().is_empty() {
            return Err(WorkspaceValidationError::EmptyWorkspaceName);
        }

        let mut zones = FxHashSet::default();
        let mut owners: FxHashMap<NodeId, &ContainerId> = FxHashMap::default();
        for zone in &self.containers {
            if zone.id.as_str() == ContainerId::RESERVED_CATALOG {
                return Err(WorkspaceValidationError::ReservedContainerId);
            }
            if zone.id.as_str().is_empty() || zone.id.as_str().contains(ORIGIN_SEPARATOR) {
                return Err(WorkspaceValidationError::InvalidContainerId {
                    container: zone.id.clone(),
                });
            }
            if !zones.insert(&zone.id) {
                return Err(WorkspaceValidationError::DuplicateContainer {
                    container: zone.id.clone(),
                });
            }

            let report = enforce::audit(&zone.root);
            if let Some(issue) = report
                .issues
                .iter()
                .find(|issue| issue.code == InvariantCode::DuplicateId)
            {
                return Err(WorkspaceValidationError::DuplicateNode {
                    container: zone.id.clone(),
                    id: issue.node_id.clone(),
                });
            }

            if let Some(capacity) = zone.capacity {
                let count = locate::node_count(&zone.root);
                if count > capacity {
                    return Err(WorkspaceValidationError::OverCapacity {
                        container: zone.id.clone(),
                        capacity,
                        count,
                    });
                }
            }

            let refused = zone.accepts.as_ref().and_then(|accepts| {
                walk::iter(&zone.root).find(|node| !accepts.contains(&node.kind))
            });
            if let Some(node) = refused {
                return Err(WorkspaceValidationError::KindNotAccepted {
                    container: zone.id.clone(),
                    id: node.id.clone(),
                    kind: node.kind,
                });
            }

            for node in walk::iter(&zone.root) {
                if node.id.catalog_key().is_none() {
                    continue;
                }
                if let Some(first) = owners.insert(node.id.clone(), &zone.id) {
                    return Err(WorkspaceValidationError::SharedCatalogEntry {
                        id: node.id.clone(),
                        first: first.clone(),
                        second: zone.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the rule enforcer over every tree. Returns how many capability
    /// violations were repaired.
    pub fn normalize(&mut self) -> usize {
        let mut repaired = 0;
        for zone in &mut self.containers {
            repaired += enforce::audit(&zone.root)
                .issues
                .iter()
                .filter(|issue| issue.repairable)
                .count();
            enforce::enforce_in_place(&mut zone.root);
        }
        if repaired > 0 {
            tracing::debug!(workspace = %self.name, repaired, "workspace normalized");
        }
        repaired
    }

    /// Overlay zone rules from `config`. Matching zones take the configured
    /// label, capacity and accepted kinds; configured zones missing from the
    /// snapshot are appended empty. Trees are left untouched.
    pub fn apply_config(&mut self, config: &OrganizerConfig) {
        for zone_config in &config.containers {
            match self
                .containers
                .iter_mut()
                .find(|zone| zone.id.as_str() == zone_config.id)
            {
                Some(zone) => {
                    zone.label.clone_from(&zone_config.label);
                    zone.capacity = zone_config.capacity;
                    zone.accepts.clone_from(&zone_config.accepts);
                }
                None => self
                    .containers
                    .push(ContainerSnapshot::from(&zone_config.to_container())),
            }
        }
    }

    /// Validate, then build live containers with normalized trees.
    pub fn into_container_set(self) -> Result<ContainerSet, WorkspaceValidationError> {
        self.validate()?;
        Ok(ContainerSet::new(
            self.containers
                .into_iter()
                .map(|zone| {
                    let mut container = Container::new(zone.id, zone.label).with_root(zone.root);
                    container.capacity = zone.capacity;
                    container.accepts = zone.accepts;
                    container
                })
                .collect(),
        ))
    }

    /// Deterministic hash for state diagnostics.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.schema_version.hash(&mut hasher);
        self.name.hash(&mut hasher);
        for zone in &self.containers {
            zone.id.hash(&mut hasher);
            zone.capacity.hash(&mut hasher);
            zone.accepts.hash(&mut hasher);
            locate::state_hash(&zone.root).hash(&mut hasher);
        }
        for (k, v) in &self.extensions {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Total nodes across all zones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.containers
            .iter()
            .map(|zone| locate::node_count(&zone.root))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceValidationError {
    UnsupportedVersion { found: u16, expected: u16 },
    EmptyWorkspaceName,
    ReservedContainerId,
    /// Empty, or contains the origin separator used in item keys.
    InvalidContainerId { container: ContainerId },
    DuplicateContainer { container: ContainerId },
    DuplicateNode { container: ContainerId, id: NodeId },
    OverCapacity {
        container: ContainerId,
        capacity: usize,
        count: usize,
    },
    KindNotAccepted {
        container: ContainerId,
        id: NodeId,
        kind: NodeKind,
    },
    /// One catalog entry placed in two zones.
    SharedCatalogEntry {
        id: NodeId,
        first: ContainerId,
        second: ContainerId,
    },
}

impl fmt::Display for WorkspaceValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "unsupported workspace schema version {found} (expected {expected})"
            ),
            Self::EmptyWorkspaceName => write!(f, "workspace name must not be empty"),
            Self::ReservedContainerId => write!(
                f,
                "container id {:?} is reserved",
                ContainerId::RESERVED_CATALOG
            ),
            Self::InvalidContainerId { container } => write!(
                f,
                "container id {:?} must be non-empty and must not contain {ORIGIN_SEPARATOR:?}",
                container.as_str()
            ),
            Self::DuplicateContainer { container } => {
                write!(f, "container {container} is declared twice")
            }
            Self::DuplicateNode { container, id } => {
                write!(f, "node {id} appears twice in container {container}")
            }
            Self::OverCapacity {
                container,
                capacity,
                count,
            } => write!(
                f,
                "container {container} holds {count} node(s), capacity is {capacity}"
            ),
            Self::KindNotAccepted {
                container,
                id,
                kind,
            } => write!(f, "container {container} does not accept {kind} node {id}"),
            Self::SharedCatalogEntry { id, first, second } => {
                write!(f, "{id} is placed in both {first} and {second}")
            }
        }
    }
}

impl std::error::Error for WorkspaceValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, root: Vec<Node>) -> ContainerSnapshot {
        ContainerSnapshot {
            id: id.into(),
            label: id.to_uppercase(),
            capacity: None,
            accepts: None,
            root,
        }
    }

    fn sample() -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            containers: vec![
                zone(
                    "layers",
                    vec![Node::group(
                        "group:1",
                        "Base",
                        vec![Node::layer("layer:1", "Roads")],
                    )],
                ),
                zone("tools", vec![Node::tool("tool:T1", "Measure")]),
            ],
            ..WorkspaceSnapshot::new("demo")
        }
    }

    #[test]
    fn sample_validates_and_round_trips() {
        let snapshot = sample();
        assert_eq!(snapshot.validate(), Ok(()));
        let json = snapshot.to_json_pretty().expect("serialize");
        let parsed = WorkspaceSnapshot::from_json_str(&json).expect("parse");
        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.state_hash(), snapshot.state_hash());
        assert!(!json.contains("\"children\": null"));
    }

    #[test]
    fn version_is_checked() {
        let mut snapshot = sample();
        snapshot.schema_version = 99;
        assert_eq!(
            snapshot.validate(),
            Err(WorkspaceValidationError::UnsupportedVersion {
                found: 99,
                expected: WORKSPACE_SCHEMA_VERSION,
            })
        );
    }

    #[test]
    fn catalog_entry_in_two_zones_is_rejected() {
        let mut snapshot = sample();
        snapshot.containers[1].root.push(Node::layer("layer:1", "Roads"));
        assert!(matches!(
            snapshot.validate(),
            Err(WorkspaceValidationError::SharedCatalogEntry { .. })
        ));
    }

    #[test]
    fn duplicate_zone_and_node_are_rejected() {
        let mut snapshot = sample();
        snapshot.containers.push(zone("tools", vec![]));
        assert!(matches!(
            snapshot.validate(),
            Err(WorkspaceValidationError::DuplicateContainer { .. })
        ));

        let mut snapshot = sample();
        snapshot.containers[0].root.push(Node::layer("layer:1", "Again"));
        assert!(matches!(
            snapshot.validate(),
            Err(WorkspaceValidationError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn zone_rules_and_container_ids_are_checked() {
        let mut snapshot = sample();
        snapshot.containers[1].accepts = Some(vec![NodeKind::Tool]);
        snapshot.containers[1].root.push(Node::layer("layer:7", "Stray"));
        assert_eq!(
            snapshot.validate(),
            Err(WorkspaceValidationError::KindNotAccepted {
                container: "tools".into(),
                id: "layer:7".into(),
                kind: NodeKind::Layer,
            })
        );
        assert!(snapshot.into_container_set().is_err());

        let mut snapshot = sample();
        snapshot.containers[0].accepts = Some(vec![NodeKind::Group]);
        assert_eq!(
            snapshot.validate(),
            Err(WorkspaceValidationError::KindNotAccepted {
                container: "layers".into(),
                id: "layer:1".into(),
                kind: NodeKind::Layer,
            })
        );

        let mut snapshot = sample();
        snapshot.containers.push(zone("a::b", vec![]));
        assert_eq!(
            snapshot.validate(),
            Err(WorkspaceValidationError::InvalidContainerId {
                container: "a::b".into()
            })
        );
    }

    #[test]
    fn normalize_repairs_leaf_children() {
        let mut snapshot = sample();
        let mut bad = Node::layer("layer:9", "Bad");
        bad.children = Some(vec![Node::layer("layer:10", "Orphan")]);
        snapshot.containers[1].root.push(bad);
        assert_eq!(snapshot.normalize(), 1);
        assert_eq!(snapshot.normalize(), 0);
        assert_eq!(snapshot.containers[1].root[1].children, None);
    }

    #[test]
    fn container_set_round_trip() {
        let set = sample().into_container_set().expect("valid");
        let back = WorkspaceSnapshot::from_container_set("demo", &set);
        assert_eq!(back, sample());
        assert_eq!(back.node_count(), 3);
    }

    #[test]
    fn config_overlays_zone_rules() {
        let mut snapshot = sample();
        snapshot.apply_config(&OrganizerConfig::default());
        let tools = snapshot
            .containers
            .iter()
            .find(|zone| zone.id.as_str() == "tools")
            .expect("tools zone");
        assert_eq!(tools.accepts, Some(vec![NodeKind::Tool]));
        assert!(
            snapshot
                .containers
                .iter()
                .any(|zone| zone.id.as_str() == "widget_top" && zone.capacity == Some(1))
        );
        assert_eq!(snapshot.node_count(), 3);
        assert!(snapshot.validate().is_ok());
    }
}
