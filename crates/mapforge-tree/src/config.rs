//! Drop-zone layout as data.
//!
//! [`OrganizerConfig`] declares the containers an organizer manages. It loads
//! from TOML or JSON; [`OrganizerConfig::default`] is the standard map layout
//! (a layer tree, a tool drawer, and two single-slot widget zones).
//!
//! ```toml
//! [[containers]]
//! id = "layers"
//! label = "Layer tree"
//! accepts = ["group", "layer"]
//!
//! [[containers]]
//! id = "widget_top"
//! label = "Top widget"
//! capacity = 1
//! accepts = ["tool"]
//! ```

use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::container::{Container, ContainerSet};
use crate::node::{ContainerId, NodeKind};

/// One declared drop zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<NodeKind>>,
}

impl ContainerConfig {
    fn new(id: &str, label: &str, capacity: Option<usize>, accepts: &[NodeKind]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            capacity,
            accepts: Some(accepts.to_vec()),
        }
    }

    /// Empty container with this zone's rules.
    #[must_use]
    pub fn to_container(&self) -> Container {
        let mut container = Container::new(ContainerId::new(self.id.clone()), self.label.clone());
        container.capacity = self.capacity;
        container.accepts.clone_from(&self.accepts);
        container
    }
}

/// Container layout for an organizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Zones in declaration order; order decides lookup priority and change
    /// notification order.
    pub containers: Vec<ContainerConfig>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            containers: vec![
                ContainerConfig::new(
                    "layers",
                    "Layer tree",
                    None,
                    &[NodeKind::Group, NodeKind::Layer],
                ),
                ContainerConfig::new("tools", "Tool drawer", None, &[NodeKind::Tool]),
                ContainerConfig::new("widget_top", "Top widget", Some(1), &[NodeKind::Tool]),
                ContainerConfig::new(
                    "widget_bottom",
                    "Bottom widget",
                    Some(1),
                    &[NodeKind::Tool],
                ),
            ],
        }
    }
}

impl OrganizerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Pick the loader from the file extension (`.json`, else TOML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Problems with this layout. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.containers.is_empty() {
            errors.push("at least one container is required".into());
        }
        let mut seen = FxHashSet::default();
        for (index, zone) in self.containers.iter().enumerate() {
            if zone.id.trim().is_empty() {
                errors.push(format!("containers[{index}].id must not be empty"));
            } else if zone.id == ContainerId::RESERVED_CATALOG {
                errors.push(format!(
                    "containers[{index}].id {:?} is reserved",
                    zone.id
                ));
            } else if zone.id.contains("::") {
                errors.push(format!(
                    "containers[{index}].id {:?} must not contain \"::\"",
                    zone.id
                ));
            } else if !seen.insert(zone.id.as_str()) {
                errors.push(format!("duplicate container id {:?}", zone.id));
            }
            if zone.capacity == Some(0) {
                errors.push(format!("containers[{index}].capacity must be > 0"));
            }
            if zone.accepts.as_ref().is_some_and(Vec::is_empty) {
                errors.push(format!(
                    "containers[{index}].accepts must list at least one kind"
                ));
            }
        }
        errors
    }

    /// Validate, then build the empty container set.
    pub fn container_set(&self) -> Result<ContainerSet, ConfigError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(ContainerSet::new(
            self.containers.iter().map(ContainerConfig::to_container).collect(),
        ))
    }

    #[must_use]
    pub fn zone(&self, id: &str) -> Option<&ContainerConfig> {
        self.containers.iter().find(|zone| zone.id == id)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
