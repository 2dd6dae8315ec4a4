use std::io::{IsTerminal, Write};
use std::path::Path;

use mapforge_tree::{Catalog, WorkspaceSnapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CliError, Result};

/// Env var that forces machine-readable error output.
pub const OUTPUT_ENV: &str = "MAPFORGE_OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    /// `MAPFORGE_OUTPUT=json|text` wins; otherwise JSON when stderr is not a
    /// terminal.
    #[must_use]
    pub fn detect() -> Self {
        match std::env::var(OUTPUT_ENV).ok().as_deref() {
            Some("json") => Self::Json,
            Some("text") => Self::Text,
            _ if std::io::stderr().is_terminal() => Self::Text,
            _ => Self::Json,
        }
    }

    #[must_use]
    pub fn should_emit_json(self) -> bool {
        self == Self::Json
    }
}

pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    require_file(path)?;
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn load_workspace(path: &Path) -> Result<WorkspaceSnapshot> {
    let snapshot: WorkspaceSnapshot = read_json(path)?;
    tracing::debug!(
        path = %path.display(),
        name = %snapshot.name,
        containers = snapshot.containers.len(),
        "workspace loaded"
    );
    Ok(snapshot)
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    read_json(path)
}

/// Pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

/// One compact JSON value per line.
pub fn write_json_line<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}
