use std::path::{Path, PathBuf};

use clap::Args;
use mapforge_tree::{InvariantReport, WorkspaceSnapshot, audit};
use serde::Serialize;

use crate::error::{CliError, Result};
use crate::util::{load_workspace, write_json_line};

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Workspace snapshot (JSON).
    pub workspace: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerCheck {
    pub id: String,
    pub node_count: usize,
    pub report: InvariantReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub schema_version: u16,
    pub state_hash: u64,
    pub node_count: usize,
    pub containers: Vec<ContainerCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub valid: bool,
}

#[must_use]
pub fn check_snapshot(snapshot: &WorkspaceSnapshot) -> CheckReport {
    let containers: Vec<ContainerCheck> = snapshot
        .containers
        .iter()
        .map(|zone| {
            let report = audit(&zone.root);
            ContainerCheck {
                id: zone.id.to_string(),
                node_count: report.node_count,
                report,
            }
        })
        .collect();
    let error = snapshot.validate().err().map(|error| error.to_string());
    let valid = error.is_none() && containers.iter().all(|zone| zone.report.is_clean());
    CheckReport {
        name: snapshot.name.clone(),
        schema_version: snapshot.schema_version,
        state_hash: snapshot.state_hash(),
        node_count: snapshot.node_count(),
        containers,
        error,
        valid,
    }
}

pub fn check_path(path: &Path, out: &mut impl std::io::Write) -> Result<CheckReport> {
    let snapshot = load_workspace(path)?;
    let report = check_snapshot(&snapshot);
    write_json_line(out, &report)?;
    Ok(report)
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let report = check_path(&args.workspace, &mut std::io::stdout().lock())?;
    if report.valid {
        Ok(())
    } else {
        Err(CliError::exit(
            2,
            format!("workspace {:?} has invariant findings", report.name),
        ))
    }
}
