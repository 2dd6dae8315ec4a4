use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::error::Result;
use crate::util::{load_workspace, write_json_file, write_json_line};

#[derive(Debug, Clone, Args)]
pub struct NormalizeArgs {
    /// Workspace snapshot (JSON).
    pub workspace: PathBuf,

    /// Write the normalized snapshot here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

/// Repair capability violations, then validate what is left.
pub fn normalize(args: &NormalizeArgs, out: &mut impl Write) -> Result<usize> {
    let mut snapshot = load_workspace(&args.workspace)?;
    let repaired = snapshot.normalize();
    snapshot.validate()?;
    match &args.output {
        Some(path) => {
            write_json_file(path, &snapshot)?;
            write_json_line(
                out,
                &json!({
                    "repaired": repaired,
                    "output": path.display().to_string(),
                    "state_hash": snapshot.state_hash(),
                }),
            )?;
        }
        None => {
            writeln!(out, "{}", snapshot.to_json_pretty()?)?;
        }
    }
    tracing::info!(workspace = %snapshot.name, repaired, "workspace normalized");
    Ok(repaired)
}

pub fn run_normalize(args: NormalizeArgs) -> Result<()> {
    normalize(&args, &mut std::io::stdout().lock()).map(|_| ())
}

#[cfg(test)]
mod tests {
    use mapforge_tree::{ContainerSnapshot, Node, WorkspaceSnapshot};

    use super::*;
    use crate::error::CliError;

    fn write_workspace(dir: &std::path::Path, snapshot: &WorkspaceSnapshot) -> PathBuf {
        let path = dir.join("workspace.json");
        write_json_file(&path, snapshot).expect("write workspace");
        path
    }

    fn zone(root: Vec<Node>) -> ContainerSnapshot {
        ContainerSnapshot {
            id: "layers".into(),
            label: "Layers".to_string(),
            capacity: None,
            accepts: None,
            root,
        }
    }

    #[test]
    fn repairs_are_written_to_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut group = Node::group("group:1", "Base", Vec::new());
        group.children = None;
        let snapshot = WorkspaceSnapshot {
            containers: vec![zone(vec![group])],
            ..WorkspaceSnapshot::new("demo")
        };
        let args = NormalizeArgs {
            workspace: write_workspace(dir.path(), &snapshot),
            output: Some(dir.path().join("out/normalized.json")),
        };
        let mut out = Vec::new();
        assert_eq!(normalize(&args, &mut out).expect("normalize"), 1);

        let written: WorkspaceSnapshot =
            crate::util::read_json(&dir.path().join("out/normalized.json")).expect("read");
        assert_eq!(written.containers[0].root[0].children, Some(Vec::new()));
        let line: serde_json::Value =
            serde_json::from_slice(&out).expect("summary line is JSON");
        assert_eq!(line["repaired"], 1);
    }

    #[test]
    fn duplicate_ids_survive_normalize_and_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = WorkspaceSnapshot {
            containers: vec![zone(vec![
                Node::layer("layer:1", "Roads"),
                Node::layer("layer:1", "Roads again"),
            ])],
            ..WorkspaceSnapshot::new("demo")
        };
        let args = NormalizeArgs {
            workspace: write_workspace(dir.path(), &snapshot),
            output: None,
        };
        let error = normalize(&args, &mut std::io::sink()).expect_err("duplicate id");
        assert!(matches!(error, CliError::Workspace(_)));
        assert_eq!(error.exit_code(), 2);
    }
}
