use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use mapforge_tree::{ConfigError, Organizer, OrganizerConfig};
use serde::Serialize;

use crate::error::Result;
use crate::script::{execute, load_script};
use crate::util::{load_catalog, load_workspace, write_json_file, write_json_line};

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    #[arg(long)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub catalog: PathBuf,

    /// JSON array of gesture steps.
    #[arg(long)]
    pub script: PathBuf,

    /// Zone rules (TOML or JSON) overlaid on the workspace before replay.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the final snapshot here.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

/// Last line of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub steps: usize,
    pub changed_steps: usize,
    pub active_drag: bool,
    pub state_hash: u64,
    pub node_count: usize,
}

/// Replay a gesture script and stream one JSON line per step, then a summary.
pub fn replay(args: &ReplayArgs, out: &mut impl Write) -> Result<ReplaySummary> {
    let mut snapshot = load_workspace(&args.workspace)?;
    if let Some(path) = &args.config {
        let config = OrganizerConfig::from_file(path)?;
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Validation(problems).into());
        }
        snapshot.apply_config(&config);
    }
    let name = snapshot.name.clone();
    let catalog = load_catalog(&args.catalog)?;
    let steps = load_script(&args.script)?;
    let mut organizer = Organizer::new(snapshot.into_container_set()?, catalog);

    let mut changed_steps = 0;
    for (index, step) in steps.iter().enumerate() {
        let report = execute(&mut organizer, index, step);
        if report
            .result
            .as_ref()
            .is_some_and(|result| !result.changed().is_empty())
        {
            changed_steps += 1;
        }
        write_json_line(out, &report)?;
    }

    let final_snapshot = organizer.snapshot(name);
    let summary = ReplaySummary {
        steps: steps.len(),
        changed_steps,
        active_drag: organizer.session().is_active(),
        state_hash: final_snapshot.state_hash(),
        node_count: final_snapshot.node_count(),
    };
    write_json_line(out, &summary)?;
    if let Some(path) = &args.output {
        write_json_file(path, &final_snapshot)?;
    }
    tracing::info!(
        steps = summary.steps,
        changed_steps,
        state_hash = summary.state_hash,
        "replay finished"
    );
    Ok(summary)
}

pub fn run_replay(args: ReplayArgs) -> Result<()> {
    replay(&args, &mut std::io::stdout().lock()).map(|_| ())
}
