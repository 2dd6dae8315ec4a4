use clap::{ArgAction, Parser, Subcommand};

use crate::available::{AvailableArgs, run_available};
use crate::check::{CheckArgs, run_check};
use crate::error::Result;
use crate::logging;
use crate::normalize::{NormalizeArgs, run_normalize};
use crate::replay::{ReplayArgs, run_replay};

#[derive(Debug, Parser)]
#[command(
    name = "mapforge",
    about = "Inspect, repair and replay map layer/tool workspaces",
    version
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a workspace and audit every container tree.
    Check(CheckArgs),

    /// Repair capability violations in a workspace.
    Normalize(NormalizeArgs),

    /// List catalog entries not placed in any container.
    Available(AvailableArgs),

    /// Replay a scripted drag/edit session against a workspace.
    Replay(ReplayArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Normalize(args) => run_normalize(args),
        Commands::Available(args) => run_available(args),
        Commands::Replay(args) => run_replay(args),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::check::CheckArgs;
    use crate::error::CliError;
    use crate::replay::ReplayArgs;

    use super::{Cli, Commands, run};

    #[test]
    fn check_reports_missing_workspace() {
        let missing = PathBuf::from("/tmp/mapforge/does-not-exist/workspace.json");
        let result = run(Cli {
            verbose: 0,
            command: Commands::Check(CheckArgs {
                workspace: missing.clone(),
            }),
        });
        match result {
            Err(CliError::MissingPath { path }) => assert_eq!(path, missing),
            other => panic!("expected MissingPath, got {other:?}"),
        }
    }

    #[test]
    fn replay_reports_missing_script_inputs() {
        let result = run(Cli {
            verbose: 0,
            command: Commands::Replay(ReplayArgs {
                workspace: PathBuf::from("/tmp/mapforge/missing-ws.json"),
                catalog: PathBuf::from("/tmp/mapforge/missing-cat.json"),
                script: PathBuf::from("/tmp/mapforge/missing-script.json"),
                config: None,
                output: None,
            }),
        });
        assert!(matches!(result, Err(CliError::MissingPath { .. })));
    }

    #[test]
    fn arguments_parse() {
        let cli = Cli::try_parse_from([
            "mapforge",
            "-vv",
            "available",
            "--workspace",
            "ws.json",
            "--catalog",
            "cat.json",
            "--kind",
            "tool",
        ])
        .expect("valid arguments");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Available(args) => {
                assert_eq!(args.kind, Some(mapforge_tree::NodeKind::Tool));
                assert_eq!(args.search, "");
            }
            other => panic!("expected available, got {other:?}"),
        }

        let unknown_kind = Cli::try_parse_from([
            "mapforge",
            "available",
            "--workspace",
            "a",
            "--catalog",
            "b",
            "--kind",
            "widget",
        ]);
        assert!(unknown_kind.is_err());
    }
}
