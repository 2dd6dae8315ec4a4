use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use mapforge_tree::{NodeKind, available, available_all};

use crate::error::Result;
use crate::util::{load_catalog, load_workspace, write_json_line};

#[derive(Debug, Clone, Args)]
pub struct AvailableArgs {
    #[arg(long)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub catalog: PathBuf,

    /// Only list one kind: `group`, `layer` or `tool`.
    #[arg(long)]
    pub kind: Option<NodeKind>,

    /// Case-insensitive name filter.
    #[arg(long, default_value = "")]
    pub search: String,
}

/// Print catalog entries not placed in any zone. Returns how many.
pub fn list_available(args: &AvailableArgs, out: &mut impl Write) -> Result<usize> {
    let containers = load_workspace(&args.workspace)?.into_container_set()?;
    let catalog = load_catalog(&args.catalog)?;
    let count = match args.kind {
        Some(kind) => {
            let entries = available(catalog.entries(kind), kind, &containers, &args.search);
            write_json_line(out, &entries)?;
            entries.len()
        }
        None => {
            let lists = available_all(&catalog, &containers, &args.search);
            write_json_line(out, &lists)?;
            lists.len()
        }
    };
    Ok(count)
}

pub fn run_available(args: AvailableArgs) -> Result<()> {
    list_available(&args, &mut std::io::stdout().lock()).map(|_| ())
}
