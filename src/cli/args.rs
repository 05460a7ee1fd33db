//! Clap derive CLI surface: `Cli` wraps a global `--json` flag and a
//! `Commands` enum, one variant per subcommand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "swarm1", version, about = "DAG execution engine and capability router")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of human-readable tables.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, validate, and execute a graph.
    Run {
        graph: PathBuf,
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Reload durable state for `run_id` and continue.
    Resume {
        graph: PathBuf,
        run_id: String,
    },
    /// Load and validate a graph without executing it.
    Validate { graph: PathBuf },
    /// Run the capability router standalone and print the decision.
    Route {
        #[arg(long)]
        agent: String,
        #[arg(long, value_delimiter = ',')]
        cap: Vec<String>,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        consent: bool,
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        policy: PathBuf,
    },
    /// Print aggregated ledger totals.
    Spend {
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "runs")]
        artifact_root: PathBuf,
    },
}
