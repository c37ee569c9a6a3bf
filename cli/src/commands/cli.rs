use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wavesmith", version, about = "Dependency-aware parallel issue execution")]
pub struct Args {
    /// Configuration file; overrides ./wavesmith.toml and ~/.wavesmith/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// JSON manifest of work items.
    #[arg(long)]
    pub items: PathBuf,

    /// Shared repository; defaults to the current directory.
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// JSON manifest of work items.
    #[arg(long)]
    pub items: PathBuf,

    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Per-item time budget in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Shared repository; defaults to the current directory.
    #[arg(long)]
    pub repo: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the wave plan without executing anything.
    Plan(PlanArgs),
    Run(RunArgs),
    /// Continue from the persisted execution state.
    Resume(RunArgs),
}
