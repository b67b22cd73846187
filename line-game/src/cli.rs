//! Command-line flags of the launcher.

use std::path::PathBuf;

use clap::Parser;
use line_core::Perspective;

/// The Line: a border journey told from both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "the-line", version, about)]
pub struct CliArgs {
    /// Debug logging (RUST_LOG still wins)
    #[arg(long)]
    pub debug: bool,

    /// Do not print the introduction
    #[arg(long)]
    pub skip_intro: bool,

    /// TOML config (default: built-in settings)
    #[arg(long, env = "THE_LINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fixed RNG seed (default: clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the perspective prompt: migrant or patrol
    #[arg(long)]
    pub perspective: Option<Perspective>,

    /// Resume the journey saved in this slot
    #[arg(long, value_name = "SLOT")]
    pub load: Option<String>,
}
