//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// wheel-stub - A build backend that redirects installs to a third-party index
#[derive(Parser)]
#[command(name = "wheel-stub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a stub sdist from a wheel (PEP 517 `build_sdist`)
    BuildSdist(BuildSdistArgs),

    /// Fetch the real wheel for an unpacked stub sdist (PEP 517 `build_wheel`)
    BuildWheel(BuildWheelArgs),

    /// Show how a wheel would be turned into a stub
    Inspect(InspectArgs),

    /// Show the CUDA driver and runtime versions reported by nvidia-smi
    CudaInfo,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildSdistArgs {
    /// Directory to write the sdist into
    pub sdist_dir: PathBuf,

    /// Project directory containing pyproject.toml
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Hook setting, e.g. `-C source_wheel=dist/foo-1.0-py3-none-any.whl`
    #[arg(short = 'C', long = "config-setting", value_name = "KEY=VALUE")]
    pub config_settings: Vec<String>,

    /// Timestamp applied to every archive entry
    #[arg(long, env = "SOURCE_DATE_EPOCH", value_name = "SECONDS")]
    pub source_date_epoch: Option<String>,
}

#[derive(Args)]
pub struct BuildWheelArgs {
    /// Directory to write the wheel into
    pub wheel_dir: PathBuf,

    /// Unpacked stub sdist containing PKG-INFO and pyproject.toml
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Hook setting (accepted for frontend compatibility)
    #[arg(short = 'C', long = "config-setting", value_name = "KEY=VALUE")]
    pub config_settings: Vec<String>,

    /// Index to fetch from instead of the configured index_url
    #[arg(long, env = "WHEEL_STUB_PIP_INDEX_URL", value_name = "URL")]
    pub index_url: Option<String>,

    /// Python interpreter the wheel is being installed into
    #[arg(long, env = "WHEEL_STUB_PYTHON", value_name = "PATH")]
    pub python: Option<String>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Path to a .whl file
    pub wheel: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
