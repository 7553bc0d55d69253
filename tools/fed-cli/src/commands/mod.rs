//! CLI command implementations.

pub mod emit;
pub mod init;
pub mod inspect;
pub mod probe;
pub mod serve;
pub mod validate;

use clap::Args;

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Host name for the new descriptor.
    #[arg(default_value = "host")]
    pub name: String,

    /// Entry filename to publish.
    #[arg(short, long, default_value = "remoteEntry.js")]
    pub filename: String,

    /// Dev server port.
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Overwrite an existing descriptor.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Project root for the expose-path check (default: descriptor directory).
    #[arg(long)]
    pub project_root: Option<String>,

    /// Source directory for the import-alias scan (default: <project-root>/src).
    #[arg(long)]
    pub src: Option<String>,

    /// Skip the import-alias cross-reference scan.
    #[arg(long)]
    pub no_scan: bool,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {}

/// Arguments for the probe command.
#[derive(Args)]
pub struct ProbeArgs {
    /// Per-attempt timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Retries per remote after the initial attempt.
    #[arg(long, default_value_t = 1)]
    pub retries: u32,
}

/// Arguments for the emit command.
#[derive(Args)]
pub struct EmitArgs {
    /// Write the manifest to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<String>,
}

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Override the descriptor's dev server port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory exposed module sources are served from.
    #[arg(long, default_value = ".")]
    pub asset_root: String,
}
