//! Fed CLI - Command line tool for the fedhost module-federation toolkit.
//!
//! Commands:
//! - `fed init` - Scaffold a federation descriptor
//! - `fed validate` - Validate the descriptor against the project
//! - `fed inspect` - Show the descriptor
//! - `fed emit` - Emit the host's entry manifest
//! - `fed probe` - Probe every declared remote's entry URL
//! - `fed serve` - Run the local development server

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{EmitArgs, InitArgs, InspectArgs, ProbeArgs, ServeArgs, ValidateArgs};

/// Fed CLI - Validate and serve module-federation host descriptors
#[derive(Parser)]
#[command(name = "fed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Descriptor file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a federation descriptor for a new host
    Init(InitArgs),

    /// Validate the descriptor against the project tree
    Validate(ValidateArgs),

    /// Show the descriptor
    Inspect(InspectArgs),

    /// Emit the host's entry manifest JSON
    Emit(EmitArgs),

    /// Probe every declared remote's entry URL
    Probe(ProbeArgs),

    /// Run the local development server
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Init(args) => commands::init::run(args, &ctx).await,
        Commands::Validate(args) => commands::validate::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
        Commands::Emit(args) => commands::emit::run(args, &ctx).await,
        Commands::Probe(args) => commands::probe::run(args, &ctx).await,
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
