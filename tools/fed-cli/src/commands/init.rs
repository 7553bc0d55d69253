//! Scaffold a federation descriptor.

use anyhow::{bail, Result};
use fed_core::{DevServerConfig, HostDescriptor};

use super::InitArgs;
use crate::context::Context;

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join("federation.toml");
    if path.exists() && !args.force {
        bail!(
            "'{}' already exists; pass --force to overwrite",
            path.display()
        );
    }

    let descriptor = HostDescriptor::new(&args.name, &args.filename)
        .with_dev_server(DevServerConfig::new(args.port));

    let report = descriptor.validate();
    if !report.is_valid() {
        bail!("'{}' is not a valid federation identifier", args.name);
    }

    descriptor.save(&path)?;
    ctx.output
        .success(&format!("created {}", path.display()));
    ctx.output
        .info("declare remotes as `alias = \"name@http://host:port/remoteEntry.js\"` under [remotes]");
    Ok(())
}
