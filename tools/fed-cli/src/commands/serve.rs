//! Run the local development server.

use anyhow::{Context as _, Result};
use fed_devserver::DevServer;
use tokio_util::sync::CancellationToken;

use super::ServeArgs;
use crate::context::Context;

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let (mut descriptor, _) = ctx.require_descriptor()?;

    if let Some(port) = args.port {
        let dev = descriptor
            .dev_server
            .get_or_insert_with(|| fed_core::DevServerConfig::new(port));
        dev.port = port;
    }

    let port = descriptor
        .dev_server
        .as_ref()
        .map(|d| d.port)
        .unwrap_or_default();
    let server = DevServer::dev(descriptor)
        .context("descriptor has no dev_server settings; pass --port")?
        .with_asset_root(ctx.resolve_path(&args.asset_root));

    ctx.output
        .info(&format!("serving on http://127.0.0.1:{} (ctrl-c to stop)", port));

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    server.serve(shutdown).await?;
    ctx.output.success("dev server stopped");
    Ok(())
}
