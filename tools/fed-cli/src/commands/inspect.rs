//! Show the descriptor.

use anyhow::Result;

use super::InspectArgs;
use crate::context::Context;

/// Run the inspect command.
pub async fn run(_args: InspectArgs, ctx: &Context) -> Result<()> {
    let (descriptor, path) = ctx.require_descriptor()?;

    if ctx.output.is_json() {
        ctx.output.json(&descriptor);
        return Ok(());
    }

    ctx.output.header("Federation descriptor");
    ctx.output.debug(&format!("loaded from {}", path.display()));

    ctx.output.kv("name", &descriptor.name);
    ctx.output.kv("filename", &descriptor.filename);

    if !descriptor.remotes.is_empty() {
        ctx.output.info("");
        ctx.output.info("[remotes]");
        for (alias, remote) in &descriptor.remotes {
            ctx.output.kv(alias, &remote.to_string());
        }
    }

    if !descriptor.exposes.is_empty() {
        ctx.output.info("");
        ctx.output.info("[exposes]");
        for (public, local) in &descriptor.exposes {
            ctx.output.kv(public, local);
        }
    }

    if !descriptor.shared.is_empty() {
        ctx.output.info("");
        ctx.output.info("[shared]");
        for (package, spec) in &descriptor.shared {
            let kind = if spec.singleton { "singleton" } else { "shared" };
            ctx.output
                .kv(package, &format!("{} {}", kind, spec.required_version));
        }
    }

    if let Some(dev) = &descriptor.dev_server {
        ctx.output.info("");
        ctx.output.info("[dev_server]");
        ctx.output.kv("port", &dev.port.to_string());
        ctx.output.kv("cors", &format!("{:?}", dev.cors));
    }

    Ok(())
}
