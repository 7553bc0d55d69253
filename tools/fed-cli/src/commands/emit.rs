//! Emit the host's entry manifest.

use anyhow::{Context as _, Result};
use fed_core::RemoteEntry;

use super::EmitArgs;
use crate::context::Context;

/// Run the emit command.
pub async fn run(args: EmitArgs, ctx: &Context) -> Result<()> {
    let (descriptor, _) = ctx.require_descriptor()?;
    let entry = RemoteEntry::from_descriptor(&descriptor);
    let json = entry.to_json().context("failed to serialize entry manifest")?;

    match args.out {
        Some(out) => {
            let path = ctx.resolve_path(&out);
            std::fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            ctx.output.success(&format!(
                "wrote entry manifest for '{}' to {}",
                descriptor.name,
                path.display()
            ));
        }
        None => println!("{}", json),
    }

    Ok(())
}
