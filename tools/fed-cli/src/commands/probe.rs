//! Probe every declared remote's entry URL.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use fed_runtime::{FederationLoader, FetchPolicy, HttpFetcher, RetryPolicy, TimeoutConfig};

use super::ProbeArgs;
use crate::context::Context;

/// Run the probe command.
///
/// Fetches all declared remotes' entry manifests concurrently, the same way
/// the runtime loader does at application start. One remote being down does
/// not abort the probe of the others.
pub async fn run(args: ProbeArgs, ctx: &Context) -> Result<()> {
    let (descriptor, _) = ctx.require_descriptor()?;

    if descriptor.remotes.is_empty() {
        ctx.output.info("no remotes declared");
        return Ok(());
    }

    let timeout = TimeoutConfig::from_total(Duration::from_millis(args.timeout_ms));
    let fetcher = Arc::new(HttpFetcher::new(timeout.connect)?);
    let loader = FederationLoader::new(descriptor, fetcher)
        .with_policy(FetchPolicy::new(timeout, RetryPolicy::new(args.retries)));

    let spinner = ctx.output.spinner("probing remotes...");
    let report = loader.warm_up().await;
    spinner.finish_and_clear();

    if ctx.output.is_json() {
        let summary: Vec<serde_json::Value> = report
            .loaded
            .iter()
            .map(|alias| serde_json::json!({ "alias": alias, "ok": true }))
            .chain(report.failed.iter().map(|(alias, err)| {
                serde_json::json!({ "alias": alias, "ok": false, "error": err.to_string() })
            }))
            .collect();
        ctx.output.json(&summary);
    } else {
        for alias in &report.loaded {
            ctx.output.success(&format!("{}: reachable", alias));
        }
        for (alias, err) in &report.failed {
            ctx.output.error(&format!("{}: {}", alias, err));
        }
    }

    if !report.all_loaded() {
        let total = report.loaded.len() + report.failed.len();
        bail!("{} of {} remote(s) unreachable", report.failed.len(), total);
    }
    Ok(())
}
