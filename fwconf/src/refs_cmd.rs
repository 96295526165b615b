use std::fs;

use anyhow::{Context, Result};
use fwconf::policy::EntityPolicy;
use fwconf::references::{build_reference_index, ReferenceOptions};
use fwconf::report::render_references;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{OutputFormat, RefsArgs};

pub fn run_refs(args: RefsArgs, policy: &EntityPolicy) -> Result<()> {
    let xml = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let options = ReferenceOptions {
        chunk_size: args.chunk_size,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let cancel = CancellationToken::new();

    let outcome = runtime
        .block_on(async {
            let watcher = cancel.clone();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, cancelling reference build");
                    watcher.cancel();
                }
            });
            let outcome = build_reference_index(&xml, policy, options, &cancel, |percent| {
                debug!(percent, "reference build progress");
            })
            .await;
            interrupt.abort();
            outcome
        })
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    let Some(index) = outcome.into_index() else {
        return Ok(());
    };

    match args.format {
        OutputFormat::Text => println!("{}", render_references(&index, args.name.as_deref())),
        OutputFormat::Json => match args.name.as_deref() {
            Some(name) => println!("{}", serde_json::to_string_pretty(&index.get(name))?),
            None => println!("{}", serde_json::to_string_pretty(&index)?),
        },
    }
    Ok(())
}
