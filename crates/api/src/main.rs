use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use tally_api::InvoiceActions;
use tally_api::script::{ScriptRequest, Seed};
use tally_infra::{EngineConfig, InMemoryCatalogStore};

/// Usage: `tally [seed.json] < actions.jsonl`
fn main() -> anyhow::Result<()> {
    tally_observability::init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let store = Arc::new(InMemoryCatalogStore::new());

    if let Some(path) = std::env::args().nth(1) {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read seed file {path}"))?;
        let seed: Seed =
            serde_json::from_str(&raw).with_context(|| format!("invalid seed file {path}"))?;
        seed.load_into(&store).context("failed to load seed")?;
    }

    let actions = InvoiceActions::new(store, config);
    let stdin = std::io::stdin();
    let mut out = std::io::stdout().lock();

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ScriptRequest>(&line) {
            Ok(request) => actions.run(request),
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "unreadable request");
                json!({ "message": format!("Unreadable request on line {}: {err}", index + 1) })
            }
        };

        serde_json::to_writer(&mut out, &reply)?;
        writeln!(out)?;
    }

    Ok(())
}
