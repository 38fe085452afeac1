use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::domain::Domain;
use crate::model::{NOT_AVAILABLE, RunLog};
use crate::tracker::OutputTracker;

pub fn run(args: StatusArgs) -> Result<()> {
    let tracker = OutputTracker::new(&args.target);
    let json_path = tracker.json_path();
    let tsv_path = tracker.tsv_path();
    let lock_path = tracker.lock_path();

    info!(target = %args.target.display(), "status requested");

    if lock_path.exists() {
        warn!(path = %lock_path.display(), "output target is locked by a writer");
    }

    if !json_path.exists() {
        warn!(path = %json_path.display(), "run log missing");
        return Ok(());
    }

    let raw =
        fs::read(&json_path).with_context(|| format!("failed to read {}", json_path.display()))?;
    let run_log: RunLog = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", json_path.display()))?;

    for domain in Domain::ALL {
        let entries = run_log.entries(domain);
        let runs = entries
            .iter()
            .map(|entry| entry.entries.runs.len())
            .sum::<usize>();
        let unstructured = entries
            .iter()
            .flat_map(|entry| entry.entries.runs.iter())
            .filter(|run| run.json_file == NOT_AVAILABLE)
            .count();
        let latest = entries
            .iter()
            .flat_map(|entry| entry.entries.runs.iter())
            .map(|run| run.timestamp.as_str())
            .max()
            .unwrap_or_default();

        info!(
            domain = %domain,
            parameter_sets = entries.len(),
            runs,
            unstructured,
            latest = %latest,
            "domain status"
        );
    }
    info!(runs = run_log.run_count(), "run log status");

    if args.rebuild_tsv {
        let rows = tracker.rebuild_tsv()?;
        info!(path = %tsv_path.display(), rows, "rebuilt run table");
    } else if !tsv_path.exists() {
        warn!(path = %tsv_path.display(), "run table missing, rerun with --rebuild-tsv");
    }

    Ok(())
}
