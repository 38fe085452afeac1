use anyhow::Result;
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::fingerprint::fingerprint;
use crate::model::{
    NOT_AVAILABLE, ParamSet, ParameterConfiguration, ParameterSetEntry, RunEntry, RunLog,
};
use crate::util::{now_utc_string, write_string};

use super::{ArtifactLayout, RunOutput, materialize};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Appends one run for `config` under `domain`, writing its artifacts.
///
/// An absent run log starts empty. The parameter-set entry for the config's
/// fingerprint is reused when present, so indices stay gapless per entry
/// unless artifacts from an unlogged run already occupy the next index; such
/// files are never overwritten. Only a failure to write the raw or source
/// artifacts is returned as an error; an unparseable response is recorded
/// with `json_file = "NA"`.
pub fn record_run(
    run_log: Option<RunLog>,
    domain: Domain,
    config: &ParameterConfiguration,
    output: &RunOutput,
    layout: &ArtifactLayout,
) -> Result<RunLog> {
    let hash_str = fingerprint(config);
    let mut run_log = run_log.unwrap_or_default();
    let entries = run_log.entries_mut(domain);

    let position = match entries.iter().position(|entry| entry.hash_str == hash_str) {
        Some(position) => position,
        None => {
            debug!(domain = %domain, hash = %hash_str, "new parameter set");
            entries.push(ParameterSetEntry::new(hash_str.clone(), ParamSet::from(config)));
            entries.len() - 1
        }
    };
    let entry = &mut entries[position];
    let templates = layout.templates(domain, &hash_str);
    let mut new_index = entry.next_index();
    let mut paths = templates.resolve(new_index);
    while paths.any_exists() {
        warn!(
            domain = %domain,
            hash = %hash_str,
            index = new_index,
            "artifacts for this index already exist, skipping it"
        );
        new_index += 1;
        paths = templates.resolve(new_index);
    }

    let structured = materialize(&output.response_text, &paths.json_file, &paths.txt_file)?;
    write_string(&paths.source_node_file, &output.source_text)?;

    let json_file = if structured {
        paths.json_file.display().to_string()
    } else {
        NOT_AVAILABLE.to_string()
    };

    entry.push_run(RunEntry {
        index: new_index,
        timestamp: now_utc_string(),
        txt_file: paths.txt_file.display().to_string(),
        json_file,
        source_node_file: paths.source_node_file.display().to_string(),
        elapsed_time: round_seconds(output.elapsed_seconds),
        version: TOOL_VERSION.to_string(),
    });

    info!(
        domain = %domain,
        hash = %hash_str,
        index = new_index,
        structured,
        "recorded run"
    );

    Ok(run_log)
}

fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
