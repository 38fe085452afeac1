use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::Domain;
use crate::model::{NOT_AVAILABLE, ParamSet, RunEntry, RunLog};
use crate::tracker::OUTPUT_MAP_JSON;
use crate::util::file_basename;

use super::{EvalData, EvaluationStore, HUMAN_CURATED_DIR};

pub const RAW_TEXT_PREFIX: &str = "Failed JSON serialization. Raw text output:\n\n";

/// One recorded run addressed by its position across all output targets.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    pub paper: String,
    pub domain: Domain,
    pub params: ParamSet,
    pub run: RunEntry,
}

impl EvaluationRun {
    /// The structured artifact when one was written, else the raw response.
    pub fn generated_file(&self) -> PathBuf {
        let json_file = Path::new(&self.run.json_file);
        if self.run.json_file != NOT_AVAILABLE && json_file.is_file() {
            json_file.to_path_buf()
        } else {
            PathBuf::from(&self.run.txt_file)
        }
    }

    /// Key under which evaluations of this run are stored.
    pub fn file_name(&self) -> String {
        file_basename(&self.generated_file().to_string_lossy())
    }
}

/// Everything a reviewer needs to evaluate one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub paper: String,
    pub domain: Domain,
    pub generated_domain: String,
    pub generated_file_path: PathBuf,
    pub human_curated_domain: Option<String>,
    pub param_set: String,
    pub reference_nodes: String,
    pub run_index: usize,
    pub total_runs: usize,
    pub already_evaluated: bool,
    pub eval_data: EvalData,
}

/// Runs of every output target under `output_dir`, ordered by target name,
/// then domain, parameter set, and run.
pub fn discover_runs(output_dir: &Path) -> Result<Vec<EvaluationRun>> {
    let mut targets = Vec::new();
    let entries = fs::read_dir(output_dir)
        .with_context(|| format!("failed to read {}", output_dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", output_dir.display()))?;
        let path = entry.path();
        if !path.is_dir() || entry.file_name() == HUMAN_CURATED_DIR {
            continue;
        }
        if path.join(OUTPUT_MAP_JSON).is_file() {
            targets.push(path);
        }
    }
    targets.sort();

    let mut runs = Vec::new();
    for target in targets {
        let paper = file_basename(&target.to_string_lossy());
        let json_path = target.join(OUTPUT_MAP_JSON);
        let raw = fs::read(&json_path)
            .with_context(|| format!("failed to read {}", json_path.display()))?;
        let run_log: RunLog = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", json_path.display()))?;

        for domain in Domain::ALL {
            for entry in run_log.entries(domain) {
                for run in &entry.entries.runs {
                    runs.push(EvaluationRun {
                        paper: paper.clone(),
                        domain,
                        params: entry.entries.params.clone(),
                        run: run.clone(),
                    });
                }
            }
        }
    }

    debug!(output_dir = %output_dir.display(), runs = runs.len(), "discovered runs");
    Ok(runs)
}

pub fn load_run_state(
    output_dir: &Path,
    runs: &[EvaluationRun],
    run_index: usize,
    store: &EvaluationStore,
    user_hash: &str,
    defaults: &EvalData,
) -> Result<RunState> {
    let Some(item) = runs.get(run_index) else {
        bail!("run index {run_index} out of range, {} runs available", runs.len());
    };

    let generated_file_path = item.generated_file();
    let raw = fs::read_to_string(&generated_file_path)
        .with_context(|| format!("failed to read {}", generated_file_path.display()))?;
    let generated_domain = if generated_file_path == Path::new(&item.run.json_file) {
        let value: Value = serde_json::from_str(&raw).with_context(|| {
            format!("failed to parse generated domain {}", generated_file_path.display())
        })?;
        serde_json::to_string_pretty(&value).context("failed to format generated domain")?
    } else {
        format!("{RAW_TEXT_PREFIX}{raw}")
    };

    let reference_nodes = fs::read_to_string(&item.run.source_node_file)
        .with_context(|| format!("failed to read {}", item.run.source_node_file))?;
    let param_set =
        serde_json::to_string_pretty(&item.params).context("failed to format parameter set")?;

    let file_name = item.file_name();
    let (already_evaluated, eval_data) = match store.user_eval(user_hash, &file_name) {
        Some(eval) => (true, eval.clone()),
        None => (false, defaults.clone()),
    };

    Ok(RunState {
        paper: item.paper.clone(),
        domain: item.domain,
        generated_domain,
        generated_file_path,
        human_curated_domain: human_curated_domain(output_dir, &item.paper, item.domain)?,
        param_set,
        reference_nodes,
        run_index,
        total_runs: runs.len(),
        already_evaluated,
        eval_data,
    })
}

/// The reference domain from `human_curated/<paper>.json`, wrapped as
/// `{"<domain>_domain": ...}`. Absent when the paper has no curated record.
fn human_curated_domain(output_dir: &Path, paper: &str, domain: Domain) -> Result<Option<String>> {
    let path = output_dir.join(HUMAN_CURATED_DIR).join(format!("{paper}.json"));
    if !path.is_file() {
        debug!(path = %path.display(), "no human curated record");
        return Ok(None);
    }

    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let curated: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let key = format!("{}_domain", domain.as_str());
    let Some(section) = curated.get(&key) else {
        warn!(path = %path.display(), key = %key, "human curated record lacks domain");
        return Ok(None);
    };

    let mut wrapped = Map::new();
    wrapped.insert(key, section.clone());
    let formatted = serde_json::to_string_pretty(&Value::Object(wrapped))
        .context("failed to format human curated domain")?;
    Ok(Some(formatted))
}
