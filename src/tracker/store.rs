use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::domain::Domain;
use crate::fingerprint::fingerprint;
use crate::model::{ParamSet, ParameterConfiguration, RunEntry, RunLog};
use crate::util::{
    ensure_directory, file_basename, utc_compact_string, write_json_pretty, write_string,
};

use super::{
    ArtifactLayout, OUTPUT_MAP_JSON, OUTPUT_MAP_LOCK, OUTPUT_MAP_TSV, OutputLock, RunOutput,
    record_run,
};

pub const TSV_HEADER: [&str; 17] = [
    "timestamp",
    "domain",
    "txt_file",
    "json_file",
    "source_node_file",
    "hash_string",
    "index",
    "loader",
    "vector_store",
    "llm",
    "embedding_model",
    "similarity_top_k",
    "chunking_config",
    "git_user",
    "git_repo",
    "git_branch",
    "git_filters",
];

/// Run log of one output target: `output_map.json` is authoritative and
/// `output_map.tsv` is rederived from it on every write.
#[derive(Debug, Clone)]
pub struct OutputTracker {
    root: PathBuf,
}

impl OutputTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn json_path(&self) -> PathBuf {
        self.root.join(OUTPUT_MAP_JSON)
    }

    pub fn tsv_path(&self) -> PathBuf {
        self.root.join(OUTPUT_MAP_TSV)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(OUTPUT_MAP_LOCK)
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::under(&self.root)
    }

    /// Takes the target's lock. Every run-log write goes through the guard.
    pub fn lock(&self) -> Result<LockedTracker<'_>> {
        ensure_directory(&self.root)?;
        let lock = OutputLock::acquire(&self.lock_path())?;
        Ok(LockedTracker {
            tracker: self,
            _lock: lock,
        })
    }

    /// Load, append, and persist one run while holding the target's lock.
    pub fn record(
        &self,
        domain: Domain,
        config: &ParameterConfiguration,
        output: &RunOutput,
    ) -> Result<RunLog> {
        self.lock()?.record(domain, config, output)
    }

    /// Keeps a response that could not be recorded next to the generated
    /// artifacts, under a name no run index can collide with.
    pub fn save_unrecorded(
        &self,
        domain: Domain,
        config: &ParameterConfiguration,
        response_text: &str,
    ) -> Result<PathBuf> {
        let generated_dir = self.layout().generated_dir;
        let stem = format!(
            "{domain}-unrecorded-{}-{}",
            fingerprint(config),
            utc_compact_string(Utc::now())
        );
        let mut path = generated_dir.join(format!("{stem}.txt"));
        let mut attempt = 1u32;
        while path.exists() {
            attempt += 1;
            path = generated_dir.join(format!("{stem}-{attempt}.txt"));
        }
        write_string(&path, response_text)?;
        Ok(path)
    }

    /// Missing run logs load as `None`. A run log that no longer parses is
    /// moved aside so the next write cannot clobber it.
    pub fn load(&self) -> Result<Option<RunLog>> {
        let path = self.json_path();
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_slice::<RunLog>(&raw) {
            Ok(run_log) => Ok(Some(run_log)),
            Err(err) => {
                let quarantine = self.root.join(format!(
                    "{OUTPUT_MAP_JSON}.corrupt-{}",
                    utc_compact_string(Utc::now())
                ));
                fs::rename(&path, &quarantine).with_context(|| {
                    format!("failed to move unreadable run log {} aside", path.display())
                })?;
                error!(
                    path = %path.display(),
                    moved_to = %quarantine.display(),
                    error = %err,
                    "run log is unreadable, starting a new one"
                );
                Ok(None)
            }
        }
    }

    /// Write failures are logged and swallowed; the caller's in-memory run log
    /// and the raw artifacts remain the record for this call.
    pub fn persist(&self, run_log: &RunLog) {
        let json_path = self.json_path();
        match write_json_pretty(&json_path, run_log) {
            Ok(()) => info!(path = %json_path.display(), "wrote run log"),
            Err(err) => {
                error!(path = %json_path.display(), error = %err, "failed to write run log")
            }
        }

        let tsv_path = self.tsv_path();
        match write_tsv(&tsv_path, run_log) {
            Ok(rows) => info!(path = %tsv_path.display(), rows, "wrote run table"),
            Err(err) => {
                error!(path = %tsv_path.display(), error = %err, "failed to write run table")
            }
        }
    }

    /// Regenerates `output_map.tsv` from `output_map.json`.
    pub fn rebuild_tsv(&self) -> Result<usize> {
        let _guard = self.lock()?;
        let path = self.json_path();
        let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let run_log: RunLog = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let rows = write_tsv(&self.tsv_path(), &run_log)?;
        if rows != run_log.run_count() {
            warn!(rows, runs = run_log.run_count(), "run table row count mismatch");
        }
        Ok(rows)
    }
}

/// Holds an output target's lock for the duration of one generation.
#[derive(Debug)]
pub struct LockedTracker<'a> {
    tracker: &'a OutputTracker,
    _lock: OutputLock,
}

impl LockedTracker<'_> {
    pub fn record(
        &self,
        domain: Domain,
        config: &ParameterConfiguration,
        output: &RunOutput,
    ) -> Result<RunLog> {
        let existing = self.tracker.load()?;
        let run_log = record_run(existing, domain, config, output, &self.tracker.layout())?;
        self.tracker.persist(&run_log);
        Ok(run_log)
    }
}

fn write_tsv(path: &Path, run_log: &RunLog) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer
        .write_record(TSV_HEADER)
        .with_context(|| format!("failed to write header to {}", path.display()))?;

    let mut rows = 0usize;
    for domain in Domain::ALL {
        for entry in run_log.entries(domain) {
            let params = &entry.entries.params;
            let git_filters = params
                .git_filters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(";");
            for run in &entry.entries.runs {
                writer
                    .write_record(tsv_row(domain, &entry.hash_str, run, params, &git_filters))
                    .with_context(|| format!("failed to write row to {}", path.display()))?;
                rows += 1;
            }
        }
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(rows)
}

fn tsv_row(
    domain: Domain,
    hash_str: &str,
    run: &RunEntry,
    params: &ParamSet,
    git_filters: &str,
) -> Vec<String> {
    vec![
        run.timestamp.clone(),
        domain.as_str().to_string(),
        file_basename(&run.txt_file),
        file_basename(&run.json_file),
        file_basename(&run.source_node_file),
        hash_str.to_string(),
        run.index.to_string(),
        params.loader.clone(),
        params.vector_store.clone(),
        params.llm.clone(),
        params.embedding_model.clone(),
        params.similarity_top_k.to_string(),
        params.chunking_config.clone(),
        params.git_user.clone().unwrap_or_default(),
        params.git_repo.clone().unwrap_or_default(),
        params.git_branch.clone().unwrap_or_default(),
        git_filters.to_string(),
    ]
}
