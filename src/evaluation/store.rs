use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::util::write_json_pretty;

use super::{BCO_RESULTS_FILE, EvalData, USER_RESULTS_FILE, USERS_FILE};

const USER_HASH_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: String,
    pub last_name: String,
}

/// user hash -> generated file name -> evaluation. A user with no
/// evaluations yet maps to `null`.
pub type UserResults = BTreeMap<String, Option<BTreeMap<String, EvalData>>>;

/// paper -> generated file name -> user hash -> evaluation.
pub type BcoResults = BTreeMap<String, BTreeMap<String, BTreeMap<String, EvalData>>>;

/// Stable reviewer identity derived from the lowercased, trimmed name.
pub fn user_hash(first_name: &str, last_name: &str) -> String {
    let key = format!(
        "{}_{}",
        first_name.trim().to_lowercase(),
        last_name.trim().to_lowercase()
    );
    let digest = Sha256::digest(key.as_bytes());
    digest[..USER_HASH_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// The three evaluation result files of one results directory, held in
/// memory between `load` and `save`.
#[derive(Debug, Clone)]
pub struct EvaluationStore {
    results_dir: PathBuf,
    pub users: BTreeMap<String, UserRecord>,
    pub user_results: UserResults,
    pub bco_results: BcoResults,
}

impl EvaluationStore {
    /// Missing result files load as empty; files that do not parse are an
    /// error.
    pub fn load(results_dir: &Path) -> Result<Self> {
        let store = Self {
            results_dir: results_dir.to_path_buf(),
            users: load_or_empty(&results_dir.join(USERS_FILE))?,
            user_results: load_or_empty(&results_dir.join(USER_RESULTS_FILE))?,
            bco_results: load_or_empty(&results_dir.join(BCO_RESULTS_FILE))?,
        };
        debug!(
            results_dir = %results_dir.display(),
            users = store.users.len(),
            papers = store.bco_results.len(),
            "loaded evaluation results"
        );
        Ok(store)
    }

    /// Returns the reviewer's hash, registering the reviewer on first login.
    pub fn login(&mut self, first_name: &str, last_name: &str) -> Result<String> {
        let first_name = first_name.trim().to_lowercase();
        let last_name = last_name.trim().to_lowercase();
        match (first_name.is_empty(), last_name.is_empty()) {
            (true, true) => bail!("first and last name are required"),
            (true, false) => bail!("first name is required"),
            (false, true) => bail!("last name is required"),
            (false, false) => {}
        }

        let hash = user_hash(&first_name, &last_name);
        if self.users.contains_key(&hash) {
            info!(user = %hash, "found existing reviewer");
        } else {
            info!(
                user = %hash,
                first_name = %first_name,
                last_name = %last_name,
                "creating reviewer"
            );
            self.users.insert(
                hash.clone(),
                UserRecord {
                    first_name,
                    last_name,
                },
            );
        }
        self.user_results.entry(hash.clone()).or_insert(None);
        Ok(hash)
    }

    /// Ensures every paper has a (possibly empty) results entry.
    pub fn register_papers<'a>(&mut self, papers: impl IntoIterator<Item = &'a str>) {
        for paper in papers {
            self.bco_results.entry(paper.to_string()).or_default();
        }
    }

    pub fn user_eval(&self, user_hash: &str, file_name: &str) -> Option<&EvalData> {
        self.user_results
            .get(user_hash)?
            .as_ref()?
            .get(file_name)
    }

    /// Records an evaluation under both the reviewer and the paper. An
    /// evaluation equal to `defaults` is skipped and `false` is returned.
    pub fn submit(
        &mut self,
        user_hash: &str,
        paper: &str,
        file_name: &str,
        eval: EvalData,
        defaults: &EvalData,
    ) -> Result<bool> {
        let eval = eval.normalized()?;
        if eval.is_default(defaults) {
            info!(file = %file_name, "default evaluation, not updating");
            return Ok(false);
        }

        let Some(user_entry) = self.user_results.get_mut(user_hash) else {
            bail!("reviewer {user_hash} is not registered");
        };
        user_entry
            .get_or_insert_with(BTreeMap::new)
            .insert(file_name.to_string(), eval.clone());

        self.bco_results
            .entry(paper.to_string())
            .or_default()
            .entry(file_name.to_string())
            .or_default()
            .insert(user_hash.to_string(), eval);

        info!(user = %user_hash, paper = %paper, file = %file_name, "evaluation recorded");
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        write_json_pretty(&self.results_dir.join(BCO_RESULTS_FILE), &self.bco_results)?;
        write_json_pretty(&self.results_dir.join(USER_RESULTS_FILE), &self.user_results)?;
        write_json_pretty(&self.results_dir.join(USERS_FILE), &self.users)?;
        debug!(results_dir = %self.results_dir.display(), "saved evaluation results");
        Ok(())
    }
}

fn load_or_empty<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
