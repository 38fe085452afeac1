use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

pub const NOT_AVAILABLE: &str = "NA";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDirection {
    Include,
    Exclude,
}

impl FilterDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Directory,
    FileExtension,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::FileExtension => "file_extension",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GitFilter {
    pub direction: FilterDirection,
    pub kind: FilterKind,
    pub values: Vec<String>,
}

impl GitFilter {
    pub fn new(direction: FilterDirection, kind: FilterKind, values: Vec<String>) -> Self {
        let mut values = values;
        values.sort();
        values.dedup();
        Self {
            direction,
            kind,
            values,
        }
    }

    /// Tokens contributed to the parameter fingerprint, one per value.
    pub fn fingerprint_tokens(&self) -> Vec<String> {
        let mut values = self.values.clone();
        values.sort();
        values
            .iter()
            .map(|value| {
                format!(
                    "{}-{}:{}",
                    self.direction.as_str(),
                    self.kind.as_str(),
                    value
                )
            })
            .collect()
    }
}

impl fmt::Display for GitFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}",
            self.direction.as_str(),
            self.kind.as_str(),
            self.values.join(",")
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GitSource {
    pub user: String,
    pub repo: String,
    pub branch: String,
    #[serde(default)]
    pub filters: Vec<GitFilter>,
}

impl GitSource {
    pub fn sorted_filters(&self) -> Vec<GitFilter> {
        let mut filters = self
            .filters
            .iter()
            .map(|filter| GitFilter::new(filter.direction, filter.kind, filter.values.clone()))
            .collect::<Vec<GitFilter>>();
        filters.sort();
        filters
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Fixed { size: u32, overlap: u32 },
    Semantic,
}

/// Immutable set of generation-affecting choices. Document and output paths
/// are not part of it; equality is the run-grouping relation.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ParameterConfiguration {
    pub llm: String,
    pub embedding_model: String,
    pub vector_store: String,
    pub loader: String,
    pub similarity_top_k: u32,
    pub chunking_config: String,
    pub git_data: Option<GitSource>,
}

impl ParameterConfiguration {
    pub fn chunking_strategy(&self) -> Option<ChunkingStrategy> {
        crate::options::parse_chunking_label(&self.chunking_config)
    }
}

/// Display projection of a configuration as stored under `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub loader: String,
    pub vector_store: String,
    pub llm: String,
    pub embedding_model: String,
    pub similarity_top_k: u32,
    pub chunking_config: String,
    pub git_user: Option<String>,
    pub git_repo: Option<String>,
    pub git_branch: Option<String>,
    #[serde(default)]
    pub git_filters: Vec<GitFilter>,
}

impl From<&ParameterConfiguration> for ParamSet {
    fn from(config: &ParameterConfiguration) -> Self {
        let git = config.git_data.as_ref();
        Self {
            loader: config.loader.clone(),
            vector_store: config.vector_store.clone(),
            llm: config.llm.clone(),
            embedding_model: config.embedding_model.clone(),
            similarity_top_k: config.similarity_top_k,
            chunking_config: config.chunking_config.clone(),
            git_user: git.map(|value| value.user.clone()),
            git_repo: git.map(|value| value.repo.clone()),
            git_branch: git.map(|value| value.branch.clone()),
            git_filters: git.map(GitSource::sorted_filters).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub index: u32,
    pub timestamp: String,
    pub txt_file: String,
    pub json_file: String,
    pub source_node_file: String,
    pub elapsed_time: f64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSetRuns {
    pub curr_index: u32,
    pub params: ParamSet,
    pub runs: Vec<RunEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSetEntry {
    pub hash_str: String,
    pub entries: ParameterSetRuns,
}

impl ParameterSetEntry {
    pub fn new(hash_str: String, params: ParamSet) -> Self {
        Self {
            hash_str,
            entries: ParameterSetRuns {
                curr_index: 0,
                params,
                runs: Vec::new(),
            },
        }
    }

    pub fn next_index(&self) -> u32 {
        self.entries.curr_index + 1
    }

    pub fn push_run(&mut self, run: RunEntry) {
        self.entries.curr_index = run.index;
        self.entries.runs.push(run);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    #[serde(default)]
    pub usability: Vec<ParameterSetEntry>,
    #[serde(default)]
    pub io: Vec<ParameterSetEntry>,
    #[serde(default)]
    pub description: Vec<ParameterSetEntry>,
    #[serde(default)]
    pub execution: Vec<ParameterSetEntry>,
    #[serde(default)]
    pub parametric: Vec<ParameterSetEntry>,
    #[serde(default)]
    pub error: Vec<ParameterSetEntry>,
}

impl RunLog {
    pub fn entries(&self, domain: Domain) -> &[ParameterSetEntry] {
        match domain {
            Domain::Usability => &self.usability,
            Domain::Io => &self.io,
            Domain::Description => &self.description,
            Domain::Execution => &self.execution,
            Domain::Parametric => &self.parametric,
            Domain::Error => &self.error,
        }
    }

    pub fn entries_mut(&mut self, domain: Domain) -> &mut Vec<ParameterSetEntry> {
        match domain {
            Domain::Usability => &mut self.usability,
            Domain::Io => &mut self.io,
            Domain::Description => &mut self.description,
            Domain::Execution => &mut self.execution,
            Domain::Parametric => &mut self.parametric,
            Domain::Error => &mut self.error,
        }
    }

    pub fn find(&self, domain: Domain, hash_str: &str) -> Option<&ParameterSetEntry> {
        self.entries(domain)
            .iter()
            .find(|entry| entry.hash_str == hash_str)
    }

    pub fn run_count(&self) -> usize {
        Domain::ALL
            .iter()
            .flat_map(|domain| self.entries(*domain))
            .map(|entry| entry.entries.runs.len())
            .sum()
    }
}
