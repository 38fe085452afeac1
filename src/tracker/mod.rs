use std::path::{Path, PathBuf};

use crate::domain::Domain;

mod lock;
mod materialize;
mod record;
mod store;

pub use lock::OutputLock;
pub use materialize::{materialize, strip_code_fence};
pub use record::record_run;
pub use store::{OutputTracker, TSV_HEADER};

pub const OUTPUT_MAP_JSON: &str = "output_map.json";
pub const OUTPUT_MAP_TSV: &str = "output_map.tsv";
pub const OUTPUT_MAP_LOCK: &str = "output_map.lock";
pub const GENERATED_DIR: &str = "generated_domains";
pub const SOURCES_DIR: &str = "reference_sources";
pub const INDEX_PLACEHOLDER: &str = "(index)";

/// Everything the tracker needs from one generation call.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub response_text: String,
    pub source_text: String,
    pub elapsed_seconds: f64,
}

/// Artifact directories of one output target.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub generated_dir: PathBuf,
    pub sources_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn under(output_root: &Path) -> Self {
        Self {
            generated_dir: output_root.join(GENERATED_DIR),
            sources_dir: output_root.join(SOURCES_DIR),
        }
    }

    pub fn templates(&self, domain: Domain, hash_str: &str) -> ArtifactTemplates {
        let stem = format!("{domain}-{INDEX_PLACEHOLDER}-{hash_str}");
        ArtifactTemplates {
            txt_file: self
                .generated_dir
                .join(format!("{stem}.txt"))
                .display()
                .to_string(),
            json_file: self
                .generated_dir
                .join(format!("{stem}.json"))
                .display()
                .to_string(),
            source_node_file: self
                .sources_dir
                .join(format!("{stem}.txt"))
                .display()
                .to_string(),
        }
    }
}

/// Artifact paths still carrying the index placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactTemplates {
    pub txt_file: String,
    pub json_file: String,
    pub source_node_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub txt_file: PathBuf,
    pub json_file: PathBuf,
    pub source_node_file: PathBuf,
}

impl ArtifactPaths {
    pub fn any_exists(&self) -> bool {
        self.txt_file.exists() || self.json_file.exists() || self.source_node_file.exists()
    }
}

impl ArtifactTemplates {
    pub fn resolve(&self, index: u32) -> ArtifactPaths {
        let index = index.to_string();
        ArtifactPaths {
            txt_file: PathBuf::from(self.txt_file.replace(INDEX_PLACEHOLDER, &index)),
            json_file: PathBuf::from(self.json_file.replace(INDEX_PLACEHOLDER, &index)),
            source_node_file: PathBuf::from(
                self.source_node_file.replace(INDEX_PLACEHOLDER, &index),
            ),
        }
    }
}
