use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use crate::model::GitSource;
use crate::options::OptionsCatalogue;
use crate::util::file_basename;

/// Repository context attached to one paper of the search space.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitDataFileConfig {
    pub filename: String,
    pub git_info: GitSource,
}

/// On-disk search-space description. Every axis is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSpaceFile {
    #[serde(default)]
    pub filenames: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub loader: Option<Vec<String>>,
    #[serde(default)]
    pub chunking_config: Option<Vec<String>>,
    #[serde(default)]
    pub embedding_model: Option<Vec<String>>,
    #[serde(default)]
    pub vector_store: Option<Vec<String>>,
    #[serde(default)]
    pub similarity_top_k: Option<Vec<u32>>,
    #[serde(default)]
    pub llm: Option<Vec<String>>,
    #[serde(default)]
    pub git_data: Option<Vec<GitDataFileConfig>>,
    #[serde(default)]
    pub other_docs: Option<BTreeMap<String, Vec<PathBuf>>>,
}

impl SearchSpaceFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse search space {}", path.display()))
    }
}

/// Fully resolved and validated search space.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub filenames: Vec<PathBuf>,
    pub loader: Vec<String>,
    pub chunking_config: Vec<String>,
    pub embedding_model: Vec<String>,
    pub vector_store: Vec<String>,
    pub similarity_top_k: Vec<u32>,
    pub llm: Vec<String>,
    pub git_data: Vec<GitDataFileConfig>,
    pub other_docs: BTreeMap<String, Vec<PathBuf>>,
}

impl SearchSpace {
    pub fn load(path: &Path, catalogue: &OptionsCatalogue) -> Result<Self> {
        let file = SearchSpaceFile::load(path)?;
        Self::resolve(file, catalogue)
            .with_context(|| format!("invalid search space {}", path.display()))
    }

    /// Fills missing axes from the catalogue and rejects unknown option
    /// values and missing papers.
    pub fn resolve(file: SearchSpaceFile, catalogue: &OptionsCatalogue) -> Result<Self> {
        let options = &catalogue.options;
        let filenames = match file.filenames {
            Some(filenames) => filenames,
            None => {
                let discovered = discover_pdfs(&catalogue.paper_directory)?;
                debug!(
                    paper_directory = %catalogue.paper_directory.display(),
                    papers = discovered.len(),
                    "defaulted search space filenames"
                );
                discovered
            }
        };

        let space = Self {
            filenames,
            loader: file.loader.unwrap_or_else(|| options.loader.list.clone()),
            chunking_config: file
                .chunking_config
                .unwrap_or_else(|| options.chunking_config.list.clone()),
            embedding_model: file
                .embedding_model
                .unwrap_or_else(|| options.embedding_model.list.clone()),
            vector_store: file
                .vector_store
                .unwrap_or_else(|| options.vector_store.list.clone()),
            similarity_top_k: file
                .similarity_top_k
                .unwrap_or_else(|| options.similarity_top_k.list.clone()),
            llm: file.llm.unwrap_or_else(|| options.llm.list.clone()),
            git_data: file.git_data.unwrap_or_default(),
            other_docs: file.other_docs.unwrap_or_default(),
        };
        space.validate(catalogue)?;

        info!(
            papers = space.filenames.len(),
            population = space.population(),
            "resolved search space"
        );
        Ok(space)
    }

    fn validate(&self, catalogue: &OptionsCatalogue) -> Result<()> {
        let axes: [(&str, usize); 7] = [
            ("filenames", self.filenames.len()),
            ("loader", self.loader.len()),
            ("chunking_config", self.chunking_config.len()),
            ("embedding_model", self.embedding_model.len()),
            ("vector_store", self.vector_store.len()),
            ("similarity_top_k", self.similarity_top_k.len()),
            ("llm", self.llm.len()),
        ];
        for (axis, len) in axes {
            if len == 0 {
                bail!("search space axis `{axis}` is empty");
            }
        }

        catalogue.check_axis("loader", &self.loader)?;
        catalogue.check_axis("chunking_config", &self.chunking_config)?;
        catalogue.check_axis("embedding_model", &self.embedding_model)?;
        catalogue.check_axis("vector_store", &self.vector_store)?;
        catalogue.check_axis("llm", &self.llm)?;
        catalogue.check_top_k(&self.similarity_top_k)?;

        for path in &self.filenames {
            if !path.is_file() {
                bail!("paper file not found: {}", path.display());
            }
        }
        for docs in self.other_docs.values() {
            for path in docs {
                if !path.is_file() {
                    bail!("auxiliary document not found: {}", path.display());
                }
            }
        }
        Ok(())
    }

    /// Number of configurations in the full cartesian product.
    pub fn population(&self) -> usize {
        self.llm.len()
            * self.embedding_model.len()
            * self.filenames.len()
            * self.loader.len()
            * self.chunking_config.len()
            * self.vector_store.len()
            * self.similarity_top_k.len()
    }

    /// Git context for a paper, matched by exact path or by basename. The
    /// last matching entry wins.
    pub fn git_data_for(&self, path: &Path) -> Option<GitSource> {
        let full = path.to_string_lossy();
        let basename = file_basename(&full);
        self.git_data
            .iter()
            .rev()
            .find(|item| item.filename == full || item.filename == basename)
            .map(|item| item.git_info.clone())
    }

    /// Auxiliary documents for a paper, keyed by exact path or by basename.
    /// An exact-path key takes precedence.
    pub fn other_docs_for(&self, path: &Path) -> Vec<PathBuf> {
        let full = path.to_string_lossy();
        let basename = file_basename(&full);
        self.other_docs
            .get(full.as_ref())
            .or_else(|| self.other_docs.get(&basename))
            .cloned()
            .unwrap_or_default()
    }
}

fn discover_pdfs(paper_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(paper_directory)
        .with_context(|| format!("failed to read {}", paper_directory.display()))?;

    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", paper_directory.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    if pdfs.is_empty() {
        bail!("no PDFs found in {}", paper_directory.display());
    }
    Ok(pdfs)
}
