use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::model::{ChunkingStrategy, GitSource, ParameterConfiguration};

const BUILTIN_OPTIONS: &str = include_str!("../config/options.json");

#[derive(Debug, Clone, Deserialize)]
pub struct OptionSchema<T> {
    pub list: Vec<T>,
    pub default: T,
    #[serde(default)]
    pub documentation: String,
}

impl<T: PartialEq + Display> OptionSchema<T> {
    fn check(&self, axis: &str, value: &T) -> Result<()> {
        if self.list.contains(value) {
            return Ok(());
        }
        let available = self
            .list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join(", ");
        if self.documentation.is_empty() {
            bail!("invalid {axis} `{value}`, available options: {available}")
        }
        bail!(
            "invalid {axis} `{value}`, available options: {available} (see {})",
            self.documentation
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueOptions {
    pub loader: OptionSchema<String>,
    pub chunking_config: OptionSchema<String>,
    pub embedding_model: OptionSchema<String>,
    pub vector_store: OptionSchema<String>,
    pub similarity_top_k: OptionSchema<u32>,
    pub llm: OptionSchema<String>,
}

/// Available option values per configuration axis, with defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsCatalogue {
    pub paper_directory: PathBuf,
    pub options: CatalogueOptions,
}

/// Partially specified configuration; unset axes fall back to catalogue
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct Selections {
    pub llm: Option<String>,
    pub embedding_model: Option<String>,
    pub vector_store: Option<String>,
    pub loader: Option<String>,
    pub similarity_top_k: Option<u32>,
    pub chunking_config: Option<String>,
    pub git_data: Option<GitSource>,
}

impl OptionsCatalogue {
    pub fn builtin() -> Result<Self> {
        let catalogue: Self =
            serde_json::from_str(BUILTIN_OPTIONS).context("invalid built-in options catalogue")?;
        catalogue.validate_defaults()?;
        Ok(catalogue)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let catalogue: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse options catalogue {}", path.display()))?;
        catalogue
            .validate_defaults()
            .with_context(|| format!("invalid options catalogue {}", path.display()))?;
        debug!(path = %path.display(), "loaded options catalogue");
        Ok(catalogue)
    }

    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    fn validate_defaults(&self) -> Result<()> {
        let options = &self.options;
        options.loader.check("loader default", &options.loader.default)?;
        options
            .chunking_config
            .check("chunking_config default", &options.chunking_config.default)?;
        options
            .embedding_model
            .check("embedding_model default", &options.embedding_model.default)?;
        options
            .vector_store
            .check("vector_store default", &options.vector_store.default)?;
        options
            .similarity_top_k
            .check("similarity_top_k default", &options.similarity_top_k.default)?;
        options.llm.check("llm default", &options.llm.default)?;

        for label in &options.chunking_config.list {
            if parse_chunking_label(label).is_none() {
                bail!("unrecognized chunking_config label `{label}`");
            }
        }
        Ok(())
    }

    pub fn resolve(&self, selections: Selections) -> Result<ParameterConfiguration> {
        let options = &self.options;
        let config = ParameterConfiguration {
            llm: selections.llm.unwrap_or_else(|| options.llm.default.clone()),
            embedding_model: selections
                .embedding_model
                .unwrap_or_else(|| options.embedding_model.default.clone()),
            vector_store: selections
                .vector_store
                .unwrap_or_else(|| options.vector_store.default.clone()),
            loader: selections
                .loader
                .unwrap_or_else(|| options.loader.default.clone()),
            similarity_top_k: selections
                .similarity_top_k
                .unwrap_or(options.similarity_top_k.default),
            chunking_config: selections
                .chunking_config
                .unwrap_or_else(|| options.chunking_config.default.clone()),
            git_data: selections.git_data,
        };
        self.validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self, config: &ParameterConfiguration) -> Result<()> {
        let options = &self.options;
        options.llm.check("llm", &config.llm)?;
        options
            .embedding_model
            .check("embedding_model", &config.embedding_model)?;
        options.vector_store.check("vector_store", &config.vector_store)?;
        options.loader.check("loader", &config.loader)?;
        options
            .similarity_top_k
            .check("similarity_top_k", &config.similarity_top_k)?;
        options
            .chunking_config
            .check("chunking_config", &config.chunking_config)?;
        Ok(())
    }

    pub fn check_axis(&self, axis: &str, values: &[String]) -> Result<()> {
        let schema = match axis {
            "loader" => &self.options.loader,
            "chunking_config" => &self.options.chunking_config,
            "embedding_model" => &self.options.embedding_model,
            "vector_store" => &self.options.vector_store,
            "llm" => &self.options.llm,
            other => bail!("unknown option axis `{other}`"),
        };
        for value in values {
            schema.check(axis, value)?;
        }
        Ok(())
    }

    pub fn check_top_k(&self, values: &[u32]) -> Result<()> {
        for value in values {
            self.options
                .similarity_top_k
                .check("similarity_top_k", value)?;
        }
        Ok(())
    }
}

fn chunking_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\s*chunk size)?\s*/\s*(\d+)(?:\s*chunk overlap)?$")
            .expect("valid chunking label regex")
    })
}

pub fn parse_chunking_label(label: &str) -> Option<ChunkingStrategy> {
    let trimmed = label.trim();
    if trimmed.eq_ignore_ascii_case("semantic") {
        return Some(ChunkingStrategy::Semantic);
    }

    let captures = chunking_pattern().captures(trimmed)?;
    let size = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let overlap = captures.get(2)?.as_str().parse::<u32>().ok()?;
    if size == 0 || overlap >= size {
        return None;
    }
    Some(ChunkingStrategy::Fixed { size, overlap })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_is_consistent() {
        let catalogue = OptionsCatalogue::builtin().unwrap();
        assert!(catalogue.options.llm.list.contains(&"gpt-4".to_string()));
        assert!(catalogue.options.similarity_top_k.list.contains(&3));
    }

    #[test]
    fn undocumented_axis_error_omits_reference() {
        let schema = OptionSchema {
            list: vec![1_u32, 2],
            default: 1,
            documentation: String::new(),
        };
        assert!(schema.check("similarity_top_k", &2).is_ok());
        let err = schema.check("similarity_top_k", &7).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid similarity_top_k `7`, available options: 1, 2"
        );
    }

    #[test]
    fn resolve_fills_defaults_and_rejects_unknown_values() {
        let catalogue = OptionsCatalogue::builtin().unwrap();
        let config = catalogue
            .resolve(Selections {
                llm: Some("gpt-4".to_string()),
                similarity_top_k: Some(4),
                ..Selections::default()
            })
            .unwrap();
        assert_eq!(config.llm, "gpt-4");
        assert_eq!(config.similarity_top_k, 4);
        assert_eq!(config.loader, catalogue.options.loader.default);

        let err = catalogue
            .resolve(Selections {
                llm: Some("not-a-model".to_string()),
                ..Selections::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("invalid llm `not-a-model`"));
        assert!(
            err.to_string()
                .contains(&format!("(see {})", catalogue.options.llm.documentation))
        );

        assert!(
            catalogue
                .resolve(Selections {
                    similarity_top_k: Some(99),
                    ..Selections::default()
                })
                .is_err()
        );
    }

    #[test]
    fn parse_chunking_label_supports_long_and_short_forms() {
        assert_eq!(
            parse_chunking_label("1024 chunk size/20 chunk overlap"),
            Some(ChunkingStrategy::Fixed {
                size: 1024,
                overlap: 20
            })
        );
        assert_eq!(
            parse_chunking_label("1024/20"),
            Some(ChunkingStrategy::Fixed {
                size: 1024,
                overlap: 20
            })
        );
        assert_eq!(
            parse_chunking_label("Semantic"),
            Some(ChunkingStrategy::Semantic)
        );
        assert_eq!(parse_chunking_label("20/1024"), None);
        assert_eq!(parse_chunking_label("big chunks"), None);
    }
}
