use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{Span, debug, error, info, info_span};

use crate::domain::Domain;
use crate::generation::{GenerationRequest, Generator, format_sources};
use crate::model::{ParameterConfiguration, RunLog};
use crate::tracker::{OutputTracker, RunOutput};
use crate::util::normalized_document_stem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub filename: String,
    pub filepath: PathBuf,
}

impl SourceDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("paper file not found: {}", path.display());
        }
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
        Ok(Self {
            filename,
            filepath: path.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DomainResult {
    pub domain: Domain,
    pub text: String,
    pub run_log: RunLog,
}

/// One paper processed under one configuration. Owns the tracker for the
/// paper's output target.
pub struct GenerationSession<G: Generator> {
    document: SourceDocument,
    other_docs: Vec<PathBuf>,
    config: ParameterConfiguration,
    tracker: OutputTracker,
    generator: G,
    span: Span,
}

impl<G: Generator> GenerationSession<G> {
    pub fn new(
        document: SourceDocument,
        other_docs: Vec<PathBuf>,
        config: ParameterConfiguration,
        output_dir: &Path,
        generator: G,
    ) -> Self {
        let output_root = output_dir.join(normalized_document_stem(&document.filename));
        let span = info_span!("session", document = %document.filename);
        let git_repo = config
            .git_data
            .as_ref()
            .map(|git| format!("{}/{}@{}", git.user, git.repo, git.branch))
            .unwrap_or_default();
        {
            let _entered = span.enter();
            info!(
                llm = %config.llm,
                embedding_model = %config.embedding_model,
                vector_store = %config.vector_store,
                loader = %config.loader,
                similarity_top_k = config.similarity_top_k,
                chunking_config = %config.chunking_config,
                git_repo = %git_repo,
                output_root = %output_root.display(),
                "session configured"
            );
        }

        Self {
            document,
            other_docs,
            config,
            tracker: OutputTracker::new(output_root),
            generator,
            span,
        }
    }

    pub fn tracker(&self) -> &OutputTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ParameterConfiguration {
        &self.config
    }

    /// The output target stays locked from before the generator call until
    /// the run is recorded. A response whose recording fails is saved to a
    /// separate file before the error is returned.
    pub fn perform_query(&mut self, domain: Domain) -> Result<DomainResult> {
        let _entered = self.span.clone().entered();
        let locked = self.tracker.lock()?;

        let request = GenerationRequest {
            domain,
            prompt: domain.query_prompt(),
            document_path: &self.document.filepath,
            other_docs: &self.other_docs,
            config: &self.config,
            chunking: self.config.chunking_strategy(),
        };
        debug!(domain = %domain, prompt = %request.prompt, "querying");

        let started = Instant::now();
        let generation = self
            .generator
            .generate(&request)
            .with_context(|| format!("generation failed for the {domain} domain"))?;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let output = RunOutput {
            response_text: generation.text.clone(),
            source_text: format_sources(&generation.sources),
            elapsed_seconds,
        };
        debug!(domain = %domain, sources = generation.sources.len(), "retrieval sources");

        let run_log = match locked.record(domain, &self.config, &output) {
            Ok(run_log) => run_log,
            Err(err) => {
                match self
                    .tracker
                    .save_unrecorded(domain, &self.config, &output.response_text)
                {
                    Ok(path) => error!(
                        domain = %domain,
                        path = %path.display(),
                        "run was not recorded, response saved separately"
                    ),
                    Err(save_err) => error!(
                        domain = %domain,
                        error = %save_err,
                        "run was not recorded and the response could not be saved"
                    ),
                }
                return Err(err.context(format!("failed to record the {domain} run")));
            }
        };
        info!(domain = %domain, elapsed_seconds, "generated domain");

        Ok(DomainResult {
            domain,
            text: generation.text,
            run_log,
        })
    }
}
