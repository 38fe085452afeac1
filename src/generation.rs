use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::GeneratorOutput;
use crate::domain::Domain;
use crate::model::{ChunkingStrategy, ParameterConfiguration};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub domain: Domain,
    pub prompt: String,
    pub document_path: &'a Path,
    pub other_docs: &'a [PathBuf],
    pub config: &'a ParameterConfiguration,
    pub chunking: Option<ChunkingStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<SourceNode>,
}

/// The retrieval + language model service answering one domain query.
pub trait Generator {
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<Generation>;
}

/// Delegates generation to an external program. The request is written to
/// its stdin as JSON; stdout is read according to `output`.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    output: GeneratorOutput,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, output: GeneratorOutput) -> Self {
        Self {
            program: program.into(),
            args,
            output,
        }
    }
}

impl Generator for CommandGenerator {
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<Generation> {
        let payload =
            serde_json::to_vec(request).context("failed to serialize generation request")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute generator {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .with_context(|| format!("failed to send request to {}", self.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for generator {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "generator {} returned non-zero exit status for the {} domain: {}",
                self.program,
                request.domain,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        parse_generator_output(&stdout, self.output)
            .with_context(|| format!("invalid output from generator {}", self.program))
    }
}

/// Text mode keeps stdout byte for byte. Envelope mode requires a
/// `{"text": ..., "sources": [...]}` object.
pub fn parse_generator_output(stdout: &str, mode: GeneratorOutput) -> Result<Generation> {
    match mode {
        GeneratorOutput::Text => Ok(Generation {
            text: stdout.to_string(),
            sources: Vec::new(),
        }),
        GeneratorOutput::Envelope => {
            let generation = serde_json::from_str::<Generation>(stdout)
                .context("generator output is not a JSON envelope")?;
            debug!(sources = generation.sources.len(), "parsed generator envelope");
            Ok(generation)
        }
    }
}

pub fn format_sources(sources: &[SourceNode]) -> String {
    let total = sources.len();
    let mut out = String::new();
    for (idx, node) in sources.iter().enumerate() {
        let score = node
            .score
            .map(|value| value.to_string())
            .unwrap_or_else(|| "None".to_string());
        out.push_str(&format!(
            "\n--------------- Source Node '{}/{}' ---------------",
            idx + 1,
            total
        ));
        out.push_str(&format!("\nNode ID: '{}'", node.node_id));
        out.push_str(&format!("\nSimilarity: '{score}'"));
        out.push_str(&format!("\nMetadata String:\n`{}`", node.metadata));
        out.push_str(&format!("\nMetadata Size: `{}`", node.metadata.len()));
        out.push_str(&format!("\nContent Size: `{}`", node.content.len()));
        out.push_str(&format!("\nRetrieved Text:\n{}\n", node.content.trim()));
        out.push('\n');
    }
    out
}
