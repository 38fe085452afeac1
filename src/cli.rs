use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::Domain;
use crate::search::{DEFAULT_BACKOFF_SECONDS, DEFAULT_DELAY_RESET};

#[derive(Parser, Debug)]
#[command(
    name = "bcorag",
    version,
    about = "BioCompute Object generation runs with per-configuration run tracking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Generate(GenerateArgs),
    GridSearch(GridSearchArgs),
    RandomSearch(RandomSearchArgs),
    Status(StatusArgs),
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// Program answering one domain query per invocation.
    #[arg(long)]
    pub generator: String,

    #[arg(long = "generator-arg", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// How generator stdout is read: verbatim answer text, or a JSON
    /// envelope carrying the answer and its retrieval sources.
    #[arg(long, value_enum, default_value_t = GeneratorOutput::Text)]
    pub generator_output: GeneratorOutput,

    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub options_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GeneratorOutput {
    Text,
    Envelope,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub llm: Option<String>,

    #[arg(long)]
    pub embedding_model: Option<String>,

    #[arg(long)]
    pub vector_store: Option<String>,

    #[arg(long)]
    pub loader: Option<String>,

    #[arg(long)]
    pub similarity_top_k: Option<u32>,

    #[arg(long)]
    pub chunking_config: Option<String>,

    #[arg(long)]
    pub github_url: Option<String>,

    #[arg(long, requires = "github_url")]
    pub git_branch: Option<String>,

    /// `<include|exclude>:<directory|file_extension>:v1,v2`
    #[arg(long = "git-filter", requires = "github_url")]
    pub git_filters: Vec<String>,

    #[arg(long = "domain", value_parser = parse_domain)]
    pub domains: Vec<Domain>,

    #[arg(long = "other-doc")]
    pub other_docs: Vec<PathBuf>,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[arg(long)]
    pub space: PathBuf,

    #[arg(long = "domain", value_parser = parse_domain)]
    pub domains: Vec<Domain>,

    #[arg(long, default_value_t = DEFAULT_BACKOFF_SECONDS)]
    pub backoff_seconds: f64,

    #[arg(long, default_value_t = DEFAULT_DELAY_RESET)]
    pub delay_reset: usize,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GridSearchArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RandomSearchArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    #[arg(long, default_value_t = 5)]
    pub subset_size: usize,

    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Output target directory holding `output_map.json`.
    #[arg(long)]
    pub target: PathBuf,

    #[arg(long, default_value_t = false)]
    pub rebuild_tsv: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(subcommand)]
    pub command: EvaluateCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EvaluateCommand {
    /// List every recorded run with its index.
    Runs(ReviewerArgs),
    /// Print one run and the reviewer's current evaluation as JSON.
    Show(ShowRunArgs),
    /// Record the reviewer's evaluation of one run.
    Submit(SubmitEvalArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReviewerArgs {
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "./evaluator/results")]
    pub results_dir: PathBuf,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShowRunArgs {
    #[arg(long)]
    pub run_index: usize,

    #[command(flatten)]
    pub reviewer: ReviewerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitEvalArgs {
    #[arg(long)]
    pub run_index: usize,

    /// JSON file holding the evaluation, shaped like `show`'s `eval_data`.
    #[arg(long = "eval")]
    pub eval_path: PathBuf,

    #[command(flatten)]
    pub reviewer: ReviewerArgs,
}

fn parse_domain(raw: &str) -> Result<Domain, String> {
    Domain::from_selection(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_accepts_domain_codes_and_names() {
        let cli = Cli::try_parse_from([
            "bcorag",
            "generate",
            "--file",
            "paper.pdf",
            "--domain",
            "u",
            "--domain",
            "execution",
            "--domain",
            "err",
            "--generator",
            "./answer.sh",
            "--generator-arg",
            "--model-dir",
        ])
        .unwrap();

        let Commands::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(
            args.domains,
            vec![Domain::Usability, Domain::Execution, Domain::Error]
        );
        assert_eq!(args.generator.output_dir, PathBuf::from("./output"));
        assert_eq!(args.generator.generator_args, vec!["--model-dir".to_string()]);
        assert_eq!(args.generator.generator_output, GeneratorOutput::Text);
    }

    #[test]
    fn envelope_output_mode_is_selectable() {
        let cli = Cli::try_parse_from([
            "bcorag",
            "generate",
            "--file",
            "paper.pdf",
            "--generator",
            "./answer.sh",
            "--generator-output",
            "envelope",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.generator.generator_output, GeneratorOutput::Envelope);
    }

    #[test]
    fn evaluate_submit_parses_reviewer_and_run() {
        let cli = Cli::try_parse_from([
            "bcorag",
            "evaluate",
            "submit",
            "--run-index",
            "4",
            "--eval",
            "eval.json",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
        ])
        .unwrap();
        let Commands::Evaluate(EvaluateArgs {
            command: EvaluateCommand::Submit(args),
        }) = cli.command
        else {
            panic!("expected evaluate submit command");
        };
        assert_eq!(args.run_index, 4);
        assert_eq!(args.eval_path, PathBuf::from("eval.json"));
        assert_eq!(args.reviewer.output_dir, PathBuf::from("./output"));
        assert_eq!(args.reviewer.first_name, "Ada");
    }

    #[test]
    fn unknown_domain_is_rejected() {
        let result = Cli::try_parse_from([
            "bcorag",
            "generate",
            "--file",
            "paper.pdf",
            "--domain",
            "x",
            "--generator",
            "./answer.sh",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn random_search_defaults() {
        let cli = Cli::try_parse_from([
            "bcorag",
            "random-search",
            "--space",
            "space.json",
            "--generator",
            "./answer.sh",
            "--seed",
            "9",
        ])
        .unwrap();

        let Commands::RandomSearch(args) = cli.command else {
            panic!("expected random-search command");
        };
        assert_eq!(args.subset_size, 5);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.sweep.backoff_seconds, DEFAULT_BACKOFF_SECONDS);
        assert_eq!(args.sweep.delay_reset, DEFAULT_DELAY_RESET);
        assert!(args.sweep.domains.is_empty());
    }
}
