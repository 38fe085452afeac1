use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{EvaluateArgs, EvaluateCommand, ReviewerArgs, ShowRunArgs, SubmitEvalArgs};
use crate::evaluation::{EvalData, EvaluationRun, EvaluationStore, discover_runs, load_run_state};

pub fn run(args: EvaluateArgs) -> Result<()> {
    match args.command {
        EvaluateCommand::Runs(args) => list_runs(args),
        EvaluateCommand::Show(args) => show_run(args),
        EvaluateCommand::Submit(args) => submit_eval(args),
    }
}

struct Session {
    store: EvaluationStore,
    user_hash: String,
    runs: Vec<EvaluationRun>,
}

fn open_session(reviewer: &ReviewerArgs) -> Result<Session> {
    let runs = discover_runs(&reviewer.output_dir)?;
    let mut store = EvaluationStore::load(&reviewer.results_dir)?;
    store.register_papers(runs.iter().map(|item| item.paper.as_str()));
    let user_hash = store.login(&reviewer.first_name, &reviewer.last_name)?;
    info!(runs = runs.len(), user = %user_hash, "evaluation session opened");
    Ok(Session {
        store,
        user_hash,
        runs,
    })
}

fn list_runs(args: ReviewerArgs) -> Result<()> {
    let session = open_session(&args)?;
    session.store.save()?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    for (index, item) in session.runs.iter().enumerate() {
        let file_name = item.file_name();
        let evaluated = session.store.user_eval(&session.user_hash, &file_name).is_some();
        writeln!(
            output,
            "{index}\t{}\t{}\t{file_name}\t{}",
            item.paper,
            item.domain,
            if evaluated { "evaluated" } else { "pending" }
        )?;
    }
    output.flush()?;
    Ok(())
}

fn show_run(args: ShowRunArgs) -> Result<()> {
    let session = open_session(&args.reviewer)?;
    session.store.save()?;
    let defaults = EvalData::defaults()?;
    let state = load_run_state(
        &args.reviewer.output_dir,
        &session.runs,
        args.run_index,
        &session.store,
        &session.user_hash,
        &defaults,
    )?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &state)
        .context("failed to serialize run state json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn submit_eval(args: SubmitEvalArgs) -> Result<()> {
    let mut session = open_session(&args.reviewer)?;
    let Some(item) = session.runs.get(args.run_index) else {
        bail!(
            "run index {} out of range, {} runs available",
            args.run_index,
            session.runs.len()
        );
    };

    let raw = fs::read(&args.eval_path)
        .with_context(|| format!("failed to read {}", args.eval_path.display()))?;
    let eval: EvalData = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse evaluation {}", args.eval_path.display()))?;

    let defaults = EvalData::defaults()?;
    let recorded = session.store.submit(
        &session.user_hash,
        &item.paper,
        &item.file_name(),
        eval,
        &defaults,
    )?;
    session.store.save()?;
    info!(run_index = args.run_index, recorded, "evaluation submitted");
    Ok(())
}
