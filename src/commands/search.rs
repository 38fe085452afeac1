use std::thread;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::{GridSearchArgs, RandomSearchArgs, SweepArgs};
use crate::options::OptionsCatalogue;
use crate::search::{
    Backoff, MAX_BACKOFF_SECONDS, SearchSpace, SweepCandidate, SweepDriver, SweepReport,
    enumerate_grid, enumerate_random,
};

use super::{command_generator, selected_domains};

pub fn run_grid(args: GridSearchArgs) -> Result<()> {
    let space = load_space(&args.sweep)?;
    let candidates = enumerate_grid(&space);
    info!(candidates = candidates.len(), "grid search requested");
    let report = drive(&args.sweep, &candidates);
    finish(report)
}

pub fn run_random(args: RandomSearchArgs) -> Result<()> {
    let space = load_space(&args.sweep)?;
    let candidates = enumerate_random(&space, args.subset_size, args.seed);
    info!(
        candidates = candidates.len(),
        subset_size = args.subset_size,
        seed = ?args.seed,
        "random search requested"
    );
    let report = drive(&args.sweep, &candidates);
    finish(report)
}

fn load_space(args: &SweepArgs) -> Result<SearchSpace> {
    if !(0.0..=MAX_BACKOFF_SECONDS).contains(&args.backoff_seconds) {
        bail!("--backoff-seconds must be between 0 and {MAX_BACKOFF_SECONDS}");
    }
    if args.delay_reset == 0 {
        bail!("--delay-reset must be at least 1");
    }
    let catalogue = OptionsCatalogue::load_or_builtin(args.generator.options_path.as_deref())?;
    SearchSpace::load(&args.space, &catalogue)
}

fn drive(args: &SweepArgs, candidates: &[SweepCandidate]) -> SweepReport {
    let domains = selected_domains(&args.domains);
    let mut driver = SweepDriver::new(
        &args.generator.output_dir,
        Backoff::new(args.backoff_seconds, args.delay_reset),
    );
    driver.run(
        candidates,
        &domains,
        |_| Ok(command_generator(&args.generator)),
        thread::sleep,
    )
}

fn finish(report: SweepReport) -> Result<()> {
    if report.candidates > 0 && report.succeeded_domains == 0 {
        bail!(
            "sweep produced no successful generations ({} failed domains, {} failed sessions)",
            report.failed_domains,
            report.failed_sessions
        );
    }
    Ok(())
}
