use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, info_span};

use crate::domain::Domain;
use crate::generation::Generator;
use crate::session::{GenerationSession, SourceDocument};

use super::{Backoff, SweepCandidate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub failed_sessions: usize,
    pub succeeded_domains: usize,
    pub failed_domains: usize,
}

/// Runs sweep candidates one after another, pausing between them.
pub struct SweepDriver {
    output_dir: PathBuf,
    backoff: Backoff,
    rng: StdRng,
}

impl SweepDriver {
    pub fn new(output_dir: impl Into<PathBuf>, backoff: Backoff) -> Self {
        Self {
            output_dir: output_dir.into(),
            backoff,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// A failing domain is logged and the next domain runs; a candidate whose
    /// session cannot be built is logged and skipped.
    pub fn run<G, M, S>(
        &mut self,
        candidates: &[SweepCandidate],
        domains: &[Domain],
        mut make_generator: M,
        mut sleep: S,
    ) -> SweepReport
    where
        G: Generator,
        M: FnMut(&SweepCandidate) -> Result<G>,
        S: FnMut(Duration),
    {
        let total = candidates.len();
        let mut report = SweepReport {
            candidates: total,
            ..SweepReport::default()
        };
        info!(candidates = total, domains = domains.len(), "starting sweep");

        for (position, candidate) in candidates.iter().enumerate() {
            let iteration = position + 1;
            let span = info_span!(
                "candidate",
                iteration,
                total,
                document = %candidate.document.display()
            );
            let _entered = span.enter();

            let mut session = match self.open_session(candidate, &mut make_generator) {
                Ok(session) => session,
                Err(err) => {
                    error!(
                        error = %format!("{err:#}"),
                        "failed to start session, skipping candidate"
                    );
                    report.failed_sessions += 1;
                    continue;
                }
            };

            for domain in domains {
                match session.perform_query(*domain) {
                    Ok(_) => report.succeeded_domains += 1,
                    Err(err) => {
                        error!(
                            domain = %domain,
                            error = %format!("{err:#}"),
                            "domain generation failed"
                        );
                        report.failed_domains += 1;
                    }
                }
            }

            let delay = self.backoff.delay();
            info!(seconds = self.backoff.current_seconds(), "backing off");
            sleep(delay);
            self.backoff.advance_with(iteration, &mut self.rng);
        }

        info!(
            candidates = report.candidates,
            failed_sessions = report.failed_sessions,
            succeeded_domains = report.succeeded_domains,
            failed_domains = report.failed_domains,
            "sweep finished"
        );
        report
    }

    fn open_session<G, M>(
        &self,
        candidate: &SweepCandidate,
        make_generator: &mut M,
    ) -> Result<GenerationSession<G>>
    where
        G: Generator,
        M: FnMut(&SweepCandidate) -> Result<G>,
    {
        let document = SourceDocument::from_path(&candidate.document)?;
        let generator = make_generator(candidate)?;
        Ok(GenerationSession::new(
            document,
            candidate.other_docs.clone(),
            candidate.config.clone(),
            &self.output_dir,
            generator,
        ))
    }
}
