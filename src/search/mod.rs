use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::model::ParameterConfiguration;

mod backoff;
mod driver;
mod space;
#[cfg(test)]
mod tests;

pub use backoff::{
    Backoff, DEFAULT_BACKOFF_SECONDS, DEFAULT_DELAY_RESET, MAX_BACKOFF_SECONDS,
};
pub use driver::{SweepDriver, SweepReport};
pub use space::{GitDataFileConfig, SearchSpace, SearchSpaceFile};

/// One paper under one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepCandidate {
    pub document: PathBuf,
    pub config: ParameterConfiguration,
    pub other_docs: Vec<PathBuf>,
}

/// Full cartesian product, ordered llm, embedding model, paper, loader,
/// chunking, vector store, top-k.
pub fn enumerate_grid(space: &SearchSpace) -> Vec<SweepCandidate> {
    let mut candidates = Vec::with_capacity(space.population());

    for llm in &space.llm {
        for embedding_model in &space.embedding_model {
            for document in &space.filenames {
                let git_data = space.git_data_for(document);
                let other_docs = space.other_docs_for(document);
                for loader in &space.loader {
                    for chunking_config in &space.chunking_config {
                        for vector_store in &space.vector_store {
                            for similarity_top_k in &space.similarity_top_k {
                                candidates.push(SweepCandidate {
                                    document: document.clone(),
                                    config: ParameterConfiguration {
                                        llm: llm.clone(),
                                        embedding_model: embedding_model.clone(),
                                        vector_store: vector_store.clone(),
                                        loader: loader.clone(),
                                        similarity_top_k: *similarity_top_k,
                                        chunking_config: chunking_config.clone(),
                                        git_data: git_data.clone(),
                                    },
                                    other_docs: other_docs.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    candidates
}

/// Samples `size` distinct grid candidates. Oversized requests are clamped to
/// the population.
pub fn enumerate_random(
    space: &SearchSpace,
    size: usize,
    seed: Option<u64>,
) -> Vec<SweepCandidate> {
    let population = enumerate_grid(space);
    let size = if size > population.len() {
        warn!(
            requested = size,
            population = population.len(),
            "subset size exceeds search space, using the full population"
        );
        population.len()
    } else {
        size
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sampled = population
        .choose_multiple(&mut rng, size)
        .cloned()
        .collect::<Vec<SweepCandidate>>();
    info!(
        sampled = sampled.len(),
        population = population.len(),
        "sampled search space"
    );
    sampled
}
