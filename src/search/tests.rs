use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

use super::*;
use crate::domain::Domain;
use crate::fingerprint::fingerprint;
use crate::generation::{Generation, GenerationRequest, Generator};
use crate::model::{FilterDirection, FilterKind, GitFilter, GitSource};
use crate::options::OptionsCatalogue;

fn write_paper(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.7").unwrap();
    path
}

fn small_space(papers: Vec<PathBuf>) -> SearchSpaceFile {
    SearchSpaceFile {
        filenames: Some(papers),
        loader: Some(vec!["SimpleDirectoryReader".to_string()]),
        chunking_config: Some(vec!["1024 chunk size/20 chunk overlap".to_string()]),
        embedding_model: Some(vec!["text-embedding-3-small".to_string()]),
        vector_store: Some(vec!["VectorStoreIndex".to_string()]),
        similarity_top_k: Some(vec![1, 3]),
        llm: Some(vec!["gpt-4".to_string(), "gpt-4o-mini".to_string()]),
        ..SearchSpaceFile::default()
    }
}

fn git_source() -> GitSource {
    GitSource {
        user: "biocompute-objects".to_string(),
        repo: "bco-rag".to_string(),
        branch: "main".to_string(),
        filters: vec![GitFilter::new(
            FilterDirection::Include,
            FilterKind::FileExtension,
            vec![".py".to_string()],
        )],
    }
}

#[test]
fn grid_enumerates_full_product_in_axis_order() {
    let dir = tempdir().unwrap();
    let first = write_paper(dir.path(), "a.pdf");
    let second = write_paper(dir.path(), "b.pdf");
    let catalogue = OptionsCatalogue::builtin().unwrap();
    let space =
        SearchSpace::resolve(small_space(vec![first.clone(), second.clone()]), &catalogue)
            .unwrap();

    let candidates = enumerate_grid(&space);
    assert_eq!(candidates.len(), 8);
    assert_eq!(space.population(), 8);

    assert_eq!(candidates[0].config.llm, "gpt-4");
    assert_eq!(candidates[0].document, first);
    assert_eq!(candidates[0].config.similarity_top_k, 1);
    assert_eq!(candidates[1].config.similarity_top_k, 3);
    assert_eq!(candidates[2].document, second);
    assert_eq!(candidates[4].config.llm, "gpt-4o-mini");
    assert_eq!(candidates[4].document, first);
    assert!(candidates.iter().all(|candidate| candidate.config.git_data.is_none()));
}

#[test]
fn git_data_and_other_docs_match_by_path_or_basename() {
    let dir = tempdir().unwrap();
    let first = write_paper(dir.path(), "a.pdf");
    let second = write_paper(dir.path(), "b.pdf");
    let supplement = write_paper(dir.path(), "supplement.pdf");
    let catalogue = OptionsCatalogue::builtin().unwrap();

    let mut file = small_space(vec![first.clone(), second.clone()]);
    file.git_data = Some(vec![GitDataFileConfig {
        filename: "b.pdf".to_string(),
        git_info: git_source(),
    }]);
    file.other_docs = Some(BTreeMap::from([(
        "a.pdf".to_string(),
        vec![supplement.clone()],
    )]));
    let space = SearchSpace::resolve(file, &catalogue).unwrap();

    for candidate in enumerate_grid(&space) {
        if candidate.document == second {
            assert_eq!(candidate.config.git_data, Some(git_source()));
            assert!(candidate.other_docs.is_empty());
        } else {
            assert!(candidate.config.git_data.is_none());
            assert_eq!(candidate.other_docs, vec![supplement.clone()]);
        }
    }

    let mut by_path = small_space(vec![first.clone()]);
    by_path.git_data = Some(vec![GitDataFileConfig {
        filename: first.to_string_lossy().into_owned(),
        git_info: git_source(),
    }]);
    by_path.other_docs = Some(BTreeMap::from([(
        first.to_string_lossy().into_owned(),
        vec![supplement.clone()],
    )]));
    let space = SearchSpace::resolve(by_path, &catalogue).unwrap();
    assert_eq!(space.git_data_for(&first), Some(git_source()));
    assert_eq!(space.other_docs_for(&first), vec![supplement.clone()]);
    assert_eq!(
        enumerate_grid(&space)[0].other_docs,
        vec![supplement.clone()]
    );
    assert!(space.other_docs_for(&second).is_empty());
}

#[test]
fn oversized_random_sample_returns_whole_population_without_duplicates() {
    let dir = tempdir().unwrap();
    let first = write_paper(dir.path(), "a.pdf");
    let second = write_paper(dir.path(), "b.pdf");
    let catalogue = OptionsCatalogue::builtin().unwrap();
    let space = SearchSpace::resolve(small_space(vec![first, second]), &catalogue).unwrap();

    let sampled = enumerate_random(&space, 100, Some(7));
    assert_eq!(sampled.len(), space.population());
    let distinct = sampled
        .iter()
        .map(|candidate| (candidate.document.clone(), fingerprint(&candidate.config)))
        .collect::<HashSet<(PathBuf, String)>>();
    assert_eq!(distinct.len(), sampled.len());
}

#[test]
fn seeded_random_sample_is_reproducible() {
    let dir = tempdir().unwrap();
    let paper = write_paper(dir.path(), "a.pdf");
    let catalogue = OptionsCatalogue::builtin().unwrap();
    let mut file = small_space(vec![paper]);
    file.similarity_top_k = None;
    let space = SearchSpace::resolve(file, &catalogue).unwrap();
    assert_eq!(space.similarity_top_k, vec![1, 2, 3, 4, 5]);

    let first = enumerate_random(&space, 4, Some(42));
    let second = enumerate_random(&space, 4, Some(42));
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert!(enumerate_random(&space, 0, Some(42)).is_empty());
}

#[test]
fn resolve_rejects_unknown_values_and_missing_papers() {
    let dir = tempdir().unwrap();
    let paper = write_paper(dir.path(), "a.pdf");
    let catalogue = OptionsCatalogue::builtin().unwrap();

    let mut unknown_llm = small_space(vec![paper.clone()]);
    unknown_llm.llm = Some(vec!["not-a-model".to_string()]);
    let err = SearchSpace::resolve(unknown_llm, &catalogue).unwrap_err();
    assert!(err.to_string().contains("not-a-model"));

    let missing = small_space(vec![dir.path().join("missing.pdf")]);
    assert!(SearchSpace::resolve(missing, &catalogue).is_err());

    let mut empty_axis = small_space(vec![paper]);
    empty_axis.loader = Some(Vec::new());
    let err = SearchSpace::resolve(empty_axis, &catalogue).unwrap_err();
    assert!(err.to_string().contains("loader"));
}

#[test]
fn search_space_file_parses_git_info() {
    let raw = r#"{
        "llm": ["gpt-4"],
        "git_data": [{
            "filename": "paper.pdf",
            "git_info": {
                "user": "biocompute-objects",
                "repo": "bco-rag",
                "branch": "main",
                "filters": [
                    {"direction": "include", "kind": "file_extension", "values": [".py"]}
                ]
            }
        }],
        "other_docs": {"paper.pdf": ["supplement.pdf"]}
    }"#;
    let file: SearchSpaceFile = serde_json::from_str(raw).unwrap();
    assert_eq!(file.llm, Some(vec!["gpt-4".to_string()]));
    assert!(file.loader.is_none());
    let git_data = file.git_data.unwrap();
    assert_eq!(git_data[0].git_info, git_source());
    assert_eq!(
        file.other_docs.unwrap()["paper.pdf"],
        vec![PathBuf::from("supplement.pdf")]
    );
}

#[test]
fn backoff_grows_then_resets_every_delay_reset_iterations() {
    let mut backoff = Backoff::new(2.0, 3);
    assert_eq!(backoff.current_seconds(), 2.0);

    backoff.advance(1, 0.5);
    assert_eq!(backoff.current_seconds(), 4.5);
    backoff.advance(2, 0.25);
    assert_eq!(backoff.current_seconds(), 9.25);
    backoff.advance(3, 0.9);
    assert_eq!(backoff.current_seconds(), 2.0);
    backoff.advance(4, 0.0);
    assert_eq!(backoff.current_seconds(), 4.0);
}

#[test]
fn backoff_is_capped_on_long_sweeps() {
    let mut backoff = Backoff::new(2.0, 1000);
    for iteration in 1..=200 {
        backoff.advance(iteration, 0.99);
        assert!(backoff.current_seconds() <= MAX_BACKOFF_SECONDS);
    }
    assert_eq!(backoff.current_seconds(), MAX_BACKOFF_SECONDS);
    assert_eq!(
        backoff.delay(),
        Duration::from_secs_f64(MAX_BACKOFF_SECONDS)
    );

    let oversized = Backoff::new(f64::MAX, 3);
    assert_eq!(oversized.current_seconds(), MAX_BACKOFF_SECONDS);
    assert_eq!(Backoff::new(f64::NAN, 3), Backoff::default());
}

#[test]
fn backoff_jitter_stays_below_one_second() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut backoff = Backoff::default();
    for iteration in 1..=20 {
        let before = backoff.current_seconds();
        backoff.advance_with(iteration, &mut rng);
        let after = backoff.current_seconds();
        if iteration % DEFAULT_DELAY_RESET == 0 {
            assert_eq!(after, DEFAULT_BACKOFF_SECONDS);
        } else {
            assert!(after >= 2.0 * before);
            assert!(after < 2.0 * before + 1.0);
        }
    }
}

struct FlakyGenerator {
    failures: VecDeque<Domain>,
}

impl Generator for FlakyGenerator {
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<Generation> {
        if self.failures.front() == Some(&request.domain) {
            self.failures.pop_front();
            return Err(anyhow!("quota exceeded"));
        }
        Ok(Generation {
            text: "{\"ok\": true}".to_string(),
            sources: Vec::new(),
        })
    }
}

#[test]
fn driver_continues_past_failed_domains_and_sessions() {
    let dir = tempdir().unwrap();
    let paper = write_paper(dir.path(), "Sweep Paper.pdf");
    let output_dir = dir.path().join("output");
    let catalogue = OptionsCatalogue::builtin().unwrap();
    let mut file = small_space(vec![paper.clone()]);
    file.llm = Some(vec!["gpt-4".to_string()]);
    let space = SearchSpace::resolve(file, &catalogue).unwrap();

    let mut candidates = enumerate_grid(&space);
    let mut vanished = candidates[0].clone();
    vanished.document = dir.path().join("vanished.pdf");
    candidates.insert(1, vanished);
    assert_eq!(candidates.len(), 3);

    let mut sleeps = Vec::new();
    let mut built = 0usize;
    let mut driver =
        SweepDriver::new(&output_dir, Backoff::new(2.0, 3)).with_rng(StdRng::seed_from_u64(3));
    let report = driver.run(
        &candidates,
        &[Domain::Usability, Domain::Io],
        |_| {
            built += 1;
            Ok(FlakyGenerator {
                failures: if built == 1 {
                    VecDeque::from(vec![Domain::Io])
                } else {
                    VecDeque::new()
                },
            })
        },
        |delay: Duration| sleeps.push(delay),
    );

    assert_eq!(
        report,
        SweepReport {
            candidates: 3,
            failed_sessions: 1,
            succeeded_domains: 3,
            failed_domains: 1,
        }
    );
    assert_eq!(sleeps.len(), 2);
    assert_eq!(sleeps[0], Duration::from_secs(2));
    assert!(sleeps[1] >= Duration::from_secs(4));
    assert!(sleeps[1] < Duration::from_secs(5));

    let tracker = crate::tracker::OutputTracker::new(output_dir.join("sweep_paper"));
    let run_log = tracker.load().unwrap().unwrap();
    assert_eq!(run_log.usability.len(), 2);
    assert_eq!(run_log.io.len(), 1);
    assert_eq!(run_log.run_count(), 3);
}
