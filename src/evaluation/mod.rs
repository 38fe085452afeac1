//! Reviewer evaluations of recorded runs: walking the runs of every output
//! target, presenting one run at a time, and persisting submitted scores.

mod model;
mod runs;
mod store;

pub use model::EvalData;
pub use runs::{EvaluationRun, discover_runs, load_run_state};
pub use store::EvaluationStore;

pub const USERS_FILE: &str = "users.json";
pub const USER_RESULTS_FILE: &str = "user_results.json";
pub const BCO_RESULTS_FILE: &str = "bco_results.json";
pub const HUMAN_CURATED_DIR: &str = "human_curated";
