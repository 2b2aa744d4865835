//! Service configuration.
//!
//! Every option can come from the environment so deployments keep the
//! knobs they had before, with CLI flags layered on top.

use std::path::PathBuf;

/// Tunables for one service instance.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
  /// Points-per-cluster divisor: a run asks for max(1, n / cluster_batch) clusters
  #[arg(long, env = "CLUSTER_BATCH", default_value_t = 50, value_parser = at_least_one)]
  pub cluster_batch: usize,

  /// Maximum Lloyd iterations before a run gives up converging
  #[arg(long, env = "EARLY_STOP_THRESHOLD", default_value_t = 3)]
  pub early_stop_threshold: usize,

  /// Cap on feedback questions fetched per run
  #[arg(long, env = "MAX_NUM_TO_CLUSTER", default_value_t = 10_000)]
  pub max_num_to_cluster: usize,

  /// Smallest cluster worth keeping in the ranked output
  #[arg(long, env = "MIN_SIZE_CLUSTER", default_value_t = 10)]
  pub min_size_cluster: usize,

  /// Endpoint of the NLU segmentation/keyword service
  #[arg(long, env = "NLU_URL", default_value = "http://127.0.0.1:13901")]
  pub nlu_url: String,

  /// Directory holding vectors.txt and stopwords.txt
  #[arg(long, env = "RESOURCES_PATH")]
  pub resources_path: PathBuf,

  /// SQLite database location
  #[arg(long, env = "SELFLEARN_DB", default_value_os_t = default_db_path())]
  pub database: PathBuf,

  /// How many clustering runs may execute at once
  #[arg(long, env = "MAX_CONCURRENT_RUNS", default_value_t = 2)]
  pub max_concurrent_runs: usize,
}

/// Zero would panic the run's cluster-count division, so refuse it up
/// front with a readable parse error.
fn at_least_one(s: &str) -> Result<usize, String> {
  let value: usize = s.parse().map_err(|e| format!("{e}"))?;
  if value == 0 {
    return Err("must be at least 1".to_string());
  }
  Ok(value)
}

/// Default database location, shared by subcommands that only need storage.
pub fn default_db_path() -> PathBuf {
  dirs::home_dir()
    .unwrap_or_else(|| PathBuf::from("/tmp"))
    .join(".selflearn")
    .join("selflearn.db")
}
