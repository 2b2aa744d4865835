//! Clustering pipeline.
//!
//! Ties the stages together: fetch the feedback window, enrich it
//! through NLU, embed, cluster, rank, tag, and persist the result
//! under a report. `prepare` and `run_report` are split so the worker
//! can answer the trigger immediately and run the heavy part in the
//! background.

use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use kmeans::{rank_clusters, KmeansConfig};
use tracing::{debug, info};

use crate::config::Config;
use crate::nlu::NluClient;
use crate::store::{SqliteStore, StoreError};
use crate::tags::extract_tags;
use crate::types::{ClusterOutcome, ClusteringOutcome, ReportStatus};
use crate::wordvec::WordVectors;

/// Tags kept per cluster before merging.
const TAGS_PER_CLUSTER: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  #[error("start time must precede end time")]
  BadWindow,
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// What a trigger call hands back: the report to poll, and whether it
/// was freshly created or an earlier run over the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
  pub report_id: i64,
  pub duplicate: bool,
}

/// The clustering service: storage, NLU access, the word-vector table
/// and the tunables, shared behind an `Arc` by the worker and the API.
pub struct SelfLearnService {
  store: SqliteStore,
  nlu: NluClient,
  word_vectors: WordVectors,
  config: Config,
}

impl SelfLearnService {
  pub fn new(store: SqliteStore, nlu: NluClient, word_vectors: WordVectors, config: Config) -> Self {
    Self { store, nlu, word_vectors, config }
  }

  pub fn store(&self) -> &SqliteStore {
    &self.store
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Validate a trigger and create (or reuse) its report.
  ///
  /// A window already covered by a pending or successful report is not
  /// re-run; the caller gets the existing report instead.
  pub fn prepare(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<TriggerOutcome, TriggerError> {
    if start >= end {
      return Err(TriggerError::BadWindow);
    }
    if let Some(existing) = self.store.find_duplicate_report(start, end)? {
      info!(report_id = existing, "window already clustered, reusing report");
      return Ok(TriggerOutcome { report_id: existing, duplicate: true });
    }
    let report_id = self.store.create_report(start, end)?;
    Ok(TriggerOutcome { report_id, duplicate: false })
  }

  /// Execute the full pipeline for a prepared report.
  ///
  /// Any error leaves the report pending; the caller is responsible
  /// for marking it failed. On success the clusters are persisted and
  /// the report flipped to success atomically with them.
  pub async fn run_report(
    &self,
    report_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> anyhow::Result<()> {
    let questions =
      self.store.fetch_feedback_questions(start, end, self.config.max_num_to_cluster)?;
    if questions.is_empty() {
      bail!("no feedback questions in window");
    }
    info!(report_id, questions = questions.len(), "clustering run started");

    let analyzed = self.nlu.analyze(&questions, self.word_vectors.stop_words()).await;

    let mut ids = Vec::with_capacity(analyzed.len());
    let mut keyword_sets = Vec::with_capacity(analyzed.len());
    let mut embeddings = Vec::with_capacity(analyzed.len());
    let mut coverage_sum = 0.0;
    for item in &analyzed {
      if let Some((vector, coverage)) = self.word_vectors.sentence_vector(&item.tokens, &item.keywords)
      {
        ids.push(item.feedback_id);
        keyword_sets.push(item.keywords.clone());
        embeddings.push(vector);
        coverage_sum += coverage;
      } else {
        debug!(feedback_id = item.feedback_id, "no known tokens, question skipped");
      }
    }
    if embeddings.is_empty() {
      bail!("no question produced an embedding");
    }
    info!(
      report_id,
      embedded = embeddings.len(),
      analyzed = analyzed.len(),
      mean_coverage = coverage_sum / embeddings.len() as f64,
      "questions embedded"
    );

    let k = (embeddings.len() / self.config.cluster_batch).max(1);
    let clustered = KmeansConfig::new(k, self.config.early_stop_threshold)
      .run(&embeddings)
      .context("clustering failed")?;
    let ranked = rank_clusters(&clustered, k, self.config.min_size_cluster, k);

    let outcome = self.summarize(&ranked, &ids, &keyword_sets, embeddings.len());
    info!(report_id, clusters = outcome.clusters.len(), "clustering run finished");

    self.store.persist_clusters(report_id, &outcome)?;
    self.store.set_report_status(report_id, ReportStatus::Success)?;
    Ok(())
  }

  /// Tag each ranked cluster and merge clusters that land on the same
  /// tag set, so one topic split across centroids surfaces once.
  fn summarize(
    &self,
    ranked: &[Vec<usize>],
    ids: &[i64],
    keyword_sets: &[Vec<String>],
    num_clustered: usize,
  ) -> ClusteringOutcome {
    let mut merged: HashMap<String, ClusterOutcome> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for member_indices in ranked {
      let pool: Vec<String> =
        member_indices.iter().flat_map(|&i| keyword_sets[i].iter().cloned()).collect();
      let mut tags: Vec<String> =
        extract_tags(&pool, TAGS_PER_CLUSTER).into_iter().map(|(text, _)| text).collect();
      tags.sort();
      let key = tags.join("|");
      let members = member_indices.iter().map(|&i| ids[i]);
      match merged.get_mut(&key) {
        Some(cluster) => cluster.members.extend(members),
        None => {
          merged.insert(key.clone(), ClusterOutcome { members: members.collect(), tags });
          order.push(key);
        }
      }
    }
    let clusters = order
      .into_iter()
      .map(|key| merged.remove(&key).unwrap_or(ClusterOutcome { members: Vec::new(), tags: Vec::new() }))
      .collect();
    ClusteringOutcome { num_clustered, clusters }
  }
}
