//! Background execution of clustering runs.
//!
//! Triggers return as soon as a report row exists; the actual run
//! happens on a spawned task gated by a semaphore so a burst of
//! triggers cannot pile CPU-heavy runs on top of each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::error;

use crate::pipeline::{SelfLearnService, TriggerError, TriggerOutcome};
use crate::types::ReportStatus;

pub struct ClusterWorker {
  service: Arc<SelfLearnService>,
  permits: Arc<Semaphore>,
}

impl ClusterWorker {
  pub fn new(service: Arc<SelfLearnService>, max_concurrent: usize) -> Self {
    Self { service, permits: Arc::new(Semaphore::new(max_concurrent.max(1))) }
  }

  /// Prepare a run and, if the window is new, launch it in the
  /// background. The returned outcome is what the API answers with.
  ///
  /// Two simultaneous triggers for the same window can both pass the
  /// duplicate check and create two reports; the window is tiny and a
  /// redundant run is harmless, so no cross-process lock is taken.
  pub fn trigger(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<TriggerOutcome, TriggerError> {
    let outcome = self.service.prepare(start, end)?;
    if !outcome.duplicate {
      self.spawn_run(outcome.report_id, start, end);
    }
    Ok(outcome)
  }

  fn spawn_run(&self, report_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) {
    let service = Arc::clone(&self.service);
    let permits = Arc::clone(&self.permits);
    tokio::spawn(async move {
      // Semaphore is never closed, acquire can only succeed.
      let Ok(_permit) = permits.acquire_owned().await else {
        return;
      };
      let run_service = Arc::clone(&service);
      let handle =
        tokio::spawn(async move { run_service.run_report(report_id, start, end).await });
      let failure = match handle.await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(join_err) => Some(format!("run task panicked: {join_err}")),
      };
      if let Some(reason) = failure {
        error!(report_id, "clustering run failed: {reason}");
        if let Err(e) = service.store().set_report_status(report_id, ReportStatus::Fail) {
          error!(report_id, "could not mark report failed: {e}");
        }
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::nlu::NluClient;
  use crate::store::SqliteStore;
  use crate::wordvec::WordVectors;
  use std::path::PathBuf;
  use std::time::Duration;

  fn test_worker() -> (ClusterWorker, Arc<SelfLearnService>) {
    let config = Config {
      cluster_batch: 2,
      early_stop_threshold: 3,
      max_num_to_cluster: 100,
      min_size_cluster: 1,
      nlu_url: "http://127.0.0.1:1".to_string(),
      resources_path: PathBuf::new(),
      database: PathBuf::new(),
      max_concurrent_runs: 1,
    };
    let store = SqliteStore::open_in_memory().unwrap();
    let nlu = NluClient::new(&config.nlu_url);
    let service =
      Arc::new(SelfLearnService::new(store, nlu, WordVectors::empty_for_tests(), config));
    (ClusterWorker::new(Arc::clone(&service), 1), service)
  }

  fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
  }

  #[tokio::test]
  async fn failed_run_marks_report_failed() {
    let (worker, service) = test_worker();
    // No feedback in the window, so the background run must fail.
    let outcome = worker.trigger(ts(100), ts(200)).unwrap();
    assert!(!outcome.duplicate);

    let mut status = ReportStatus::Pending;
    for _ in 0..50 {
      status = service.store().get_report(outcome.report_id).unwrap().status;
      if status != ReportStatus::Pending {
        break;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, ReportStatus::Fail);
  }

  #[tokio::test]
  async fn duplicate_trigger_reuses_pending_report() {
    let (worker, _service) = test_worker();
    // No await between the calls: the spawned run has not started yet,
    // so the report is still pending when the second trigger arrives.
    let first = worker.trigger(ts(100), ts(200)).unwrap();
    let again = worker.trigger(ts(100), ts(200)).unwrap();
    assert!(!first.duplicate);
    assert!(again.duplicate);
    assert_eq!(again.report_id, first.report_id);
  }
}
