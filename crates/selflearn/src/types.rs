//! Row and result shapes shared across the store, pipeline, and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one clustering run.
///
/// A report is created `pending`, and its run must always leave it
/// `success` or `fail`, never parked in `pending` after the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
  Pending,
  Success,
  Fail,
}

impl ReportStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReportStatus::Pending => "pending",
      ReportStatus::Success => "success",
      ReportStatus::Fail => "fail",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(ReportStatus::Pending),
      "success" => Some(ReportStatus::Success),
      "fail" => Some(ReportStatus::Fail),
      _ => None,
    }
  }
}

/// One clustering run over a `[start_time, end_time]` window.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
  pub id: i64,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: ReportStatus,
  pub created_time: DateTime<Utc>,
  /// Number of distinct clusters persisted under this report.
  pub cluster_count: i64,
  /// Number of feedback questions those clusters cover.
  pub question_count: i64,
}

/// A user-submitted question awaiting a standard answer.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackQuestion {
  pub id: i64,
  pub question: String,
  pub std_question: Option<String>,
  pub created_time: DateTime<Utc>,
  pub updated_time: Option<DateTime<Utc>>,
}

/// One cluster as read back for a report.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
  pub id: i64,
  pub question_count: i64,
  pub tags: Vec<String>,
}

/// In-memory result of one clustering run, handed to the store whole.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringOutcome {
  /// How many questions survived embedding and entered the clusterer.
  pub num_clustered: usize,
  pub clusters: Vec<ClusterOutcome>,
}

/// Membership and tags of a single cluster before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
  /// Feedback question ids assigned to this cluster.
  pub members: Vec<i64>,
  /// Representative tags, sorted for a stable identity.
  pub tags: Vec<String>,
}
