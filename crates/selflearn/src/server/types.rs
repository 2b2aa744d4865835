//! REST API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClusterSummary, FeedbackQuestion, Report};

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct BaseResponse<T> {
  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API error information
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,
}

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { transaction_id, errors: Vec::new(), data }
  }

  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { transaction_id, errors, data: () }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string() }
  }
}

// Clustering Endpoints
// ====================

/// Query parameters for PUT /clustering
#[derive(Debug, Deserialize)]
pub struct TriggerParams {
  /// Window start, unix seconds
  pub start: i64,

  /// Window end, unix seconds
  pub end: i64,
}

/// Response for PUT /clustering
#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
  /// Report to poll for the result
  pub report_id: i64,

  /// True when an earlier report for the same window was reused
  pub duplicate: bool,
}

// Report Endpoints
// ================

/// Query parameters for GET /reports
#[derive(Debug, Deserialize)]
pub struct ReportsParams {
  /// How many reports to return, oldest window first
  pub limit: Option<usize>,
}

/// Response for GET /reports
#[derive(Debug, Serialize)]
pub struct ReportsResponse {
  pub reports: Vec<Report>,
}

/// Response for GET /reports/{id}
#[derive(Debug, Serialize)]
pub struct ReportResponse {
  pub report: Report,
}

/// Response for GET /reports/{id}/clusters
#[derive(Debug, Serialize)]
pub struct ClustersResponse {
  pub clusters: Vec<ClusterSummary>,
}

// Question Endpoints
// ==================

/// Query parameters for GET /questions
#[derive(Debug, Deserialize)]
pub struct QuestionsParams {
  /// Report whose member questions to list
  pub report_id: i64,

  /// Narrow to one cluster of the report
  pub cluster_id: Option<i64>,

  /// Zero-based page index
  #[serde(default)]
  pub page: usize,

  /// Page size; 0 disables pagination
  #[serde(default)]
  pub limit: usize,
}

/// Response for GET /questions and GET /questions/{id}
#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
  pub questions: Vec<FeedbackQuestion>,
}

/// Request for POST /questions
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
  /// Standard question to attach
  pub std_question: String,

  /// Feedback question ids to attach it to
  pub feedbacks: Vec<i64>,
}
