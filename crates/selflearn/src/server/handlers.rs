//! Endpoint handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json as ResponseJson;
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::pipeline::{SelfLearnService, TriggerError};
use crate::server::types::{
  ApiError, AssignRequest, BaseResponse, ClustersResponse, QuestionsParams, QuestionsResponse,
  ReportResponse, ReportsParams, ReportsResponse, TriggerParams, TriggerResponse,
};
use crate::store::StoreError;
use crate::worker::ClusterWorker;

const DEFAULT_REPORTS_LIMIT: usize = 10;
const MAX_REPORTS_LIMIT: usize = 100;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
  pub service: Arc<SelfLearnService>,
  pub worker: Arc<ClusterWorker>,
}

type ApiFailure = (StatusCode, ResponseJson<BaseResponse<()>>);
type ApiResult<T> = Result<ResponseJson<BaseResponse<T>>, ApiFailure>;

fn fail(status: StatusCode, key: &str, message: &str, transaction_id: Uuid) -> ApiFailure {
  let error = ApiError::new(key, message);
  (status, ResponseJson(BaseResponse::<()>::error(vec![error], transaction_id)))
}

fn store_failure(e: StoreError, transaction_id: Uuid) -> ApiFailure {
  match e {
    StoreError::NotFound => fail(StatusCode::NOT_FOUND, "not_found", &e.to_string(), transaction_id),
    StoreError::AlreadyAssigned => {
      fail(StatusCode::BAD_REQUEST, "already_assigned", &e.to_string(), transaction_id)
    }
    other => {
      fail(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", &other.to_string(), transaction_id)
    }
  }
}

fn parse_timestamp(secs: i64, transaction_id: Uuid) -> Result<DateTime<Utc>, ApiFailure> {
  DateTime::from_timestamp(secs, 0).ok_or_else(|| {
    fail(
      StatusCode::BAD_REQUEST,
      "bad_timestamp",
      &format!("{secs} is not a valid unix timestamp"),
      transaction_id,
    )
  })
}

/// GET /status - liveness probe
pub async fn status() -> ResponseJson<Value> {
  ResponseJson(json!({
    "status": "ok",
    "service": "selflearn",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/// PUT /clustering - trigger a clustering run over a time window
pub async fn trigger_clustering(
  State(state): State<AppState>,
  Query(params): Query<TriggerParams>,
) -> ApiResult<TriggerResponse> {
  let transaction_id = Uuid::new_v4();
  let start = parse_timestamp(params.start, transaction_id)?;
  let end = parse_timestamp(params.end, transaction_id)?;

  match state.worker.trigger(start, end) {
    Ok(outcome) => Ok(ResponseJson(BaseResponse::success(
      TriggerResponse { report_id: outcome.report_id, duplicate: outcome.duplicate },
      transaction_id,
    ))),
    Err(TriggerError::BadWindow) => {
      Err(fail(StatusCode::BAD_REQUEST, "bad_window", &TriggerError::BadWindow.to_string(), transaction_id))
    }
    Err(TriggerError::Store(e)) => Err(store_failure(e, transaction_id)),
  }
}

/// GET /reports - list successful reports, oldest window first
pub async fn get_reports(
  State(state): State<AppState>,
  Query(params): Query<ReportsParams>,
) -> ApiResult<ReportsResponse> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_REPORTS_LIMIT).min(MAX_REPORTS_LIMIT);
  let reports =
    state.service.store().get_reports(limit).map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success(ReportsResponse { reports }, transaction_id)))
}

/// GET /reports/{id} - one report, any status
pub async fn get_report(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> ApiResult<ReportResponse> {
  let transaction_id = Uuid::new_v4();
  let report =
    state.service.store().get_report(id).map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success(ReportResponse { report }, transaction_id)))
}

/// DELETE /reports/{id} - remove a report and its clusters
pub async fn delete_report(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> ApiResult<()> {
  let transaction_id = Uuid::new_v4();
  state.service.store().delete_report(id).map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success((), transaction_id)))
}

/// GET /reports/{id}/clusters - clusters of a report with counts and tags
pub async fn get_report_clusters(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> ApiResult<ClustersResponse> {
  let transaction_id = Uuid::new_v4();
  let store = state.service.store();
  // Surface a 404 for an unknown report rather than an empty list.
  store.get_report(id).map_err(|e| store_failure(e, transaction_id))?;
  let clusters = store.get_clusters(id).map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success(ClustersResponse { clusters }, transaction_id)))
}

/// GET /questions - member questions of a report, optionally one cluster
pub async fn get_questions(
  State(state): State<AppState>,
  Query(params): Query<QuestionsParams>,
) -> ApiResult<QuestionsResponse> {
  let transaction_id = Uuid::new_v4();
  let questions = state
    .service
    .store()
    .get_user_questions(params.report_id, params.cluster_id, params.page, params.limit)
    .map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success(QuestionsResponse { questions }, transaction_id)))
}

/// GET /questions/{id} - one feedback question
pub async fn get_question(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> ApiResult<QuestionsResponse> {
  let transaction_id = Uuid::new_v4();
  let question =
    state.service.store().get_user_question(id).map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success(
    QuestionsResponse { questions: vec![question] },
    transaction_id,
  )))
}

/// POST /questions - attach a standard question to a set of feedbacks
pub async fn assign_std_question(
  State(state): State<AppState>,
  Json(request): Json<AssignRequest>,
) -> ApiResult<()> {
  let transaction_id = Uuid::new_v4();
  if request.feedbacks.is_empty() {
    return Err(fail(
      StatusCode::BAD_REQUEST,
      "empty_assignment",
      "feedbacks must name at least one question",
      transaction_id,
    ));
  }
  state
    .service
    .store()
    .assign_std_question(&request.feedbacks, &request.std_question)
    .map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success((), transaction_id)))
}

/// POST /questions/{id}/revoke - detach the standard question again
pub async fn revoke_std_question(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> ApiResult<()> {
  let transaction_id = Uuid::new_v4();
  state
    .service
    .store()
    .revoke_std_question(id)
    .map_err(|e| store_failure(e, transaction_id))?;
  Ok(ResponseJson(BaseResponse::success((), transaction_id)))
}
