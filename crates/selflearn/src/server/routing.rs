//! Axum router configuration for all endpoints

use axum::{
  routing::{delete, get, post, put},
  Router,
};

use crate::server::handlers::{self, AppState};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status endpoint
    .route("/status", get(handlers::status))
    // Clustering trigger
    .route("/clustering", put(handlers::trigger_clustering))
    // Report endpoints
    .route("/reports", get(handlers::get_reports))
    .route("/reports/{id}", get(handlers::get_report))
    .route("/reports/{id}", delete(handlers::delete_report))
    .route("/reports/{id}/clusters", get(handlers::get_report_clusters))
    // Question endpoints
    .route("/questions", get(handlers::get_questions))
    .route("/questions", post(handlers::assign_std_question))
    .route("/questions/{id}", get(handlers::get_question))
    .route("/questions/{id}/revoke", post(handlers::revoke_std_question))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::nlu::NluClient;
  use crate::pipeline::SelfLearnService;
  use crate::store::SqliteStore;
  use crate::wordvec::WordVectors;
  use crate::worker::ClusterWorker;
  use axum::body::Body;
  use axum::http::{Request, StatusCode};
  use std::path::PathBuf;
  use std::sync::Arc;
  use tower::ServiceExt;

  fn test_router() -> Router {
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
    let worker = Arc::new(ClusterWorker::new(Arc::clone(&service), 1));
    create_router(AppState { service, worker })
  }

  #[tokio::test]
  async fn status_endpoint_answers() {
    let router = test_router();
    let response =
      router.oneshot(Request::get("/status").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn unknown_report_is_not_found() {
    let router = test_router();
    let response =
      router.oneshot(Request::get("/reports/999").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn reversed_window_is_rejected() {
    let router = test_router();
    let response = router
      .oneshot(Request::put("/clustering?start=200&end=100").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn empty_assignment_is_rejected() {
    let router = test_router();
    let request = Request::post("/questions")
      .header("content-type", "application/json")
      .body(Body::from(r#"{"std_question":"How do refunds work?","feedbacks":[]}"#))
      .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }
}
