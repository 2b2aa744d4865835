//! SQLite persistence for feedback questions, reports, and cluster rows.
//!
//! All cluster-membership and cluster-tag rows for one report are
//! written in a single transaction: either the whole clustering result
//! lands or none of it does, and the orchestrator decides the report
//! status afterwards.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use thiserror::Error;

use crate::types::{ClusterSummary, ClusteringOutcome, FeedbackQuestion, Report, ReportStatus};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
  /// The addressed row does not exist.
  #[error("row not found")]
  NotFound,

  /// The feedback question already carries a standard question.
  #[error("feedback already has a standard question assigned")]
  AlreadyAssigned,

  /// Stored rows contradict each other (e.g. a tag without its cluster).
  #[error("inconsistent cluster data: {0}")]
  Inconsistent(String),

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
}

impl ToSql for ReportStatus {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(self.as_str().into())
  }
}

impl FromSql for ReportStatus {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    ReportStatus::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
  }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_feedback (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  question TEXT NOT NULL,
  std_question TEXT,
  created_time TEXT NOT NULL,
  updated_time TEXT
);

CREATE TABLE IF NOT EXISTS report (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  start_time TEXT NOT NULL,
  end_time TEXT NOT NULL,
  status TEXT NOT NULL,
  created_time TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cluster_result (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  report_id INTEGER NOT NULL REFERENCES report(id) ON DELETE CASCADE,
  feedback_id INTEGER NOT NULL,
  cluster_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS cluster_tag (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  report_id INTEGER NOT NULL REFERENCES report(id) ON DELETE CASCADE,
  cluster_id INTEGER NOT NULL,
  tag TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_created ON user_feedback(created_time);
CREATE INDEX IF NOT EXISTS idx_result_report ON cluster_result(report_id);
CREATE INDEX IF NOT EXISTS idx_tag_report ON cluster_tag(report_id);
";

/// Store handle shared process-wide behind a connection mutex.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the database at `path` and apply the schema.
  pub fn open(path: &Path) -> StoreResult<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::Inconsistent(format!("cannot create {parent:?}: {e}")))?;
    }
    Self::from_connection(Connection::open(path)?)
  }

  /// In-memory database, used by tests and throwaway runs.
  pub fn open_in_memory() -> StoreResult<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> StoreResult<Self> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn: Mutex::new(conn) })
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().expect("store mutex poisoned")
  }

  // Feedback rows

  /// Insert a feedback question, returning its id.
  pub fn add_feedback(&self, question: &str, created_time: DateTime<Utc>) -> StoreResult<i64> {
    let conn = self.conn();
    conn.execute(
      "INSERT INTO user_feedback (question, created_time) VALUES (?1, ?2)",
      params![question, created_time],
    )?;
    Ok(conn.last_insert_rowid())
  }

  /// Questions created within `[start, end]`, distinct by text.
  ///
  /// Duplicate texts collapse to the row with the highest id, matching
  /// how repeated questions are deduplicated before clustering.
  pub fn fetch_feedback_questions(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: usize,
  ) -> StoreResult<Vec<(i64, String)>> {
    let conn = self.conn();
    let mut stmt = conn.prepare(
      "SELECT max(id) AS id, question FROM user_feedback
       WHERE created_time >= ?1 AND created_time <= ?2
       GROUP BY question ORDER BY id LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![start, end, limit as i64], |row| {
      Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
  }

  pub fn get_user_question(&self, id: i64) -> StoreResult<FeedbackQuestion> {
    let conn = self.conn();
    conn
      .query_row(
        "SELECT id, question, std_question, created_time, updated_time
         FROM user_feedback WHERE id = ?1",
        [id],
        row_to_feedback,
      )
      .optional()?
      .ok_or(StoreError::NotFound)
  }

  /// Member questions of a report, optionally narrowed to one cluster.
  ///
  /// `page` starts at 0; `limit == 0` disables pagination.
  pub fn get_user_questions(
    &self,
    report_id: i64,
    cluster_id: Option<i64>,
    page: usize,
    limit: usize,
  ) -> StoreResult<Vec<FeedbackQuestion>> {
    let mut sql = String::from(
      "SELECT f.id, f.question, f.std_question, f.created_time, f.updated_time
       FROM cluster_result r INNER JOIN user_feedback f ON r.feedback_id = f.id
       WHERE r.report_id = ?1",
    );
    let mut args: Vec<i64> = vec![report_id];
    if let Some(cluster) = cluster_id {
      sql.push_str(" AND r.cluster_id = ?2");
      args.push(cluster);
    }
    sql.push_str(" ORDER BY f.id");
    if limit > 0 {
      sql.push_str(&format!(" LIMIT {}, {}", page * limit, limit));
    }

    let conn = self.conn();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), row_to_feedback)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
  }

  /// Assign one standard question to a batch of feedback rows.
  ///
  /// All-or-nothing: a missing row or an already-assigned row rolls
  /// the whole batch back.
  pub fn assign_std_question(&self, ids: &[i64], std_question: &str) -> StoreResult<()> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    let now = Utc::now();
    for &id in ids {
      let current: Option<Option<String>> = tx
        .query_row("SELECT std_question FROM user_feedback WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
      match current {
        None => return Err(StoreError::NotFound),
        Some(Some(existing)) if !existing.is_empty() => return Err(StoreError::AlreadyAssigned),
        _ => {
          tx.execute(
            "UPDATE user_feedback SET std_question = ?1, updated_time = ?2 WHERE id = ?3",
            params![std_question, now, id],
          )?;
        }
      }
    }
    tx.commit()?;
    Ok(())
  }

  /// Remove a feedback row's standard-question assignment.
  pub fn revoke_std_question(&self, id: i64) -> StoreResult<()> {
    let conn = self.conn();
    let affected = conn.execute(
      "UPDATE user_feedback SET std_question = NULL, updated_time = ?1 WHERE id = ?2",
      params![Utc::now(), id],
    )?;
    if affected == 0 {
      return Err(StoreError::NotFound);
    }
    Ok(())
  }

  // Reports

  /// Create a new report row in `pending` status.
  pub fn create_report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<i64> {
    let conn = self.conn();
    conn.execute(
      "INSERT INTO report (start_time, end_time, status, created_time) VALUES (?1, ?2, ?3, ?4)",
      params![start, end, ReportStatus::Pending, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
  }

  /// An existing non-failed report for the exact same window, if any.
  ///
  /// Failed windows are retriable, so they don't count as duplicates.
  pub fn find_duplicate_report(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> StoreResult<Option<i64>> {
    let conn = self.conn();
    let id = conn
      .query_row(
        "SELECT id FROM report
         WHERE start_time = ?1 AND end_time = ?2 AND status != 'fail'
         ORDER BY id LIMIT 1",
        params![start, end],
        |row| row.get(0),
      )
      .optional()?;
    Ok(id)
  }

  pub fn set_report_status(&self, id: i64, status: ReportStatus) -> StoreResult<()> {
    let affected = self
      .conn()
      .execute("UPDATE report SET status = ?1 WHERE id = ?2", params![status, id])?;
    if affected == 0 {
      return Err(StoreError::NotFound);
    }
    Ok(())
  }

  /// Successful reports, oldest window first, with cluster counts.
  pub fn get_reports(&self, limit: usize) -> StoreResult<Vec<Report>> {
    let conn = self.conn();
    let mut stmt = conn.prepare(&format!("{REPORT_SELECT} WHERE r.status = 'success' ORDER BY r.start_time LIMIT ?1"))?;
    let rows = stmt.query_map([limit as i64], row_to_report)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
  }

  /// A single report of any status.
  pub fn get_report(&self, id: i64) -> StoreResult<Report> {
    let conn = self.conn();
    conn
      .query_row(&format!("{REPORT_SELECT} WHERE r.id = ?1"), [id], row_to_report)
      .optional()?
      .ok_or(StoreError::NotFound)
  }

  /// Delete a report; its cluster and tag rows cascade away with it.
  pub fn delete_report(&self, id: i64) -> StoreResult<()> {
    let affected = self.conn().execute("DELETE FROM report WHERE id = ?1", [id])?;
    if affected == 0 {
      return Err(StoreError::NotFound);
    }
    Ok(())
  }

  // Cluster rows

  /// Persist a whole clustering result under `report_id` in one
  /// transaction.
  pub fn persist_clusters(&self, report_id: i64, outcome: &ClusteringOutcome) -> StoreResult<()> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    {
      let mut member_stmt = tx.prepare(
        "INSERT INTO cluster_result (report_id, feedback_id, cluster_id) VALUES (?1, ?2, ?3)",
      )?;
      let mut tag_stmt =
        tx.prepare("INSERT INTO cluster_tag (report_id, cluster_id, tag) VALUES (?1, ?2, ?3)")?;

      for (cluster_id, cluster) in outcome.clusters.iter().enumerate() {
        for &feedback_id in &cluster.members {
          member_stmt.execute(params![report_id, feedback_id, cluster_id as i64])?;
        }
        for tag in &cluster.tags {
          tag_stmt.execute(params![report_id, cluster_id as i64, tag])?;
        }
      }
    }
    tx.commit()?;
    Ok(())
  }

  /// Clusters of a report with member counts and tags, by cluster id.
  pub fn get_clusters(&self, report_id: i64) -> StoreResult<Vec<ClusterSummary>> {
    let conn = self.conn();

    let mut stmt = conn.prepare(
      "SELECT cluster_id, count(*) FROM cluster_result
       WHERE report_id = ?1 GROUP BY cluster_id ORDER BY cluster_id",
    )?;
    let mut clusters: Vec<ClusterSummary> = stmt
      .query_map([report_id], |row| {
        Ok(ClusterSummary { id: row.get(0)?, question_count: row.get(1)?, tags: Vec::new() })
      })?
      .collect::<rusqlite::Result<_>>()?;

    let mut tag_stmt =
      conn.prepare("SELECT cluster_id, tag FROM cluster_tag WHERE report_id = ?1")?;
    let tags = tag_stmt
      .query_map([report_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
    for tag in tags {
      let (cluster_id, tag) = tag?;
      match clusters.iter_mut().find(|c| c.id == cluster_id) {
        Some(cluster) => cluster.tags.push(tag),
        None => {
          return Err(StoreError::Inconsistent(format!(
            "report {report_id} has tag {tag} for missing cluster {cluster_id}"
          )))
        }
      }
    }

    Ok(clusters)
  }
}

const REPORT_SELECT: &str = "SELECT r.id, r.start_time, r.end_time, r.status, r.created_time,
  (SELECT count(DISTINCT cluster_id) FROM cluster_result WHERE report_id = r.id),
  (SELECT count(id) FROM cluster_result WHERE report_id = r.id)
 FROM report r";

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
  Ok(Report {
    id: row.get(0)?,
    start_time: row.get(1)?,
    end_time: row.get(2)?,
    status: row.get(3)?,
    created_time: row.get(4)?,
    cluster_count: row.get(5)?,
    question_count: row.get(6)?,
  })
}

fn row_to_feedback(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackQuestion> {
  Ok(FeedbackQuestion {
    id: row.get(0)?,
    question: row.get(1)?,
    std_question: row.get(2)?,
    created_time: row.get(3)?,
    updated_time: row.get(4)?,
  })
}
