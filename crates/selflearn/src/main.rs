use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use selflearn::config::{default_db_path, Config};
use selflearn::nlu::NluClient;
use selflearn::pipeline::SelfLearnService;
use selflearn::server::{start_server, AppState};
use selflearn::store::SqliteStore;
use selflearn::types::ReportStatus;
use selflearn::wordvec::WordVectors;
use selflearn::worker::ClusterWorker;

#[derive(Parser)]
#[command(name = "selflearn")]
#[command(about = "Self-learning feedback clustering\nGroups user feedback questions into topics and tags them")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the REST API with the background clustering worker
  Serve {
    /// Address to bind the API server to
    #[arg(long, env = "SELFLEARN_ADDR", default_value = "127.0.0.1:3042")]
    addr: SocketAddr,
    #[command(flatten)]
    config: Config,
  },
  /// Cluster one time window in the foreground
  Trigger {
    /// Window start, unix seconds
    #[arg(long)]
    start: i64,
    /// Window end, unix seconds
    #[arg(long)]
    end: i64,
    #[command(flatten)]
    config: Config,
  },
  /// List the most recent successful reports
  Reports {
    /// How many reports to show
    #[arg(long, default_value_t = 10)]
    limit: usize,
    /// SQLite database location
    #[arg(long, env = "SELFLEARN_DB", default_value_os_t = default_db_path())]
    database: PathBuf,
  },
  /// Insert a feedback question, for local runs
  Feedback {
    /// The question text
    question: String,
    /// SQLite database location
    #[arg(long, env = "SELFLEARN_DB", default_value_os_t = default_db_path())]
    database: PathBuf,
  },
}

fn build_service(config: Config) -> Result<Arc<SelfLearnService>> {
  let store = SqliteStore::open(&config.database)
    .with_context(|| format!("cannot open database at {:?}", config.database))?;
  let word_vectors = WordVectors::load(&config.resources_path)?;
  let nlu = NluClient::new(&config.nlu_url);
  Ok(Arc::new(SelfLearnService::new(store, nlu, word_vectors, config)))
}

fn parse_timestamp(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0).with_context(|| format!("{secs} is not a valid unix timestamp"))
}

async fn serve(addr: SocketAddr, config: Config) -> Result<()> {
  let max_concurrent = config.max_concurrent_runs;
  let service = build_service(config)?;
  let worker = Arc::new(ClusterWorker::new(Arc::clone(&service), max_concurrent));
  start_server(AppState { service, worker }, addr).await
}

async fn trigger(start: i64, end: i64, config: Config) -> Result<()> {
  let start = parse_timestamp(start)?;
  let end = parse_timestamp(end)?;
  let service = build_service(config)?;

  let outcome = service.prepare(start, end)?;
  if outcome.duplicate {
    println!("window already clustered in report {}", outcome.report_id);
    return Ok(());
  }
  if let Err(e) = service.run_report(outcome.report_id, start, end).await {
    service.store().set_report_status(outcome.report_id, ReportStatus::Fail)?;
    return Err(e.context(format!("report {} failed", outcome.report_id)));
  }
  let clusters = service.store().get_clusters(outcome.report_id)?;
  println!("report {} succeeded with {} clusters", outcome.report_id, clusters.len());
  for cluster in clusters {
    println!("  cluster {}: {} questions [{}]", cluster.id, cluster.question_count, cluster.tags.join(", "));
  }
  Ok(())
}

fn reports(limit: usize, database: PathBuf) -> Result<()> {
  let store = SqliteStore::open(&database)?;
  let reports = store.get_reports(limit)?;
  if reports.is_empty() {
    println!("no successful reports yet");
    return Ok(());
  }
  for report in reports {
    println!(
      "report {}: {} .. {}, {} clusters, {} questions",
      report.id, report.start_time, report.end_time, report.cluster_count, report.question_count
    );
  }
  Ok(())
}

fn add_feedback(question: String, database: PathBuf) -> Result<()> {
  let store = SqliteStore::open(&database)?;
  let id = store.add_feedback(&question, Utc::now())?;
  println!("feedback {id} added");
  Ok(())
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Serve { addr, config } => serve(addr, config).await,
    Command::Trigger { start, end, config } => trigger(start, end, config).await,
    Command::Reports { limit, database } => reports(limit, database),
    Command::Feedback { question, database } => add_feedback(question, database),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

  let cli = Cli::parse();
  handle(cli.command).await?;
  Ok(())
}
