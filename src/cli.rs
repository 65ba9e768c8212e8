// src/cli.rs

//! Pieces shared by `costscraper` and the per-job binaries.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::Config,
    http::build_client,
    jobs::{Job, JobContext},
    pipeline::{self, Outcome},
    sink::{SinkKind, SinkTarget},
};

#[derive(Args, Debug, Clone, Copy)]
pub struct SinkArgs {
    /// Where the table goes
    #[arg(long, value_enum, env = "COSTSCRAPER_SINK", default_value_t = SinkKind::Csv)]
    pub sink: SinkKind,

    /// Append to the spreadsheet without clearing it first
    #[arg(long)]
    pub no_clear: bool,
}

impl SinkArgs {
    pub fn target(&self) -> SinkTarget {
        self.sink.target(!self.no_clear)
    }
}

/// Console logging filtered by `RUST_LOG`, `info` when unset.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
}

/// Run date in UTC, which is how Cost Explorer and Cost Management bucket
/// days. Sets both the query window and the dated output folder.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Load configuration and run `job` into `target` for today's date.
pub async fn run_job_from_env(job: Job, target: SinkTarget) -> Result<Outcome> {
    let config = Config::from_env();
    let http = build_client().context("building HTTP client")?;
    let ctx = JobContext::new(&config, http, today());
    let outcome = pipeline::run_job(job, target, &ctx)
        .await
        .with_context(|| format!("running {job}"))?;
    info!(
        job = %job,
        rows = outcome.rows,
        path = ?outcome.local_path,
        remote = ?outcome.remote_file_id,
        "done"
    );
    Ok(outcome)
}

#[derive(Parser, Debug)]
struct SingleJobArgs {
    #[command(flatten)]
    sink: SinkArgs,
}

/// Entry point for a binary dedicated to one job.
pub async fn run_single(job: Job) -> Result<()> {
    init_tracing();
    let args = SingleJobArgs::parse();
    info!(job = %job, sink = ?args.sink.sink, "startup");
    run_job_from_env(job, args.sink.target()).await?;
    Ok(())
}
