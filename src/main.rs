#![recursion_limit = "256"]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use costscraper::{
    cli::{init_tracing, run_job_from_env, today, SinkArgs},
    config::Config,
    http::build_client,
    jobs::{Job, JobContext},
    pipeline,
};
use tracing::info;

/// Pull billing and dashboard data into CSV, Google Sheets or Google Drive.
#[derive(Parser, Debug)]
#[command(name = "costscraper", version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Job to run, see `costscraper list`
    #[arg(value_enum)]
    job: Option<Job>,

    #[command(flatten)]
    sink: SinkArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every job with its header and default file
    List,
    /// Upload CSVs already written today to the dated Drive folders
    Upload {
        #[arg(value_enum, required = true)]
        jobs: Vec<Job>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_tracing();
    let cli = Cli::parse();

    // ─── 2) dispatch ─────────────────────────────────────────────────
    match (cli.command, cli.job) {
        (Some(Command::List), _) => {
            for job in Job::ALL {
                println!("{:<36} {}", job.name(), job.description());
                println!("{:<36} {}", "", job.header().join(", "));
                println!(
                    "{:<36} {}",
                    "",
                    job.output_path(std::path::Path::new("."), today())
                        .display()
                );
            }
        }
        (Some(Command::Upload { jobs }), _) => {
            // ─── 3) upload existing files ────────────────────────────
            let config = Config::from_env();
            let http = build_client().context("building HTTP client")?;
            let ctx = JobContext::new(&config, http, today());
            let outcomes = pipeline::upload_existing(&jobs, &ctx)
                .await
                .context("uploading to drive")?;
            info!(files = outcomes.len(), "upload complete");
        }
        (None, Some(job)) => {
            // ─── 3) fetch → flatten → sink ───────────────────────────
            info!(job = %job, sink = ?cli.sink.sink, "startup");
            run_job_from_env(job, cli.sink.target()).await?;
        }
        (None, None) => {
            Cli::command().print_help()?;
            std::process::exit(2);
        }
    }
    Ok(())
}
