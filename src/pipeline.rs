// src/pipeline.rs

//! Source → table → sink, for one job at a time.

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::{
    auth::{
        self,
        google::{DRIVE_FILE_SCOPE, SPREADSHEETS_SCOPE},
        ServiceAccountKey,
    },
    config::Config,
    error::{Error, Result},
    jobs::{self, Job, JobContext},
    process::Table,
    sink::{drive::CSV_MIME, local, DriveClient, SheetsClient, SinkTarget},
};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub job: Job,
    pub rows: usize,
    /// CSV written locally, for the `Csv` and `Drive` targets.
    pub local_path: Option<PathBuf>,
    /// Drive file id, for the `Drive` target.
    pub remote_file_id: Option<String>,
}

/// Fail before any request if the sink's settings are missing.
pub fn check_sink_config(config: &Config, target: SinkTarget) -> Result<()> {
    match target {
        SinkTarget::Csv => Ok(()),
        SinkTarget::Sheet { .. } => {
            config.spreadsheet_id()?;
            config.service_account_file()?;
            Ok(())
        }
        SinkTarget::Drive => {
            config.drive_folder_id()?;
            config.service_account_file()?;
            Ok(())
        }
    }
}

async fn google_token(ctx: &JobContext<'_>, scope: &str) -> Result<String> {
    let key = ServiceAccountKey::from_file(ctx.config.service_account_file()?)?;
    auth::google::fetch_token(&ctx.http, &key, scope).await
}

async fn drive_client(ctx: &JobContext<'_>) -> Result<DriveClient> {
    let token = google_token(ctx, DRIVE_FILE_SCOPE).await?;
    Ok(DriveClient::new(ctx.http.clone(), &ctx.config.endpoints, token).with_retry(ctx.sink_retry))
}

/// Fetch the job's data and hand it to `target`. Nothing is written when
/// fetching fails.
#[instrument(level = "info", skip(job, ctx), fields(job = %job))]
pub async fn run_job(job: Job, target: SinkTarget, ctx: &JobContext<'_>) -> Result<Outcome> {
    check_sink_config(ctx.config, target)?;
    let table = jobs::build_table(job, ctx).await?;
    deliver(job, &table, target, ctx).await
}

/// Write an already built table to `target`.
pub async fn deliver(
    job: Job,
    table: &Table,
    target: SinkTarget,
    ctx: &JobContext<'_>,
) -> Result<Outcome> {
    let mut outcome = Outcome {
        job,
        rows: table.len(),
        local_path: None,
        remote_file_id: None,
    };

    match target {
        SinkTarget::Csv => {
            let path = job.output_path(&ctx.config.output_dir, ctx.today);
            local::write_csv(&path, table)?;
            info!(path = %path.display(), rows = table.len(), "wrote csv");
            outcome.local_path = Some(path);
        }
        SinkTarget::Sheet { clear } => {
            let spreadsheet_id = ctx.config.spreadsheet_id()?;
            let token = google_token(ctx, SPREADSHEETS_SCOPE).await?;
            let sheets = SheetsClient::new(ctx.http.clone(), &ctx.config.endpoints, token)
                .with_retry(ctx.sink_retry);
            sheets.write_table(spreadsheet_id, table, clear).await?;
            info!(spreadsheet_id, rows = table.len(), clear, "wrote spreadsheet");
        }
        SinkTarget::Drive => {
            let path = job.output_path(&ctx.config.output_dir, ctx.today);
            local::write_csv(&path, table)?;
            let drive = drive_client(ctx).await?;
            let id = drive
                .upload_to_path(
                    ctx.config.drive_folder_id()?,
                    &job.remote_folder(ctx.today),
                    &path,
                    CSV_MIME,
                )
                .await?;
            outcome.local_path = Some(path);
            outcome.remote_file_id = Some(id);
        }
    }
    Ok(outcome)
}

/// Upload files that earlier runs wrote today. Every file must exist
/// before anything is uploaded.
#[instrument(level = "info", skip(ctx))]
pub async fn upload_existing(jobs: &[Job], ctx: &JobContext<'_>) -> Result<Vec<Outcome>> {
    check_sink_config(ctx.config, SinkTarget::Drive)?;
    let root = ctx.config.drive_folder_id()?;

    let mut files = Vec::with_capacity(jobs.len());
    for &job in jobs {
        let path = job.output_path(&ctx.config.output_dir, ctx.today);
        if !path.is_file() {
            return Err(Error::Sink(format!(
                "{} not found; run {job} first",
                path.display()
            )));
        }
        files.push((job, path));
    }

    let drive = drive_client(ctx).await?;
    let mut outcomes = Vec::with_capacity(files.len());
    for (job, path) in files {
        let id = drive
            .upload_to_path(root, &job.remote_folder(ctx.today), &path, CSV_MIME)
            .await?;
        outcomes.push(Outcome {
            job,
            rows: 0,
            local_path: Some(path),
            remote_file_id: Some(id),
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn sheet_target_needs_spreadsheet_id() {
        let cfg = config(&[("SERVICE_ACCOUNT_FILE", "key.json")]);
        let err = check_sink_config(&cfg, SinkTarget::Sheet { clear: true }).unwrap_err();
        assert!(err.to_string().contains("SPREADSHEET_ID"), "{err}");
        assert!(check_sink_config(&cfg, SinkTarget::Csv).is_ok());
    }

    #[tokio::test]
    async fn csv_delivery_writes_dated_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().to_string_lossy().to_string();
        let cfg = config(&[("OUTPUT_DIR", out.as_str())]);
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let ctx = JobContext::new(&cfg, reqwest::Client::new(), today);

        let mut table = Job::GrafanaDashboards.empty_table();
        table.push(vec!["Billing".into(), "abc".into()]);

        let outcome = deliver(Job::GrafanaDashboards, &table, SinkTarget::Csv, &ctx)
            .await
            .unwrap();
        let path = outcome.local_path.unwrap();
        assert_eq!(path, dir.path().join("Grafana/2025/03/09/grafana_dashboards.csv"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "Title,UID\nBilling,abc\n"
        );
    }

    #[tokio::test]
    async fn upload_requires_existing_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().to_string_lossy().to_string();
        let cfg = config(&[
            ("OUTPUT_DIR", out.as_str()),
            ("GOOGLE_DRIVE_FOLDER_ID", "root"),
            ("SERVICE_ACCOUNT_FILE", "missing.json"),
        ]);
        let today = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let ctx = JobContext::new(&cfg, reqwest::Client::new(), today);

        let err = upload_existing(&[Job::AwsCostPerService], &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Sink(_)), "{err}");
    }
}
