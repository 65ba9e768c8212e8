// src/jobs/grafana.rs

use super::{Job, JobContext};
use crate::{
    error::{Error, Result},
    fetch::grafana::search_dashboards,
    process::{flatten_dashboards, DashboardRow, Table},
};

/// Dashboard keys backing each column, in header order.
pub fn fields(job: Job) -> Result<&'static [&'static str]> {
    match job {
        Job::GrafanaDashboards => Ok(&["title", "uid"]),
        Job::GrafanaDashboardLinks => Ok(&["title", "type", "url"]),
        other => Err(Error::Config(format!("{other} is not a Grafana job"))),
    }
}

pub fn layout(job: Job, dashboards: &[DashboardRow]) -> Result<Table> {
    let keys = fields(job)?;
    let mut table = job.empty_table();
    table.extend(
        dashboards
            .iter()
            .map(|d| keys.iter().map(|k| d.field(k)).collect()),
    );
    Ok(table)
}

pub async fn run(job: Job, ctx: &JobContext<'_>) -> Result<Table> {
    let settings = ctx.config.grafana()?;
    let items = search_dashboards(&ctx.http, &settings, &ctx.api_retry).await?;
    layout(job, &flatten_dashboards(&items))
}
