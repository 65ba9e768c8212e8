// src/jobs/aws.rs

use chrono::NaiveDate;

use super::{Job, JobContext};
use crate::{
    error::{Error, Result},
    fetch::CostExplorer,
    process::{flatten_aws, CostRow, Table},
    query::{CostQuery, DateWindow, Granularity},
};

pub const METRIC: &str = "UnblendedCost";
pub const EC2_COMPUTE: &str = "Amazon Elastic Compute Cloud - Compute";
const WINDOW_DAYS: i64 = 7;

/// Daily buckets over the last week, grouped the way the job reports them.
pub fn query(job: Job, today: NaiveDate) -> Result<CostQuery> {
    let base = CostQuery::new(
        DateWindow::trailing_days(today, WINDOW_DAYS),
        Granularity::Daily,
        METRIC,
    );
    Ok(match job {
        Job::AwsCostPerService => base.group_by("SERVICE"),
        Job::AwsCostPerAccount => base.group_by("LINKED_ACCOUNT"),
        Job::AwsCostPerServicePerAccount => base.group_by("LINKED_ACCOUNT").group_by("SERVICE"),
        Job::AwsGpuCost => base
            .filter("SERVICE", &[EC2_COMPUTE])
            .group_by("LINKED_ACCOUNT"),
        other => return Err(Error::Config(format!("{other} is not an AWS job"))),
    })
}

pub fn layout(job: Job, rows: &[CostRow]) -> Table {
    let mut table = job.empty_table();
    table.extend(rows.iter().map(|r| match job {
        Job::AwsGpuCost => vec![r.dimension(0), r.date_str(), r.amount.clone()],
        Job::AwsCostPerServicePerAccount => vec![
            r.date_str(),
            r.dimension(0),
            r.dimension(1),
            r.amount.clone(),
        ],
        _ => vec![r.date_str(), r.dimension(0), r.amount.clone()],
    }));
    table
}

pub async fn run(job: Job, ctx: &JobContext<'_>) -> Result<Table> {
    let query = query(job, ctx.today)?;
    let settings = ctx.config.aws()?;
    let client = CostExplorer::new(&settings).await.with_retry(ctx.api_retry);
    let buckets = client.get_cost_and_usage(&query).await?;
    let rows = flatten_aws(&buckets, &query.metric)?;
    Ok(layout(job, &rows))
}
