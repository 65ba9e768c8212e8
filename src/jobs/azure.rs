// src/jobs/azure.rs

use std::future::Future;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::{Job, JobContext};
use crate::{
    auth,
    config::AzureResource,
    error::{Error, Result},
    fetch::{
        azure::{MetricQuery, QueryProperties, SubscriptionDetails},
        AzureClient, CostType,
    },
    process::{flatten_azure, flatten_resources, flatten_usage, CostRow, ResourceRow, Table, UsageRow},
    query::{CostQuery, DateWindow, Granularity},
};

pub const COST_METRIC: &str = "PreTaxCost";
pub const COGNITIVE_SERVICES: &str = "Cognitive Services";
pub const TTS_METRIC: &str = "SynthesizedCharacters";
const WINDOW_DAYS: i64 = 7;
const USAGE_MONTHS: i64 = 6;

/// Grouping for the per-resource report, in output column order.
pub const RESOURCE_DIMENSIONS: [&str; 7] = [
    "ResourceId",
    "ResourceType",
    "ResourceLocation",
    "ResourceGroupName",
    "ServiceName",
    "ServiceTier",
    "Meter",
];

/// Names Cost Management may give the aggregated cost column.
const COST_COLUMNS: [&str; 3] = [COST_METRIC, "totalCost", "Cost"];

pub fn cost_query(job: Job, today: NaiveDate) -> Result<(CostQuery, CostType)> {
    let week = DateWindow::trailing_days(today, WINDOW_DAYS);
    Ok(match job {
        Job::AzureCostPerService | Job::AzureCognitiveServices => (
            CostQuery::new(week, Granularity::Daily, COST_METRIC).group_by("ServiceName"),
            CostType::Usage,
        ),
        Job::AzureCostPerResource => (
            RESOURCE_DIMENSIONS.iter().fold(
                CostQuery::new(DateWindow::day(today), Granularity::Daily, COST_METRIC),
                |q, dim| q.group_by(*dim),
            ),
            CostType::ActualCost,
        ),
        Job::AzureCostPerServicePerAccount => (
            CostQuery::new(week, Granularity::None, COST_METRIC)
                .group_by("ServiceName")
                .group_by("SubscriptionId"),
            CostType::ActualCost,
        ),
        other => return Err(Error::Config(format!("{other} has no cost query"))),
    })
}

pub fn metric_query(resource: &AzureResource, today: NaiveDate) -> MetricQuery {
    MetricQuery {
        resource_id: resource.resource_id(),
        window: DateWindow::trailing_months(today, USAGE_MONTHS),
        interval: "P1M".to_string(),
        metric: TTS_METRIC.to_string(),
        aggregation: "Total".to_string(),
    }
}

fn cost_column(props: &QueryProperties) -> &'static str {
    COST_COLUMNS
        .into_iter()
        .find(|c| props.column_index(c).is_some())
        .unwrap_or(COST_METRIC)
}

pub fn service_rows(sub: &SubscriptionDetails, rows: &[CostRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                sub.subscription_id.clone(),
                sub.display_name.clone(),
                r.amount.clone(),
                r.date_str(),
                r.dimension(0),
            ]
        })
        .collect()
}

/// Keep only rows whose service name mentions Cognitive Services.
pub fn cognitive_rows(subscription_id: &str, rows: &[CostRow]) -> Vec<Vec<String>> {
    rows.iter()
        .filter(|r| r.dimension(0).contains(COGNITIVE_SERVICES))
        .map(|r| {
            vec![
                subscription_id.to_string(),
                r.amount.clone(),
                r.date_str(),
                r.dimension(0),
                r.currency.clone(),
            ]
        })
        .collect()
}

/// Rows without a usage date are stamped with `today`, the only day queried.
pub fn resource_cost_rows(rows: &[CostRow], today: NaiveDate) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            let date = r.date.unwrap_or(today).format("%Y-%m-%d").to_string();
            let mut out = vec![date, r.amount.clone()];
            out.extend(r.dimensions.iter().cloned());
            out.push(r.currency.clone());
            out
        })
        .collect()
}

/// Expects dimensions flattened as `[SubscriptionId, ServiceName]`.
pub fn service_account_rows(rows: &[CostRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| vec![r.dimension(0), r.dimension(1), r.amount.clone(), r.currency.clone()])
        .collect()
}

pub fn resource_list_rows(rows: &[ResourceRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                r.subscription_id.clone(),
                r.name.clone(),
                r.kind.clone(),
                r.location.clone(),
            ]
        })
        .collect()
}

pub fn usage_rows(rows: &[UsageRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| vec![r.month.clone(), r.total.clone()])
        .collect()
}

/// Run `fetch` for each subscription in turn. A failing subscription is
/// logged and skipped; if every one fails the whole job fails.
pub async fn per_subscription<F, Fut>(subscription_ids: &[String], mut fetch: F) -> Result<Vec<Vec<String>>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<String>>>>,
{
    let mut rows = Vec::new();
    let mut succeeded = 0;
    for sub in subscription_ids {
        match fetch(sub.clone()).await {
            Ok(found) => {
                info!(subscription = %sub, rows = found.len(), "subscription done");
                succeeded += 1;
                rows.extend(found);
            }
            Err(e) => error!(subscription = %sub, error = %e, "subscription failed, skipping"),
        }
    }
    if succeeded == 0 {
        return Err(Error::Response(format!(
            "all {} subscriptions failed",
            subscription_ids.len()
        )));
    }
    Ok(rows)
}

pub async fn run(job: Job, ctx: &JobContext<'_>) -> Result<Table> {
    let settings = ctx.config.azure()?;
    let token = auth::azure::fetch_token(&ctx.http, &ctx.config.endpoints, &settings).await?;
    let client = AzureClient::new(ctx.http.clone(), &ctx.config.endpoints, token)
        .with_retry(ctx.api_retry);
    let client = &client;
    let today = ctx.today;
    let subs = &settings.subscription_ids;

    let mut table = job.empty_table();
    match job {
        Job::AzureCostPerService => {
            let (query, cost_type) = cost_query(job, today)?;
            let query = &query;
            table.extend(
                per_subscription(subs, |sub| async move {
                    let props = client.query_costs(&sub, query, cost_type).await?;
                    let rows = flatten_azure(&props, cost_column(&props), &["ServiceName"])?;
                    let details = match client.subscription_details(&sub).await {
                        Ok(details) => details,
                        Err(e) => {
                            warn!(subscription = %sub, error = %e, "no subscription details");
                            SubscriptionDetails {
                                display_name: "Unknown".to_string(),
                                subscription_id: sub.clone(),
                            }
                        }
                    };
                    Ok::<_, Error>(service_rows(&details, &rows))
                })
                .await?,
            );
        }
        Job::AzureCognitiveServices => {
            let (query, cost_type) = cost_query(job, today)?;
            let query = &query;
            table.extend(
                per_subscription(subs, |sub| async move {
                    let props = client.query_costs(&sub, query, cost_type).await?;
                    let rows = flatten_azure(&props, cost_column(&props), &["ServiceName"])?;
                    Ok::<_, Error>(cognitive_rows(&sub, &rows))
                })
                .await?,
            );
        }
        Job::AzureCostPerResource => {
            let (query, cost_type) = cost_query(job, today)?;
            let sub = subs
                .first()
                .ok_or_else(|| Error::missing_var("AZURE_SUBSCRIPTION_ID"))?;
            let props = client.query_costs(sub, &query, cost_type).await?;
            let rows = flatten_azure(&props, cost_column(&props), &RESOURCE_DIMENSIONS)?;
            table.extend(resource_cost_rows(&rows, today));
        }
        Job::AzureCostPerServicePerAccount => {
            let (query, cost_type) = cost_query(job, today)?;
            let query = &query;
            table.extend(
                per_subscription(subs, |sub| async move {
                    let props = client.query_costs(&sub, query, cost_type).await?;
                    let rows = flatten_azure(
                        &props,
                        cost_column(&props),
                        &["SubscriptionId", "ServiceName"],
                    )?;
                    Ok::<_, Error>(service_account_rows(&rows))
                })
                .await?,
            );
        }
        Job::AzureResources => {
            table.extend(
                per_subscription(subs, |sub| async move {
                    let items = client.list_resources(&sub).await?;
                    Ok::<_, Error>(resource_list_rows(&flatten_resources(&sub, &items)))
                })
                .await?,
            );
        }
        Job::AzureTtsUsage => {
            let resource = ctx.config.azure_resource()?;
            info!(resource_id = %resource.resource_id(), "querying metrics");
            let metrics = client.metrics(&metric_query(&resource, today)).await?;
            table.extend(usage_rows(&flatten_usage(&metrics)));
        }
        other => return Err(Error::Config(format!("{other} is not an Azure job"))),
    }
    Ok(table)
}
