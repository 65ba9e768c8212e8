// src/process/flatten.rs

//! Nested provider results → flat rows. Iteration order is the provider's:
//! buckets chronologically, groups as returned. Nothing is sorted and
//! nothing absent from the source is synthesised.

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    date_parser::{month_of_timestamp, parse_iso_date, parse_usage_date},
    rows::{CostRow, DashboardRow, ResourceRow, UsageRow},
    utils::{cell_text, field_or},
};
use crate::{
    error::{Error, Result},
    fetch::{
        aws::ResultByTime,
        azure::{MetricsResponse, QueryProperties},
    },
};

const DEFAULT_CURRENCY: &str = "USD";

/// One row per (bucket, group). A group without the requested metric is skipped.
pub fn flatten_aws(buckets: &[ResultByTime], metric: &str) -> Result<Vec<CostRow>> {
    let mut rows = Vec::new();
    for bucket in buckets {
        let date = parse_iso_date(&bucket.time_period.start).ok_or_else(|| {
            Error::Response(format!(
                "bad TimePeriod.Start {:?}",
                bucket.time_period.start
            ))
        })?;
        for group in &bucket.groups {
            let Some(value) = group.metrics.get(metric) else {
                warn!(keys = ?group.keys, metric, "group has no metric, skipping");
                continue;
            };
            let Some(amount) = value.amount.clone() else {
                warn!(keys = ?group.keys, metric, "metric has no amount, skipping");
                continue;
            };
            rows.push(CostRow {
                date: Some(date),
                dimensions: group.keys.clone(),
                amount,
                currency: value
                    .unit
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            });
        }
    }
    debug!(buckets = buckets.len(), rows = rows.len(), "flattened aws result");
    Ok(rows)
}

/// Map Cost Management's columnar rows by name. `dimensions` are the
/// grouping column names in the order they should appear on the row.
pub fn flatten_azure(
    props: &QueryProperties,
    cost_column: &str,
    dimensions: &[&str],
) -> Result<Vec<CostRow>> {
    let cost_idx = props
        .column_index(cost_column)
        .ok_or_else(|| Error::Response(format!("no {cost_column} column in cost query")))?;
    let dim_idx = dimensions
        .iter()
        .map(|name| {
            props
                .column_index(name)
                .ok_or_else(|| Error::Response(format!("no {name} column in cost query")))
        })
        .collect::<Result<Vec<_>>>()?;
    let date_idx = props.column_index("UsageDate");
    let currency_idx = props.column_index("Currency");

    let rows = props
        .rows
        .iter()
        .map(|row| CostRow {
            date: date_idx
                .and_then(|i| row.get(i))
                .and_then(parse_usage_date),
            dimensions: dim_idx
                .iter()
                .map(|&i| field_or(row.get(i), ""))
                .collect(),
            amount: field_or(row.get(cost_idx), ""),
            currency: currency_idx
                .map(|i| field_or(row.get(i), DEFAULT_CURRENCY))
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        })
        .collect::<Vec<_>>();
    debug!(rows = rows.len(), "flattened azure result");
    Ok(rows)
}

pub fn flatten_dashboards(items: &[Value]) -> Vec<DashboardRow> {
    items.iter().map(DashboardRow::from_value).collect()
}

/// ARM resources, tagged with the subscription they were listed from.
pub fn flatten_resources(subscription_id: &str, items: &[Value]) -> Vec<ResourceRow> {
    items
        .iter()
        .map(|r| ResourceRow {
            subscription_id: subscription_id.to_string(),
            name: field_or(r.get("name"), "Unknown"),
            kind: field_or(r.get("type"), "Unknown"),
            location: field_or(r.get("location"), "Unknown"),
        })
        .collect()
}

/// Every data point with a total, in series order. Null totals are dropped.
pub fn flatten_usage(metrics: &MetricsResponse) -> Vec<UsageRow> {
    let mut rows = Vec::new();
    for metric in &metrics.value {
        for series in &metric.timeseries {
            for point in &series.data {
                let Some(total) = point.total.as_ref().filter(|t| !t.is_null()) else {
                    continue;
                };
                match month_of_timestamp(&point.time_stamp) {
                    Some(month) => rows.push(UsageRow {
                        month,
                        total: cell_text(total),
                    }),
                    None => warn!(ts = %point.time_stamp, "unparseable metric timestamp"),
                }
            }
        }
    }
    rows
}
