// src/fetch/aws.rs

//! AWS Cost Explorer `GetCostAndUsage`.

use std::collections::BTreeMap;

use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_costexplorer::{
    config::Credentials,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_cost_and_usage::{
        builders::GetCostAndUsageFluentBuilder, GetCostAndUsageError,
    },
    types::{
        DateInterval, Dimension, DimensionValues, Expression, Granularity as AwsGranularity,
        GroupDefinition, GroupDefinitionType,
    },
    Client,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::{
    config::AwsSettings,
    error::{Error, Result},
    query::CostQuery,
    retry::{with_rate_limit_retry, RetryPolicy},
};

/// Error codes Cost Explorer uses for throttling.
const THROTTLING_CODES: &[&str] = &[
    "LimitExceededException",
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
];

/// One time bucket of a Cost Explorer response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: TimePeriod,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub keys: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    pub amount: Option<String>,
    pub unit: Option<String>,
}

/// Cost Explorer client with the rate-limit policy applied to every page.
pub struct CostExplorer {
    client: Client,
    retry: RetryPolicy,
}

impl CostExplorer {
    /// Build a client from explicit static credentials and region. The
    /// SDK's own retries are off; throttling goes through `retry` only.
    pub async fn new(settings: &AwsSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "costscraper-env",
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        Self {
            client: Client::new(&config),
            retry: RetryPolicy::fixed(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run `query`, following `NextPageToken` until every page is in.
    /// Buckets keep the order the API returned them in.
    #[instrument(level = "info", skip(self, query), fields(start = %query.window.start, end = %query.window.end))]
    pub async fn get_cost_and_usage(&self, query: &CostQuery) -> Result<Vec<ResultByTime>> {
        let interval = DateInterval::builder()
            .start(query.window.start_str())
            .end(query.window.end_str())
            .build()
            .map_err(|e| Error::Aws(format!("building date interval: {e}")))?;

        let mut results = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;
        loop {
            let output = with_rate_limit_retry(&self.retry, "GetCostAndUsage", || {
                let request = self.request(query, interval.clone(), page_token.as_deref());
                async move { request.send().await.map_err(map_sdk_error) }
            })
            .await?;
            pages += 1;

            results.extend(output.results_by_time().iter().map(convert_bucket));
            match output.next_page_token() {
                Some(token) if !token.is_empty() => {
                    debug!(page = pages, "following NextPageToken");
                    page_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        info!(buckets = results.len(), pages, "cost explorer query complete");
        Ok(results)
    }

    fn request(
        &self,
        query: &CostQuery,
        interval: DateInterval,
        page_token: Option<&str>,
    ) -> GetCostAndUsageFluentBuilder {
        let mut request = self
            .client
            .get_cost_and_usage()
            .time_period(interval)
            .granularity(AwsGranularity::from(query.granularity.as_aws()))
            .metrics(query.metric.clone());

        for key in &query.group_by {
            request = request.group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(key.clone())
                    .build(),
            );
        }

        if let Some(filter) = &query.filter {
            request = request.filter(
                Expression::builder()
                    .dimensions(
                        DimensionValues::builder()
                            .key(Dimension::from(filter.key.as_str()))
                            .set_values(Some(filter.values.clone()))
                            .build(),
                    )
                    .build(),
            );
        }

        if let Some(token) = page_token {
            request = request.next_page_token(token);
        }
        request
    }
}

fn map_sdk_error(err: SdkError<GetCostAndUsageError>) -> Error {
    classify(err.code(), || DisplayErrorContext(&err).to_string())
}

/// Throttling codes feed the retry loop; everything else is terminal.
fn classify(code: Option<&str>, detail: impl FnOnce() -> String) -> Error {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => {
            Error::RateLimited(format!("GetCostAndUsage: {code}"))
        }
        _ => Error::Aws(detail()),
    }
}

fn convert_bucket(r: &aws_sdk_costexplorer::types::ResultByTime) -> ResultByTime {
    let (start, end) = r
        .time_period()
        .map(|p| (p.start().to_string(), p.end().to_string()))
        .unwrap_or_default();

    let groups = r
        .groups()
        .iter()
        .map(|g| Group {
            keys: g.keys().to_vec(),
            metrics: g
                .metrics()
                .map(|m| {
                    m.iter()
                        .map(|(name, v)| {
                            (
                                name.clone(),
                                MetricValue {
                                    amount: v.amount().map(String::from),
                                    unit: v.unit().map(String::from),
                                },
                            )
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    ResultByTime {
        time_period: TimePeriod { start, end },
        groups,
        estimated: r.estimated(),
    }
}
