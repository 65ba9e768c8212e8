// src/fetch/azure.rs

//! Azure Cost Management, Resource Manager and Monitor calls.

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::{
    config::Endpoints,
    error::Result,
    http::read_json,
    query::{CostQuery, DateWindow},
    retry::{with_rate_limit_retry, RetryPolicy},
};

const COST_API_VERSION: &str = "2023-03-01";
const SUBSCRIPTION_API_VERSION: &str = "2020-01-01";
const RESOURCES_API_VERSION: &str = "2021-04-01";
const METRICS_API_VERSION: &str = "2018-01-01";

/// Which cost figures Cost Management aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostType {
    Usage,
    ActualCost,
}

impl CostType {
    fn as_str(&self) -> &'static str {
        match self {
            CostType::Usage => "Usage",
            CostType::ActualCost => "ActualCost",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResult {
    pub properties: QueryProperties,
}

/// Columnar query result: `columns` names each position of every row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProperties {
    #[serde(default)]
    pub next_link: Option<String>,
    #[serde(default)]
    pub columns: Vec<QueryColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl QueryProperties {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    #[serde(default = "unknown")]
    pub display_name: String,
    #[serde(default = "unknown")]
    pub subscription_id: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcePage {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub value: Vec<Metric>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub time_stamp: String,
    #[serde(default)]
    pub total: Option<Value>,
}

/// One metric request against a single resource.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub resource_id: String,
    pub window: DateWindow,
    pub interval: String,
    pub metric: String,
    pub aggregation: String,
}

/// Bearer-authenticated ARM client. Every call goes through the
/// rate-limit retry loop.
pub struct AzureClient {
    http: Client,
    management_url: String,
    token: String,
    retry: RetryPolicy,
}

impl AzureClient {
    pub fn new(http: Client, endpoints: &Endpoints, token: String) -> Self {
        Self {
            http,
            management_url: endpoints.azure_management.trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::fixed(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_json<T, F>(&self, operation: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let http = &self.http;
        let token = self.token.as_str();
        let build = &build;
        with_rate_limit_retry(&self.retry, operation, || async move {
            let response = build(http).bearer_auth(token).send().await?;
            read_json(response, operation).await
        })
        .await
    }

    /// Cost Management `query` for one subscription. Pages linked through
    /// `nextLink` are appended in order.
    #[instrument(level = "info", skip(self, query))]
    pub async fn query_costs(
        &self,
        subscription_id: &str,
        query: &CostQuery,
        cost_type: CostType,
    ) -> Result<QueryProperties> {
        let body = cost_query_body(query, cost_type);
        let mut url = format!(
            "{}/subscriptions/{}/providers/Microsoft.CostManagement/query?api-version={}",
            self.management_url, subscription_id, COST_API_VERSION
        );

        let mut merged = QueryProperties::default();
        loop {
            let page: QueryResult = self
                .send_json("cost management query", |http| http.post(&url).json(&body))
                .await?;
            let props = page.properties;
            if merged.columns.is_empty() {
                merged.columns = props.columns;
            }
            merged.rows.extend(props.rows);
            match props.next_link.filter(|l| !l.is_empty()) {
                Some(next) => {
                    debug!(next = %next, "following nextLink");
                    url = next;
                }
                None => break,
            }
        }

        info!(rows = merged.rows.len(), "cost query complete");
        Ok(merged)
    }

    pub async fn subscription_details(&self, subscription_id: &str) -> Result<SubscriptionDetails> {
        let url = format!(
            "{}/subscriptions/{}?api-version={}",
            self.management_url, subscription_id, SUBSCRIPTION_API_VERSION
        );
        self.send_json("subscription details", |http| http.get(&url))
            .await
    }

    /// Every resource in the subscription, following `nextLink`.
    #[instrument(level = "info", skip(self))]
    pub async fn list_resources(&self, subscription_id: &str) -> Result<Vec<Value>> {
        let mut url = format!(
            "{}/subscriptions/{}/resources?api-version={}",
            self.management_url, subscription_id, RESOURCES_API_VERSION
        );
        let mut resources = Vec::new();
        loop {
            let page: ResourcePage = self
                .send_json("list resources", |http| http.get(&url))
                .await?;
            resources.extend(page.value);
            match page.next_link.filter(|l| !l.is_empty()) {
                Some(next) => url = next,
                None => break,
            }
        }
        info!(count = resources.len(), "resources listed");
        Ok(resources)
    }

    #[instrument(level = "info", skip(self, query), fields(metric = %query.metric))]
    pub async fn metrics(&self, query: &MetricQuery) -> Result<MetricsResponse> {
        let url = format!(
            "{}{}/providers/Microsoft.Insights/metrics",
            self.management_url, query.resource_id
        );
        let timespan = format!(
            "{}T00:00:00Z/{}T00:00:00Z",
            query.window.start_str(),
            query.window.end_str()
        );
        self.send_json("metrics", |http| {
            http.get(&url).query(&[
                ("api-version", METRICS_API_VERSION),
                ("timespan", timespan.as_str()),
                ("interval", query.interval.as_str()),
                ("metricnames", query.metric.as_str()),
                ("aggregation", query.aggregation.as_str()),
            ])
        })
        .await
    }
}

/// Request body for Cost Management `query`. The window end is inclusive.
pub fn cost_query_body(query: &CostQuery, cost_type: CostType) -> Value {
    let grouping: Vec<Value> = query
        .group_by
        .iter()
        .map(|name| json!({"type": "Dimension", "name": name}))
        .collect();

    let mut dataset = json!({
        "granularity": query.granularity.as_azure(),
        "aggregation": {
            "totalCost": {"name": query.metric, "function": "Sum"}
        },
        "grouping": grouping,
    });
    if let Some(filter) = &query.filter {
        dataset["filter"] = json!({
            "dimensions": {
                "name": filter.key,
                "operator": "In",
                "values": filter.values,
            }
        });
    }

    json!({
        "type": cost_type.as_str(),
        "timeframe": "Custom",
        "timePeriod": {
            "from": format!("{}T00:00:00Z", query.window.start_str()),
            "to": format!("{}T23:59:59Z", query.window.end_str()),
        },
        "dataset": dataset,
    })
}
