// src/fetch/grafana.rs

use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::{
    config::GrafanaSettings,
    error::Result,
    http::read_json,
    retry::{with_rate_limit_retry, RetryPolicy},
};

/// Call `/api/search` and return the raw dashboard objects in API order.
pub async fn search_dashboards(
    http: &Client,
    settings: &GrafanaSettings,
    retry: &RetryPolicy,
) -> Result<Vec<Value>> {
    let url = settings.search_url.as_str();
    let token = settings.token.as_str();
    let items: Vec<Value> = with_rate_limit_retry(retry, "grafana search", || async move {
        let response = http.get(url).bearer_auth(token).send().await?;
        read_json(response, "grafana search").await
    })
    .await?;
    info!(count = items.len(), "grafana dashboards fetched");
    Ok(items)
}
