// src/http.rs

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build the shared HTTP client used by every fetcher and sink.
pub fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()?)
}

/// Map a response status onto the error taxonomy, returning the response
/// untouched when it succeeded.
pub async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(operation, status = status.as_u16(), error = %e, "failed to read error body");
            String::new()
        }
    };
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited(format!("{operation}: {body}")));
    }
    warn!(operation, status = status.as_u16(), "request failed");
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

/// Check the status, then decode the body as JSON.
pub async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let response = ensure_success(response, operation).await?;
    let text = response.text().await?;
    debug!(operation, bytes = text.len(), "response received");
    serde_json::from_str(&text).map_err(|e| {
        warn!(operation, error = %e, "failed to parse response");
        Error::Json(e)
    })
}
