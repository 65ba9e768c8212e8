//! Azure AD client-credentials token exchange.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    config::{AzureSettings, Endpoints},
    error::{Error, Result},
};

/// Scope for Azure Resource Manager, Cost Management and Monitor.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// POST the client secret to the tenant's v2 token endpoint and return the
/// bearer token. A non-success status is an [`Error::Auth`].
pub async fn fetch_token(
    http: &Client,
    endpoints: &Endpoints,
    settings: &AzureSettings,
) -> Result<String> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        endpoints.azure_login.trim_end_matches('/'),
        settings.tenant_id
    );
    debug!(url = %url, "requesting azure token");

    let response = http
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Auth {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    info!(expires_in = ?token.expires_in, "azure token acquired");
    Ok(token.access_token)
}
