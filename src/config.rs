// src/config.rs

//! Process configuration, read once from the environment at startup and
//! passed down explicitly. Sections are validated lazily so a job only
//! fails on the variables it actually needs.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const AZURE_LOGIN_URL: &str = "https://login.microsoftonline.com";
pub const AZURE_MANAGEMENT_URL: &str = "https://management.azure.com";
pub const GOOGLE_APIS_URL: &str = "https://www.googleapis.com";
pub const GOOGLE_SHEETS_URL: &str = "https://sheets.googleapis.com";

/// Base URLs for every REST endpoint. Overridden in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub azure_login: String,
    pub azure_management: String,
    pub google_apis: String,
    pub google_sheets: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            azure_login: AZURE_LOGIN_URL.to_string(),
            azure_management: AZURE_MANAGEMENT_URL.to_string(),
            google_apis: GOOGLE_APIS_URL.to_string(),
            google_sheets: GOOGLE_SHEETS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_ids: Vec<String>,
}

/// Identifies one Cognitive Services account for metric queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureResource {
    pub subscription_id: String,
    pub resource_group: String,
    pub resource_name: String,
}

impl AzureResource {
    pub fn resource_id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.CognitiveServices/accounts/{}",
            self.subscription_id, self.resource_group, self.resource_name
        )
    }
}

#[derive(Debug, Clone)]
pub struct GrafanaSettings {
    pub search_url: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    pub azure_client_id: Option<String>,
    pub azure_client_secret: Option<String>,
    pub azure_tenant_id: Option<String>,
    pub azure_subscription_ids: Vec<String>,
    pub service_account_file: Option<PathBuf>,
    pub drive_folder_id: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub grafana_api_url: Option<String>,
    pub grafana_token: Option<String>,
    pub resource_group: Option<String>,
    pub resource_name: Option<String>,
    pub output_dir: PathBuf,
    pub endpoints: Endpoints,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let azure_subscription_ids = get("AZURE_SUBSCRIPTION_ID")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_region: get("AWS_DEFAULT_REGION"),
            azure_client_id: get("AZURE_CLIENT_ID"),
            azure_client_secret: get("AZURE_CLIENT_SECRET"),
            azure_tenant_id: get("AZURE_TENANT_ID"),
            azure_subscription_ids,
            service_account_file: get("SERVICE_ACCOUNT_FILE").map(PathBuf::from),
            drive_folder_id: get("GOOGLE_DRIVE_FOLDER_ID"),
            spreadsheet_id: get("SPREADSHEET_ID"),
            grafana_api_url: get("GRAFANA_API_URL"),
            grafana_token: get("GRAFANA_TOKEN").or_else(|| get("GRAFANA_API_KEY")),
            resource_group: get("RESOURCE_GROUP"),
            resource_name: get("RESOURCE_NAME"),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            endpoints: Endpoints::default(),
        }
    }

    pub fn aws(&self) -> Result<AwsSettings> {
        Ok(AwsSettings {
            access_key_id: required(&self.aws_access_key_id, "AWS_ACCESS_KEY_ID")?,
            secret_access_key: required(&self.aws_secret_access_key, "AWS_SECRET_ACCESS_KEY")?,
            region: required(&self.aws_region, "AWS_DEFAULT_REGION")?,
        })
    }

    pub fn azure(&self) -> Result<AzureSettings> {
        if self.azure_subscription_ids.is_empty() {
            return Err(Error::missing_var("AZURE_SUBSCRIPTION_ID"));
        }
        Ok(AzureSettings {
            client_id: required(&self.azure_client_id, "AZURE_CLIENT_ID")?,
            client_secret: required(&self.azure_client_secret, "AZURE_CLIENT_SECRET")?,
            tenant_id: required(&self.azure_tenant_id, "AZURE_TENANT_ID")?,
            subscription_ids: self.azure_subscription_ids.clone(),
        })
    }

    /// The metrics target: first listed subscription plus group and name.
    pub fn azure_resource(&self) -> Result<AzureResource> {
        let subscription_id = self
            .azure_subscription_ids
            .first()
            .cloned()
            .ok_or_else(|| Error::missing_var("AZURE_SUBSCRIPTION_ID"))?;
        Ok(AzureResource {
            subscription_id,
            resource_group: required(&self.resource_group, "RESOURCE_GROUP")?,
            resource_name: required(&self.resource_name, "RESOURCE_NAME")?,
        })
    }

    pub fn service_account_file(&self) -> Result<&Path> {
        self.service_account_file
            .as_deref()
            .ok_or_else(|| Error::missing_var("SERVICE_ACCOUNT_FILE"))
    }

    pub fn drive_folder_id(&self) -> Result<&str> {
        self.drive_folder_id
            .as_deref()
            .ok_or_else(|| Error::missing_var("GOOGLE_DRIVE_FOLDER_ID"))
    }

    pub fn spreadsheet_id(&self) -> Result<&str> {
        self.spreadsheet_id
            .as_deref()
            .ok_or_else(|| Error::missing_var("SPREADSHEET_ID"))
    }

    pub fn grafana(&self) -> Result<GrafanaSettings> {
        let base = required(&self.grafana_api_url, "GRAFANA_API_URL")?;
        let token = self
            .grafana_token
            .clone()
            .ok_or_else(|| Error::missing_var("GRAFANA_TOKEN or GRAFANA_API_KEY"))?;
        Ok(GrafanaSettings {
            search_url: search_url(&base),
            token,
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value.clone().ok_or_else(|| Error::missing_var(name))
}

/// `GRAFANA_API_URL` may be the instance root or the full search endpoint.
fn search_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/api/search") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api/search")
    }
}
