// src/sink/sheets.rs

//! Google Sheets v4: select the first tab, optionally clear it, append in one batch.

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use url::Url;

use crate::{
    config::Endpoints,
    error::{Error, Result},
    http::read_json,
    process::Table,
    retry::{with_rate_limit_retry, RetryPolicy},
};

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: AppendUpdates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_rows: Option<u64>,
}

/// A1 range covering a whole sheet: `'Title'`, inner quotes doubled.
pub fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub struct SheetsClient {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl SheetsClient {
    pub fn new(http: Client, endpoints: &Endpoints, token: String) -> Self {
        Self {
            http,
            base_url: endpoints.google_sheets.clone(),
            token,
            retry: RetryPolicy::exponential(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::Sink(format!("invalid sheets base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let http = &self.http;
        let token = self.token.as_str();
        let url = &url;
        let method = &method;
        with_rate_limit_retry(&self.retry, operation, || async move {
            let mut request = http
                .request(method.clone(), url.clone())
                .bearer_auth(token)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }
            read_json(request.send().await?, operation).await
        })
        .await
    }

    /// Title of the first tab.
    pub async fn first_sheet_title(&self, spreadsheet_id: &str) -> Result<String> {
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id])?;
        let meta: SpreadsheetMeta = self
            .call(
                "spreadsheet metadata",
                Method::GET,
                url,
                &[("fields", "sheets.properties.title")],
                None,
            )
            .await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| Error::Sink(format!("spreadsheet {spreadsheet_id} has no sheets")))
    }

    pub async fn clear(&self, spreadsheet_id: &str, sheet: &str) -> Result<()> {
        let range = format!("{}:clear", sheet_range(sheet));
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        let _: Value = self
            .call("clear sheet", Method::POST, url, &[], Some(&json!({})))
            .await?;
        info!(sheet, "sheet cleared");
        Ok(())
    }

    /// Append all `values` in a single request. A 429 resubmits the same batch.
    pub async fn append_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        values: &[Vec<String>],
    ) -> Result<usize> {
        let range = format!("{}!A1:append", sheet_range(sheet));
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        let body = json!({ "values": values });
        let resp: AppendResponse = self
            .call(
                "append rows",
                Method::POST,
                url,
                &[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ],
                Some(&body),
            )
            .await?;
        info!(sheet, sent = values.len(), updated = ?resp.updates.updated_rows, "rows appended");
        Ok(values.len())
    }

    /// First tab, optional clear, then header + rows as one batch.
    #[instrument(level = "info", skip(self, table), fields(rows = table.len()))]
    pub async fn write_table(&self, spreadsheet_id: &str, table: &Table, clear: bool) -> Result<usize> {
        let sheet = self.first_sheet_title(spreadsheet_id).await?;
        if clear {
            self.clear(spreadsheet_id, &sheet).await?;
        }
        self.append_rows(spreadsheet_id, &sheet, &table.to_values())
            .await?;
        Ok(table.len())
    }
}
