// src/sink/drive.rs

//! Google Drive v3 folder-path resolution and file upload.

use std::path::Path;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::{
    config::Endpoints,
    error::{Error, Result},
    http::read_json,
    retry::{with_rate_limit_retry, RetryPolicy},
};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const CSV_MIME: &str = "text/csv";
const BOUNDARY: &str = "costscraper-part";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Drive search expression for a child folder called `name`.
pub fn folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name='{}' and mimeType='{}' and trashed=false",
        escape(parent_id),
        escape(name),
        FOLDER_MIME
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Non-empty segments of a slash-separated folder path.
pub fn segments(folder_path: &str) -> Vec<&str> {
    folder_path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// `multipart/related` body: JSON metadata first, then the file bytes.
fn multipart_body(meta: &serde_json::Value, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub struct DriveClient {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl DriveClient {
    pub fn new(http: Client, endpoints: &Endpoints, token: String) -> Self {
        Self {
            http,
            base_url: endpoints.google_apis.trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::exponential(),
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

    /// First folder named `name` directly under `parent_id`, if any.
    pub async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<String>> {
        let url = format!("{}/drive/v3/files", self.base_url);
        let q = folder_query(parent_id, name);
        let list: FileList = self
            .send_json("list folders", |http| {
                http.get(&url).query(&[
                    ("q", q.as_str()),
                    ("spaces", "drive"),
                    ("fields", "files(id,name)"),
                ])
            })
            .await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let url = format!("{}/drive/v3/files", self.base_url);
        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });
        let created: FileRef = self
            .send_json("create folder", |http| {
                http.post(&url).query(&[("fields", "id")]).json(&body)
            })
            .await?;
        info!(name, id = %created.id, "created drive folder");
        Ok(created.id)
    }

    /// Walk `folder_path` from `root_id`, creating each missing segment
    /// under the previous one. Returns the id of the last segment.
    ///
    /// Nothing is cached: every call re-resolves the whole chain.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_folder_path(&self, root_id: &str, folder_path: &str) -> Result<String> {
        let mut current = root_id.to_string();
        for name in segments(folder_path) {
            current = match self.find_folder(&current, name).await? {
                Some(id) => {
                    debug!(name, id = %id, "folder exists");
                    id
                }
                None => self.create_folder(&current, name).await?,
            };
        }
        Ok(current)
    }

    /// Create a new file entry under `folder_id` holding the bytes of
    /// `local`, in one multipart request. Always creates a new entry, even
    /// if one with the same name exists.
    #[instrument(level = "info", skip(self, local), fields(file = %local.display()))]
    pub async fn upload_file(&self, folder_id: &str, local: &Path, mime_type: &str) -> Result<String> {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::Sink(format!("{} has no file name", local.display())))?;
        let bytes = tokio::fs::read(local).await?;

        let meta = json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": mime_type,
        });
        let body = multipart_body(&meta, mime_type, &bytes);
        let content_type = format!("multipart/related; boundary={BOUNDARY}");
        let url = format!("{}/upload/drive/v3/files", self.base_url);
        let created: FileRef = self
            .send_json("upload file", |http| {
                http.post(&url)
                    .query(&[("uploadType", "multipart"), ("fields", "id")])
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(body.clone())
            })
            .await?;

        info!(name = %name, id = %created.id, bytes = bytes.len(), "uploaded to drive");
        Ok(created.id)
    }

    /// Resolve `folder_path` under `root_id`, then upload `local` into it.
    pub async fn upload_to_path(
        &self,
        root_id: &str,
        folder_path: &str,
        local: &Path,
        mime_type: &str,
    ) -> Result<String> {
        let folder_id = self.resolve_folder_path(root_id, folder_path).await?;
        self.upload_file(&folder_id, local, mime_type).await
    }
}
