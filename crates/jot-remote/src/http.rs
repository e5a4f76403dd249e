//! HTTP implementation of the remote store.
//!
//! Speaks a PostgREST-style dialect: tables live under `/rest/v1/{table}`,
//! uploads are POST upserts with `Prefer: resolution=merge-duplicates`, and
//! downloads are GET requests with column filters such as `updated_at=gt.{ts}`
//! and `note_id=in.(...)`. The access key travels as both the `apikey` header
//! and a bearer token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use jot_core::{
    defaults, AttachmentQuery, ConnectivityProbe, Error, RemoteAttachment, RemoteFolder,
    RemoteNote, RemoteStore, Result, SyncLogEntry,
};

use crate::config::RemoteConfig;

/// Default timeout for remote requests (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = defaults::REMOTE_TIMEOUT_SECS;

/// Timeout for connectivity probes (seconds).
pub const PROBE_TIMEOUT_SECS: u64 = defaults::PROBE_TIMEOUT_SECS;

/// Render a strictly-greater-than timestamp filter.
fn gt_filter(ts: DateTime<Utc>) -> String {
    format!("gt.{}", ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Render an id set membership filter.
fn in_filter(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

/// HTTP remote store.
pub struct HttpRemote {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemote {
    /// Create a new remote store with the given configuration.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Remote(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "remote",
            component = "http",
            url = %config.url,
            timeout_secs = config.timeout_secs,
            "Initializing remote store"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RemoteConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    /// Attach the access key headers.
    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.key)
            .header("Authorization", format!("Bearer {}", self.config.key))
    }

    async fn check_status(&self, table: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "Remote returned {} for {}: {}",
                status, table, body
            )));
        }
        Ok(response)
    }

    /// Upsert rows by id. An empty set is a no-op that never touches the
    /// network.
    async fn upsert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let start = Instant::now();

        let url = format!("{}?on_conflict=id", self.table_url(table));
        let response = self
            .authed(self.client.post(&url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Upload to {} failed: {}", table, e)))?;

        self.check_status(table, response).await?;

        debug!(
            subsystem = "remote",
            component = "http",
            op = "upsert",
            table = table,
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Uploaded rows"
        );
        Ok(())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let start = Instant::now();

        let response = self
            .authed(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Download from {} failed: {}", table, e)))?;

        let response = self.check_status(table, response).await?;
        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse {} rows: {}", table, e)))?;

        debug!(
            subsystem = "remote",
            component = "http",
            op = "select",
            table = table,
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Downloaded rows"
        );
        Ok(rows)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn upload_notes(&self, rows: &[RemoteNote]) -> Result<()> {
        self.upsert("notes", rows).await
    }

    async fn upload_folders(&self, rows: &[RemoteFolder]) -> Result<()> {
        self.upsert("folders", rows).await
    }

    async fn upload_attachments(&self, rows: &[RemoteAttachment]) -> Result<()> {
        self.upsert("attachments", rows).await
    }

    async fn download_notes(&self, updated_after: Option<DateTime<Utc>>) -> Result<Vec<RemoteNote>> {
        let mut params = vec![("order", "updated_at.desc".to_string())];
        if let Some(after) = updated_after {
            params.push(("updated_at", gt_filter(after)));
        }
        self.select("notes", &params).await
    }

    async fn download_folders(&self) -> Result<Vec<RemoteFolder>> {
        self.select("folders", &[]).await
    }

    async fn download_attachments(&self, query: AttachmentQuery) -> Result<Vec<RemoteAttachment>> {
        let mut params = Vec::new();
        if let Some(note_ids) = &query.note_ids {
            // Membership in the empty set matches nothing; skip the call.
            if note_ids.is_empty() {
                return Ok(Vec::new());
            }
            params.push(("note_id", in_filter(note_ids)));
        }
        if let Some(after) = query.created_after {
            params.push(("created_at", gt_filter(after)));
        }
        self.select("attachments", &params).await
    }

    async fn upsert_sync_log(&self, entries: &[SyncLogEntry]) -> Result<()> {
        self.upsert("sync_log", entries).await
    }
}

/// Connectivity probe that checks whether the remote service is reachable.
///
/// Any HTTP response counts as online, even an auth rejection; only a
/// transport failure (DNS, connect, timeout) reports offline.
pub struct HttpConnectivity {
    client: Client,
    url: String,
    key: String,
}

impl HttpConnectivity {
    /// Create a probe against the configured remote service.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/rest/v1/", config.url.trim_end_matches('/')),
            key: config.key.clone(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivity {
    async fn is_online(&self) -> bool {
        let result = self
            .client
            .head(&self.url)
            .header("apikey", &self.key)
            .send()
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                debug!(
                    subsystem = "remote",
                    component = "probe",
                    error = %e,
                    "Connectivity probe failed"
                );
                false
            }
        }
    }
}
