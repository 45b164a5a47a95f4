// src/registry/gateway.rs
//! HTTP client for the source registry (Kernel Planckster).
//!
//! Every public call probes `/ping` first and fails with
//! [`AugmentError::Unavailable`] when the registry is not live.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{Protocol, SourceData};
use crate::error::{AugmentError, Result};

const AUTH_HEADER: &str = "x-auth-token";

/// Connection settings for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub auth_token: String,
    /// Must match the registry's default client for this project.
    pub client_id: u32,
    pub request_timeout: Duration,
}

impl RegistryConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    signed_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    source_data: Option<RawSourceData>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    source_data_list: Option<Vec<RawSourceData>>,
}

// Fields are optional so a partial echo is reported, not a decode failure.
#[derive(Debug, Deserialize)]
struct RawSourceData {
    name: Option<String>,
    protocol: Option<String>,
    relative_path: Option<String>,
}

pub struct RegistryGateway {
    cfg: RegistryConfig,
    client: Client,
}

impl RegistryGateway {
    pub fn new(cfg: RegistryConfig) -> Result<Self> {
        let client = Client::builder().timeout(cfg.request_timeout).build()?;
        Ok(Self { cfg, client })
    }

    pub fn url(&self) -> String {
        self.cfg.base_url()
    }

    fn client_endpoint(&self, suffix: &str) -> String {
        format!("{}/client/{}/{}", self.url(), self.cfg.client_id, suffix)
    }

    /// `GET /ping`; true iff the registry answered 200.
    pub async fn ping(&self) -> bool {
        let url = format!("{}/ping", self.url());
        match self.client.get(&url).send().await {
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "registry ping");
                resp.status() == StatusCode::OK
            }
            Err(e) => {
                debug!(error = %e, "registry ping failed");
                false
            }
        }
    }

    async fn ensure_live(&self) -> Result<()> {
        if self.ping().await {
            return Ok(());
        }
        error!(url = %self.url(), "failed to ping registry");
        Err(AugmentError::Unavailable {
            url: self.url(),
            reason: "ping did not return 200".to_string(),
        })
    }

    pub async fn issue_upload_url(&self, source: &SourceData) -> Result<String> {
        self.signed_url("upload-credentials", source).await
    }

    pub async fn issue_download_url(&self, source: &SourceData) -> Result<String> {
        self.signed_url("download-credentials", source).await
    }

    async fn signed_url(&self, which: &str, source: &SourceData) -> Result<String> {
        self.ensure_live().await?;
        info!(relative_path = %source.relative_path, which, "requesting signed url");

        let endpoint = self.client_endpoint(which);
        let resp = self
            .client
            .get(&endpoint)
            .header(AUTH_HEADER, &self.cfg.auth_token)
            .query(&[
                ("protocol", source.protocol.as_str()),
                ("relative_path", source.relative_path.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if status != StatusCode::OK {
            return Err(AugmentError::Registry {
                endpoint,
                reason: format!("status {}: {}", status.as_u16(), text),
            });
        }

        let parsed: SignedUrlResponse = serde_json::from_str(&text)?;
        match parsed.signed_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(AugmentError::Registry {
                endpoint,
                reason: format!("signed url not found in response: {text}"),
            }),
        }
    }

    /// Register `source` and check that the registry echoed it back.
    pub async fn register(&self, source: &SourceData) -> Result<SourceData> {
        self.ensure_live().await?;
        info!(relative_path = %source.relative_path, "registering source data");

        let endpoint = self.client_endpoint("source");
        let resp = self
            .client
            .post(&endpoint)
            .header(AUTH_HEADER, &self.cfg.auth_token)
            .query(&[
                ("source_data_name", source.name.as_str()),
                ("source_data_protocol", source.protocol.as_str()),
                ("source_data_relative_path", source.relative_path.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if status != StatusCode::OK {
            return Err(AugmentError::Registry {
                endpoint,
                reason: format!("status {}: {}", status.as_u16(), text),
            });
        }

        let rejected = |reason: String| AugmentError::Registration {
            relative_path: source.relative_path.clone(),
            reason,
        };

        let parsed: RegisterResponse =
            serde_json::from_str(&text).map_err(|e| rejected(format!("unreadable confirmation: {e}")))?;
        let raw = parsed
            .source_data
            .ok_or_else(|| rejected(format!("source data not returned: {text}")))?;
        let confirmed = confirmed_source(raw).map_err(rejected)?;

        if confirmed.name != source.name {
            return Err(rejected(format!(
                "registry echoed name '{}' for request '{}'",
                confirmed.name, source.name
            )));
        }
        Ok(confirmed)
    }

    /// Every source registered for this client.
    pub async fn list_all(&self) -> Result<Vec<SourceData>> {
        self.ensure_live().await?;
        info!(url = %self.url(), "listing all source data");

        let endpoint = self.client_endpoint("source");
        let resp = self
            .client
            .get(&endpoint)
            .header(AUTH_HEADER, &self.cfg.auth_token)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if status != StatusCode::OK {
            return Err(AugmentError::Registry {
                endpoint,
                reason: format!("status {}: {}", status.as_u16(), text),
            });
        }

        let parsed: ListResponse = serde_json::from_str(&text)?;
        let raw = parsed.source_data_list.ok_or_else(|| AugmentError::Registry {
            endpoint: endpoint.clone(),
            reason: format!("source_data_list missing from response: {text}"),
        })?;

        let mut out = Vec::with_capacity(raw.len());
        for item in raw {
            match confirmed_source(item) {
                Ok(sd) => out.push(sd),
                Err(reason) => debug!(%reason, "skipping malformed source entry"),
            }
        }
        Ok(out)
    }
}

fn confirmed_source(raw: RawSourceData) -> std::result::Result<SourceData, String> {
    let non_empty = |v: Option<String>, field: &str| {
        v.filter(|s| !s.is_empty())
            .ok_or_else(|| format!("confirmation is missing '{field}'"))
    };
    let name = non_empty(raw.name, "name")?;
    let protocol: Protocol = non_empty(raw.protocol, "protocol")?.parse()?;
    let relative_path = non_empty(raw.relative_path, "relative_path")?;
    Ok(SourceData {
        name,
        protocol,
        relative_path,
    })
}
