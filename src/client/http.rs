use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{BackendError, PromptBackend, TraceBackend};
use crate::config::BackendConfig;
use crate::prompt::Prompt;

/// HTTP client for the backend's public REST API
pub struct HttpTraceBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpTraceBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {}", e)))?;

        info!("Backend client: host={}", config.host);
        Ok(Self { client, config })
    }

    /// `{host}/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.config.host).map_err(|e| {
            BackendError::Transport(format!("invalid host {}: {}", self.config.host, e))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::Transport(format!("host {} cannot be a base URL", self.config.host))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<Response, BackendError> {
        debug!("GET {}", url);
        let mut req = self.client.get(url).query(query);
        if let Some(public_key) = &self.config.public_key {
            req = req.basic_auth(public_key, self.config.secret_key.as_ref());
        }
        Ok(req.send().await?)
    }

    async fn check_status(resp: Response, what: &str) -> Result<Response, BackendError> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl TraceBackend for HttpTraceBackend {
    async fn fetch_trace(&self, trace_id: &str) -> Result<Value, BackendError> {
        let url = self.endpoint(&["api", "public", "traces", trace_id])?;
        let resp = self.get(url, &[]).await?;
        let resp = Self::check_status(resp, trace_id).await?;
        resp.json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PromptBackend for HttpTraceBackend {
    async fn fetch_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<Prompt, BackendError> {
        let url = self.endpoint(&["api", "public", "v2", "prompts", name])?;
        let mut query = Vec::new();
        if let Some(version) = version {
            query.push(("version", version.to_string()));
        }
        if let Some(label) = label {
            query.push(("label", label.to_string()));
        }

        let resp = self.get(url, &query).await?;
        let resp = Self::check_status(resp, name).await?;
        resp.json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}
