use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{StatusCode, header};
use url::Url;
use wpt_checks_core::config::BackendConfig;
use wpt_checks_dispatch::{events::EventKind, ports::EventBackend};

/// Forwards raw webhook payloads to another CI integration's endpoint.
pub struct HttpBackend {
    name: &'static str,
    client: reqwest::Client,
    url: Url,
}

impl HttpBackend {
    pub fn new(name: &'static str, config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { name, client, url: config.url.clone() })
    }
}

#[async_trait]
impl EventBackend for HttpBackend {
    async fn handle_event(&self, kind: EventKind, payload: &[u8]) -> Result<bool> {
        let response = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-GitHub-Event", kind.as_str())
            .body(payload.to_vec())
            .send()
            .await
            .with_context(|| format!("Failed to forward {kind} event to {}", self.name))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NO_CONTENT => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                bail!("{} responded with {status}: {body}", self.name)
            }
        }
    }
}

/// Stands in for a backend without a configured endpoint.
pub struct Disabled(pub &'static str);

#[async_trait]
impl EventBackend for Disabled {
    async fn handle_event(&self, kind: EventKind, _payload: &[u8]) -> Result<bool> {
        tracing::warn!("No endpoint configured for {}, dropping {} event", self.0, kind);
        Ok(false)
    }
}

pub fn create(name: &'static str, config: Option<&BackendConfig>) -> Result<Arc<dyn EventBackend>> {
    Ok(match config {
        Some(config) => {
            tracing::info!("Forwarding {} events to {}", name, config.url);
            Arc::new(HttpBackend::new(name, config)?)
        }
        None => Arc::new(Disabled(name)),
    })
}
