use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use shakemap_common::EventMetadata;

use super::{EngineError, Overlay, SeismicEngine, SimulationParams};

/// Overlay engine reached over HTTP.
#[derive(Clone)]
pub struct HttpEngine {
    base_url: String,
    http: reqwest::Client,
}

impl HttpEngine {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SeismicEngine for HttpEngine {
    async fn fetch_latest_event(&self) -> Result<Option<EventMetadata>, EngineError> {
        let url = self.url("/events/latest");
        tracing::debug!(%url, "fetching latest event");

        let resp = self.http.get(&url).send().await.map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(resp).await
    }

    async fn compute_overlay(&self, event: &EventMetadata) -> Result<Overlay, EngineError> {
        let url = self.url("/overlay");
        tracing::debug!(%url, time = ?event.time(), "requesting overlay");

        let resp = self
            .http
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }

    async fn simulate_event(&self, params: &SimulationParams) -> Result<Overlay, EngineError> {
        let url = self.url("/simulate");
        tracing::debug!(%url, ?params, "requesting simulated overlay");

        let resp = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::InvalidParameters(body));
        }
        read_json(resp).await
    }
}

fn transport(err: reqwest::Error) -> EngineError {
    EngineError::Transport(err.to_string())
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, EngineError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EngineError::Status {
            status: status.as_u16(),
            body,
        });
    }
    resp.json()
        .await
        .map_err(|e| EngineError::Decode(e.to_string()))
}
