use chrono::NaiveDateTime;
use reqwest::StatusCode;
use thiserror::Error;

use crate::datetime;
use crate::dto::{EndpointHit, ViewStats};

#[derive(Debug, Error)]
pub enum StatsClientError {
    #[error("stats request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("stats server responded with status {0}")]
    Status(StatusCode),
}

/// HTTP client for the stats service (`POST /hit`, `GET /stats`).
#[derive(Debug, Clone)]
pub struct StatsClient {
    base_url: String,
    http: reqwest::Client,
}

impl StatsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn record_hit(&self, hit: &EndpointHit) -> Result<(), StatsClientError> {
        let response = self
            .http
            .post(format!("{}/hit", self.base_url))
            .json(hit)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StatsClientError::Status(response.status()));
        }
        tracing::debug!(uri = %hit.uri, "recorded hit");
        Ok(())
    }

    /// Range query over recorded hits. `uris` travel as one comma separated
    /// parameter; `unique` asks for distinct-ip counting.
    pub async fn stats(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> Result<Vec<ViewStats>, StatsClientError> {
        let response = self
            .http
            .get(format!("{}/stats", self.base_url))
            .query(&[
                ("start", datetime::format(&start)),
                ("end", datetime::format(&end)),
                ("uris", uris.join(",")),
                ("unique", unique.to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StatsClientError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}
