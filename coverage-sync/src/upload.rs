#![doc = "Codacy publisher: implements the core `CoveragePublisher` trait over HTTP."]
//
//! # Codacy coverage client
//!
//! [`CodacyClient`] POSTs one JSON coverage report per (commit, language) to
//! `{base}/2.0/{provider}/{owner}/{repo}/commit/{uuid}/coverage/{language}`
//! with the `api-token` header taken from the request. A NULL language is sent
//! as the literal `None` segment (see
//! [`coverage_sync_core::contract::NULL_LANGUAGE_SEGMENT`]).
//!
//! Any HTTP response, including non-2xx, is returned as a [`PublishResponse`];
//! only transport failures become a [`PublishError`]. Deciding what a status
//! means is left to the synchronise driver.

use std::time::Duration;

use async_trait::async_trait;
use coverage_sync_core::contract::{CoveragePublisher, PublishRequest, PublishResponse};
use coverage_sync_core::error::PublishError;
use reqwest::Url;

const USER_AGENT_VALUE: &str = concat!("coverage-sync/", env!("CARGO_PKG_VERSION"));

pub struct CodacyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CodacyClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let base_url = Url::parse(base_url).map_err(|e| {
            tracing::error!(error = %e, base_url, "Invalid Codacy API base url");
            e
        })?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Codacy API base url {base_url} cannot carry a path").into());
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()?;
        tracing::info!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Initialized CodacyClient");
        Ok(Self { http, base_url })
    }

    /// Full coverage endpoint for `req`, with every path segment percent-encoded.
    pub fn coverage_url(&self, req: &PublishRequest<'_>) -> Result<Url, PublishError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "2.0",
                req.provider,
                req.owner,
                req.repo,
                "commit",
                req.commit_uuid,
                "coverage",
                req.language_segment(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl CoveragePublisher for CodacyClient {
    async fn publish<'a>(
        &self,
        req: PublishRequest<'a>,
    ) -> Result<PublishResponse, PublishError> {
        let url = self.coverage_url(&req)?;
        tracing::info!(
            url = %url,
            files = req.report.file_reports.len(),
            "Posting coverage report"
        );

        let response = self
            .http
            .post(url.clone())
            .header("api-token", req.api_token)
            .json(req.report)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Coverage request failed");
                PublishError::Transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, status, "Could not read coverage response body");
                String::new()
            }
        };
        tracing::debug!(status, body = %body, "Coverage response received");
        Ok(PublishResponse { status, body })
    }
}
