// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP CI adapter

use super::{CiAdapter, CiError, DispatchRequest};
use async_trait::async_trait;
use gantry_core::Stage;
use std::time::Duration;

/// Triggers jobs with `POST {base_url}/jobs/{stage}/trigger`
#[derive(Clone)]
pub struct HttpCiAdapter {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpCiAdapter {
    /// `timeout` bounds the whole exchange, connect included
    pub fn new(base_url: impl Into<String>, timeout: Duration, token: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout,
        }
    }

    pub fn trigger_url(&self, stage: Stage) -> String {
        format!("{}/jobs/{}/trigger", self.base_url, stage.slug())
    }
}

impl std::fmt::Debug for HttpCiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCiAdapter")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn map_error(err: ureq::Error, timeout: Duration) -> CiError {
    match err {
        ureq::Error::StatusCode(status) => CiError::Rejected { status },
        ureq::Error::Timeout(_) => CiError::Timeout(timeout),
        other => CiError::Transport(other.to_string()),
    }
}

#[async_trait]
impl CiAdapter for HttpCiAdapter {
    async fn trigger(&self, request: &DispatchRequest) -> Result<(), CiError> {
        let body = serde_json::to_string(request)
            .map_err(|e| CiError::InvalidRequest(e.to_string()))?;
        let url = self.trigger_url(request.stage);
        let agent = self.agent.clone();
        let token = self.token.clone();
        let timeout = self.timeout;

        // ureq is blocking; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let mut call = agent
                .post(&url)
                .header("content-type", "application/json");
            if let Some(token) = token {
                call = call.header("authorization", &format!("Bearer {}", token));
            }
            call.send(body).map(|_| ()).map_err(|e| map_error(e, timeout))
        })
        .await
        .map_err(|e| CiError::Transport(format!("trigger task failed: {}", e)))?
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
