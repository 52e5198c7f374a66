// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for gantryd

use std::time::Duration;

use gantry_daemon::protocol::{ApprovalRequest, ErrorBody, InitiateRequest, Initiated, StatusView};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Daemon address used when neither `--server` nor `GANTRY_SERVER` is given
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:7310";

/// Upper bound on one request, including the daemon's own CI trigger
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address {0}: expected an http or https URL")]
    InvalidServer(String),

    #[error("could not reach gantryd at {server}: {message}")]
    Unreachable { server: String, message: String },

    /// The daemon refused the request
    #[error("{0}")]
    Api(ErrorBody),

    #[error("unexpected response from gantryd (HTTP {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },
}

pub struct ApiClient {
    base: Url,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(server: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(server)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ClientError::InvalidServer(server.to_string()))?;
        // Error bodies carry the daemon's message, so statuses are not errors here
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Ok(Self { base, agent })
    }

    /// Absolute URL for `segments`, each percent-encoded as one path segment
    pub fn url(&self, segments: &[&str]) -> Result<String, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidServer(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    pub fn create_version(
        &self,
        project: &str,
        request: &InitiateRequest,
    ) -> Result<Initiated, ClientError> {
        let body = encode(request)?;
        self.post(&["projects", project, "versions"], Some(body))
    }

    pub fn status(&self, version: &str) -> Result<StatusView, ClientError> {
        self.get(&["versions", version, "status"])
    }

    pub fn decide(&self, version: &str, approved: bool) -> Result<StatusView, ClientError> {
        let body = encode(&ApprovalRequest { approved })?;
        self.post(&["versions", version, "approval"], Some(body))
    }

    pub fn retry(&self, version: &str) -> Result<StatusView, ClientError> {
        self.post(&["versions", version, "retry"], None)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self
            .agent
            .get(&self.url(segments)?)
            .call()
            .map_err(|e| self.unreachable(e))?;
        decode(response)
    }

    fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<String>,
    ) -> Result<T, ClientError> {
        let request = self
            .agent
            .post(&self.url(segments)?)
            .header("content-type", "application/json");
        let response = match body {
            Some(body) => request.send(body),
            None => request.send_empty(),
        }
        .map_err(|e| self.unreachable(e))?;
        decode(response)
    }

    fn unreachable(&self, err: ureq::Error) -> ClientError {
        ClientError::Unreachable {
            server: self.base.to_string(),
            message: err.to_string(),
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|e| ClientError::UnexpectedResponse {
        status: 0,
        message: format!("could not encode request: {}", e),
    })
}

fn decode<T: DeserializeOwned>(
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<T, ClientError> {
    let status = response.status();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ClientError::UnexpectedResponse {
            status: status.as_u16(),
            message: e.to_string(),
        })?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| ClientError::UnexpectedResponse {
            status: status.as_u16(),
            message: e.to_string(),
        });
    }
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(ClientError::Api(body)),
        Err(_) => Err(ClientError::UnexpectedResponse {
            status: status.as_u16(),
            message: text,
        }),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
