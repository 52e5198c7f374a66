// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CI system adapters
//!
//! Triggers are one-way: a successful call only means the CI system accepted
//! the job. Results come back later through the callback URL.

mod http;
mod noop;

pub use http::HttpCiAdapter;
pub use noop::NoOpCiAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CiCall, FakeCiAdapter};

use async_trait::async_trait;
use gantry_core::{Stage, VersionId, VersionName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors from triggering a CI job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CiError {
    #[error("CI transport error: {0}")]
    Transport(String),
    #[error("CI rejected the trigger with status {status}")]
    Rejected { status: u16 },
    #[error("CI trigger timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid trigger request: {0}")]
    InvalidRequest(String),
}

/// Job trigger sent to the CI system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub stage: Stage,
    pub version_id: VersionId,
    pub version_name: VersionName,
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub callback_url: String,
    pub inputs: BTreeMap<String, String>,
}

/// Adapter for triggering CI jobs
#[async_trait]
pub trait CiAdapter: Clone + Send + Sync + 'static {
    /// Ask the CI system to run the stage's job
    async fn trigger(&self, request: &DispatchRequest) -> Result<(), CiError>;
}
