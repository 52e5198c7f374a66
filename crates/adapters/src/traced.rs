// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::ci::{CiAdapter, CiError, DispatchRequest};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any CiAdapter
#[derive(Clone)]
pub struct TracedCiAdapter<C> {
    inner: C,
}

impl<C> TracedCiAdapter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

fn check_callback_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("{}: {}", raw, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("{}: unsupported scheme {}", raw, other)),
    }
}

#[async_trait]
impl<C: CiAdapter> CiAdapter for TracedCiAdapter<C> {
    async fn trigger(&self, request: &DispatchRequest) -> Result<(), CiError> {
        let span = tracing::info_span!(
            "ci.trigger",
            stage = %request.stage,
            version_id = %request.version_id,
        );

        async {
            tracing::info!(
                version_name = %request.version_name,
                git_ref = %request.git_ref,
                input_count = request.inputs.len(),
                "triggering"
            );

            // Precondition: the CI system must be able to call us back
            if let Err(reason) = check_callback_url(&request.callback_url) {
                tracing::error!(%reason, "callback url is not an absolute http url");
                return Err(CiError::InvalidRequest(format!(
                    "callback url is not an absolute http url: {}",
                    reason
                )));
            }

            let start = std::time::Instant::now();
            let result = self.inner.trigger(request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "trigger accepted")
                }
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "trigger failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
