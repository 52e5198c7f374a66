// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake CI adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CiAdapter, CiError, DispatchRequest};
use async_trait::async_trait;
use gantry_core::Stage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiCall {
    pub request: DispatchRequest,
    pub result: Result<(), CiError>,
}

/// Fake CI adapter that records triggers and fails stages on request
#[derive(Clone, Default)]
pub struct FakeCiAdapter {
    failures: Arc<Mutex<HashMap<Stage, CiError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<Mutex<Vec<CiCall>>>,
}

impl FakeCiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every trigger for `stage` fail with `error`
    pub fn fail_stage(&self, stage: Stage, error: CiError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stage, error);
    }

    /// Let triggers for `stage` succeed again
    pub fn heal_stage(&self, stage: Stage) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&stage);
    }

    /// Sleep this long inside every trigger
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CiCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stages triggered so far, in order
    pub fn triggered(&self) -> Vec<Stage> {
        self.calls().into_iter().map(|c| c.request.stage).collect()
    }

    /// Most recent request for `stage`
    pub fn last_request(&self, stage: Stage) -> Option<DispatchRequest> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.request.stage == stage)
            .map(|c| c.request)
    }
}

#[async_trait]
impl CiAdapter for FakeCiAdapter {
    async fn trigger(&self, request: &DispatchRequest) -> Result<(), CiError> {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request.stage)
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        };

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CiCall {
                request: request.clone(),
                result: result.clone(),
            });
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
