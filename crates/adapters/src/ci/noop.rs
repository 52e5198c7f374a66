// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op CI adapter for when no CI system is configured.

use super::{CiAdapter, CiError, DispatchRequest};
use async_trait::async_trait;

/// CI adapter that accepts every trigger and does nothing.
///
/// Stages then wait for callbacks posted by hand.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpCiAdapter;

impl NoOpCiAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CiAdapter for NoOpCiAdapter {
    async fn trigger(&self, _request: &DispatchRequest) -> Result<(), CiError> {
        Ok(())
    }
}
