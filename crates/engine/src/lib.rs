// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Gantry coordination engine

mod approval;
mod dispatch;
mod error;
mod ingest;
mod initiate;
mod retry;
mod runtime;
mod sync;

pub use approval::ApprovalGate;
pub use dispatch::{
    DispatchStrategy, DispatchTarget, PreApprovalJobs, StageDispatcher, DEFAULT_DISPATCH_TIMEOUT,
};
pub use error::{EngineError, ErrorKind};
pub use ingest::{CallbackIngestor, CallbackPayload};
pub use initiate::{InitiateRequest, Initiated, PipelineInitiator, MAX_NAMING_ATTEMPTS};
pub use retry::Retrier;
pub use runtime::{Runtime, RuntimeConfig, RuntimeDeps};
pub use sync::{StatusSynchronizer, DEFAULT_WRITE_ATTEMPTS};

#[cfg(test)]
#[path = "test_support.rs"]
mod test_support;
