// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-daemon: HTTP surface of the Gantry coordinator
//!
//! The `gantryd` binary loads [`config::Config`], opens the configured store,
//! seeds projects and serves [`server::router`] until interrupted.

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use config::{CiConfig, Config, ConfigError, StoreConfig, StoreKind};
pub use lifecycle::{open_store, LifecycleError};
pub use protocol::{ApprovalRequest, ErrorBody, Health, StatusView};
pub use server::{router, AppState};
