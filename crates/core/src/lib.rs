// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-core: domain model for the Gantry delivery coordinator
//!
//! This crate provides:
//! - Version, project and Helm snapshot records
//! - The six-field status model with merge and approval derivation
//! - Version naming and resource quantity arithmetic
//! - Clock and ID abstractions for deterministic tests

pub mod clock;
pub mod helm;
pub mod id;
pub mod naming;
pub mod stage;
pub mod status;
pub mod version;

pub use clock::{Clock, FakeClock, SystemClock};
pub use helm::{HelmDefaults, HelmOverrides, HelmValues, HelmValuesId, Quantity, QuantityError};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use naming::{NamingError, VersionName};
pub use stage::{Outcome, Stage};
pub use status::{ApproveStatus, Revision, StageStatus, StatusError, StatusSnapshot, StatusUpdate};
pub use version::{CodeAnalysis, Project, ProjectId, Version, VersionId};
