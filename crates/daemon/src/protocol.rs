// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared by the daemon and the CLI
//!
//! All bodies are JSON with camelCase keys.

use gantry_core::{ApproveStatus, StageStatus, VersionId, VersionName};
use gantry_engine::EngineError;
use gantry_storage::StatusRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use gantry_engine::{CallbackPayload, InitiateRequest, Initiated};

/// Flow status of one version as returned by every status-bearing route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub version_id: VersionId,
    pub version_name: VersionName,
    pub code_status: StageStatus,
    pub build_status: StageStatus,
    pub image_status: StageStatus,
    pub approve_status: ApproveStatus,
    pub deploy_status: StageStatus,
    pub flow_status: StageStatus,
    pub revision: u64,
}

impl From<StatusRecord> for StatusView {
    fn from(record: StatusRecord) -> Self {
        let status = record.status;
        Self {
            version_id: record.version_id,
            version_name: record.name,
            code_status: status.code,
            build_status: status.build,
            image_status: status.image,
            approve_status: status.approve,
            deploy_status: status.deploy,
            flow_status: status.flow,
            revision: record.revision.0,
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.version_name, self.version_id)?;
        writeln!(f, "  code:     {}", self.code_status)?;
        writeln!(f, "  build:    {}", self.build_status)?;
        writeln!(f, "  image:    {}", self.image_status)?;
        writeln!(f, "  approve:  {}", self.approve_status)?;
        writeln!(f, "  deploy:   {}", self.deploy_status)?;
        writeln!(f, "  flow:     {}", self.flow_status)?;
        write!(f, "  revision: {}", self.revision)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of the engine's error kinds, e.g. `not_found`
    pub error: String,
    pub message: String,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self {
            error: err.kind().as_str().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
