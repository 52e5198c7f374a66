// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Six-field version status model
//!
//! A version's pipeline state is a [`StatusSnapshot`]: one field per stage
//! (code analysis, image build, image scan, approval, deployment) plus the
//! aggregate flow status. Writers never replace a snapshot wholesale; they
//! submit a sparse [`StatusUpdate`] which is merged onto the latest stored
//! snapshot. The merge is also where the approval gate opens itself: the
//! first write that observes both code analysis and image scan succeeded
//! moves approval from `none` to `pending`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status of a single stage, and of the aggregate flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    None,
    Pending,
    Success,
    Fail,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::None => "none",
            StageStatus::Pending => "pending",
            StageStatus::Success => "success",
            StageStatus::Fail => "fail",
        }
    }

    /// Whether the stage has reported a final outcome
    pub fn is_finished(self) -> bool {
        matches!(self, StageStatus::Success | StageStatus::Fail)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(StageStatus::None),
            "pending" => Ok(StageStatus::Pending),
            "success" => Ok(StageStatus::Success),
            "fail" => Ok(StageStatus::Fail),
            other => Err(StatusError::UnknownValue(other.to_string())),
        }
    }
}

/// Status of the human approval stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproveStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl ApproveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApproveStatus::None => "none",
            ApproveStatus::Pending => "pending",
            ApproveStatus::Approved => "approved",
            ApproveStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApproveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApproveStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ApproveStatus::None),
            "pending" => Ok(ApproveStatus::Pending),
            "approved" => Ok(ApproveStatus::Approved),
            "rejected" => Ok(ApproveStatus::Rejected),
            other => Err(StatusError::UnknownValue(other.to_string())),
        }
    }
}

/// Errors from status parsing and validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("unknown status value: {0}")]
    UnknownValue(String),
    #[error("deploy status cannot be {deploy} while approval is {approve}")]
    DeployBeforeApproval {
        deploy: StageStatus,
        approve: ApproveStatus,
    },
}

/// Concurrency token of a version row; advances on every accepted write
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision of a freshly created row
    pub const INITIAL: Revision = Revision(1);

    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The full status of a version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub code: StageStatus,
    pub build: StageStatus,
    pub image: StageStatus,
    pub approve: ApproveStatus,
    pub deploy: StageStatus,
    pub flow: StageStatus,
}

impl StatusSnapshot {
    /// Status of a just-initiated version: code analysis is queued, nothing
    /// else has started, and the flow as a whole is in progress
    pub fn initial() -> Self {
        Self {
            code: StageStatus::Pending,
            flow: StageStatus::Pending,
            ..Self::default()
        }
    }

    /// Both pre-approval checks have passed
    pub fn checks_passed(&self) -> bool {
        self.code == StageStatus::Success && self.image == StageStatus::Success
    }

    /// Reject snapshots that break cross-field invariants
    pub fn validate(&self) -> Result<(), StatusError> {
        if self.deploy != StageStatus::None && self.approve != ApproveStatus::Approved {
            return Err(StatusError::DeployBeforeApproval {
                deploy: self.deploy,
                approve: self.approve,
            });
        }
        Ok(())
    }
}

/// A sparse status write; `None` fields keep their stored value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<ApproveStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<StageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<StageStatus>,
}

impl StatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(self, status: StageStatus) -> Self {
        Self {
            code: Some(status),
            ..self
        }
    }

    pub fn build(self, status: StageStatus) -> Self {
        Self {
            build: Some(status),
            ..self
        }
    }

    pub fn image(self, status: StageStatus) -> Self {
        Self {
            image: Some(status),
            ..self
        }
    }

    pub fn approve(self, status: ApproveStatus) -> Self {
        Self {
            approve: Some(status),
            ..self
        }
    }

    pub fn deploy(self, status: StageStatus) -> Self {
        Self {
            deploy: Some(status),
            ..self
        }
    }

    pub fn flow(self, status: StageStatus) -> Self {
        Self {
            flow: Some(status),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this update onto `current`, deriving the approval transition.
    ///
    /// Approval opens (`none` -> `pending`) only when `current.approve` is
    /// still `none` and the merged snapshot has both code analysis and image
    /// scan succeeded. An explicit `approve` in the update always wins.
    pub fn merge(&self, current: &StatusSnapshot) -> StatusSnapshot {
        let mut next = StatusSnapshot {
            code: self.code.unwrap_or(current.code),
            build: self.build.unwrap_or(current.build),
            image: self.image.unwrap_or(current.image),
            approve: self.approve.unwrap_or(current.approve),
            deploy: self.deploy.unwrap_or(current.deploy),
            flow: self.flow.unwrap_or(current.flow),
        };

        if self.approve.is_none() && current.approve == ApproveStatus::None && next.checks_passed()
        {
            next.approve = ApproveStatus::Pending;
        }

        next
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
