// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Externally executed pipeline stages and their reported outcomes

use crate::status::{StageStatus, StatusUpdate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stage that runs in the external CI system and calls back when done.
///
/// Image build and image scan run as one job and report together, so they
/// are a single dispatchable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    CodeAnalysis,
    BuildScan,
    Deploy,
}

impl Stage {
    /// Path segment used in trigger and callback URLs
    pub fn slug(self) -> &'static str {
        match self {
            Stage::CodeAnalysis => "code-analysis",
            Stage::BuildScan => "build-scan",
            Stage::Deploy => "deploy",
        }
    }

    /// Status write setting every field this stage owns to `status`
    pub fn fields(self, status: StageStatus) -> StatusUpdate {
        let update = StatusUpdate::new();
        match self {
            Stage::CodeAnalysis => update.code(status),
            Stage::BuildScan => update.build(status).image(status),
            Stage::Deploy => update.deploy(status),
        }
    }

    /// Status write marking the stage queued and the flow in progress
    pub fn pending(self) -> StatusUpdate {
        self.fields(StageStatus::Pending).flow(StageStatus::Pending)
    }

    /// Status write recording that the stage (or its trigger) failed
    pub fn failed(self) -> StatusUpdate {
        self.fields(StageStatus::Fail).flow(StageStatus::Fail)
    }

    /// Status write for a reported outcome.
    ///
    /// Only a failure touches the flow; a successful deployment is the one
    /// success that also completes the flow.
    pub fn reported(self, outcome: Outcome) -> StatusUpdate {
        match (self, outcome) {
            (_, Outcome::Fail) => self.failed(),
            (Stage::Deploy, Outcome::Success) => self
                .fields(StageStatus::Success)
                .flow(StageStatus::Success),
            (_, Outcome::Success) => self.fields(StageStatus::Success),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code-analysis" => Ok(Stage::CodeAnalysis),
            "build-scan" => Ok(Stage::BuildScan),
            "deploy" => Ok(Stage::Deploy),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

/// Outcome reported by an external job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "fail" => Ok(Outcome::Fail),
            other => Err(format!("unknown outcome: {}", other)),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Fail => f.write_str("fail"),
        }
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
