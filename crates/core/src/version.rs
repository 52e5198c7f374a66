// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projects, versions and code analysis records

use crate::helm::{HelmDefaults, HelmValuesId};
use crate::naming::VersionName;
use crate::status::{Revision, StageStatus, StatusSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declare a string-backed identifier newtype
#[macro_export]
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id! {
    /// Identifier of a version
    VersionId
}

string_id! {
    /// Identifier of a project
    ProjectId
}

/// Parent of versions; supplies defaults read at initiation only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Clone URL handed to the CI system
    pub repository: String,
    /// Registry path images are pushed to, without a tag
    pub image_repository: String,
    /// Build context path inside the repository
    #[serde(default = "default_build_context")]
    pub build_context: String,
    #[serde(default)]
    pub helm: HelmDefaults,
}

fn default_build_context() -> String {
    ".".to_string()
}

impl Project {
    /// Image reference for one of this project's versions
    pub fn image_for(&self, name: &VersionName) -> String {
        format!("{}:{}", self.image_repository, name)
    }
}

/// A version of a project moving through the delivery pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub name: VersionName,
    pub branch: String,
    pub image: String,
    pub helm_values_id: HelmValuesId,
    pub scan_report_url: Option<String>,
    pub status: StatusSnapshot,
    pub revision: Revision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Code analysis sub-record, one per version.
///
/// Tracks the analyzer's own outcome and report location. It is written by
/// the code analysis callback alongside, not together with, `Version.status.code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub version_id: VersionId,
    pub status: StageStatus,
    pub report_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CodeAnalysis {
    pub fn pending(version_id: VersionId, at: DateTime<Utc>) -> Self {
        Self {
            version_id,
            status: StageStatus::Pending,
            report_url: None,
            updated_at: at,
        }
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
