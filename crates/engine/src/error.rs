// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use gantry_adapters::CiError;
use gantry_core::{NamingError, ProjectId, Stage, StatusError, VersionId};
use gantry_storage::{RecordKind, StoreError};
use thiserror::Error;

/// Coarse error classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    DispatchFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::DispatchFailure => "dispatch_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while coordinating a version
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("status of version {version} kept changing; gave up after {attempts} attempts")]
    ConcurrencyConflict { version: VersionId, attempts: u32 },
    #[error("no free version name in project {project} after {attempts} attempts")]
    NamingExhausted { project: ProjectId, attempts: u32 },
    #[error("cannot name the next version: {0}")]
    Naming(#[from] NamingError),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("dispatch of {stage} for version {version} failed: {source}")]
    Dispatch {
        stage: Stage,
        version: VersionId,
        #[source]
        source: CiError,
    },
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::VersionNotFound(_) | EngineError::ProjectNotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::ConcurrencyConflict { .. }
            | EngineError::NamingExhausted { .. }
            | EngineError::Naming(_)
            | EngineError::InvalidState(_) => ErrorKind::Conflict,
            EngineError::Dispatch { .. } => ErrorKind::DispatchFailure,
            EngineError::Encode(_) | EngineError::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            // Code analysis rows are keyed by their version
            StoreError::NotFound {
                kind: RecordKind::Version | RecordKind::CodeAnalysis,
                id,
            } => EngineError::VersionNotFound(VersionId::new(id)),
            StoreError::NotFound {
                kind: RecordKind::Project,
                id,
            } => EngineError::ProjectNotFound(ProjectId::new(id)),
            other => EngineError::Storage(other),
        }
    }
}

impl From<StatusError> for EngineError {
    fn from(err: StatusError) -> Self {
        EngineError::InvalidState(err.to_string())
    }
}
