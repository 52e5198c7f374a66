// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP routes and request handling.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gantry_adapters::CiAdapter;
use gantry_core::{Clock, IdGen, ProjectId, Stage, SystemClock, UuidIdGen, VersionId};
use gantry_engine::{EngineError, ErrorKind, Runtime};
use gantry_storage::VersionStore;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::protocol::{
    ApprovalRequest, CallbackPayload, ErrorBody, Health, InitiateRequest, Initiated, StatusView,
};

/// Shared handler state
pub struct AppState<C, S: ?Sized, K = SystemClock, I = UuidIdGen> {
    pub runtime: Arc<Runtime<C, S, K, I>>,
}

impl<C, S: ?Sized, K, I> Clone for AppState<C, S, K, I> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
        }
    }
}

/// Build the daemon's router around a runtime
pub fn router<C, S, K, I>(runtime: Arc<Runtime<C, S, K, I>>) -> Router
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    Router::new()
        .route("/healthz", get(health))
        .route(
            "/projects/{project_id}/versions",
            post(create_version::<C, S, K, I>),
        )
        .route(
            "/versions/{version_id}/callbacks/{stage}",
            post(callback::<C, S, K, I>),
        )
        .route(
            "/versions/{version_id}/approval",
            post(decide::<C, S, K, I>),
        )
        .route("/versions/{version_id}/retry", post(retry::<C, S, K, I>))
        .route("/versions/{version_id}/status", get(status::<C, S, K, I>))
        .with_state(AppState { runtime })
}

/// Engine error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::DispatchFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        match kind {
            ErrorKind::Internal => error!(error = %self.0, "request failed"),
            ErrorKind::DispatchFailure => warn!(error = %self.0, "request failed"),
            _ => debug!(error = %self.0, kind = %kind, "request rejected"),
        }
        (status_code(kind), Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// Decode a JSON body, reporting malformed input as `InvalidInput`
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError(EngineError::InvalidInput(format!(
            "malformed request body: {}",
            e
        )))
    })
}

async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn create_version<C, S, K, I>(
    State(state): State<AppState<C, S, K, I>>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Initiated>), ApiError>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    let request: InitiateRequest = parse_body(&body)?;
    let initiated = state
        .runtime
        .create_version(&ProjectId::new(project_id), &request)
        .await?;
    Ok((StatusCode::CREATED, Json(initiated)))
}

/// The path names the version; a body that names another one is refused
fn callback_payload(version_id: &str, body: &Bytes) -> Result<CallbackPayload, ApiError> {
    let mut payload: CallbackPayload = parse_body(body)?;
    match payload.version_id.as_deref().map(str::trim) {
        Some(named) if !named.is_empty() && named != version_id => {
            return Err(ApiError(EngineError::InvalidInput(format!(
                "versionId {} does not match the callback path",
                named
            ))));
        }
        _ => payload.version_id = Some(version_id.to_string()),
    }
    Ok(payload)
}

async fn callback<C, S, K, I>(
    State(state): State<AppState<C, S, K, I>>,
    Path((version_id, stage)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<StatusView>, ApiError>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    let stage: Stage = stage.parse().map_err(|e: String| {
        ApiError(EngineError::InvalidInput(e))
    })?;
    let payload = callback_payload(&version_id, &body)?;
    let record = state.runtime.callback(stage, &payload)?;
    Ok(Json(record.into()))
}

async fn decide<C, S, K, I>(
    State(state): State<AppState<C, S, K, I>>,
    Path(version_id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusView>, ApiError>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    let request: ApprovalRequest = parse_body(&body)?;
    let record = state
        .runtime
        .decide(&VersionId::new(version_id), request.approved)
        .await?;
    Ok(Json(record.into()))
}

async fn retry<C, S, K, I>(
    State(state): State<AppState<C, S, K, I>>,
    Path(version_id): Path<String>,
) -> Result<Json<StatusView>, ApiError>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    let record = state.runtime.retry(&VersionId::new(version_id)).await?;
    Ok(Json(record.into()))
}

async fn status<C, S, K, I>(
    State(state): State<AppState<C, S, K, I>>,
    Path(version_id): Path<String>,
) -> Result<Json<StatusView>, ApiError>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    let record = state.runtime.status(&VersionId::new(version_id))?;
    Ok(Json(record.into()))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
