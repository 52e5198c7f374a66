// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: store selection, project seeding, serving.

use std::future::Future;
use std::sync::Arc;

use gantry_adapters::{CiAdapter, HttpCiAdapter, NoOpCiAdapter, TracedCiAdapter};
use gantry_core::{Project, SystemClock, UuidIdGen};
use gantry_engine::{Runtime, RuntimeDeps};
use gantry_storage::{MemoryStore, SqliteStore, StoreError, VersionStore};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, StoreKind};
use crate::server;

/// Environment variable holding the CI bearer token
pub const CI_TOKEN_ENV: &str = "GANTRY_CI_TOKEN";

/// Store handle shared by every component of a running daemon
pub type SharedStore = Arc<dyn VersionStore>;

/// Daemon runtime with the system clock and UUID identifiers
pub type DaemonRuntime<C> = Runtime<TracedCiAdapter<C>, dyn VersionStore, SystemClock, UuidIdGen>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the configured store, creating the database directory if needed
pub fn open_store(config: &Config) -> Result<SharedStore, LifecycleError> {
    match config.store.kind {
        StoreKind::Memory => {
            warn!("using the in-memory store; versions are lost on exit");
            let store: SharedStore = Arc::new(MemoryStore::new());
            Ok(store)
        }
        StoreKind::Sqlite => {
            let path = config.store_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store: SharedStore = Arc::new(SqliteStore::open(&path, config.store.busy_timeout)?);
            info!(path = %path.display(), "opened sqlite store");
            Ok(store)
        }
    }
}

/// Insert or refresh the configured projects
pub fn seed_projects(store: &dyn VersionStore, projects: &[Project]) -> Result<(), LifecycleError> {
    for project in projects {
        store.upsert_project(project)?;
        info!(project_id = %project.id, "project registered");
    }
    Ok(())
}

/// Wire a runtime around `ci` and `store`
pub fn build_runtime<C: CiAdapter>(
    config: &Config,
    ci: C,
    store: SharedStore,
) -> DaemonRuntime<C> {
    Runtime::new(
        RuntimeDeps {
            ci: TracedCiAdapter::new(ci),
            store,
        },
        SystemClock,
        UuidIdGen,
        config.runtime_config(),
    )
}

/// Bind the listen address and serve until `shutdown` resolves
pub async fn serve<C, F>(
    config: &Config,
    ci: C,
    store: SharedStore,
    shutdown: F,
) -> Result<(), LifecycleError>
where
    C: CiAdapter,
    F: Future<Output = ()> + Send + 'static,
{
    let runtime = Arc::new(build_runtime(config, ci, store));
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| LifecycleError::BindFailed {
            addr: config.listen,
            source,
        })?;
    info!(
        listen = %config.listen,
        callback_base_url = %config.callback_base_url(),
        strategy = ?config.dispatch_strategy,
        "gantryd listening"
    );

    axum::serve(listener, server::router(runtime))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Start the daemon described by `config`
pub async fn run<F>(config: &Config, shutdown: F) -> Result<(), LifecycleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = open_store(config)?;
    seed_projects(store.as_ref(), &config.projects)?;

    match &config.ci.base_url {
        Some(base_url) => {
            let token = std::env::var(CI_TOKEN_ENV).ok().filter(|t| !t.is_empty());
            if token.is_none() {
                warn!("{} is not set; triggers are sent without a token", CI_TOKEN_ENV);
            }
            let ci = HttpCiAdapter::new(base_url.clone(), config.ci.timeout, token);
            serve(config, ci, store, shutdown).await
        }
        None => {
            warn!("ci.base_url is not configured; triggers will be dropped");
            serve(config, NoOpCiAdapter::new(), store, shutdown).await
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
