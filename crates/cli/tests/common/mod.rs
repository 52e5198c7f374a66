// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use assert_cmd::Command;
use gantry_adapters::FakeCiAdapter;
use gantry_core::{HelmDefaults, Project, ProjectId};
use gantry_daemon::router;
use gantry_engine::{Runtime, RuntimeConfig, RuntimeDeps};
use gantry_storage::{MemoryStore, VersionStore};

/// In-process gantryd on an ephemeral port, serving until dropped
pub struct TestDaemon {
    pub url: String,
    pub ci: FakeCiAdapter,
    _runtime: tokio::runtime::Runtime,
}

impl TestDaemon {
    pub fn start() -> Self {
        let store = MemoryStore::new();
        store
            .upsert_project(&Project {
                id: ProjectId::new("shop"),
                name: "shop".to_string(),
                repository: "git@git.test:shop.git".to_string(),
                image_repository: "registry.test/shop".to_string(),
                build_context: ".".to_string(),
                helm: HelmDefaults::default(),
            })
            .expect("seed project");

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("local addr");
        let url = format!("http://{}", addr);

        let ci = FakeCiAdapter::new();
        let runtime = Arc::new(Runtime::new(
            RuntimeDeps {
                ci: ci.clone(),
                store: Arc::new(store),
            },
            gantry_core::SystemClock,
            gantry_core::UuidIdGen,
            RuntimeConfig::new(url.clone()),
        ));

        let tokio_rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        tokio_rt.spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            let _ = axum::serve(listener, router(runtime)).await;
        });

        Self {
            url,
            ci,
            _runtime: tokio_rt,
        }
    }

    /// `gantry` pointed at this daemon
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("gantry").expect("gantry binary");
        cmd.env("GANTRY_SERVER", &self.url).env_remove("RUST_LOG");
        cmd
    }

    /// Create a version through the CLI and return its id
    pub fn create(&self) -> String {
        let output = self
            .cli()
            .args(["--format", "json", "create", "shop", "--branch", "main"])
            .output()
            .expect("run gantry");
        assert!(output.status.success(), "{:?}", output);
        let created: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("json output");
        created["versionId"]
            .as_str()
            .expect("versionId")
            .to_string()
    }
}

/// A base URL nothing is listening on
pub fn dead_server() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
