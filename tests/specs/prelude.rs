//! Shared harness for gantryd specs

use std::sync::Arc;
use std::time::Duration;

pub use gantry_core::Stage;
pub use serde_json::{json, Value};
pub use similar_asserts::assert_eq;

use gantry_adapters::{CiError, FakeCiAdapter};
use gantry_core::{HelmDefaults, Project, ProjectId, SystemClock, UuidIdGen};
use gantry_engine::{DispatchStrategy, Runtime, RuntimeConfig, RuntimeDeps};
use gantry_storage::{SqliteStore, VersionStore};
use tempfile::TempDir;

/// A gantryd instance backed by a SQLite file in a temp directory
pub struct Gantry {
    pub url: String,
    pub ci: FakeCiAdapter,
    agent: ureq::Agent,
    _server: tokio::runtime::Runtime,
    _dir: TempDir,
}

/// Status code and decoded body of one exchange
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    /// Assert the status code and hand back the body
    pub fn expect(self, status: u16) -> Value {
        assert_eq!(self.status, status, "body: {}", self.body);
        self.body
    }

    /// Assert an error reply of the given kind
    pub fn expect_error(self, status: u16, kind: &str) -> Value {
        let body = self.expect(status);
        assert_eq!(body["error"], kind);
        body
    }
}

pub fn shop() -> Project {
    Project {
        id: ProjectId::new("shop"),
        name: "shop".to_string(),
        repository: "git@git.test:shop.git".to_string(),
        image_repository: "registry.test/shop".to_string(),
        build_context: "services/shop".to_string(),
        helm: HelmDefaults::default(),
    }
}

impl Gantry {
    pub fn start() -> Self {
        Self::with_strategy(DispatchStrategy::Sequential)
    }

    pub fn with_strategy(strategy: DispatchStrategy) -> Self {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("gantry.db"), Duration::from_secs(5)).unwrap();
        store.upsert_project(&shop()).unwrap();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let ci = FakeCiAdapter::new();
        let mut config = RuntimeConfig::new(url.clone());
        config.dispatch_strategy = strategy;
        config.dispatch_timeout = Duration::from_millis(500);
        let runtime = Arc::new(Runtime::new(
            RuntimeDeps {
                ci: ci.clone(),
                store: Arc::new(store),
            },
            SystemClock,
            UuidIdGen,
            config,
        ));

        let server = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        server.spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let _ = axum::serve(listener, gantry_daemon::router(runtime)).await;
        });

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(10)))
            .build()
            .into();

        Self {
            url,
            ci,
            agent,
            _server: server,
            _dir: dir,
        }
    }

    pub fn get(&self, path: &str) -> Reply {
        let response = self.agent.get(&format!("{}{}", self.url, path)).call().unwrap();
        reply(response)
    }

    pub fn post(&self, path: &str, body: Value) -> Reply {
        let response = self
            .agent
            .post(&format!("{}{}", self.url, path))
            .header("content-type", "application/json")
            .send(body.to_string())
            .unwrap();
        reply(response)
    }

    pub fn post_empty(&self, path: &str) -> Reply {
        let response = self
            .agent
            .post(&format!("{}{}", self.url, path))
            .send_empty()
            .unwrap();
        reply(response)
    }

    /// Create a version of `shop` from `main`, returning its id
    pub fn create(&self) -> String {
        let body = self
            .post("/projects/shop/versions", json!({"branch": "main"}))
            .expect(201);
        body["versionId"].as_str().unwrap().to_string()
    }

    pub fn status(&self, id: &str) -> Value {
        self.get(&format!("/versions/{id}/status")).expect(200)
    }

    pub fn report(&self, id: &str, stage: Stage, body: Value) -> Reply {
        self.post(&format!("/versions/{id}/callbacks/{}", stage.slug()), body)
    }

    /// Report both checks as passed
    pub fn pass_checks(&self, id: &str) -> Value {
        self.report(
            id,
            Stage::CodeAnalysis,
            json!({"outcome": "success", "artifactLocation": "https://sonar.test/r/1"}),
        )
        .expect(200);
        self.report(
            id,
            Stage::BuildScan,
            json!({"outcome": "success", "artifactLocation": "https://scan.test/r/1"}),
        )
        .expect(200)
    }

    pub fn decide(&self, id: &str, approved: bool) -> Reply {
        self.post(&format!("/versions/{id}/approval"), json!({"approved": approved}))
    }

    pub fn fail_stage(&self, stage: Stage) {
        self.ci
            .fail_stage(stage, CiError::Transport("connection refused".to_string()));
    }
}

fn reply(mut response: ureq::http::Response<ureq::Body>) -> Reply {
    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string().unwrap();
    Reply {
        status,
        body: serde_json::from_str(&text).unwrap_or(Value::String(text)),
    }
}

/// Status fields of a view, for whole-status comparisons
pub fn fields(view: &Value) -> Value {
    json!({
        "code": view["codeStatus"],
        "build": view["buildStatus"],
        "image": view["imageStatus"],
        "approve": view["approveStatus"],
        "deploy": view["deployStatus"],
        "flow": view["flowStatus"],
    })
}
