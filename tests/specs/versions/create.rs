//! Version creation specs
//!
//! Creating a version persists it and triggers both checks.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn create_returns_the_first_name() {
    let gantry = Gantry::start();

    let body = gantry
        .post("/projects/shop/versions", json!({"branch": "main"}))
        .expect(201);

    assert_eq!(body["versionName"], "1.0.5");
    assert!(body["versionId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn new_version_is_queued_for_both_checks() {
    let gantry = Gantry::start();
    let id = gantry.create();

    let view = gantry.status(&id);
    assert_eq!(
        fields(&view),
        json!({
            "code": "pending",
            "build": "pending",
            "image": "pending",
            "approve": "none",
            "deploy": "none",
            "flow": "pending",
        })
    );
    assert_eq!(gantry.ci.triggered(), vec![Stage::CodeAnalysis, Stage::BuildScan]);
}

#[test]
fn names_advance_by_five_patches() {
    let gantry = Gantry::start();
    let names: Vec<Value> = (0..4)
        .map(|_| {
            gantry
                .post("/projects/shop/versions", json!({"branch": "main"}))
                .expect(201)["versionName"]
                .clone()
        })
        .collect();
    assert_eq!(names, vec![json!("1.0.5"), json!("1.1.0"), json!("1.1.5"), json!("1.2.0")]);
}

#[test]
fn triggers_carry_the_callback_url() {
    let gantry = Gantry::start();
    let id = gantry.create();

    let request = gantry.ci.last_request(Stage::BuildScan).unwrap();
    assert_eq!(
        request.callback_url,
        format!("{}/versions/{}/callbacks/build-scan", gantry.url, id)
    );
    assert_eq!(request.git_ref, "main");
    assert_eq!(request.inputs["build_context"], "services/shop");
    assert_eq!(request.inputs["image"], "registry.test/shop:1.0.5");
}

#[test]
fn unknown_project_is_not_found() {
    let gantry = Gantry::start();
    gantry
        .post("/projects/nope/versions", json!({"branch": "main"}))
        .expect_error(404, "not_found");
}

#[test]
fn malformed_overrides_are_rejected() {
    let gantry = Gantry::start();
    gantry
        .post(
            "/projects/shop/versions",
            json!({"branch": "main", "helmOverrides": {"memoryRequest": "a lot"}}),
        )
        .expect_error(400, "invalid_input");
    assert!(gantry.ci.calls().is_empty());
}

#[test]
fn failed_trigger_reports_a_bad_gateway_and_fails_the_flow() {
    let gantry = Gantry::start();
    gantry.fail_stage(Stage::CodeAnalysis);

    let body = gantry
        .post("/projects/shop/versions", json!({"branch": "main"}))
        .expect_error(502, "dispatch_failure");
    assert!(body["message"].as_str().unwrap().contains("code-analysis"));

    let id = gantry.ci.calls()[0].request.version_id.to_string();
    let view = gantry.status(&id);
    assert_eq!(view["codeStatus"], "fail");
    assert_eq!(view["buildStatus"], "none");
    assert_eq!(view["flowStatus"], "fail");
}
