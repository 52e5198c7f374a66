//! Callback specs
//!
//! Check results arrive asynchronously and open the approval gate.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn passing_both_checks_opens_approval() {
    let gantry = Gantry::start();
    let id = gantry.create();

    let view = gantry.pass_checks(&id);

    assert_eq!(
        fields(&view),
        json!({
            "code": "success",
            "build": "success",
            "image": "success",
            "approve": "pending",
            "deploy": "none",
            "flow": "pending",
        })
    );
}

#[test]
fn failed_scan_fails_the_flow_without_opening_approval() {
    let gantry = Gantry::start();
    let id = gantry.create();

    let view = gantry
        .report(&id, Stage::BuildScan, json!({"outcome": "fail"}))
        .expect(200);

    assert_eq!(view["buildStatus"], "fail");
    assert_eq!(view["imageStatus"], "fail");
    assert_eq!(view["flowStatus"], "fail");
    assert_eq!(view["approveStatus"], "none");
}

#[test]
fn success_without_an_artifact_is_rejected() {
    let gantry = Gantry::start();
    let id = gantry.create();
    let before = gantry.status(&id);

    gantry
        .report(&id, Stage::CodeAnalysis, json!({"outcome": "success"}))
        .expect_error(400, "invalid_input");

    assert_eq!(gantry.status(&id), before);
}

#[test]
fn unknown_outcome_is_rejected() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry
        .report(&id, Stage::Deploy, json!({"outcome": "maybe"}))
        .expect_error(400, "invalid_input");
}

#[test]
fn redelivered_callbacks_do_not_change_the_status() {
    let gantry = Gantry::start();
    let id = gantry.create();
    let first = gantry.pass_checks(&id);

    let again = gantry
        .report(
            &id,
            Stage::BuildScan,
            json!({"outcome": "success", "artifactLocation": "https://scan.test/r/1"}),
        )
        .expect(200);

    assert_eq!(fields(&again), fields(&first));
}

#[test]
fn callback_for_an_unknown_version_is_not_found() {
    let gantry = Gantry::start();
    gantry
        .report("ghost", Stage::Deploy, json!({"outcome": "success"}))
        .expect_error(404, "not_found");
}

#[test]
fn deploy_callback_before_approval_is_a_conflict() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry
        .report(&id, Stage::Deploy, json!({"outcome": "success"}))
        .expect_error(409, "conflict");
}
