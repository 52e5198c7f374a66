//! Approval specs
//!
//! A human decision either deploys the version or ends its flow.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn approval_deploys_and_deploy_callback_completes_the_flow() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);

    let view = gantry.decide(&id, true).expect(200);
    assert_eq!(view["approveStatus"], "approved");
    assert_eq!(view["deployStatus"], "pending");

    let request = gantry.ci.last_request(Stage::Deploy).unwrap();
    let helm: Value = serde_json::from_str(&request.inputs["helm_values"]).unwrap();
    assert_eq!(helm["replicaCount"], 1);
    assert_eq!(helm["cpuRequest"], "100m");
    assert_eq!(helm["cpuLimit"], "200m");
    assert_eq!(helm["memoryLimit"], "256Mi");

    let view = gantry
        .report(&id, Stage::Deploy, json!({"outcome": "success"}))
        .expect(200);
    assert_eq!(
        fields(&view),
        json!({
            "code": "success",
            "build": "success",
            "image": "success",
            "approve": "approved",
            "deploy": "success",
            "flow": "success",
        })
    );
}

#[test]
fn rejection_is_final() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);

    let view = gantry.decide(&id, false).expect(200);
    assert_eq!(view["approveStatus"], "rejected");
    assert_eq!(view["flowStatus"], "fail");

    gantry.decide(&id, true).expect_error(409, "conflict");
    assert!(gantry.ci.last_request(Stage::Deploy).is_none());
}

#[test]
fn failed_deploy_trigger_keeps_the_approval() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);
    gantry.fail_stage(Stage::Deploy);

    gantry.decide(&id, true).expect_error(502, "dispatch_failure");

    let view = gantry.status(&id);
    assert_eq!(view["approveStatus"], "approved");
    assert_eq!(view["deployStatus"], "fail");
    assert_eq!(view["flowStatus"], "fail");
}

#[test]
fn malformed_decision_is_rejected() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);

    gantry
        .post(&format!("/versions/{id}/approval"), json!({"approved": "yes"}))
        .expect_error(400, "invalid_input");
    assert_eq!(gantry.status(&id)["approveStatus"], "pending");
}
