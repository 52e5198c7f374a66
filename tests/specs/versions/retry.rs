//! Manual retry specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn retry_restarts_only_the_failed_check() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry
        .report(
            &id,
            Stage::CodeAnalysis,
            json!({"outcome": "success", "artifactLocation": "https://sonar.test/r/1"}),
        )
        .expect(200);
    gantry
        .report(&id, Stage::BuildScan, json!({"outcome": "fail"}))
        .expect(200);

    let view = gantry.post_empty(&format!("/versions/{id}/retry")).expect(200);

    assert_eq!(view["codeStatus"], "success");
    assert_eq!(view["buildStatus"], "pending");
    assert_eq!(view["flowStatus"], "pending");
    assert_eq!(
        gantry.ci.triggered(),
        vec![Stage::CodeAnalysis, Stage::BuildScan, Stage::BuildScan]
    );
}

#[test]
fn retry_redeploys_with_the_same_helm_values() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);
    gantry.decide(&id, true).expect(200);
    let first = gantry.ci.last_request(Stage::Deploy).unwrap();

    gantry
        .report(&id, Stage::Deploy, json!({"outcome": "fail"}))
        .expect(200);
    let view = gantry.post_empty(&format!("/versions/{id}/retry")).expect(200);

    assert_eq!(view["deployStatus"], "pending");
    assert_eq!(view["flowStatus"], "pending");
    let second = gantry.ci.last_request(Stage::Deploy).unwrap();
    assert_eq!(second.inputs["helm_values"], first.inputs["helm_values"]);
}

#[test]
fn healthy_versions_cannot_be_retried() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry
        .post_empty(&format!("/versions/{id}/retry"))
        .expect_error(409, "conflict");
}

#[test]
fn rejected_versions_cannot_be_retried() {
    let gantry = Gantry::start();
    let id = gantry.create();
    gantry.pass_checks(&id);
    gantry.decide(&id, false).expect(200);

    gantry
        .post_empty(&format!("/versions/{id}/retry"))
        .expect_error(409, "conflict");
}
