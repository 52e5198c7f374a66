//! Concurrent reporter specs
//!
//! Checks that report at the same moment must both land.

use crate::prelude::*;
use crate::prelude::assert_eq;
use gantry_engine::DispatchStrategy;
use std::sync::Arc;
use std::thread;

#[test]
fn simultaneous_check_results_both_land() {
    for _ in 0..10 {
        let gantry = Arc::new(Gantry::with_strategy(DispatchStrategy::Parallel));
        let id = gantry.create();

        let reporters: Vec<_> = [
            (Stage::CodeAnalysis, "https://sonar.test/r/1"),
            (Stage::BuildScan, "https://scan.test/r/1"),
        ]
        .into_iter()
        .map(|(stage, artifact)| {
            let gantry = Arc::clone(&gantry);
            let id = id.clone();
            thread::spawn(move || {
                gantry
                    .report(
                        &id,
                        stage,
                        json!({"outcome": "success", "artifactLocation": artifact}),
                    )
                    .status
            })
        })
        .collect();
        for reporter in reporters {
            assert_eq!(reporter.join().unwrap(), 200);
        }

        let view = gantry.status(&id);
        assert_eq!(view["codeStatus"], "success");
        assert_eq!(view["imageStatus"], "success");
        assert_eq!(view["approveStatus"], "pending");
    }
}

#[test]
fn reading_twice_returns_the_same_revision() {
    let gantry = Gantry::start();
    let id = gantry.create();
    assert_eq!(gantry.status(&id)["revision"], gantry.status(&id)["revision"]);
}
