//! Daemon health specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn health_reports_ok() {
    let gantry = Gantry::start();
    assert_eq!(gantry.get("/healthz").expect(200), json!({"status": "ok"}));
}

#[test]
fn unknown_routes_are_not_found() {
    let gantry = Gantry::start();
    assert_eq!(gantry.get("/versions").status, 404);
}
