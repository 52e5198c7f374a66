// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Records shared by the store test suites

use crate::NewVersion;
use chrono::{DateTime, TimeZone, Utc};
use gantry_core::{
    CodeAnalysis, HelmDefaults, HelmOverrides, HelmValues, HelmValuesId, Project, ProjectId,
    Revision, StatusSnapshot, Version, VersionId, VersionName,
};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .unwrap()
}

pub fn project(id: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: id.to_string(),
        repository: format!("git@example.com:{id}.git"),
        image_repository: format!("registry.example.com/{id}"),
        build_context: ".".to_string(),
        helm: HelmDefaults {
            replica_count: Some(2),
            cpu_request: Some("250m".parse().unwrap()),
            memory_request: None,
        },
    }
}

pub fn new_version(project: &Project, id: &str, name: VersionName) -> NewVersion {
    let version_id = VersionId::new(id);
    let helm_values = HelmValues::resolve(
        HelmValuesId::new(format!("helm-{id}")),
        &HelmOverrides::default(),
        &project.helm,
    )
    .unwrap();
    NewVersion {
        version: Version {
            id: version_id.clone(),
            project_id: project.id.clone(),
            name,
            branch: "main".to_string(),
            image: project.image_for(&name),
            helm_values_id: helm_values.id.clone(),
            scan_report_url: None,
            status: StatusSnapshot::initial(),
            revision: Revision::INITIAL,
            created_at: at(0),
            updated_at: at(0),
        },
        helm_values,
        code_analysis: CodeAnalysis::pending(version_id, at(0)),
    }
}

// Behaviour every store must share; each backend's tests call these.

use crate::{CasOutcome, StoreError, VersionStore};
use gantry_core::{ApproveStatus, StageStatus, StatusUpdate};

pub fn creates_and_reads_back(store: &impl VersionStore) {
    let project = project("shop");
    store.upsert_project(&project).unwrap();
    let new = new_version(&project, "v-1", VersionName::new(1, 0, 5));
    store.create_version(&new).unwrap();

    assert_eq!(store.project(&project.id).unwrap(), project);
    assert_eq!(store.version(&new.version.id).unwrap(), new.version);
    assert_eq!(
        store.helm_values(&new.helm_values.id).unwrap(),
        new.helm_values
    );
    assert_eq!(
        store.code_analysis(&new.version.id).unwrap(),
        new.code_analysis
    );

    let record = store.status(&new.version.id).unwrap();
    assert_eq!(record.revision, Revision::INITIAL);
    assert_eq!(record.name, VersionName::new(1, 0, 5));
    assert_eq!(record.status, StatusSnapshot::initial());
}

pub fn duplicate_names_are_rejected(store: &impl VersionStore) {
    let project = project("shop");
    store.upsert_project(&project).unwrap();
    let name = VersionName::new(1, 0, 5);
    store
        .create_version(&new_version(&project, "v-1", name))
        .unwrap();

    let err = store
        .create_version(&new_version(&project, "v-2", name))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { .. }), "{err:?}");
    assert!(store.version(&VersionId::new("v-2")).unwrap_err().is_not_found());
    assert!(store
        .helm_values(&HelmValuesId::new("helm-v-2"))
        .unwrap_err()
        .is_not_found());

    // Same name under another project is fine
    let other = self::project("blog");
    store.upsert_project(&other).unwrap();
    store
        .create_version(&new_version(&other, "v-3", name))
        .unwrap();
}

pub fn latest_name_follows_creation_order(store: &impl VersionStore) {
    let project = project("shop");
    store.upsert_project(&project).unwrap();
    assert_eq!(store.latest_version_name(&project.id).unwrap(), None);

    store
        .create_version(&new_version(&project, "v-1", VersionName::new(1, 1, 0)))
        .unwrap();
    store
        .create_version(&new_version(&project, "v-2", VersionName::new(1, 0, 5)))
        .unwrap();

    assert_eq!(
        store.latest_version_name(&project.id).unwrap(),
        Some(VersionName::new(1, 0, 5))
    );
}

pub fn stale_revisions_do_not_write(store: &impl VersionStore) {
    let project = project("shop");
    store.upsert_project(&project).unwrap();
    let new = new_version(&project, "v-1", VersionName::new(1, 0, 5));
    store.create_version(&new).unwrap();
    let id = &new.version.id;

    let first = StatusUpdate::new()
        .code(StageStatus::Success)
        .merge(&StatusSnapshot::initial());
    let outcome = store
        .compare_and_set_status(id, Revision::INITIAL, &first, at(5))
        .unwrap();
    assert_eq!(outcome, CasOutcome::Applied(Revision(2)));

    let second = StatusUpdate::new()
        .approve(ApproveStatus::Rejected)
        .merge(&StatusSnapshot::initial());
    let outcome = store
        .compare_and_set_status(id, Revision::INITIAL, &second, at(6))
        .unwrap();
    assert_eq!(outcome, CasOutcome::Stale { current: Revision(2) });

    let version = store.version(id).unwrap();
    assert_eq!(version.status, first);
    assert_eq!(version.revision, Revision(2));
    assert_eq!(version.updated_at, at(5));
}

pub fn missing_rows_are_not_found(store: &impl VersionStore) {
    let missing = VersionId::new("nope");
    assert!(store.version(&missing).unwrap_err().is_not_found());
    assert!(store.status(&missing).unwrap_err().is_not_found());
    assert!(store
        .project(&ProjectId::new("nope"))
        .unwrap_err()
        .is_not_found());
    assert!(store
        .compare_and_set_status(&missing, Revision::INITIAL, &StatusSnapshot::default(), at(1))
        .unwrap_err()
        .is_not_found());
    assert!(store
        .record_scan_report(&missing, "https://reports/x", at(1))
        .unwrap_err()
        .is_not_found());
    assert!(store
        .record_code_analysis(&missing, StageStatus::Success, None, at(1))
        .unwrap_err()
        .is_not_found());
}

pub fn artifacts_are_recorded_without_touching_status(store: &impl VersionStore) {
    let project = project("shop");
    store.upsert_project(&project).unwrap();
    let new = new_version(&project, "v-1", VersionName::new(1, 0, 5));
    store.create_version(&new).unwrap();
    let id = &new.version.id;

    store
        .record_code_analysis(id, StageStatus::Success, Some("https://sonar/r/1"), at(3))
        .unwrap();
    store
        .record_scan_report(id, "https://scanner/r/9", at(4))
        .unwrap();

    let analysis = store.code_analysis(id).unwrap();
    assert_eq!(analysis.status, StageStatus::Success);
    assert_eq!(analysis.report_url.as_deref(), Some("https://sonar/r/1"));
    assert_eq!(analysis.updated_at, at(3));

    let version = store.version(id).unwrap();
    assert_eq!(version.scan_report_url.as_deref(), Some("https://scanner/r/9"));
    assert_eq!(version.status, StatusSnapshot::initial());
    assert_eq!(version.revision, Revision::INITIAL);

    // A later failure keeps the earlier report
    store
        .record_code_analysis(id, StageStatus::Fail, None, at(7))
        .unwrap();
    let analysis = store.code_analysis(id).unwrap();
    assert_eq!(analysis.status, StageStatus::Fail);
    assert_eq!(analysis.report_url.as_deref(), Some("https://sonar/r/1"));
}
