// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store
//!
//! A single connection guarded by a mutex. Version creation runs in one
//! transaction; status writes are conditional updates keyed on `revision`.

use crate::store::{CasOutcome, NewVersion, StatusRecord, StoreError, VersionStore};
use chrono::{DateTime, Utc};
use gantry_core::{
    CodeAnalysis, HelmDefaults, HelmValues, HelmValuesId, Project, ProjectId, Revision,
    StageStatus, StatusSnapshot, Version, VersionId, VersionName,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    repository       TEXT NOT NULL,
    image_repository TEXT NOT NULL,
    build_context    TEXT NOT NULL,
    helm_defaults    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS helm_values (
    id             TEXT PRIMARY KEY,
    replica_count  INTEGER NOT NULL,
    cpu_request    TEXT NOT NULL,
    memory_request TEXT NOT NULL,
    cpu_limit      TEXT NOT NULL,
    memory_limit   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS versions (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT NOT NULL UNIQUE,
    project_id      TEXT NOT NULL REFERENCES projects(id),
    name            TEXT NOT NULL,
    branch          TEXT NOT NULL,
    image           TEXT NOT NULL,
    helm_values_id  TEXT NOT NULL REFERENCES helm_values(id),
    scan_report_url TEXT,
    code_status     TEXT NOT NULL,
    build_status    TEXT NOT NULL,
    image_status    TEXT NOT NULL,
    approve_status  TEXT NOT NULL,
    deploy_status   TEXT NOT NULL,
    flow_status     TEXT NOT NULL,
    revision        INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (project_id, name)
);
CREATE TABLE IF NOT EXISTS code_analyses (
    version_id TEXT PRIMARY KEY REFERENCES versions(id),
    status     TEXT NOT NULL,
    report_url TEXT,
    updated_at TEXT NOT NULL
);
";

const VERSION_COLUMNS: &str = "id, project_id, name, branch, image, helm_values_id, \
     scan_report_url, code_status, build_status, image_status, approve_status, \
     deploy_status, flow_status, revision, created_at, updated_at";

/// Store backed by a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating the schema if needed
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("sqlite schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn revision_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Revision> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw)
        .map(Revision)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn revision_param(revision: Revision) -> Result<i64, StoreError> {
    i64::try_from(revision.0).map_err(|_| StoreError::Corrupt {
        id: revision.to_string(),
        reason: "revision exceeds the storable range".to_string(),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: VersionId::new(row.get::<_, String>(0)?),
        project_id: ProjectId::new(row.get::<_, String>(1)?),
        name: parse_column(row, 2)?,
        branch: row.get(3)?,
        image: row.get(4)?,
        helm_values_id: HelmValuesId::new(row.get::<_, String>(5)?),
        scan_report_url: row.get(6)?,
        status: StatusSnapshot {
            code: parse_column(row, 7)?,
            build: parse_column(row, 8)?,
            image: parse_column(row, 9)?,
            approve: parse_column(row, 10)?,
            deploy: parse_column(row, 11)?,
            flow: parse_column(row, 12)?,
        },
        revision: revision_column(row, 13)?,
        created_at: timestamp_column(row, 14)?,
        updated_at: timestamp_column(row, 15)?,
    })
}

fn is_duplicate_name(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("versions.name")
    )
}

impl VersionStore for SqliteStore {
    fn upsert_project(&self, project: &Project) -> Result<(), StoreError> {
        let helm = serde_json::to_string(&project.helm)?;
        self.conn().execute(
            "INSERT INTO projects (id, name, repository, image_repository, build_context, helm_defaults)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                repository = excluded.repository,
                image_repository = excluded.image_repository,
                build_context = excluded.build_context,
                helm_defaults = excluded.helm_defaults",
            params![
                project.id.as_str(),
                project.name,
                project.repository,
                project.image_repository,
                project.build_context,
                helm,
            ],
        )?;
        Ok(())
    }

    fn project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        let row = self
            .conn()
            .query_row(
                "SELECT name, repository, image_repository, build_context, helm_defaults
                 FROM projects WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        let (name, repository, image_repository, build_context, helm) =
            row.ok_or_else(|| StoreError::project_not_found(id))?;
        let helm: HelmDefaults = serde_json::from_str(&helm)?;
        Ok(Project {
            id: id.clone(),
            name,
            repository,
            image_repository,
            build_context,
            helm,
        })
    }

    fn latest_version_name(&self, project: &ProjectId) -> Result<Option<VersionName>, StoreError> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT name FROM versions WHERE project_id = ?1 ORDER BY seq DESC LIMIT 1",
                [project.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|name| {
            name.parse::<VersionName>().map_err(|e| StoreError::Corrupt {
                id: project.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    fn create_version(&self, new: &NewVersion) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let version = &new.version;
        let helm = &new.helm_values;

        let project_exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                [version.project_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if project_exists.is_none() {
            return Err(StoreError::project_not_found(&version.project_id));
        }

        tx.execute(
            "INSERT INTO helm_values (id, replica_count, cpu_request, memory_request, cpu_limit, memory_limit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                helm.id.as_str(),
                helm.replica_count,
                helm.cpu_request.to_string(),
                helm.memory_request.to_string(),
                helm.cpu_limit.to_string(),
                helm.memory_limit.to_string(),
            ],
        )?;

        let status = &version.status;
        let inserted = tx.execute(
            &format!(
                "INSERT INTO versions ({VERSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                version.id.as_str(),
                version.project_id.as_str(),
                version.name.to_string(),
                version.branch,
                version.image,
                version.helm_values_id.as_str(),
                version.scan_report_url,
                status.code.as_str(),
                status.build.as_str(),
                status.image.as_str(),
                status.approve.as_str(),
                status.deploy.as_str(),
                status.flow.as_str(),
                revision_param(version.revision)?,
                version.created_at.to_rfc3339(),
                version.updated_at.to_rfc3339(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_duplicate_name(&e) => {
                // Dropping the transaction rolls back the helm row as well
                return Err(StoreError::DuplicateName {
                    project: version.project_id.clone(),
                    name: version.name,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let analysis = &new.code_analysis;
        tx.execute(
            "INSERT INTO code_analyses (version_id, status, report_url, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                analysis.version_id.as_str(),
                analysis.status.as_str(),
                analysis.report_url,
                analysis.updated_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn version(&self, id: &VersionId) -> Result<Version, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE id = ?1"),
                [id.as_str()],
                version_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::version_not_found(id))
    }

    fn status(&self, id: &VersionId) -> Result<StatusRecord, StoreError> {
        let version = self.version(id)?;
        Ok(StatusRecord {
            version_id: version.id,
            name: version.name,
            status: version.status,
            revision: version.revision,
        })
    }

    fn compare_and_set_status(
        &self,
        id: &VersionId,
        expected: Revision,
        status: &StatusSnapshot,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE versions SET
                code_status = ?1, build_status = ?2, image_status = ?3,
                approve_status = ?4, deploy_status = ?5, flow_status = ?6,
                revision = revision + 1, updated_at = ?7
             WHERE id = ?8 AND revision = ?9",
            params![
                status.code.as_str(),
                status.build.as_str(),
                status.image.as_str(),
                status.approve.as_str(),
                status.deploy.as_str(),
                status.flow.as_str(),
                at.to_rfc3339(),
                id.as_str(),
                revision_param(expected)?,
            ],
        )?;
        if changed == 1 {
            return Ok(CasOutcome::Applied(expected.next()));
        }

        let current = conn
            .query_row(
                "SELECT revision FROM versions WHERE id = ?1",
                [id.as_str()],
                |row| revision_column(row, 0),
            )
            .optional()?;
        match current {
            Some(current) => Ok(CasOutcome::Stale { current }),
            None => Err(StoreError::version_not_found(id)),
        }
    }

    fn helm_values(&self, id: &HelmValuesId) -> Result<HelmValues, StoreError> {
        self.conn()
            .query_row(
                "SELECT replica_count, cpu_request, memory_request, cpu_limit, memory_limit
                 FROM helm_values WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok(HelmValues {
                        id: id.clone(),
                        replica_count: row.get(0)?,
                        cpu_request: parse_column(row, 1)?,
                        memory_request: parse_column(row, 2)?,
                        cpu_limit: parse_column(row, 3)?,
                        memory_limit: parse_column(row, 4)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::helm_values_not_found(id))
    }

    fn code_analysis(&self, version: &VersionId) -> Result<CodeAnalysis, StoreError> {
        self.conn()
            .query_row(
                "SELECT status, report_url, updated_at FROM code_analyses WHERE version_id = ?1",
                [version.as_str()],
                |row| {
                    Ok(CodeAnalysis {
                        version_id: version.clone(),
                        status: parse_column(row, 0)?,
                        report_url: row.get(1)?,
                        updated_at: timestamp_column(row, 2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::code_analysis_not_found(version))
    }

    fn record_code_analysis(
        &self,
        version: &VersionId,
        status: StageStatus,
        report_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE code_analyses
             SET status = ?1, report_url = COALESCE(?2, report_url), updated_at = ?3
             WHERE version_id = ?4",
            params![status.as_str(), report_url, at.to_rfc3339(), version.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::code_analysis_not_found(version));
        }
        Ok(())
    }

    fn record_scan_report(
        &self,
        version: &VersionId,
        report_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE versions SET scan_report_url = ?1, updated_at = ?2 WHERE id = ?3",
            params![report_url, at.to_rfc3339(), version.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::version_not_found(version));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
