//! SQLite-backed store for vehicle records.
//!
//! Records are kept as one JSON document per registration identifier, with
//! make, model and manufacture year mirrored into indexed columns for
//! analytical queries that happen outside this subsystem. Writes are full
//! replacements: whatever the latest extraction produced is the record, and
//! fields missing from it disappear from the stored document too. Records
//! are never deleted here, only overwritten.
//!
//! Callers pass identifiers already in canonical form; the store does not
//! normalize.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

use crate::record::{VehicleRecord, VehicleReport};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vehicles (
    identifier        TEXT PRIMARY KEY,
    make              TEXT,
    model             TEXT,
    manufacture_year  INTEGER,
    record            TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vehicles_make_model ON vehicles (make, model);
CREATE INDEX IF NOT EXISTS idx_vehicles_year ON vehicles (manufacture_year);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not prepare store path: {0}")]
    Io(#[from] std::io::Error),
}

pub struct VehicleStore {
    conn: Mutex<Connection>,
}

impl VehicleStore {
    /// Open (or create) the store at `path`, creating parent directories as
    /// needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and the offline import path when no
    /// persistence is wanted.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The stored record for `identifier`, if any.
    pub fn get(&self, identifier: &str) -> Result<Option<VehicleRecord>, StoreError> {
        let conn = self.conn();
        let json: String = match conn.query_row(
            "SELECT record FROM vehicles WHERE identifier = ?1",
            params![identifier],
            |row| row.get(0),
        ) {
            Ok(json) => json,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Write `report` as the record for its identifier, stamped with the
    /// current time. Replaces any existing record wholesale while keeping
    /// the row's original creation time.
    pub fn upsert(&self, report: &VehicleReport) -> Result<VehicleRecord, StoreError> {
        self.upsert_at(report, Utc::now())
    }

    pub(crate) fn upsert_at(
        &self,
        report: &VehicleReport,
        last_updated: DateTime<Utc>,
    ) -> Result<VehicleRecord, StoreError> {
        let record = VehicleRecord {
            report: report.clone(),
            last_updated,
        };
        let json = serde_json::to_string(&record)?;
        let stamp = last_updated.to_rfc3339();

        let conn = self.conn();
        conn.execute(
            "INSERT INTO vehicles (identifier, make, model, manufacture_year, record, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(identifier) DO UPDATE SET
                 make = excluded.make,
                 model = excluded.model,
                 manufacture_year = excluded.manufacture_year,
                 record = excluded.record,
                 updated_at = excluded.updated_at",
            params![
                record.report.identifier,
                record.report.make,
                record.report.model,
                record.report.manufacture_year,
                json,
                stamp,
            ],
        )?;
        debug!(identifier = %record.report.identifier, "vehicle record stored");
        Ok(record)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Recover the connection if a holder panicked mid-operation.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Engine, MotStatus};
    use chrono::Duration;
    use tempfile::tempdir;

    fn sample_report(identifier: &str) -> VehicleReport {
        let mut report = VehicleReport::new(identifier);
        report.make = Some("Honda".to_string());
        report.model = Some("Civic".to_string());
        report.manufacture_year = Some(2019);
        report.engine = Some(Engine {
            power_bhp: Some(180.0),
            capacity_cc: Some(1998),
            cylinder_count: Some(4),
            fuel_type: Some("Petrol".to_string()),
        });
        report
    }

    #[test]
    fn test_get_returns_none_for_unknown_identifier() {
        let store = VehicleStore::open_in_memory().unwrap();
        assert!(store.get("AB12CDE").unwrap().is_none());
    }

    #[test]
    fn test_upsert_then_get_round_trips_the_record() {
        let store = VehicleStore::open_in_memory().unwrap();
        let written = store.upsert(&sample_report("AB12CDE")).unwrap();

        let read = store.get("AB12CDE").unwrap().unwrap();
        assert_eq!(read, written);
        assert_eq!(read.report.engine.unwrap().capacity_cc, Some(1998));
    }

    #[test]
    fn test_upsert_replaces_the_whole_record() {
        let store = VehicleStore::open_in_memory().unwrap();
        store.upsert(&sample_report("AB12CDE")).unwrap();

        // Second extraction found less. The stored record must not keep the
        // old engine group around.
        let mut thinner = VehicleReport::new("AB12CDE");
        thinner.make = Some("Honda".to_string());
        thinner.mot_status = Some(MotStatus {
            expiry_date: Some("12 March 2027".to_string()),
            pass_rate_percent: None,
        });
        store.upsert(&thinner).unwrap();

        let read = store.get("AB12CDE").unwrap().unwrap();
        assert_eq!(read.report.make.as_deref(), Some("Honda"));
        assert!(read.report.engine.is_none());
        assert!(read.report.model.is_none());
        assert!(read.report.mot_status.is_some());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_keeps_created_at_and_advances_updated_at() {
        let store = VehicleStore::open_in_memory().unwrap();
        let first = Utc::now() - Duration::days(3);
        let second = Utc::now();
        store.upsert_at(&sample_report("AB12CDE"), first).unwrap();
        store.upsert_at(&sample_report("AB12CDE"), second).unwrap();

        let conn = store.conn();
        let (created, updated): (String, String) = conn
            .query_row(
                "SELECT created_at, updated_at FROM vehicles WHERE identifier = ?1",
                params!["AB12CDE"],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(created, first.to_rfc3339());
        assert_eq!(updated, second.to_rfc3339());
    }

    #[test]
    fn test_upsert_mirrors_indexed_columns() {
        let store = VehicleStore::open_in_memory().unwrap();
        store.upsert(&sample_report("AB12CDE")).unwrap();

        let conn = store.conn();
        let (make, model, year): (String, String, i32) = conn
            .query_row(
                "SELECT make, model, manufacture_year FROM vehicles WHERE identifier = ?1",
                params!["AB12CDE"],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(make, "Honda");
        assert_eq!(model, "Civic");
        assert_eq!(year, 2019);
    }

    #[test]
    fn test_schema_creates_analytical_indexes() {
        let store = VehicleStore::open_in_memory().unwrap();
        let conn = store.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(names.contains(&"idx_vehicles_make_model".to_string()));
        assert!(names.contains(&"idx_vehicles_year".to_string()));
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vehicles.db");

        {
            let store = VehicleStore::open(&path).unwrap();
            store.upsert(&sample_report("AB12CDE")).unwrap();
        }

        let reopened = VehicleStore::open(&path).unwrap();
        let read = reopened.get("AB12CDE").unwrap().unwrap();
        assert_eq!(read.report.make.as_deref(), Some("Honda"));
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("vehicles.db");
        let store = VehicleStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_records_for_different_identifiers_do_not_collide() {
        let store = VehicleStore::open_in_memory().unwrap();
        store.upsert(&sample_report("AB12CDE")).unwrap();
        let mut other = VehicleReport::new("ZZ99ZZZ");
        other.make = Some("Ford".to_string());
        store.upsert(&other).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let read = store.get("ZZ99ZZZ").unwrap().unwrap();
        assert_eq!(read.report.make.as_deref(), Some("Ford"));
        assert!(read.report.engine.is_none());
    }
}
