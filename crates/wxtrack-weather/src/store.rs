//! SQLite-based location storage.
//!
//! `SqliteLocationStore` keeps one row per canonical location. Timestamps are
//! stored as integer milliseconds so staleness and due-for-fetch filters are
//! plain integer comparisons.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{TrackerError, TrackerResult};
use crate::repository::LocationRepository;
use crate::types::{LocationKey, LocationRecord};

const SELECT_COLUMNS: &str = "SELECT id, city_name, country_code, request_count, last_fetched_at, last_request_at, is_active, created_at FROM locations";

/// SQLite location store.
pub struct SqliteLocationStore {
    conn: Mutex<Connection>,
}

impl SqliteLocationStore {
    /// Open or create the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn in_memory() -> TrackerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> TrackerResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> TrackerResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city_name TEXT NOT NULL,
                country_code TEXT NOT NULL,
                request_count INTEGER NOT NULL DEFAULT 0,
                last_fetched_at INTEGER NULL,
                last_request_at INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                UNIQUE (city_name, country_code)
            );

            CREATE INDEX IF NOT EXISTS idx_locations_active ON locations(is_active);
            CREATE INDEX IF NOT EXISTS idx_locations_last_request ON locations(last_request_at);
            "#,
        )?;
        Ok(())
    }

    /// Convert a database row to a LocationRecord.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<LocationRecord> {
        let last_fetched_ms: Option<i64> = row.get(4)?;
        let is_active: i32 = row.get(6)?;

        Ok(LocationRecord {
            id: row.get(0)?,
            city_name: row.get(1)?,
            country_code: row.get(2)?,
            request_count: row.get(3)?,
            last_fetched_at: last_fetched_ms.map(|ms| from_millis(4, ms)).transpose()?,
            last_request_at: from_millis(5, row.get(5)?)?,
            is_active: is_active != 0,
            created_at: from_millis(7, row.get(7)?)?,
        })
    }

    fn get_by_id(conn: &Connection, id: i64) -> TrackerResult<LocationRecord> {
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()?
        .ok_or_else(|| TrackerError::not_found(format!("id {}", id)))
    }

    fn query_records(
        conn: &Connection,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> TrackerResult<Vec<LocationRecord>> {
        let mut stmt = conn.prepare(&format!("{} {} ORDER BY id", SELECT_COLUMNS, filter))?;
        let rows = stmt.query_map(args, Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn from_millis(column: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

impl LocationRepository for SqliteLocationStore {
    fn find(&self, key: &LocationKey) -> TrackerResult<Option<LocationRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!("{} WHERE city_name = ?1 AND country_code = ?2", SELECT_COLUMNS),
                params![key.city_name, key.country_code],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert(&self, key: &LocationKey, now: DateTime<Utc>) -> TrackerResult<LocationRecord> {
        let conn = self.conn.lock();
        let now_ms = now.timestamp_millis();

        conn.execute(
            r#"
            INSERT INTO locations (city_name, country_code, request_count, last_fetched_at, last_request_at, is_active, created_at)
            VALUES (?1, ?2, 0, NULL, ?3, 1, ?3)
            ON CONFLICT (city_name, country_code)
            DO UPDATE SET last_request_at = excluded.last_request_at, is_active = 1
            "#,
            params![key.city_name, key.country_code, now_ms],
        )?;

        let record = conn
            .query_row(
                &format!("{} WHERE city_name = ?1 AND country_code = ?2", SELECT_COLUMNS),
                params![key.city_name, key.country_code],
                Self::row_to_record,
            )
            .optional()?
            .ok_or_else(|| TrackerError::not_found(key.to_string()))?;

        tracing::debug!("Upserted location {} (id {})", key, record.id);
        Ok(record)
    }

    fn increment_request_count(&self, id: i64) -> TrackerResult<LocationRecord> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE locations SET request_count = request_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(TrackerError::not_found(format!("id {}", id)));
        }
        Self::get_by_id(&conn, id)
    }

    fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> TrackerResult<LocationRecord> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE locations SET last_fetched_at = ?1 WHERE id = ?2",
            params![at.timestamp_millis(), id],
        )?;
        if changed == 0 {
            return Err(TrackerError::not_found(format!("id {}", id)));
        }
        tracing::debug!("Marked location {} fetched", id);
        Self::get_by_id(&conn, id)
    }

    fn filter_by_active(&self) -> TrackerResult<Vec<LocationRecord>> {
        let conn = self.conn.lock();
        Self::query_records(&conn, "WHERE is_active = 1", [])
    }

    fn filter_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>> {
        let conn = self.conn.lock();
        Self::query_records(
            &conn,
            "WHERE is_active = 1 AND last_request_at < ?1",
            params![cutoff.timestamp_millis()],
        )
    }

    fn filter_due_for_fetch(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>> {
        let conn = self.conn.lock();
        Self::query_records(
            &conn,
            "WHERE is_active = 1 AND (last_fetched_at IS NULL OR last_fetched_at < ?1)",
            params![cutoff.timestamp_millis()],
        )
    }

    fn deactivate_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE locations SET is_active = 0 WHERE is_active = 1 AND last_request_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(changed)
    }

    fn count(&self) -> TrackerResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
