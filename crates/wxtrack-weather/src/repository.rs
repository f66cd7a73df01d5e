//! Location storage trait and backend selection.
//!
//! This module defines the `LocationRepository` trait that abstracts over the
//! SQLite and in-memory stores. Keys passed in are already normalized.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wxtrack_core::{Config, StorageBackend};

use crate::error::TrackerResult;
use crate::memory::InMemoryLocationStore;
use crate::store::SqliteLocationStore;
use crate::types::{LocationKey, LocationRecord};

/// Storage for location records keyed by `(city_name, country_code)`.
///
/// Implementations must make `increment_request_count` atomic relative to the
/// stored value, so concurrent tracks of the same location never lose counts.
pub trait LocationRepository: Send + Sync {
    /// Look up a record by its natural key.
    fn find(&self, key: &LocationKey) -> TrackerResult<Option<LocationRecord>>;

    /// Create the record (count 0, active) or refresh `last_request_at` and
    /// reactivate it. Never touches `request_count` or `last_fetched_at`.
    fn upsert(&self, key: &LocationKey, now: DateTime<Utc>) -> TrackerResult<LocationRecord>;

    /// Add one to the stored request count and return the updated record.
    ///
    /// # Errors
    /// Returns `TrackerError::NotFound` if no record has this id.
    fn increment_request_count(&self, id: i64) -> TrackerResult<LocationRecord>;

    /// Set `last_fetched_at` and return the updated record.
    ///
    /// # Errors
    /// Returns `TrackerError::NotFound` if no record has this id.
    fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> TrackerResult<LocationRecord>;

    /// All active records, in storage order.
    fn filter_by_active(&self) -> TrackerResult<Vec<LocationRecord>>;

    /// Active records whose last request is older than `cutoff`.
    fn filter_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>>;

    /// Active records never fetched or last fetched before `cutoff`.
    fn filter_due_for_fetch(&self, cutoff: DateTime<Utc>) -> TrackerResult<Vec<LocationRecord>>;

    /// Deactivate every active record whose last request is older than
    /// `cutoff`. Returns how many records changed.
    fn deactivate_stale_since(&self, cutoff: DateTime<Utc>) -> TrackerResult<usize>;

    /// Total number of records, active or not.
    fn count(&self) -> TrackerResult<usize>;
}

/// Open the backend named in the configuration.
///
/// # Errors
/// Returns an error if the SQLite database cannot be opened or initialized.
pub fn open_repository(config: &Config) -> TrackerResult<Arc<dyn LocationRepository>> {
    match config.database.backend {
        StorageBackend::Sqlite => {
            let path = config.database.resolved_path(&config.config_dir);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
            }
            tracing::debug!("Opening location store at {}", path.display());
            let store = SqliteLocationStore::new(&path)?;
            Ok(Arc::new(store) as Arc<dyn LocationRepository>)
        }
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory location store");
            Ok(Arc::new(InMemoryLocationStore::new()) as Arc<dyn LocationRepository>)
        }
    }
}
