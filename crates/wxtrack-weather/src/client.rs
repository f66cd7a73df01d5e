//! Async front for the tracker.
//!
//! Request handlers run on the tokio runtime, while the stores do blocking
//! I/O. `LocationClient` moves each call onto the blocking pool.

use std::sync::Arc;

use chrono::Duration;

use crate::error::{TrackerError, TrackerResult};
use crate::tracker::LocationTracker;
use crate::types::LocationRecord;

#[derive(Clone)]
pub struct LocationClient {
    tracker: Arc<LocationTracker>,
}

impl LocationClient {
    pub fn new(tracker: LocationTracker) -> Self {
        Self {
            tracker: Arc::new(tracker),
        }
    }

    /// The wrapped tracker, for the synchronous key helpers.
    pub fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    async fn run<T, F>(&self, op: F) -> TrackerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocationTracker) -> TrackerResult<T> + Send + 'static,
    {
        let tracker = self.tracker.clone();
        tokio::task::spawn_blocking(move || op(tracker.as_ref()))
            .await
            .map_err(|e| TrackerError::Other(anyhow::anyhow!("Tracker task failed: {}", e)))?
    }

    /// Async `LocationTracker::track_location`.
    pub async fn track_location(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> TrackerResult<LocationRecord> {
        let city_name = city_name.to_string();
        let country_code = country_code.to_string();
        self.run(move |t| t.track_location(&city_name, &country_code))
            .await
    }

    pub async fn find_location(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> TrackerResult<Option<LocationRecord>> {
        let city_name = city_name.to_string();
        let country_code = country_code.to_string();
        self.run(move |t| t.find_location(&city_name, &country_code))
            .await
    }

    pub async fn active_locations(&self) -> TrackerResult<Vec<LocationRecord>> {
        self.run(|t| t.active_locations()).await
    }

    pub async fn locations_due_for_fetch(
        &self,
        refresh_interval: Duration,
    ) -> TrackerResult<Vec<LocationRecord>> {
        self.run(move |t| t.locations_due_for_fetch(refresh_interval))
            .await
    }

    pub async fn mark_as_fetched(&self, record: &LocationRecord) -> TrackerResult<LocationRecord> {
        let record = record.clone();
        self.run(move |t| t.mark_as_fetched(&record)).await
    }

    pub async fn deactivate_old_locations(&self) -> TrackerResult<usize> {
        self.run(|t| t.deactivate_old_locations()).await
    }
}
