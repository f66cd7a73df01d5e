//! Location tracking service.
//!
//! `LocationTracker` records which locations clients ask about, keeps them
//! active while they are in use, and hands the fetch layer the identifiers
//! it needs (location string and cache key) for each one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use wxtrack_core::TrackingConfig;

use crate::cache::CacheQuery;
use crate::clock::{Clock, SystemClock};
use crate::error::{TrackerError, TrackerResult};
use crate::normalize::AliasTable;
use crate::repository::LocationRepository;
use crate::types::LocationRecord;

/// Days without a request before a location is deactivated.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

pub struct LocationTracker {
    repo: Arc<dyn LocationRepository>,
    clock: Arc<dyn Clock>,
    aliases: AliasTable,
    retention: Duration,
    default_query: CacheQuery,
}

impl LocationTracker {
    /// Tracker with the wall clock, built-in aliases and a 30-day retention window.
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            aliases: AliasTable::default(),
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            default_query: CacheQuery::default(),
        }
    }

    /// Tracker configured from the `[tracking]` section.
    pub fn from_config(repo: Arc<dyn LocationRepository>, config: &TrackingConfig) -> Self {
        Self::new(repo)
            .with_aliases(AliasTable::from_config(&config.aliases))
            .with_retention(Duration::days(i64::from(config.retention_days)))
            .with_default_query(CacheQuery::with_alerts(
                config.forecast_days,
                config.include_alerts,
            ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_default_query(mut self, query: CacheQuery) -> Self {
        self.default_query = query;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Record a client request for a location.
    ///
    /// Normalizes the identifiers, upserts the record (reactivating it if the
    /// sweep had deactivated it), then bumps its request count.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` for empty identifiers and storage
    /// errors as-is. Every failure is logged with the raw and cleaned input.
    pub fn track_location(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> TrackerResult<LocationRecord> {
        let key = match self.aliases.normalize(city_name, country_code) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(
                    raw_city = city_name,
                    raw_country = country_code,
                    error = %e,
                    "Failed to normalize location"
                );
                return Err(e);
            }
        };

        let now = self.clock.now();
        let result = self
            .repo
            .upsert(&key, now)
            .and_then(|record| self.repo.increment_request_count(record.id));

        match result {
            Ok(record) => {
                tracing::debug!(
                    location = %key,
                    request_count = record.request_count,
                    "Tracked location request"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::error!(
                    raw_city = city_name,
                    raw_country = country_code,
                    city = %key.city_name,
                    country = %key.country_code,
                    error = %e,
                    "Failed to track location"
                );
                Err(e)
            }
        }
    }

    /// Look up a location without recording a request.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` for empty identifiers, or a storage error.
    pub fn find_location(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> TrackerResult<Option<LocationRecord>> {
        let key = self.aliases.normalize(city_name, country_code)?;
        self.repo.find(&key)
    }

    /// Snapshot of every active location.
    ///
    /// # Errors
    /// Returns a storage error if the listing fails.
    pub fn active_locations(&self) -> TrackerResult<Vec<LocationRecord>> {
        self.repo.filter_by_active()
    }

    /// Active locations not fetched within `refresh_interval`.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` if the interval reaches past the
    /// earliest representable time, or a storage error if the listing fails.
    pub fn locations_due_for_fetch(
        &self,
        refresh_interval: Duration,
    ) -> TrackerResult<Vec<LocationRecord>> {
        let cutoff = self.cutoff(refresh_interval, "refresh interval")?;
        self.repo.filter_due_for_fetch(cutoff)
    }

    /// Active locations the next sweep would deactivate.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` for an out-of-range retention
    /// window, or a storage error if the listing fails.
    pub fn stale_locations(&self) -> TrackerResult<Vec<LocationRecord>> {
        let cutoff = self.cutoff(self.retention, "retention window")?;
        self.repo.filter_stale_since(cutoff)
    }

    /// Record a successful upstream fetch for `record`.
    ///
    /// # Errors
    /// Returns `TrackerError::NotFound` if the record is no longer stored.
    pub fn mark_as_fetched(&self, record: &LocationRecord) -> TrackerResult<LocationRecord> {
        self.repo.mark_fetched(record.id, self.clock.now())
    }

    /// Deactivate locations with no request inside the retention window.
    ///
    /// Returns how many locations were deactivated; a rerun with nothing newly
    /// stale returns 0.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` for an out-of-range retention
    /// window, or a storage error if the update fails.
    pub fn deactivate_old_locations(&self) -> TrackerResult<usize> {
        let cutoff = self.cutoff(self.retention, "retention window")?;
        let changed = self.repo.deactivate_stale_since(cutoff)?;
        tracing::info!(
            deactivated = changed,
            cutoff = %cutoff,
            "Deactivated stale locations"
        );
        Ok(changed)
    }

    /// `"{city},{country}"` for the weather API query.
    pub fn location_string(&self, record: &LocationRecord) -> String {
        record.location_string()
    }

    /// Cache key with the fixed defaults: 3 days, alerts `"yes"`.
    pub fn cache_key(&self, record: &LocationRecord) -> String {
        record.cache_key()
    }

    pub fn cache_key_with(&self, record: &LocationRecord, days: u32, alerts: &str) -> String {
        record.cache_key_with(days, alerts)
    }

    /// Cache key for the configured forecast horizon and alerts preference.
    pub fn default_cache_key(&self, record: &LocationRecord) -> String {
        record.cache_key_for(&self.default_query)
    }

    fn cutoff(&self, window: Duration, what: &str) -> TrackerResult<DateTime<Utc>> {
        let now = self.clock.now();
        now.checked_sub_signed(window).ok_or_else(|| {
            TrackerError::validation(format!(
                "{} of {} hours reaches before the earliest supported time",
                what,
                window.num_hours()
            ))
        })
    }
}
