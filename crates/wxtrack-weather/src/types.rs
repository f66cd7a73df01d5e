use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{self, CacheQuery};

/// A tracked location and its request/fetch bookkeeping.
///
/// `(city_name, country_code)` is the natural key; both are stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    pub city_name: String,
    pub country_code: String,
    pub request_count: u64,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_request_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl LocationRecord {
    /// `"{city},{country}"`, the query string sent to the weather API.
    pub fn location_string(&self) -> String {
        cache::location_string(&self.city_name, &self.country_code)
    }

    /// Cache key with the default query shape (3 days, alerts included).
    pub fn cache_key(&self) -> String {
        self.cache_key_for(&CacheQuery::default())
    }

    /// Cache key for an explicit forecast horizon and alerts flag.
    pub fn cache_key_with(&self, days: u32, alerts: &str) -> String {
        cache::cache_key(&self.city_name, &self.country_code, days, alerts)
    }

    pub fn cache_key_for(&self, query: &CacheQuery) -> String {
        self.cache_key_with(query.days, &query.alerts)
    }

    /// True if the location has never been fetched or was last fetched before `cutoff`.
    pub fn is_due_for_fetch(&self, cutoff: DateTime<Utc>) -> bool {
        self.is_active && self.last_fetched_at.map_or(true, |at| at < cutoff)
    }
}

/// A cleaned `(city, country)` pair, ready to be used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub city_name: String,
    pub country_code: String,
}

impl LocationKey {
    pub fn new(city_name: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            country_code: country_code.into(),
        }
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.city_name, self.country_code)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(last_fetched_at: Option<DateTime<Utc>>, is_active: bool) -> LocationRecord {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        LocationRecord {
            id: 1,
            city_name: "cape town".to_string(),
            country_code: "za".to_string(),
            request_count: 2,
            last_fetched_at,
            last_request_at: t,
            is_active,
            created_at: t,
        }
    }

    #[test]
    fn test_location_string() {
        assert_eq!(record(None, true).location_string(), "cape town,za");
    }

    #[test]
    fn test_cache_keys() {
        let r = record(None, true);
        assert_eq!(r.cache_key(), "weather_cape town_za_3_yes");
        assert_eq!(r.cache_key_with(5, "no"), "weather_cape town_za_5_no");
    }

    #[test]
    fn test_due_for_fetch() {
        let cutoff = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert!(record(None, true).is_due_for_fetch(cutoff));
        assert!(record(Some(cutoff - Duration::minutes(1)), true).is_due_for_fetch(cutoff));
        assert!(!record(Some(cutoff + Duration::minutes(1)), true).is_due_for_fetch(cutoff));
        assert!(!record(None, false).is_due_for_fetch(cutoff));
    }

    #[test]
    fn test_location_key_display() {
        assert_eq!(LocationKey::new("messina", "za").to_string(), "messina,za");
    }
}
