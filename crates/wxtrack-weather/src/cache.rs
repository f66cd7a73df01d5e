//! Cache identifiers shared with the weather fetch layer.
//!
//! Both strings must be reproduced byte-for-byte by any consumer that reads
//! or writes the same cache entries, so they are built here and nowhere else.

use serde::{Deserialize, Serialize};

/// Default forecast horizon in days.
pub const DEFAULT_FORECAST_DAYS: u32 = 3;

/// Default alerts flag.
pub const DEFAULT_ALERTS: &str = "yes";

/// Query shape dimensions of a cached weather result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheQuery {
    pub days: u32,
    pub alerts: String,
}

impl Default for CacheQuery {
    fn default() -> Self {
        Self {
            days: DEFAULT_FORECAST_DAYS,
            alerts: DEFAULT_ALERTS.to_string(),
        }
    }
}

impl CacheQuery {
    pub fn new(days: u32, alerts: impl Into<String>) -> Self {
        Self {
            days,
            alerts: alerts.into(),
        }
    }

    /// Build from a boolean alerts preference (`yes`/`no`).
    pub fn with_alerts(days: u32, include_alerts: bool) -> Self {
        Self::new(days, if include_alerts { "yes" } else { "no" })
    }
}

/// `"{city},{country}"`
pub fn location_string(city_name: &str, country_code: &str) -> String {
    format!("{},{}", city_name, country_code)
}

/// `"weather_{city}_{country}_{days}_{alerts}"`
pub fn cache_key(city_name: &str, country_code: &str, days: u32, alerts: &str) -> String {
    format!("weather_{}_{}_{}_{}", city_name, country_code, days, alerts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_string_has_no_whitespace_padding() {
        assert_eq!(location_string("messina", "za"), "messina,za");
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("messina", "za", 5, "no"), "weather_messina_za_5_no");
        assert_eq!(cache_key("messina", "za", 3, "yes"), "weather_messina_za_3_yes");
    }

    #[test]
    fn test_default_query() {
        let q = CacheQuery::default();
        assert_eq!(q.days, 3);
        assert_eq!(q.alerts, "yes");
    }

    #[test]
    fn test_query_from_bool() {
        assert_eq!(CacheQuery::with_alerts(7, false), CacheQuery::new(7, "no"));
        assert_eq!(CacheQuery::with_alerts(3, true), CacheQuery::default());
    }
}
