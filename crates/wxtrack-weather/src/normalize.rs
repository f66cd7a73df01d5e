//! Location normalization and the alias table.
//!
//! Raw identifiers are trimmed and lowercased. The alias table then maps
//! known variants of a city name onto one canonical `(city, country)` pair.

use wxtrack_core::AliasConfig;

use crate::error::{TrackerError, TrackerResult};
use crate::types::LocationKey;

/// Maps any city name containing `pattern` to a canonical pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    pub pattern: String,
    pub canonical: LocationKey,
}

impl AliasRule {
    pub fn new(pattern: &str, city_name: &str, country_code: &str) -> Self {
        Self {
            pattern: clean(pattern),
            canonical: LocationKey::new(clean(city_name), clean(country_code)),
        }
    }

    fn matches(&self, city_name: &str) -> bool {
        !self.pattern.is_empty() && city_name.contains(&self.pattern)
    }
}

impl From<&AliasConfig> for AliasRule {
    fn from(config: &AliasConfig) -> Self {
        Self::new(&config.pattern, &config.city, &config.country)
    }
}

/// Ordered alias rules; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
}

impl Default for AliasTable {
    /// The built-in rules: Messina / Musina-Nancefield, South Africa.
    fn default() -> Self {
        Self {
            rules: vec![
                AliasRule::new("messi", "messina", "za"),
                AliasRule::new("musina-nancefield", "messina", "za"),
            ],
        }
    }
}

impl AliasTable {
    /// A table with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Built-in rules followed by the configured ones.
    pub fn from_config(aliases: &[AliasConfig]) -> Self {
        let mut table = Self::default();
        for alias in aliases {
            table.push(AliasRule::from(alias));
        }
        table
    }

    pub fn push(&mut self, rule: AliasRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    /// Canonical pair for an already-cleaned city name, if any rule matches.
    pub fn resolve(&self, city_name: &str) -> Option<&LocationKey> {
        self.rules
            .iter()
            .find(|rule| rule.matches(city_name))
            .map(|rule| &rule.canonical)
    }

    /// Trim, lowercase, then apply the alias rules.
    ///
    /// # Errors
    /// Returns `TrackerError::Validation` if either part is empty after trimming.
    pub fn normalize(&self, city_name: &str, country_code: &str) -> TrackerResult<LocationKey> {
        let city = clean(city_name);
        let country = clean(country_code);

        if city.is_empty() {
            return Err(TrackerError::validation("city name cannot be empty"));
        }
        if country.is_empty() {
            return Err(TrackerError::validation("country code cannot be empty"));
        }

        match self.resolve(&city) {
            Some(canonical) => Ok(canonical.clone()),
            None => Ok(LocationKey::new(city, country)),
        }
    }
}

fn clean(raw: &str) -> String {
    raw.trim().to_lowercase()
}
