use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Longest retention window accepted; larger values overflow date arithmetic.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Longest refresh interval accepted (ten years).
pub const MAX_REFRESH_HOURS: u32 = 87_600;

/// A single problem found in a config file, keyed by its dotted TOML path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Issues collected by [`Config::validate`].
///
/// Errors stop the tracker from starting. Warnings are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigIssue::new(field, message));
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigIssue::new(field, message));
    }

    /// All errors on one line, separated by `; `. Empty when valid.
    pub fn error_summary(&self) -> String {
        let mut summary = String::new();
        for issue in &self.errors {
            if !summary.is_empty() {
                summary.push_str("; ");
            }
            summary.push_str(&issue.to_string());
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Location store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Tracking, retention and cache-key settings
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend for location records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Which backend holds location records
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite file path; defaults to `locations.db` in the config directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolve the SQLite path against the config directory.
    pub fn resolved_path(&self, config_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config_dir.join("locations.db"))
    }
}

/// One alias rule: any city name containing `pattern` maps to `city`/`country`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub pattern: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Days without a request before a location is deactivated
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Hours between upstream fetches for an active location
    #[serde(default = "default_refresh_hours")]
    pub refresh_hours: u32,

    /// Forecast horizon used in default cache keys
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    /// Whether default cache keys include weather alerts
    #[serde(default = "default_include_alerts")]
    pub include_alerts: bool,

    /// Extra alias rules, applied after the built-in ones
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,
}

fn default_retention_days() -> u32 {
    30
}

fn default_refresh_hours() -> u32 {
    3
}

fn default_forecast_days() -> u32 {
    3
}

fn default_include_alerts() -> bool {
    true
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            refresh_hours: default_refresh_hours(),
            forecast_days: default_forecast_days(),
            include_alerts: default_include_alerts(),
            aliases: Vec::new(),
        }
    }
}

impl TrackingConfig {
    /// The alerts flag as it appears in cache keys.
    pub fn alerts_flag(&self) -> &'static str {
        if self.include_alerts {
            "yes"
        } else {
            "no"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxtrack")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            database: DatabaseConfig::default(),
            tracking: TrackingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

        Ok(config)
    }

    /// Load from the default location and reject configs with validation errors
    ///
    /// Warnings are logged and also returned so a caller that installs its
    /// subscriber after loading can report them.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config_path = Self::config_path()?;
        Self::load_validated_from(&config_path)
    }

    /// Load from an explicit path and reject configs with validation errors
    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.tracking.retention_days == 0 {
            result.add_error(
                "tracking.retention_days",
                "Retention must be at least 1 day",
            );
        } else if self.tracking.retention_days > MAX_RETENTION_DAYS {
            result.add_error(
                "tracking.retention_days",
                format!("Retention cannot exceed {} days", MAX_RETENTION_DAYS),
            );
        } else if self.tracking.retention_days > 365 {
            result.add_warning(
                "tracking.retention_days",
                "Retention is longer than a year; stale locations will keep being fetched",
            );
        }

        if self.tracking.refresh_hours == 0 {
            result.add_warning(
                "tracking.refresh_hours",
                "Refresh interval is 0; every active location is always due",
            );
        } else if self.tracking.refresh_hours > MAX_REFRESH_HOURS {
            result.add_error(
                "tracking.refresh_hours",
                format!("Refresh interval cannot exceed {} hours", MAX_REFRESH_HOURS),
            );
        }

        if self.tracking.forecast_days == 0 {
            result.add_error(
                "tracking.forecast_days",
                "Forecast horizon must be at least 1 day",
            );
        }

        for (i, alias) in self.tracking.aliases.iter().enumerate() {
            let field = format!("tracking.aliases[{}]", i);
            if alias.pattern.trim().is_empty() {
                result.add_error(&field, "Alias pattern cannot be empty");
            }
            if alias.city.trim().is_empty() || alias.country.trim().is_empty() {
                result.add_error(&field, "Alias city and country cannot be empty");
            }
        }

        if self.database.backend == StorageBackend::Memory {
            result.add_warning(
                "database.backend",
                "In-memory backend selected; tracked locations are lost on exit",
            );
        }

        if let Some(path) = &self.database.path {
            if path.is_dir() {
                result.add_error(
                    "database.path",
                    format!("Path is a directory: {}", path.display()),
                );
            }
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            result.add_error(
                "logging.level",
                format!("Invalid log filter: {}", self.logging.level),
            );
        }

        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wxtrack");

        Ok(config_dir.join("config.toml"))
    }
}
