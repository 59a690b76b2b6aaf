//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `portcall-config.yaml` at the
//! workspace root. Every field has a default, so an empty document (or no
//! document at all, via [`EngineConfig::default`]) yields a working engine.

use std::collections::BTreeMap;
use std::path::Path;

use portcall_types::OperationType;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Fixed per-call fees added to every cost estimate.
    #[serde(default)]
    pub fees: FeeConfig,

    /// Queue and punctuality heuristics.
    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// Operation duration estimates.
    #[serde(default)]
    pub operations: OperationsConfig,

    /// Event stream settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Analytics settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging settings (consumed by the host binary).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `PORTCALL_LOG_LEVEL` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Flat fees charged once per port call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeeConfig {
    /// Pilot boarding and guidance.
    #[serde(default = "default_pilotage")]
    pub pilotage: Decimal,

    /// Tug assistance.
    #[serde(default = "default_towage")]
    pub towage: Decimal,

    /// Ship agency services.
    #[serde(default = "default_agency")]
    pub agency: Decimal,
}

impl FeeConfig {
    /// Sum of all flat fees.
    pub fn total(&self) -> Decimal {
        self.pilotage
            .saturating_add(self.towage)
            .saturating_add(self.agency)
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            pilotage: default_pilotage(),
            towage: default_towage(),
            agency: default_agency(),
        }
    }
}

/// Queue and punctuality heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulingConfig {
    /// Minutes of estimated wait per queue position.
    ///
    /// A placeholder heuristic, not a measured service rate.
    #[serde(default = "default_wait_minutes_per_queue_slot")]
    pub wait_minutes_per_queue_slot: i64,

    /// Minutes after the planned arrival that still count as on time.
    #[serde(default = "default_on_time_grace_minutes")]
    pub on_time_grace_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            wait_minutes_per_queue_slot: default_wait_minutes_per_queue_slot(),
            on_time_grace_minutes: default_on_time_grace_minutes(),
        }
    }
}

/// Operation duration estimates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationsConfig {
    /// Base handling minutes per unit of quantity, by operation type.
    #[serde(default = "default_base_minutes_per_unit")]
    pub base_minutes_per_unit: BTreeMap<OperationType, Decimal>,
}

impl OperationsConfig {
    /// Base minutes per unit for `operation_type`, falling back to one
    /// minute per unit for types missing from the table.
    pub fn minutes_per_unit(&self, operation_type: OperationType) -> Decimal {
        self.base_minutes_per_unit
            .get(&operation_type)
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            base_minutes_per_unit: default_base_minutes_per_unit(),
        }
    }
}

/// Event stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity. Subscribers that fall further behind
    /// than this skip ahead.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Analytics settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyticsConfig {
    /// Utilization samples kept per port (oldest dropped first).
    #[serde(default = "default_utilization_history_limit")]
    pub utilization_history_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            utilization_history_limit: default_utilization_history_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Apply `PORTCALL_LOG_LEVEL` if it is set.
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("PORTCALL_LOG_LEVEL") {
            self.level = level;
        }
    }

    /// Whether JSON output was requested.
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_pilotage() -> Decimal {
    Decimal::from_parts(1_500, 0, 0, false, 0)
}

const fn default_towage() -> Decimal {
    Decimal::from_parts(2_500, 0, 0, false, 0)
}

const fn default_agency() -> Decimal {
    Decimal::from_parts(800, 0, 0, false, 0)
}

const fn default_wait_minutes_per_queue_slot() -> i64 {
    30
}

const fn default_on_time_grace_minutes() -> i64 {
    30
}

fn default_base_minutes_per_unit() -> BTreeMap<OperationType, Decimal> {
    BTreeMap::from([
        (OperationType::Loading, Decimal::new(5, 1)),
        (OperationType::Unloading, Decimal::new(5, 1)),
        (OperationType::Transshipment, Decimal::new(75, 2)),
        (OperationType::Bunkering, Decimal::new(2, 1)),
        (OperationType::Maintenance, Decimal::ONE),
        (OperationType::Inspection, Decimal::ONE),
    ])
}

const fn default_broadcast_capacity() -> usize {
    1024
}

const fn default_utilization_history_limit() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "pretty".to_owned()
}
