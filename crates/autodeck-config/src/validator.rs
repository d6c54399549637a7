//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Minimum history capacity for both the job queue and the event buffer.
const MIN_HISTORY_CAPACITY: usize = 16;

/// Allowed heartbeat cadence in seconds.
const HEARTBEAT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// Configuration validator.
///
/// Out-of-range numeric fields are clamped in place and reported as
/// warnings; structurally invalid fields are reported as errors.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, clamping out-of-range values.
    pub fn validate(config: &mut Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_bridge(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_events(config, &mut result);
        Self::validate_workflows(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_bridge(config: &Config, result: &mut ValidationResult) {
        if config.bridge.binary.is_empty() {
            result.add_error(ValidationError::new(
                "bridge.binary",
                "Bridge binary cannot be empty",
            ));
        }

        if config.bridge.timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "bridge.timeout_ms",
                "timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_queue(config: &mut Config, result: &mut ValidationResult) {
        if config.queue.history_capacity < MIN_HISTORY_CAPACITY {
            result.add_warning(ValidationWarning::new(
                "queue.history_capacity",
                format!(
                    "history_capacity {} is below the minimum, raised to {}",
                    config.queue.history_capacity, MIN_HISTORY_CAPACITY
                ),
            ));
            config.queue.history_capacity = MIN_HISTORY_CAPACITY;
        }
    }

    fn validate_events(config: &mut Config, result: &mut ValidationResult) {
        if config.events.history_capacity < MIN_HISTORY_CAPACITY {
            result.add_warning(ValidationWarning::new(
                "events.history_capacity",
                format!(
                    "history_capacity {} is below the minimum, raised to {}",
                    config.events.history_capacity, MIN_HISTORY_CAPACITY
                ),
            ));
            config.events.history_capacity = MIN_HISTORY_CAPACITY;
        }

        if !HEARTBEAT_RANGE_SECS.contains(&config.events.heartbeat_secs) {
            let clamped = config
                .events
                .heartbeat_secs
                .clamp(*HEARTBEAT_RANGE_SECS.start(), *HEARTBEAT_RANGE_SECS.end());
            result.add_warning(ValidationWarning::new(
                "events.heartbeat_secs",
                format!(
                    "heartbeat_secs {} is out of range, clamped to {}",
                    config.events.heartbeat_secs, clamped
                ),
            ));
            config.events.heartbeat_secs = clamped;
        }
    }

    fn validate_workflows(config: &Config, result: &mut ValidationResult) {
        if config.workflows.store_path.is_empty() {
            result.add_error(ValidationError::new(
                "workflows.store_path",
                "Workflow store path cannot be empty",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, valid_levels
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
