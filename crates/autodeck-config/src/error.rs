//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::NotFound("autodeck.toml".to_string());
        assert!(err.to_string().contains("autodeck.toml"));

        let err = ConfigError::InvalidValue {
            field: "bridge.binary".to_string(),
            message: "must not be empty".to_string(),
        };
        assert!(err.to_string().contains("bridge.binary"));
        assert!(err.to_string().contains("must not be empty"));

        let err = ConfigError::EnvVarNotSet("AUTODECK_HOME".to_string());
        assert!(err.to_string().contains("AUTODECK_HOME"));
    }
}
