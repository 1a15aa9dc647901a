//! Error types shared by GME crates

use thiserror::Error;

/// Result type alias for GME operations
pub type Result<T> = std::result::Result<T, GmeError>;

/// Errors that are not specific to one pipeline stage
#[derive(Error, Debug)]
pub enum GmeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidSetting {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown data source: {0}")]
    UnknownSource(String),
}

impl GmeError {
    /// Build an [`GmeError::InvalidSetting`] for an environment variable that failed to parse
    pub fn invalid_setting(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        GmeError::InvalidSetting {
            name: name.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_setting_message() {
        let err = GmeError::invalid_setting("GME_FETCH_TIMEOUT_SECS", "abc", "not a number");
        assert_eq!(
            err.to_string(),
            "Invalid value for GME_FETCH_TIMEOUT_SECS: \"abc\" (not a number)"
        );
    }

    #[test]
    fn test_unknown_source_message() {
        let err = GmeError::UnknownSource("sym-h".to_string());
        assert_eq!(err.to_string(), "Unknown data source: sym-h");
    }
}
