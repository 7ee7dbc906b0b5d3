//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NorthError {
    #[error("CONFIG/{0}")]
    ConfigError(String),

    #[error("SERIALIZE/{0}")]
    SerializeError(String),

    #[error("IO/{0}")]
    IoError(String),
}

impl From<serde_json::Error> for NorthError {
    fn from(err: serde_json::Error) -> Self {
        NorthError::SerializeError(err.to_string())
    }
}

impl From<std::io::Error> for NorthError {
    fn from(err: std::io::Error) -> Self {
        NorthError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefix() {
        let err = NorthError::ConfigError("thresholds must ascend".to_string());
        assert_eq!(err.to_string(), "CONFIG/thresholds must ascend");
    }

    #[test]
    fn test_from_json_error() {
        let err: NorthError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("SERIALIZE/"));
    }
}
