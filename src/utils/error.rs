use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("unsupported crop '{name}'; available crops: {available}")]
    UnknownCrop { name: String, available: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("rainfall data unavailable: {message}")]
    DataUnavailable { message: String },

    #[error("no planting signal detected for the {year} season")]
    NoPlantingSignal { year: i32 },

    #[error("insufficient history: {valid} valid seasons, need at least {required}")]
    InsufficientHistory { valid: usize, required: usize },

    #[error("provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {field}: {message}")]
    Config { field: String, message: String },
}

/// Coarse error classification carried in bulk `FailureRecord`s so batch
/// consumers can branch without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownCrop,
    InvalidRequest,
    DataUnavailable,
    NoPlantingSignal,
    InsufficientHistory,
    Provider,
    Internal,
}

impl QuoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuoteError::UnknownCrop { .. } => ErrorKind::UnknownCrop,
            QuoteError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            QuoteError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            QuoteError::NoPlantingSignal { .. } => ErrorKind::NoPlantingSignal,
            QuoteError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            QuoteError::Provider(_) => ErrorKind::Provider,
            QuoteError::Serialization(_) | QuoteError::Io(_) | QuoteError::Config { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Validation errors are rejected before any provider call; data errors
    /// are per-field/per-season and never abort a batch.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnknownCrop | ErrorKind::InvalidRequest
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        QuoteError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn data_unavailable(message: impl Into<String>) -> Self {
        QuoteError::DataUnavailable {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_variants() {
        let e = QuoteError::UnknownCrop {
            name: "quinoa".to_string(),
            available: "maize".to_string(),
        };
        assert_eq!(e.kind(), ErrorKind::UnknownCrop);
        assert!(e.is_validation());

        let e = QuoteError::data_unavailable("sparse series");
        assert_eq!(e.kind(), ErrorKind::DataUnavailable);
        assert!(!e.is_validation());
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NoPlantingSignal).unwrap();
        assert_eq!(json, "\"no_planting_signal\"");
    }
}
