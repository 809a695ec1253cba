//! Error handling for the Acuity adapter
//!
//! Only graph construction can fail. Shape inference never raises; it
//! leaves shapes unresolved instead.

use thiserror::Error;

/// Result type alias for Acuity operations
pub type Result<T> = std::result::Result<T, AcuityError>;

/// Main error type for Acuity operations
#[derive(Error, Debug)]
pub enum AcuityError {
    /// A value was referenced by something other than a JSON string.
    #[error("Invalid value identifier '{identifier}'.")]
    InvalidValueIdentifier { identifier: String },

    #[error("Model document is missing the '{section}' section")]
    MissingSection { section: &'static str },

    #[error("Layer '{layer}' is malformed: {reason}")]
    MalformedLayer { layer: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcuityError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AcuityError::InvalidValueIdentifier { .. } => "INVALID_VALUE_IDENTIFIER",
            AcuityError::MissingSection { .. } => "MISSING_SECTION",
            AcuityError::MalformedLayer { .. } => "MALFORMED_LAYER",
            AcuityError::Io(_) => "IO_ERROR",
            AcuityError::Json(_) => "JSON_ERROR",
        }
    }

    /// Build an `InvalidValueIdentifier` from the offending JSON value
    pub fn invalid_identifier(identifier: &serde_json::Value) -> Self {
        AcuityError::InvalidValueIdentifier {
            identifier: identifier.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        let err = AcuityError::MissingSection { section: "Layers" };
        assert_eq!(err.error_code(), "MISSING_SECTION");
    }

    #[test]
    fn test_invalid_identifier_message() {
        let err = AcuityError::invalid_identifier(&json!(42));
        assert_eq!(err.error_code(), "INVALID_VALUE_IDENTIFIER");
        assert_eq!(err.to_string(), "Invalid value identifier '42'.");
    }
}
