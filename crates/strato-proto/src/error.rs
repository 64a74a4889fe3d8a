//! Error types for the strato-proto crate.

use thiserror::Error;

/// Errors that can occur while decoding or validating wire data.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to decode a payload.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A value failed validation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for ProtoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ProtoError::Validation("bad unit".into());
        assert_eq!(err.to_string(), "validation error: bad unit");
    }

    #[test]
    fn json_error_becomes_decoding() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ProtoError::from(json_err);
        assert!(matches!(err, ProtoError::Decoding(_)));
    }
}
