use thiserror::Error;

use crate::media::MediaErrorCode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host refused the request, e.g. autoplay without a user gesture.
    #[error("Operation not allowed by host: {0}")]
    NotAllowed(String),

    #[error("Media error ({code}): {message}")]
    Media {
        code: MediaErrorCode,
        message: String,
    },

    #[error("Invalid host state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Returns `true` when the host rejected the call for policy reasons
    /// rather than because the media itself is broken.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BridgeError::NotAllowed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_error_display_includes_code() {
        let err = BridgeError::Media {
            code: MediaErrorCode::Decode,
            message: "bad frame".into(),
        };
        assert_eq!(err.to_string(), "Media error (decode): bad frame");
    }

    #[test]
    fn not_allowed_is_permission_denied() {
        assert!(BridgeError::NotAllowed("autoplay".into()).is_permission_denied());
        assert!(!BridgeError::OperationFailed("x".into()).is_permission_denied());
    }
}
