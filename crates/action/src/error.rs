//! Error taxonomy for the deletion action.

use thiserror::Error;

/// Errors that can occur while running the action.
///
/// Classification happens once, at the point of detection; nothing downstream
/// reclassifies. The scheduler reads [`ActionError::retryable`] to decide
/// whether to attempt the action again.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Missing or malformed input parameter. Never retried.
    #[error("Missing or invalid required parameter: {0}")]
    Validation(String),

    /// Credential acquisition or token exchange failed. Never retried.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The delete call returned a non-2xx, non-404 status.
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        retryable: bool,
    },

    /// HTTP transport failure (connection, DNS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ActionError {
    /// Whether the scheduler should retry the invocation.
    ///
    /// Transport timeouts are the only retryable transport failures;
    /// connection and DNS errors are treated as fatal.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Api { retryable, .. } => *retryable,
            Self::Http(e) => e.is_timeout(),
            Self::Validation(_) | Self::Auth(_) | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_fatal() {
        let err = ActionError::Validation("subject_id".to_string());
        assert!(!err.retryable());
        assert_eq!(
            err.to_string(),
            "Missing or invalid required parameter: subject_id"
        );
    }

    #[test]
    fn test_auth_is_fatal() {
        assert!(!ActionError::Auth("no recognized secret".to_string()).retryable());
    }

    #[test]
    fn test_api_error_carries_classification() {
        let retryable = ActionError::Api {
            status: 503,
            message: "unavailable".to_string(),
            retryable: true,
        };
        let fatal = ActionError::Api {
            status: 403,
            message: "forbidden".to_string(),
            retryable: false,
        };
        assert!(retryable.retryable());
        assert!(!fatal.retryable());
        assert_eq!(fatal.to_string(), "API error: 403 - forbidden");
    }
}
