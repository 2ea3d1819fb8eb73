//! Workforce-pool API client: the delete operation.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::auth::Credential;
use crate::error::ActionError;

/// Canonical API host, used when no address override is supplied.
pub const DEFAULT_API_HOST: &str = "https://iam.googleapis.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Normalized result of one delete request.
///
/// Produced once per invocation and consumed immediately by the lifecycle;
/// HTTP-level error statuses are captured here instead of raised.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// Whether the subject is gone (2xx, or 404 for an idempotent repeat).
    pub success: bool,
    /// HTTP status of the delete response.
    pub status_code: u16,
    /// The subject was already deleted (404).
    pub already_deleted: bool,
    /// JSON error body, when the response carried one that parses.
    pub error_body: Option<serde_json::Value>,
}

impl DeleteOutcome {
    fn new(status_code: u16, error_body: Option<serde_json::Value>) -> Self {
        let success = (200..300).contains(&status_code) || status_code == 404;
        Self {
            success,
            status_code,
            already_deleted: status_code == 404,
            error_body,
        }
    }

    /// Classify a failed outcome per the status table: 429/502/503/504 are
    /// retryable, every other non-2xx non-404 status is fatal.
    ///
    /// Returns `None` for successful outcomes.
    pub fn classify(&self) -> Option<ActionError> {
        if self.success {
            return None;
        }

        let retryable = matches!(self.status_code, 429 | 502 | 503 | 504);
        Some(ActionError::Api {
            status: self.status_code,
            message: self.error_message(),
            retryable,
        })
    }

    /// Upstream error message, when the error payload carries one.
    fn error_message(&self) -> String {
        let upstream = self
            .error_body
            .as_ref()
            .and_then(|body| body.pointer("/error/message"))
            .and_then(serde_json::Value::as_str);

        match upstream {
            Some(msg) => format!("delete failed with status {}: {msg}", self.status_code),
            None => format!("delete failed with status {}", self.status_code),
        }
    }
}

/// Client for the workforce-pool identity-management API.
#[derive(Debug, Clone)]
pub struct WorkforceClient {
    client: Client,
    base_url: Url,
}

impl WorkforceClient {
    /// Create a client against the given base URL.
    ///
    /// # Errors
    /// Returns a validation error if the base URL is not an absolute URL, or
    /// an HTTP error if the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ActionError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit transport timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ActionError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| ActionError::Validation(format!("address ({base_url}: {e})")))?;
        if base_url.cannot_be_a_base() {
            return Err(ActionError::Validation(format!(
                "address ({base_url}: not a base URL)"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ActionError::Http)?;

        Ok(Self { client, base_url })
    }

    /// The underlying HTTP client, shared with credential acquisition so one
    /// invocation uses one connection pool.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Resource URL for a subject. Pool and subject ids are percent-encoded
    /// as path segments so reserved characters cannot corrupt the path.
    pub fn subject_url(&self, pool_id: &str, subject_id: &str) -> String {
        let mut url = self.base_url.clone();
        // Base URL was checked in the constructor; only cannot-be-a-base
        // URLs lack path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "v1",
                "locations",
                "global",
                "workforcePools",
                pool_id,
                "subjects",
                subject_id,
            ]);
        }
        url.to_string()
    }

    /// Issue the DELETE for one subject.
    ///
    /// Never fails on an HTTP-level error status; those are normalized into
    /// the returned [`DeleteOutcome`]. Only transport failures surface as
    /// errors.
    pub async fn delete_subject(
        &self,
        pool_id: &str,
        subject_id: &str,
        credential: &Credential,
    ) -> Result<DeleteOutcome, ActionError> {
        let url = self.subject_url(pool_id, subject_id);
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(&url)
            .header("Authorization", credential.header_value())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        let error_body = if status.is_success() || status == StatusCode::NOT_FOUND
            || text.is_empty()
        {
            None
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => Some(body),
                Err(e) => {
                    // Non-JSON error bodies are expected from proxies; keep going.
                    warn!(error = %e, status = status.as_u16(), "non-JSON error body");
                    None
                }
            }
        };

        Ok(DeleteOutcome::new(status.as_u16(), error_body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_url() {
        let client = WorkforceClient::new(DEFAULT_API_HOST).unwrap();
        assert_eq!(
            client.subject_url("test-pool-123", "user123@example.com"),
            "https://iam.googleapis.com/v1/locations/global/workforcePools/test-pool-123/subjects/user123@example.com"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = WorkforceClient::new("https://iam.example.test/").unwrap();
        assert_eq!(
            client.subject_url("p", "s"),
            "https://iam.example.test/v1/locations/global/workforcePools/p/subjects/s"
        );
    }

    #[test]
    fn test_reserved_characters_encoded_in_path() {
        let client = WorkforceClient::new("https://iam.example.test").unwrap();
        assert_eq!(
            client.subject_url("pool/a", "tenant/alice?x"),
            "https://iam.example.test/v1/locations/global/workforcePools/pool%2Fa/subjects/tenant%2Falice%3Fx"
        );
    }

    #[test]
    fn test_relative_address_rejected() {
        let err = WorkforceClient::new("not-a-url").unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
    }

    #[test]
    fn test_non_base_address_rejected() {
        let err = WorkforceClient::new("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
    }

    #[test]
    fn test_outcome_2xx_succeeds() {
        let outcome = DeleteOutcome::new(200, None);
        assert!(outcome.success);
        assert!(!outcome.already_deleted);
        assert!(outcome.classify().is_none());
    }

    #[test]
    fn test_outcome_404_is_idempotent_success() {
        let outcome = DeleteOutcome::new(404, None);
        assert!(outcome.success);
        assert!(outcome.already_deleted);
        assert!(outcome.classify().is_none());
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 502, 503, 504] {
            let err = DeleteOutcome::new(status, None).classify().unwrap();
            assert!(err.retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn test_fatal_statuses() {
        for status in [400, 401, 403, 409, 500] {
            let err = DeleteOutcome::new(status, None).classify().unwrap();
            assert!(!err.retryable(), "status {status} should be fatal");
        }
    }

    #[test]
    fn test_error_message_includes_upstream_payload() {
        let body = serde_json::json!({"error": {"code": 403, "message": "Permission denied"}});
        let err = DeleteOutcome::new(403, Some(body)).classify().unwrap();
        assert_eq!(
            err.to_string(),
            "API error: 403 - delete failed with status 403: Permission denied"
        );
    }

    #[test]
    fn test_error_message_without_body() {
        let err = DeleteOutcome::new(502, None).classify().unwrap();
        assert!(err.to_string().contains("delete failed with status 502"));
    }
}
