//! Action lifecycle: the three entry points the scheduler drives.
//!
//! `invoke` runs the full `Validating -> Authenticating -> Deleting` flow and
//! performs exactly one delete attempt; there is no internal retry loop.
//! `error` re-surfaces a previously classified failure as a normalized
//! record. `halt` acknowledges a cancellation without touching the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{DeleteOutcome, WorkforceClient, DEFAULT_API_HOST};
use crate::auth::CredentialSource;
use crate::error::ActionError;
use crate::params::{ExecutionContext, InvocationParams};

/// Env key overriding the API address.
pub const ENV_ADDRESS: &str = "ADDRESS";

/// Sentinel for identifiers absent from a halt or error input.
const UNKNOWN: &str = "unknown";

/// Successful invocation record.
#[derive(Debug, Clone, Serialize)]
pub struct InvokeResult {
    pub status: String,
    pub workforce_pool_id: String,
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub deleted: bool,
    /// Present only when the subject was already gone (idempotent success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_deleted: Option<bool>,
    pub deleted_at: DateTime<Utc>,
}

/// Normalized failure record produced by [`error`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub status: String,
    pub retryable: bool,
    pub error: String,
    pub workforce_pool_id: String,
    pub subject_id: String,
}

/// Cancellation acknowledgment produced by [`halt`].
#[derive(Debug, Clone, Serialize)]
pub struct HaltResult {
    pub status: String,
    pub workforce_pool_id: String,
    pub subject_id: String,
    /// Always present in the record; `null` when no reason was given.
    pub reason: Option<String>,
    pub halted_at: DateTime<Utc>,
}

/// Run the deletion action once.
///
/// Validates the identifiers and secret material before any network call,
/// acquires a fresh credential, issues the single DELETE, and maps the
/// outcome. A 404 from the API is idempotent success, reported with
/// `already_deleted`. Every failure is classified exactly once; the caller
/// reads [`ActionError::retryable`] to schedule retries.
pub async fn invoke(
    params: &InvocationParams,
    ctx: &ExecutionContext,
) -> Result<InvokeResult, ActionError> {
    let (pool_id, subject_id) = params.validate()?;
    debug!(workforce_pool_id = %pool_id, subject_id = %subject_id, "parameters validated");

    // Secret selection and key parsing happen before any network call.
    let source = CredentialSource::from_context(ctx)?;
    let project_id = resolve_project_id(params, &source)?;

    let base_url = params
        .address
        .as_deref()
        .or_else(|| ctx.env(ENV_ADDRESS))
        .unwrap_or(DEFAULT_API_HOST);
    let client = WorkforceClient::new(base_url)?;

    let credential = source.acquire(client.http_client()).await?;
    info!(workforce_pool_id = %pool_id, subject_id = %subject_id, "credential acquired");

    let outcome = client
        .delete_subject(pool_id, subject_id, &credential)
        .await?;

    map_outcome(pool_id, subject_id, project_id, &outcome)
}

/// Re-surface a previously classified failure.
///
/// Pure pass-through: the retryable flag is reported exactly as classified,
/// never upgraded or downgraded, and no deletion is attempted. Missing
/// identifiers degrade to `"unknown"`.
pub fn error(params: &InvocationParams, message: &str, retryable: bool) -> FailureRecord {
    let record = FailureRecord {
        status: "failed".to_string(),
        retryable,
        error: message.to_string(),
        workforce_pool_id: id_or_unknown(params.workforce_pool_id.as_deref()),
        subject_id: id_or_unknown(params.subject_id.as_deref()),
    };
    info!(
        workforce_pool_id = %record.workforce_pool_id,
        subject_id = %record.subject_id,
        retryable = record.retryable,
        "reporting classified failure"
    );
    record
}

/// Acknowledge a cancellation.
///
/// Never contacts the network and never fails; absent identifiers degrade to
/// the `"unknown"` sentinel.
pub fn halt(params: &InvocationParams, reason: Option<String>) -> HaltResult {
    let result = HaltResult {
        status: "halted".to_string(),
        workforce_pool_id: id_or_unknown(params.workforce_pool_id.as_deref()),
        subject_id: id_or_unknown(params.subject_id.as_deref()),
        reason,
        halted_at: Utc::now(),
    };
    info!(
        workforce_pool_id = %result.workforce_pool_id,
        subject_id = %result.subject_id,
        "halted"
    );
    result
}

fn id_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Resolve the project id: explicit parameter first, then the key material.
///
/// Only the service-account variant is required to yield one; a key without
/// `project_id` and no parameter is fatal.
fn resolve_project_id(
    params: &InvocationParams,
    source: &CredentialSource,
) -> Result<Option<String>, ActionError> {
    if let Some(project_id) = params.project_id.as_deref().map(str::trim) {
        if !project_id.is_empty() {
            return Ok(Some(project_id.to_string()));
        }
    }
    match source {
        CredentialSource::ServiceAccount(_) => source
            .project_id()
            .map(|p| Some(p.to_string()))
            .ok_or_else(|| {
                ActionError::Auth(
                    "service account key has no project_id and none was supplied".to_string(),
                )
            }),
        _ => Ok(None),
    }
}

fn map_outcome(
    pool_id: &str,
    subject_id: &str,
    project_id: Option<String>,
    outcome: &DeleteOutcome,
) -> Result<InvokeResult, ActionError> {
    if let Some(err) = outcome.classify() {
        return Err(err);
    }

    info!(
        workforce_pool_id = %pool_id,
        subject_id = %subject_id,
        status_code = outcome.status_code,
        already_deleted = outcome.already_deleted,
        "subject deleted"
    );

    Ok(InvokeResult {
        status: "success".to_string(),
        workforce_pool_id: pool_id.to_string(),
        subject_id: subject_id.to_string(),
        project_id,
        deleted: true,
        already_deleted: outcome.already_deleted.then_some(true),
        deleted_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_uses_unknown_sentinel() {
        let result = halt(&InvocationParams::default(), Some("job canceled".to_string()));
        assert_eq!(result.status, "halted");
        assert_eq!(result.workforce_pool_id, "unknown");
        assert_eq!(result.subject_id, "unknown");
        assert_eq!(result.reason.as_deref(), Some("job canceled"));
    }

    #[test]
    fn test_halt_keeps_known_ids() {
        let params = InvocationParams {
            workforce_pool_id: Some("test-pool-123".to_string()),
            subject_id: Some("user123@example.com".to_string()),
            ..InvocationParams::default()
        };
        let result = halt(&params, None);
        assert_eq!(result.workforce_pool_id, "test-pool-123");
        assert_eq!(result.subject_id, "user123@example.com");
        assert_eq!(result.reason, None);

        // The record always carries the field, null when absent.
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["reason"].is_null());
        assert!(json.as_object().unwrap().contains_key("reason"));
    }

    #[test]
    fn test_error_preserves_classification() {
        let params = InvocationParams {
            workforce_pool_id: Some("pool".to_string()),
            subject_id: Some("subject".to_string()),
            ..InvocationParams::default()
        };
        let record = error(&params, "API error: 503 - unavailable", true);
        assert_eq!(record.status, "failed");
        assert!(record.retryable);
        assert_eq!(record.error, "API error: 503 - unavailable");

        let record = error(&params, "Authentication error: bad key", false);
        assert!(!record.retryable);
    }

    #[test]
    fn test_error_degrades_missing_ids() {
        let record = error(&InvocationParams::default(), "boom", false);
        assert_eq!(record.workforce_pool_id, "unknown");
        assert_eq!(record.subject_id, "unknown");
    }

    #[test]
    fn test_success_record_shape() {
        let outcome = DeleteOutcome {
            success: true,
            status_code: 200,
            already_deleted: false,
            error_body: None,
        };
        let result = map_outcome("test-pool-123", "user123@example.com", None, &outcome).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["workforce_pool_id"], "test-pool-123");
        assert_eq!(json["subject_id"], "user123@example.com");
        assert_eq!(json["deleted"], true);
        assert!(json.get("already_deleted").is_none());
        assert!(json.get("project_id").is_none());
        assert!(json["deleted_at"].is_string());
    }

    #[test]
    fn test_idempotent_success_record_shape() {
        let outcome = DeleteOutcome {
            success: true,
            status_code: 404,
            already_deleted: true,
            error_body: None,
        };
        let result = map_outcome("p", "s", Some("proj".to_string()), &outcome).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["already_deleted"], true);
        assert_eq!(json["project_id"], "proj");
    }
}
