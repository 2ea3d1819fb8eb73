//! Invocation parameters and execution context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Parameters for one invocation, as supplied by the scheduler.
///
/// Deployments vary between camelCase and snake_case field naming; both spell
/// the same parameters, so the camelCase forms are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationParams {
    /// Workforce pool the subject belongs to. Required.
    #[serde(alias = "workforcePoolId")]
    pub workforce_pool_id: Option<String>,
    /// Subject to delete. Required.
    #[serde(alias = "subjectId")]
    pub subject_id: Option<String>,
    /// API address override; defaults to the canonical host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Project the pool lives in; derived from the service-account key when
    /// absent.
    #[serde(alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl InvocationParams {
    /// Validate the required identifiers, returning trimmed values.
    ///
    /// Runs before any network call; a missing or whitespace-only identifier
    /// fails with a fatal [`ActionError::Validation`] naming the snake_case
    /// parameter.
    pub fn validate(&self) -> Result<(&str, &str), ActionError> {
        let pool = require(self.workforce_pool_id.as_deref(), "workforce_pool_id")?;
        let subject = require(self.subject_id.as_deref(), "subject_id")?;
        Ok((pool, subject))
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ActionError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ActionError::Validation(name.to_string())),
    }
}

/// Secrets and environment supplied by the scheduler for one invocation.
///
/// Owned by the scheduler and read-only to the action; nothing in it is
/// cached across invocations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    /// Secret material keyed by conventional secret names.
    pub secrets: HashMap<String, String>,
    /// Non-secret environment overrides.
    pub env: HashMap<String, String>,
    /// Outputs of previous steps; unused by this action but part of the
    /// scheduler contract.
    pub outputs: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// Look up a secret, treating empty or whitespace-only values as absent.
    pub fn secret(&self, key: &str) -> Option<&str> {
        non_empty(self.secrets.get(key))
    }

    /// Look up an environment entry, treating empty values as absent.
    pub fn env(&self, key: &str) -> Option<&str> {
        non_empty(self.env.get(key))
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pool: Option<&str>, subject: Option<&str>) -> InvocationParams {
        InvocationParams {
            workforce_pool_id: pool.map(String::from),
            subject_id: subject.map(String::from),
            ..InvocationParams::default()
        }
    }

    #[test]
    fn test_validate_accepts_trimmed_ids() {
        let p = params(Some("  test-pool-123 "), Some("user123@example.com"));
        let (pool, subject) = p.validate().unwrap();
        assert_eq!(pool, "test-pool-123");
        assert_eq!(subject, "user123@example.com");
    }

    #[test]
    fn test_validate_rejects_missing_subject() {
        let err = params(Some("test-pool-123"), None).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing or invalid required parameter: subject_id"
        );
    }

    #[test]
    fn test_validate_rejects_whitespace_pool() {
        let err = params(Some("   "), Some("user")).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing or invalid required parameter: workforce_pool_id"
        );
    }

    #[test]
    fn test_camel_case_aliases() {
        let p: InvocationParams = serde_json::from_str(
            r#"{"workforcePoolId": "pool-1", "subjectId": "s-1", "projectId": "proj-1"}"#,
        )
        .unwrap();
        assert_eq!(p.workforce_pool_id.as_deref(), Some("pool-1"));
        assert_eq!(p.subject_id.as_deref(), Some("s-1"));
        assert_eq!(p.project_id.as_deref(), Some("proj-1"));
    }

    #[test]
    fn test_snake_case_fields() {
        let p: InvocationParams =
            serde_json::from_str(r#"{"workforce_pool_id": "pool-1", "subject_id": "s-1"}"#)
                .unwrap();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_context_skips_empty_secrets() {
        let mut ctx = ExecutionContext::default();
        ctx.secrets
            .insert("BEARER_AUTH_TOKEN".to_string(), "   ".to_string());
        assert_eq!(ctx.secret("BEARER_AUTH_TOKEN"), None);
        ctx.secrets
            .insert("BEARER_AUTH_TOKEN".to_string(), "tok".to_string());
        assert_eq!(ctx.secret("BEARER_AUTH_TOKEN"), Some("tok"));
    }
}
