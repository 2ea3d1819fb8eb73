//! Idempotent workforce-pool subject deletion action.
//!
//! This crate implements one remote-deletion action for an external job
//! scheduler: given a workforce-pool id and a subject id, authenticate to the
//! identity-management API and issue a DELETE for that subject, normalizing
//! the result into success, idempotent success, or a classified failure.
//!
//! The scheduler drives three entry points:
//!
//! - [`invoke`] - validate, acquire a credential, delete, map the outcome
//! - [`error`] - re-surface a previously classified failure as a normalized
//!   `{status: "failed", retryable, ...}` record
//! - [`halt`] - produce a cancellation acknowledgment without touching the
//!   network
//!
//! Retry scheduling, halting triggers, and log transport belong to the
//! scheduler; the action performs exactly one delete attempt per invocation
//! and classifies each failure exactly once.
//!
//! # Usage
//!
//! ```no_run
//! use wfid_action::{invoke, ExecutionContext, InvocationParams};
//!
//! # async fn run() -> Result<(), wfid_action::ActionError> {
//! let params = InvocationParams {
//!     workforce_pool_id: Some("test-pool-123".to_string()),
//!     subject_id: Some("user123@example.com".to_string()),
//!     ..InvocationParams::default()
//! };
//! let ctx = ExecutionContext::default();
//!
//! let result = invoke(&params, &ctx).await?;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod params;

pub use api::{DeleteOutcome, WorkforceClient};
pub use auth::{Credential, CredentialSource};
pub use error::ActionError;
pub use lifecycle::{error, halt, invoke, FailureRecord, HaltResult, InvokeResult};
pub use params::{ExecutionContext, InvocationParams};
