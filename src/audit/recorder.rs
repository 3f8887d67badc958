use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::audit::sink::{AuditEntry, AuditSink};
use crate::context::Identity;
use crate::error::ApiError;
use crate::extractors::client_info::ClientInfo;
use crate::models::operation_log::{OperationStatus, OperationType};
use crate::users;

const MAX_PARAMS_CHARS: usize = 2000;
const MAX_ERROR_CHARS: usize = 500;

/// Static description of an auditable operation, declared at the call site.
#[derive(Debug, Clone, Copy)]
pub struct AuditTag {
    pub module: &'static str,
    pub operation_type: OperationType,
    pub description: &'static str,
    /// When false, request parameters are never captured. Used for
    /// credential-bearing operations.
    pub log_params: bool,
    /// When true, the serialized success response is captured instead of
    /// the request parameters.
    pub log_response: bool,
}

impl AuditTag {
    pub const fn new(
        module: &'static str,
        operation_type: OperationType,
        description: &'static str,
    ) -> Self {
        AuditTag {
            module,
            operation_type,
            description,
            log_params: true,
            log_response: false,
        }
    }

    /// Same tag but with parameter capture disabled.
    pub const fn without_params(self) -> Self {
        AuditTag {
            log_params: false,
            ..self
        }
    }

    /// Same tag but capturing the success response.
    pub const fn with_response(self) -> Self {
        AuditTag {
            log_response: true,
            ..self
        }
    }
}

/// Explicit audit wrapper for business operations.
///
/// `record` runs the wrapped future, measures it, and emits one audit entry
/// reflecting its outcome. The business result passes through unchanged in
/// every case: audit is an observer, never a gate.
#[derive(Clone)]
pub struct AuditRecorder {
    db: DatabaseConnection,
    sink: AuditSink,
}

impl AuditRecorder {
    pub fn new(db: DatabaseConnection, sink: AuditSink) -> Self {
        AuditRecorder { db, sink }
    }

    /// Whether two recorders feed the same writer task.
    pub(crate) fn same_sink(&self, other: &AuditRecorder) -> bool {
        self.sink.same_channel(&other.sink)
    }

    /// Run `operation` and record its outcome under `tag`.
    ///
    /// The actor is re-resolved against the user store so the persisted
    /// username is canonical rather than whatever the request claimed. When
    /// the identity resolves to no account the operation still runs and
    /// returns normally; only the audit write is skipped.
    pub async fn record<F, T>(
        &self,
        tag: AuditTag,
        identity: &Identity,
        client: &ClientInfo,
        method: &str,
        params: Option<serde_json::Value>,
        operation: F,
    ) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
        T: Serialize,
    {
        let started = Instant::now();
        let result = operation.await;
        let cost_time_ms = started.elapsed().as_millis() as i64;

        let actor = match users::resolve_actor(&self.db, &identity.user_id).await {
            Ok(Some(actor)) => actor,
            Ok(None) => {
                tracing::warn!(
                    identity = %identity.user_id,
                    module = tag.module,
                    "audit actor did not resolve, skipping audit record"
                );
                return result;
            }
            Err(e) => {
                tracing::error!(error = %e, "audit actor lookup failed, skipping audit record");
                return result;
            }
        };

        let captured = match &result {
            Ok(response) if tag.log_response => serialize_capture(response),
            _ if tag.log_params => params.as_ref().and_then(serialize_capture),
            _ => None,
        };

        let (status, error_msg) = match &result {
            Ok(_) => (OperationStatus::Success, None),
            Err(e) => (
                OperationStatus::Failure,
                Some(truncate(&e.to_string(), MAX_ERROR_CHARS)),
            ),
        };

        self.sink.submit(AuditEntry {
            user_id: actor.id,
            username: actor.username,
            module: tag.module.to_string(),
            operation_type: tag.operation_type,
            operation: tag.description.to_string(),
            method: Some(method.to_string()),
            params: captured,
            ip_address: client.ip.clone(),
            location: client.location.clone(),
            status,
            error_msg,
            cost_time_ms,
            created_at: Utc::now().naive_utc(),
        });

        result
    }
}

fn serialize_capture<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(truncate(&json, MAX_PARAMS_CHARS)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize audit capture");
            None
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_values_alone() {
        assert_eq!(truncate("hello", 2000), "hello");
    }

    #[test]
    fn truncate_caps_and_marks() {
        let long = "x".repeat(2500);
        let out = truncate(&long, 2000);
        assert_eq!(out.chars().count(), 2003);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let long = "é".repeat(600);
        let out = truncate(&long, 500);
        assert_eq!(out.chars().count(), 503);
    }
}
