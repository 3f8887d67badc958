use chrono::NaiveDateTime;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::operation_log::{self, OperationStatus, OperationType};

/// A fully-formed audit record, ready to persist.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: String,
    pub username: String,
    pub module: String,
    pub operation_type: OperationType,
    pub operation: String,
    pub method: Option<String>,
    pub params: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub status: OperationStatus,
    pub error_msg: Option<String>,
    pub cost_time_ms: i64,
    pub created_at: NaiveDateTime,
}

/// Bounded, non-blocking channel into the audit writer task.
///
/// The request path only ever performs a `try_send`; when the queue is full
/// the entry is dropped and counted in the logs rather than ever stalling a
/// caller. Writer failures are logged and the writer keeps draining.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditSink {
    /// Spawn the writer task and return a handle for submitting entries.
    pub fn start(db: DatabaseConnection, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditEntry>(capacity);

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let record = operation_log::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    user_id: Set(entry.user_id),
                    username: Set(entry.username),
                    module: Set(entry.module),
                    operation_type: Set(entry.operation_type),
                    operation: Set(entry.operation),
                    method: Set(entry.method),
                    params: Set(entry.params),
                    ip_address: Set(entry.ip_address),
                    location: Set(entry.location),
                    status: Set(entry.status),
                    error_msg: Set(entry.error_msg),
                    cost_time_ms: Set(entry.cost_time_ms),
                    created_at: Set(entry.created_at),
                };
                if let Err(e) = record.insert(&db).await {
                    tracing::error!(error = %e, "failed to persist audit record");
                }
            }
            tracing::debug!("audit writer stopped: channel closed");
        });

        AuditSink { tx }
    }

    /// Whether two handles feed the same writer task.
    pub(crate) fn same_channel(&self, other: &AuditSink) -> bool {
        self.tx.same_channel(&other.tx)
    }

    /// Enqueue an entry without waiting. Drops the entry when the queue is
    /// full.
    pub fn submit(&self, entry: AuditEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            match e {
                mpsc::error::TrySendError::Full(dropped) => {
                    tracing::warn!(
                        module = %dropped.module,
                        operation = %dropped.operation,
                        "audit queue full, dropping record"
                    );
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::error!("audit writer gone, dropping record");
                }
            }
        }
    }
}
