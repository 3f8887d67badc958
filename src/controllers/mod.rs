use sea_orm::DatabaseConnection;

use crate::audit::AuditRecorder;
use crate::auth::TokenCodec;
use crate::config::Config;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub codec: TokenCodec,
    pub audit: AuditRecorder,
}

pub mod auth;
pub mod login_history;
pub mod operation_log;
