pub mod login_history;
pub mod operation_log;
pub mod refresh_token;
pub mod user;
