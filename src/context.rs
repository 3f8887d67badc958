//! Per-request identity context.
//!
//! The identity middleware resolves "who is making this call" once per
//! request and stores it as a request extension. Extensions are dropped with
//! the request on every exit path, so identity can never bleed into the next
//! request served by the same worker.

/// Identity of the caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Identity {
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// Sentinel identity used when a request carries neither a valid bearer
    /// token nor the development fallback headers.
    pub fn system() -> Self {
        Identity {
            user_id: "system".to_string(),
            username: "system".to_string(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.user_id == "system"
    }
}
