pub mod jwt;
pub mod login_history;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod service;

pub use jwt::{SessionClaims, TokenCodec};
pub use password::{hash_password, verify_password};

use sha2::{Digest, Sha256};

/// SHA-256 hash a token for safe database storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
