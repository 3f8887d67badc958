pub mod auth_user;
pub mod client_info;
pub mod json;
pub mod pagination;

pub use auth_user::AuthUser;
pub use client_info::ClientInfo;
pub use json::Json;
pub use pagination::Pagination;
