pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
pub mod context;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod response;
pub mod users;
pub mod util;

pub use app::App;
pub use config::Config;
pub use context::Identity;
pub use error::ApiError;
pub use response::{ApiResponse, PageResult};
