use utoipa::OpenApi;

use crate::auth::jwt::SessionClaims;
use crate::auth::service::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};
use crate::models::login_history::Model as LoginHistoryModel;
use crate::models::operation_log::Model as OperationLogModel;
use crate::models::user::UserResponse;

/// Auto-generated OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Public Health API — Identity & Audit",
        version = "0.1.0",
        description = "Authentication, refresh token rotation, login history and operation audit."
    ),
    paths(
        crate::controllers::auth::login,
        crate::controllers::auth::register,
        crate::controllers::auth::refresh,
        crate::controllers::auth::logout,
        crate::controllers::auth::validate,
        crate::controllers::login_history::list_for_user,
        crate::controllers::login_history::recent_for_user,
        crate::controllers::login_history::last_success,
        crate::controllers::login_history::summary_for_user,
        crate::controllers::login_history::purge_before,
        crate::controllers::login_history::erase_for_user,
        crate::controllers::operation_log::list,
        crate::controllers::operation_log::find_by_id,
        crate::controllers::operation_log::list_for_user,
        crate::controllers::operation_log::recent_failures,
        crate::controllers::operation_log::stats,
        crate::controllers::operation_log::purge_before,
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            RefreshRequest,
            TokenResponse,
            SessionClaims,
            UserResponse,
            LoginHistoryModel,
            OperationLogModel,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "login-history", description = "Authentication attempt history"),
        (name = "operation-log", description = "Operation audit trail")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
