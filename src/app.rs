use std::net::SocketAddr;

use axum::http::header;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::audit::{AuditRecorder, AuditSink};
use crate::auth::middleware::identity_layer;
use crate::auth::TokenCodec;
use crate::config::Config;
use crate::controllers::{self, AppState};
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;

/// The assembled application: configuration, database and HTTP surface.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    state: AppState,
}

impl App {
    /// Create the application from environment configuration.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    /// Create the application with a given config.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        let codec = TokenCodec::new(&config.jwt_secret, &config.jwt_issuer);
        let sink = AuditSink::start(db.clone(), config.audit_queue_capacity);
        let audit = AuditRecorder::new(db.clone(), sink);
        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            codec,
            audit,
        };

        Ok(App { config, db, state })
    }

    /// The shared handler state. The audit writer task is spawned once at
    /// construction; every clone feeds the same queue.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        let state = self.state();
        let is_dev = self.config.is_dev();

        let openapi_spec = ApiDoc::openapi();

        let mut router = Router::new()
            .route("/", get(welcome))
            .route("/health", get(health))
            .nest("/api/auth", controllers::auth::routes())
            .nest("/api/login-history", controllers::login_history::routes())
            .nest("/api/operation-logs", controllers::operation_log::routes())
            .layer(middleware::from_fn_with_state(state.clone(), identity_layer))
            .with_state(state)
            .route(
                "/api-docs/openapi.json",
                get(move || {
                    let spec = openapi_spec.clone();
                    async move { axum::Json(spec) }
                }),
            )
            .layer(CorsLayer::permissive());

        if is_dev {
            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind and serve until shutdown.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", addr);
        // Connect-info carries the peer address into ClientInfo for
        // unproxied requests.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

#[derive(Serialize)]
struct Welcome {
    service: &'static str,
    docs: &'static str,
}

async fn welcome() -> impl IntoResponse {
    axum::Json(Welcome {
        service: "public-health-api",
        docs: "/api-docs/openapi.json",
    })
}

async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}
