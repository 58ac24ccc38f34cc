use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod accounts;
pub mod auth;
mod error;
pub mod hydroponics;
mod observability;
mod system;
mod types;
pub mod validation;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth::auth_middleware);

    let accounts = Router::new()
        .route("/profile/", get(accounts::profile))
        .route("/update-profile/", put(accounts::update_profile))
        .route_layer(auth_layer.clone())
        .route("/register/", post(accounts::register))
        .route("/activate/{uidb64}/{token}/", get(accounts::activate))
        .route("/login/", post(accounts::login));

    let api_router = Router::new()
        .nest("/accounts", accounts)
        .route(
            "/metrics",
            get(observability::get_metrics).route_layer(auth_layer.clone()),
        )
        .route("/system/health", get(system::health));

    let hydroponics_router = Router::new()
        .route("/create-system/", post(hydroponics::create_system))
        .route(
            "/dht22-data/",
            get(hydroponics::latest_dht22).post(hydroponics::submit_dht22),
        )
        .route_layer(auth_layer);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .nest("/hydroponics", hydroponics_router)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}
