use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::analytics::StatsEngine;
use crate::config::{CorsConfig, VisitorConfig};

use super::handlers::{get_stats, health_check, record_visit, AppState};

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allows_any() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE)
}

pub fn create_api_router(
    engine: Arc<StatsEngine>,
    visitor: VisitorConfig,
    cors: &CorsConfig,
) -> Router {
    let state = Arc::new(AppState { engine, visitor });

    Router::new()
        .route("/health", get(health_check))
        .route("/api/visit", post(record_visit))
        .route("/api/stats", get(get_stats))
        .with_state(state)
        .layer(cors_layer(cors))
}
