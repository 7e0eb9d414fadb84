//! HTTP route definitions

use crate::{AppState, handlers, middleware};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, head, put},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Service endpoints
        .route("/", head(handlers::health_check))
        .route("/health", get(handlers::health_check))

        // Uploads
        .route("/upload/{cid}", put(handlers::upload).post(handlers::upload))

        // Single-object downloads
        .route("/get/{cid}/{oid}", get(handlers::get_by_id).head(handlers::head_by_id))
        .route(
            "/get_by_attribute/{cid}/{attr_key}/{attr_val}",
            get(handlers::get_by_attribute).head(handlers::head_by_attribute),
        )
        .route(
            "/get_by_filename/{cid}/{*prefix}",
            get(handlers::get_by_filename).head(handlers::head_by_filename),
        )

        // Archives
        .route("/zip/{cid}/{*prefix}", get(handlers::download_zip))

        // Apply middleware
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    let router = if state.config.cors_enabled {
        router.layer(cors_layer(&state.config.cors_origins))
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}

/// CORS configuration; `*` among the origins allows any
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
