pub mod config;
mod error;
pub mod helpers;
mod routes;
mod validation;

pub use error::ErrorResponse;
pub use validation::ValidationError;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, StatusCode, header},
    routing::get,
};
use mcstatus_cache::StatusCache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub cache: StatusCache,
    pub started_at: Instant,
}

/// Rate limiting configuration, applied per client IP
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sustained requests per minute
    pub per_min: u64,
    /// Requests allowed in a burst before throttling starts
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_min: 30,
            burst: 30,
        }
    }
}

/// Create the application router around the given status cache
pub fn create_app(
    cache: StatusCache,
    request_timeout: Duration,
    rate_limit: RateLimitConfig,
) -> Router {
    let state = Arc::new(AppState {
        cache,
        started_at: Instant::now(),
    });

    // One token is replenished every 60s / per_min
    let governor = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / rate_limit.per_min.max(1))
        .burst_size(rate_limit.burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("rate limit values are validated to be non-zero");

    Router::new()
        .route("/api/status", get(routes::status))
        .route("/api/health", get(routes::health))
        .route("/api/docs", get(routes::docs))
        .fallback(routes::not_found)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(GovernorLayer::new(governor).error_handler(error::rate_limited_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
