use axum::{extract::Request, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::handlers::energy::{get_report, health, list_meters};
use crate::services::EnergyService;

pub fn create_router(service: EnergyService) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let api_routes = Router::new()
        .route("/api/v1/energy/report", get(get_report))
        .route("/api/v1/meters", get(list_meters));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(
                    |_response: &axum::response::Response,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(Level::INFO, latency = ?latency, "request completed");
                    },
                )
                .on_failure(
                    |_error: tower_http::classify::ServerErrorsFailureClass,
                     _latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(Level::ERROR, "request failed");
                    },
                ),
        )
}
