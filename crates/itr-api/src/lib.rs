//! # itr-api: HTTP Surface for the Filing Engine
//!
//! | Prefix                    | Module                 |
//! |---------------------------|------------------------|
//! | `/v1/filings/*`           | [`routes::filings`]    |
//! | `/v1/owners/*/filings`    | [`routes::filings`]    |
//! | `/v1/callbacks/*`         | [`routes::callbacks`]  |
//! | `/health/*`               | probes, no identity    |
//!
//! Handlers hold no business logic: they extract the caller, parse the
//! body and delegate to [`itr_state::FilingRegistry`]. Every error maps to
//! a structured response through [`AppError`].

pub mod auth;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::filings::router())
        .merge(routes::callbacks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
