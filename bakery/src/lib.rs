//! # bakery
//!
//! REST backend for a bakery's order, pricing and distribution operations:
//! stores place orders, staff price products in EUR and SYP, and orders are
//! assigned to distributors either by hand or by reviewing suggestions from an
//! external scoring service.
//!
//! Every resource follows the same layering:
//!
//! - an entity module ([`entities`]) with the Sea-ORM model, the API structs and
//!   a [`core::CRUDResource`] implementation;
//! - a [`operations::CRUDOperations`] type holding the business rules as hooks;
//! - the generic handlers in [`core::handlers`], mounted by [`routes`].
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let db = sea_orm::Database::connect(&config.database_url).await?;
//! Migrator::up(&db, None).await?;
//! let app = bakery::app(AppState::new(db, config)?);
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod entities;
pub mod errors;
pub mod extract;
pub mod filtering;
pub mod migration;
pub mod money;
pub mod openapi;
pub mod operations;
pub mod routes;
pub mod scheduling;
pub mod state;
pub mod validation;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
pub use errors::ApiError;
pub use migration::Migrator;
pub use state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        header::CONTENT_RANGE,
        HeaderName::from_static("x-total-count"),
    ];
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE])
        .expose_headers(exposed);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

/// The complete application: API, health check and docs, with tracing and CORS.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    routes::api_router(&state)
        .with_state(state)
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
