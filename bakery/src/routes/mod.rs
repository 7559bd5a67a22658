//! HTTP surface. Everything under `/api` goes through [`authenticate`]; role
//! checks are layered per resource.

pub mod auto_scheduling;
pub mod distribution;
pub mod health;
pub mod orders;
pub mod pricing;
pub mod users;
pub mod vehicles;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};

use crate::auth::{authenticate, require_admin, require_staff, require_staff_for_writes};
use crate::core::crud_router;
use crate::entities::{ProductOperations, StoreOperations};
use crate::state::AppState;

pub fn api_router(state: &AppState) -> Router<AppState> {
    let staff_writes = from_fn(require_staff_for_writes);

    let api = Router::new()
        .nest("/users", users::router().route_layer(from_fn(require_admin)))
        .nest("/vehicles", vehicles::router().route_layer(staff_writes.clone()))
        .nest(
            "/products",
            crud_router::<ProductOperations>().route_layer(staff_writes.clone()),
        )
        .nest(
            "/stores",
            crud_router::<StoreOperations>().route_layer(staff_writes.clone()),
        )
        .nest("/pricing", pricing::router().route_layer(staff_writes))
        .nest("/orders", orders::router())
        .nest(
            "/auto-scheduling",
            auto_scheduling::router().route_layer(from_fn(require_staff)),
        )
        .nest("/distribution", distribution::router())
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .nest("/api", api)
        .merge(health::router())
}
