//! Generic REST handlers shared by every CRUD resource.
//!
//! A resource gets the standard six endpoints by handing its operations type to
//! [`crud_router`]:
//!
//! ```text
//! GET    /        list (filter, range/page, sort)   200 + Content-Range
//! POST   /        create                            201
//! DELETE /        batch delete, body = [uuid, ...]   200 + deleted ids
//! GET    /{id}    read                              200
//! PUT    /{id}    partial update                    200
//! DELETE /{id}    delete                            204
//! ```

use axum::{
    Router,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use sea_orm::ConnectionTrait;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::ApiError;
use crate::core::CRUDResource;
use crate::extract::{Json, Path, Query};
use crate::filtering::{FilterOptions, apply_filters, calculate_content_range, parse_pagination, parse_sorting};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::Validatable;

type ResourceOf<O> = <O as CRUDOperations>::Resource;
type ListOf<O> = <ResourceOf<O> as CRUDResource>::ListModel;
type CreateOf<O> = <ResourceOf<O> as CRUDResource>::CreateModel;
type UpdateOf<O> = <ResourceOf<O> as CRUDResource>::UpdateModel;

/// Build the standard CRUD router for an operations type.
pub fn crud_router<O>() -> Router<AppState>
where
    O: CRUDOperations + FromRef<AppState> + 'static,
    ResourceOf<O>: Serialize + 'static,
    ListOf<O>: Serialize,
    CreateOf<O>: DeserializeOwned + Validatable,
    UpdateOf<O>: DeserializeOwned + Validatable,
{
    Router::new()
        .route(
            "/",
            get(get_all_handler::<O>)
                .post(create_one_handler::<O>)
                .delete(delete_many_handler::<O>),
        )
        .route(
            "/{id}",
            get(get_one_handler::<O>)
                .put(update_one_handler::<O>)
                .delete(delete_one_handler::<O>),
        )
}

pub async fn get_all_handler<O>(
    State(state): State<AppState>,
    Query(params): Query<FilterOptions>,
) -> Result<(HeaderMap, Json<Vec<ListOf<O>>>), ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
    ListOf<O>: Serialize,
{
    let ops = O::from_ref(&state);
    let (offset, limit) = parse_pagination(&params);
    let condition = apply_filters::<ResourceOf<O>>(
        params.filter.as_deref(),
        &ResourceOf::<O>::filterable_columns(),
        state.db.get_database_backend(),
    );
    let (order_column, order_direction) = parse_sorting(
        &params,
        &ResourceOf::<O>::sortable_columns(),
        ResourceOf::<O>::default_index_column(),
    );

    let (items, total) = ops
        .get_all(&state.db, condition, order_column, order_direction, offset, limit)
        .await?;
    let headers = calculate_content_range(offset, limit, total, ResourceOf::<O>::RESOURCE_NAME_PLURAL);
    Ok((headers, Json(items)))
}

pub async fn get_one_handler<O>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceOf<O>>, ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
    ResourceOf<O>: Serialize,
{
    let ops = O::from_ref(&state);
    Ok(Json(ops.get_one(&state.db, id).await?))
}

pub async fn create_one_handler<O>(
    State(state): State<AppState>,
    Json(payload): Json<CreateOf<O>>,
) -> Result<(StatusCode, Json<ResourceOf<O>>), ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
    ResourceOf<O>: Serialize,
    CreateOf<O>: DeserializeOwned + Validatable,
{
    payload.validate()?;
    let ops = O::from_ref(&state);
    let created = ops.create(&state.db, payload).await?;
    tracing::info!(resource = ResourceOf::<O>::RESOURCE_NAME_SINGULAR, "Record created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_one_handler<O>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOf<O>>,
) -> Result<Json<ResourceOf<O>>, ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
    ResourceOf<O>: Serialize,
    UpdateOf<O>: DeserializeOwned + Validatable,
{
    payload.validate()?;
    let ops = O::from_ref(&state);
    Ok(Json(ops.update(&state.db, id, payload).await?))
}

pub async fn delete_one_handler<O>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
{
    let ops = O::from_ref(&state);
    ops.delete(&state.db, id).await?;
    tracing::info!(resource = ResourceOf::<O>::RESOURCE_NAME_SINGULAR, %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_many_handler<O>(
    State(state): State<AppState>,
    Json(ids): Json<Vec<Uuid>>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
    O: CRUDOperations + FromRef<AppState>,
{
    let ops = O::from_ref(&state);
    let deleted = ops.delete_many(&state.db, ids).await?;
    tracing::info!(
        resource = ResourceOf::<O>::RESOURCE_NAME_PLURAL,
        count = deleted.len(),
        "Records deleted"
    );
    Ok(Json(deleted))
}
