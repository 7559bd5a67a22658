use axum::{
    Router,
    extract::{FromRef, State},
    middleware::from_fn,
    routing::{get, patch},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::ApiError;
use crate::auth::{CurrentUser, require_staff_for_writes};
use crate::core::crud_router;
use crate::entities::order::{self, Order, OrderOperations, OrderStatus};
use crate::errors::MSG_FORBIDDEN;
use crate::extract::{Json, Path, Query};
use crate::money::Money;
use crate::operations::CRUDOperations;
use crate::state::AppState;

/// CRUD and the summary are staff-only for writes; the status change checks
/// the caller itself so distributors can report deliveries.
pub fn router() -> Router<AppState> {
    crud_router::<OrderOperations>()
        .route("/summary", get(summary))
        .route_layer(from_fn(require_staff_for_writes))
        .route("/{id}/status", patch(change_status))
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SummaryRange {
    /// First order date included
    pub from: Option<NaiveDate>,
    /// Last order date included
    pub to: Option<NaiveDate>,
}

#[derive(ToSchema, Serialize, Clone, Debug, PartialEq)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub label: String,
    pub count: u64,
}

#[derive(ToSchema, Serialize, Clone, Debug, PartialEq)]
pub struct OrderSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total_orders: u64,
    pub by_status: Vec<StatusCount>,
    /// All orders except cancelled ones
    pub totals: Money,
    pub delivered: Money,
}

fn summarize(from: Option<NaiveDate>, to: Option<NaiveDate>, rows: &[(OrderStatus, Decimal, Decimal)]) -> OrderSummary {
    let by_status = OrderStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            label: status.label().to_string(),
            count: rows.iter().filter(|(s, _, _)| s == status).count() as u64,
        })
        .collect();

    let totals = rows
        .iter()
        .filter(|(s, _, _)| *s != OrderStatus::Cancelled)
        .map(|(_, eur, syp)| Money::new(*eur, *syp))
        .sum();
    let delivered = rows
        .iter()
        .filter(|(s, _, _)| *s == OrderStatus::Delivered)
        .map(|(_, eur, syp)| Money::new(*eur, *syp))
        .sum();

    OrderSummary {
        from,
        to,
        total_orders: rows.len() as u64,
        by_status,
        totals,
        delivered,
    }
}

#[utoipa::path(
    get,
    path = "/api/orders/summary",
    params(SummaryRange),
    responses(
        (status = 200, description = "Counts per status and totals", body = OrderSummary),
        (status = 400, description = "`from` after `to`")
    ),
    tag = "orders"
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(range): Query<SummaryRange>,
) -> Result<Json<OrderSummary>, ApiError> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(ApiError::bad_request("تاريخ البداية يجب أن يسبق تاريخ النهاية"));
        }
    }

    let mut query = order::Entity::find()
        .select_only()
        .column(order::Column::Status)
        .column(order::Column::TotalEur)
        .column(order::Column::TotalSyp);
    if let Some(from) = range.from {
        query = query.filter(order::Column::OrderDate.gte(from));
    }
    if let Some(to) = range.to {
        query = query.filter(order::Column::OrderDate.lte(to));
    }
    let rows: Vec<(OrderStatus, Decimal, Decimal)> =
        query.into_tuple().all(&state.db).await.map_err(ApiError::database)?;

    Ok(Json(summarize(range.from, range.to, &rows)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = Order),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Distributor acting on another order"),
        (status = 404, description = "Unknown order")
    ),
    tag = "orders"
)]
pub async fn change_status(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Order>, ApiError> {
    let current = order::find_order(&state.db, id).await?;

    if !caller.is_staff() {
        let own_order = current.distributor_id == Some(caller.id);
        let delivery_step = matches!(change.status, OrderStatus::InDelivery | OrderStatus::Delivered);
        if !own_order || !delivery_step {
            tracing::warn!(order = %current.order_number, caller = %caller.id, "Distributor status change refused");
            return Err(ApiError::forbidden(MSG_FORBIDDEN));
        }
    }

    order::change_status(&state.db, current, change.status, change.reason).await?;
    let ops = OrderOperations::from_ref(&state);
    Ok(Json(ops.get_one(&state.db, id).await?))
}
