//! Daily distribution view: who carries what on a given day.

use std::collections::HashMap;

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::ApiError;
use crate::auth::CurrentUser;
use crate::entities::order::{self, Order, OrderList, OrderStatus};
use crate::entities::user::{self, User, UserRole};
use crate::entities::{store, vehicle};
use crate::errors::MSG_FORBIDDEN;
use crate::extract::{Json, Query};
use crate::money::Money;
use crate::operations::MAX_BATCH_SIZE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedule", get(schedule))
        .route("/my-orders", get(my_orders))
        .route("/assign", post(assign))
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(ToSchema, Serialize, Clone, Debug)]
pub struct DistributorSchedule {
    pub distributor: User,
    pub vehicle_plate: Option<String>,
    pub orders: Vec<OrderList>,
    pub order_count: u64,
    pub capacity: i32,
    /// Share of the daily capacity in use, in percent
    pub utilisation: f64,
    pub totals: Money,
}

#[derive(ToSchema, Serialize, Clone, Debug)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub distributors: Vec<DistributorSchedule>,
    pub unassigned: Vec<OrderList>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct AssignRequest {
    pub order_ids: Vec<Uuid>,
    pub distributor_id: Uuid,
    /// Falls back to each order's own delivery date, then today
    pub delivery_date: Option<NaiveDate>,
}

#[allow(clippy::cast_precision_loss)]
fn utilisation(count: u64, capacity: i32) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    let percent = count as f64 / f64::from(capacity) * 100.0;
    (percent * 10.0).round() / 10.0
}

async fn orders_due(
    db: &DatabaseConnection,
    distributor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<order::Model>, ApiError> {
    order::Entity::find()
        .filter(order::Column::DistributorId.eq(distributor_id))
        .filter(order::Column::DeliveryDate.eq(date))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ApiError::database)
}

#[utoipa::path(
    get,
    path = "/api/distribution/schedule",
    params(DateQuery),
    responses(
        (status = 200, description = "Per-distributor load for the day", body = DaySchedule),
        (status = 403, description = "Staff only")
    ),
    tag = "distribution"
)]
pub async fn schedule(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<DateQuery>,
) -> Result<Json<DaySchedule>, ApiError> {
    caller.require_staff()?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let distributors = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Distributor))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Name)
        .all(&state.db)
        .await
        .map_err(ApiError::database)?;

    let plates: HashMap<Uuid, String> = vehicle::Entity::find()
        .filter(vehicle::Column::DistributorId.is_not_null())
        .all(&state.db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .filter_map(|v| v.distributor_id.map(|id| (id, v.plate_number)))
        .collect();

    let mut rows = Vec::with_capacity(distributors.len());
    for distributor in distributors {
        let orders = orders_due(&state.db, distributor.id, date).await?;
        let totals: Money = orders.iter().map(order::Model::total).sum();
        let order_count = orders.len() as u64;
        rows.push(DistributorSchedule {
            vehicle_plate: plates.get(&distributor.id).cloned(),
            order_count,
            capacity: distributor.max_daily_orders,
            utilisation: utilisation(order_count, distributor.max_daily_orders),
            totals,
            orders: orders.into_iter().map(OrderList::from).collect(),
            distributor: User::from(distributor),
        });
    }

    let unassigned = order::Entity::find()
        .filter(order::Column::DistributorId.is_null())
        .filter(order::Column::Status.is_in(OrderStatus::OPEN))
        .filter(
            Condition::any()
                .add(order::Column::DeliveryDate.eq(date))
                .add(order::Column::DeliveryDate.is_null()),
        )
        .order_by_asc(order::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(ApiError::database)?;

    Ok(Json(DaySchedule {
        date,
        distributors: rows,
        unassigned: unassigned.into_iter().map(OrderList::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/distribution/my-orders",
    params(DateQuery),
    responses(
        (status = 200, description = "The caller's deliveries for the day", body = [Order]),
        (status = 403, description = "Distributors only")
    ),
    tag = "distribution"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    if caller.role != UserRole::Distributor {
        return Err(ApiError::forbidden(MSG_FORBIDDEN));
    }
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let models = orders_due(&state.db, caller.id, date).await?;

    let store_ids: Vec<Uuid> = models.iter().map(|o| o.store_id).collect();
    let store_names: HashMap<Uuid, String> = store::Entity::find()
        .filter(store::Column::Id.is_in(store_ids))
        .all(&state.db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut orders = Vec::with_capacity(models.len());
    for model in models {
        let mut order = Order::from(model);
        order.items = order::load_items(&state.db, order.id).await?;
        order.store_name = store_names.get(&order.store_id).cloned();
        orders.push(order);
    }
    Ok(Json(orders))
}

#[utoipa::path(
    post,
    path = "/api/distribution/assign",
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Orders assigned", body = [OrderList]),
        (status = 400, description = "Order not open or distributor unusable"),
        (status = 409, description = "Distributor fully booked")
    ),
    tag = "distribution"
)]
pub async fn assign(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Vec<OrderList>>, ApiError> {
    caller.require_staff()?;
    if request.order_ids.is_empty() {
        return Err(ApiError::bad_request("يجب تحديد طلب واحد على الأقل"));
    }
    if request.order_ids.len() > MAX_BATCH_SIZE {
        return Err(ApiError::bad_request(format!(
            "لا يمكن تعيين أكثر من {MAX_BATCH_SIZE} طلب في عملية واحدة"
        )));
    }

    let today = Utc::now().date_naive();
    let txn = state.db.begin().await.map_err(ApiError::database)?;
    let mut assigned = Vec::with_capacity(request.order_ids.len());
    for order_id in &request.order_ids {
        let date = match request.delivery_date {
            Some(date) => date,
            None => order::find_order(&txn, *order_id).await?.delivery_date.unwrap_or(today),
        };
        let model = order::assign(&txn, *order_id, request.distributor_id, date).await?;
        assigned.push(OrderList::from(model));
    }
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(
        distributor = %request.distributor_id,
        count = assigned.len(),
        by = %caller.id,
        "Orders assigned manually"
    );
    Ok(Json(assigned))
}
