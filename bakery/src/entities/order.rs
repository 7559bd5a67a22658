//! Orders: a store's request for products on a delivery date, plus its lines.
//!
//! Totals are always recomputed from the lines; the header and its lines are
//! written in one transaction.
//!
//! ```text
//! pending     → confirmed | cancelled
//! confirmed   → in_delivery | pending | cancelled
//! in_delivery → delivered | cancelled
//! delivered, cancelled: terminal
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DeriveActiveEnum,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    entity::prelude::*, sea_query::StringLen,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::order_item::{self, OrderItem, OrderItemInput};
use super::{product, store, user};
use crate::ApiError;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::money::{AMOUNT_OUT_OF_RANGE, Money};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::{Validatable, ValidationError, ValidationErrors, validators};

pub const MAX_ITEMS_PER_ORDER: usize = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "in_delivery")]
    InDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::InDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "قيد الانتظار",
            Self::Confirmed => "مؤكد",
            Self::InDelivery => "قيد التوصيل",
            Self::Delivered => "تم التسليم",
            Self::Cancelled => "ملغي",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InDelivery => "in_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::InDelivery | Self::Pending | Self::Cancelled)
                | (Self::InDelivery, Self::Delivered | Self::Cancelled)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Still schedulable: not yet on the road
    pub const OPEN: [Self; 2] = [Self::Pending, Self::Confirmed];

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl OrderPriority {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "منخفضة",
            Self::Normal => "عادية",
            Self::High => "عالية",
            Self::Urgent => "عاجلة",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl PaymentStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unpaid => "غير مدفوع",
            Self::Partial => "مدفوع جزئياً",
            Self::Paid => "مدفوع",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub store_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub priority: OrderPriority,
    pub payment_status: PaymentStatus,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_eur: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_syp: Decimal,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[must_use]
    pub const fn total(&self) -> Money {
        Money::new(self.total_eur, self.total_syp)
    }
}

/// `ORD-YYYYMMDD-XXXXXX`, six upper-case hex characters of a fresh UUID
#[must_use]
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("ORD-{}-{}", date.format("%Y%m%d"), suffix.to_uppercase())
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub store_id: Uuid,
    pub store_name: Option<String>,
    pub distributor_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub status_label: String,
    pub priority: OrderPriority,
    pub priority_label: String,
    pub payment_status: PaymentStatus,
    pub payment_status_label: String,
    pub total_eur: Decimal,
    pub total_syp: Decimal,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Order {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            store_id: model.store_id,
            store_name: None,
            distributor_id: model.distributor_id,
            order_date: model.order_date,
            delivery_date: model.delivery_date,
            status: model.status,
            status_label: model.status.label().to_string(),
            priority: model.priority,
            priority_label: model.priority.label().to_string(),
            payment_status: model.payment_status,
            payment_status_label: model.payment_status.label().to_string(),
            total_eur: model.total_eur,
            total_syp: model.total_syp,
            notes: model.notes,
            cancel_reason: model.cancel_reason,
            items: Vec::new(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// List representation: the header without lines
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderList {
    pub id: Uuid,
    pub order_number: String,
    pub store_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub status_label: String,
    pub priority: OrderPriority,
    pub payment_status: PaymentStatus,
    pub total_eur: Decimal,
    pub total_syp: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderList {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            store_id: order.store_id,
            distributor_id: order.distributor_id,
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            status: order.status,
            status_label: order.status_label,
            priority: order.priority,
            payment_status: order.payment_status,
            total_eur: order.total_eur,
            total_syp: order.total_syp,
            created_at: order.created_at,
        }
    }
}

impl From<Model> for OrderList {
    fn from(model: Model) -> Self {
        Self::from(Order::from(model))
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct OrderCreate {
    pub store_id: Uuid,
    pub distributor_id: Option<Uuid>,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub priority: Option<OrderPriority>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

/// Header only, with zero totals; lines are added by [`OrderOperations`].
impl From<OrderCreate> for ActiveModel {
    fn from(create: OrderCreate) -> Self {
        let now = Utc::now();
        let order_date = create.order_date.unwrap_or_else(|| now.date_naive());
        Self {
            id: Set(Uuid::new_v4()),
            order_number: Set(generate_order_number(order_date)),
            store_id: Set(create.store_id),
            distributor_id: Set(create.distributor_id),
            order_date: Set(order_date),
            delivery_date: Set(create.delivery_date),
            status: Set(OrderStatus::Pending),
            priority: Set(create.priority.unwrap_or(OrderPriority::Normal)),
            payment_status: Set(create.payment_status.unwrap_or(PaymentStatus::Unpaid)),
            total_eur: Set(Decimal::ZERO),
            total_syp: Set(Decimal::ZERO),
            notes: Set(create.notes),
            cancel_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_items(errors: &mut ValidationErrors, items: &[OrderItemInput]) {
    if items.is_empty() {
        errors.add(ValidationError::new("items", "يجب أن يحتوي الطلب على منتج واحد على الأقل"));
        return;
    }
    if items.len() > MAX_ITEMS_PER_ORDER {
        errors.add(ValidationError::new(
            "items",
            format!("لا يمكن أن يحتوي الطلب على أكثر من {MAX_ITEMS_PER_ORDER} منتج"),
        ));
    }
    for item in items {
        if item.quantity <= 0 {
            errors.add(ValidationError::new("quantity", "الكمية يجب أن تكون أكبر من صفر"));
        }
        if let Some(price) = item.unit_price_eur {
            errors.check(validators::validate_non_negative("unit_price_eur", "السعر", price));
        }
        if let Some(price) = item.unit_price_syp {
            errors.check(validators::validate_non_negative("unit_price_syp", "السعر", price));
        }
    }
}

fn validate_dates(errors: &mut ValidationErrors, order_date: NaiveDate, delivery_date: Option<NaiveDate>) {
    if let Some(delivery) = delivery_date
        && delivery < order_date
    {
        errors.add(ValidationError::new(
            "delivery_date",
            "تاريخ التسليم يجب ألا يسبق تاريخ الطلب",
        ));
    }
}

impl Validatable for OrderCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_items(&mut errors, &self.items);
        validate_dates(
            &mut errors,
            self.order_date.unwrap_or_else(|| Utc::now().date_naive()),
            self.delivery_date,
        );
        if let Some(notes) = &self.notes {
            errors.check(validators::validate_length("notes", "الملاحظات", notes, None, Some(1000)));
        }
        errors.result()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct OrderUpdate {
    pub store_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub distributor_id: Option<Option<Uuid>>,
    pub order_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub delivery_date: Option<Option<NaiveDate>>,
    pub priority: Option<OrderPriority>,
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    /// Replaces every line when present
    pub items: Option<Vec<OrderItemInput>>,
}

impl OrderUpdate {
    /// Payment and notes are the only edits allowed on a finished order
    const fn touches_fulfilment(&self) -> bool {
        self.store_id.is_some()
            || self.distributor_id.is_some()
            || self.order_date.is_some()
            || self.delivery_date.is_some()
            || self.priority.is_some()
            || self.items.is_some()
    }
}

impl MergeIntoActiveModel<ActiveModel> for OrderUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(store_id) = self.store_id {
            existing.store_id = Set(store_id);
        }
        if let Some(distributor_id) = self.distributor_id {
            existing.distributor_id = Set(distributor_id);
        }
        if let Some(order_date) = self.order_date {
            existing.order_date = Set(order_date);
        }
        if let Some(delivery_date) = self.delivery_date {
            existing.delivery_date = Set(delivery_date);
        }
        if let Some(priority) = self.priority {
            existing.priority = Set(priority);
        }
        if let Some(payment_status) = self.payment_status {
            existing.payment_status = Set(payment_status);
        }
        if let Some(notes) = self.notes {
            existing.notes = Set(notes);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for OrderUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(items) = &self.items {
            validate_items(&mut errors, items);
        }
        if let (Some(order_date), Some(delivery_date)) = (self.order_date, self.delivery_date) {
            validate_dates(&mut errors, order_date, delivery_date);
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Order {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = OrderCreate;
    type UpdateModel = OrderUpdate;
    type ListModel = OrderList;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "order";
    const RESOURCE_NAME_PLURAL: &'static str = "orders";
    const RESOURCE_LABEL: &'static str = "الطلب";

    fn default_index_column() -> Self::ColumnType {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("order_number", Column::OrderNumber),
            ("order_date", Column::OrderDate),
            ("delivery_date", Column::DeliveryDate),
            ("status", Column::Status),
            ("priority", Column::Priority),
            ("total_eur", Column::TotalEur),
            ("total_syp", Column::TotalSyp),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("order_number", Column::OrderNumber),
            ("store_id", Column::StoreId),
            ("distributor_id", Column::DistributorId),
            ("order_date", Column::OrderDate),
            ("delivery_date", Column::DeliveryDate),
            ("status", Column::Status),
            ("priority", Column::Priority),
            ("payment_status", Column::PaymentStatus),
            ("total_eur", Column::TotalEur),
            ("total_syp", Column::TotalSyp),
        ]
    }

    fn is_enum_field(field_name: &str) -> bool {
        matches!(field_name, "status" | "priority" | "payment_status")
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["order_number"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("order_number", Column::OrderNumber), ("notes", Column::Notes)]
    }
}

/// Load an order row or fail with 404.
///
/// # Errors
///
/// `NotFound` for an unknown id, `Database` on query failure.
pub async fn find_order<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ApiError> {
    Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::not_found(Order::RESOURCE_LABEL, Some(id.to_string())))
}

/// Lines of an order with product names, oldest first.
///
/// # Errors
///
/// `Database` on query failure.
pub async fn load_items<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<Vec<OrderItem>, ApiError> {
    let lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ApiError::database)?;

    let product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let names: HashMap<Uuid, String> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    Ok(lines
        .into_iter()
        .map(|line| {
            let name = names.get(&line.product_id).cloned();
            let mut item = OrderItem::from(line);
            item.product_name = name;
            item
        })
        .collect())
}

/// Price each requested line against the catalogue and return the rows to insert
/// with the order total.
async fn price_lines<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    inputs: &[OrderItemInput],
) -> Result<(Vec<order_item::ActiveModel>, Money), ApiError> {
    let ids: Vec<Uuid> = inputs.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let now = Utc::now();
    let mut total = Money::default();
    let mut rows = Vec::with_capacity(inputs.len());
    for input in inputs {
        let product = products
            .get(&input.product_id)
            .ok_or_else(|| ApiError::bad_request("المنتج غير موجود"))?;
        if !product.is_active {
            return Err(ApiError::bad_request(format!("المنتج \"{}\" غير متاح حالياً", product.name)));
        }
        let unit = Money::new(
            input.unit_price_eur.unwrap_or(product.price_eur),
            input.unit_price_syp.unwrap_or(product.price_syp),
        );
        let line = unit
            .times(input.quantity)
            .ok_or_else(|| ApiError::bad_request(AMOUNT_OUT_OF_RANGE))?;
        total = total
            .checked_add(line)
            .ok_or_else(|| ApiError::bad_request(AMOUNT_OUT_OF_RANGE))?;
        rows.push(order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            unit_price_eur: Set(unit.eur),
            unit_price_syp: Set(unit.syp),
            line_total_eur: Set(line.eur),
            line_total_syp: Set(line.syp),
            created_at: Set(now),
            updated_at: Set(now),
        });
    }
    Ok((rows, total))
}

async fn ensure_store_active<C: ConnectionTrait>(db: &C, store_id: Uuid) -> Result<(), ApiError> {
    let store = store::Entity::find_by_id(store_id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::bad_request("المتجر غير موجود"))?;
    if !store.is_active {
        return Err(ApiError::bad_request("المتجر غير نشط"));
    }
    Ok(())
}

/// Move an order along the status graph.
///
/// # Errors
///
/// `BadRequest` for a transition outside the graph, a cancellation without a
/// reason, or starting delivery with no distributor.
pub async fn change_status<C: ConnectionTrait>(
    db: &C,
    order: Model,
    next: OrderStatus,
    reason: Option<String>,
) -> Result<Model, ApiError> {
    let current = order.status;
    if !current.can_transition_to(next) {
        tracing::warn!(order = %order.order_number, from = current.as_str(), to = next.as_str(), "Rejected status transition");
        return Err(ApiError::bad_request(format!(
            "لا يمكن تغيير حالة الطلب من \"{}\" إلى \"{}\"",
            current.label(),
            next.label()
        )));
    }

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if next == OrderStatus::Cancelled && reason.is_none() {
        return Err(ApiError::bad_request("سبب الإلغاء مطلوب"));
    }
    if next == OrderStatus::InDelivery && order.distributor_id.is_none() {
        return Err(ApiError::bad_request("يجب تعيين موزع قبل بدء التوصيل"));
    }

    let order_number = order.order_number.clone();
    let mut active = order.into_active_model();
    active.status = Set(next);
    if next == OrderStatus::Cancelled {
        active.cancel_reason = Set(reason);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await.map_err(ApiError::from)?;
    tracing::info!(order = %order_number, from = current.as_str(), to = next.as_str(), "Order status changed");
    Ok(updated)
}

/// Orders a distributor already carries on `date`, cancelled ones excluded.
///
/// # Errors
///
/// `Database` on query failure.
pub async fn assigned_count<C: ConnectionTrait>(
    db: &C,
    distributor_id: Uuid,
    date: NaiveDate,
    except_order: Option<Uuid>,
) -> Result<u64, ApiError> {
    let mut query = Entity::find()
        .filter(Column::DistributorId.eq(distributor_id))
        .filter(Column::DeliveryDate.eq(date))
        .filter(Column::Status.ne(OrderStatus::Cancelled));
    if let Some(id) = except_order {
        query = query.filter(Column::Id.ne(id));
    }
    query.count(db).await.map_err(ApiError::database)
}

/// `Conflict` when `distributor` already carries their daily maximum on `date`,
/// not counting `order_id` itself.
async fn ensure_capacity<C: ConnectionTrait>(
    db: &C,
    distributor: &user::Model,
    date: NaiveDate,
    order_id: Uuid,
) -> Result<(), ApiError> {
    let booked = assigned_count(db, distributor.id, date, Some(order_id)).await?;
    if booked >= u64::try_from(distributor.max_daily_orders).unwrap_or(0) {
        tracing::warn!(distributor = %distributor.id, %date, booked, "Distributor at capacity");
        return Err(ApiError::conflict(format!(
            "الموزع {} وصل إلى الحد الأقصى ({}) من الطلبات بتاريخ {}",
            distributor.name, distributor.max_daily_orders, date
        )));
    }
    Ok(())
}

/// Assign an open order to a distributor for a delivery date. A pending order
/// becomes confirmed.
///
/// # Errors
///
/// `NotFound` for an unknown order, `BadRequest` if the order is no longer open,
/// the date precedes the order date or the distributor is not an active
/// distributor, `Conflict` when the distributor is fully booked that day.
pub async fn assign<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    distributor_id: Uuid,
    date: NaiveDate,
) -> Result<Model, ApiError> {
    let order = find_order(db, order_id).await?;
    if !order.status.is_open() {
        return Err(ApiError::bad_request(format!(
            "لا يمكن جدولة الطلب {} في حالته الحالية ({})",
            order.order_number,
            order.status.label()
        )));
    }
    if date < order.order_date {
        return Err(ApiError::bad_request("تاريخ التسليم يجب ألا يسبق تاريخ الطلب"));
    }

    let distributor = user::find_active_distributor(db, distributor_id).await?;
    ensure_capacity(db, &distributor, date, order.id).await?;

    let was_pending = order.status == OrderStatus::Pending;
    let mut active = order.into_active_model();
    active.distributor_id = Set(Some(distributor.id));
    active.delivery_date = Set(Some(date));
    if was_pending {
        active.status = Set(OrderStatus::Confirmed);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(ApiError::from)
}

#[derive(Clone, Copy, Default)]
pub struct OrderOperations;

impl FromRef<AppState> for OrderOperations {
    fn from_ref(_: &AppState) -> Self {
        Self
    }
}

#[async_trait]
impl CRUDOperations for OrderOperations {
    type Resource = Order;

    async fn after_get_one(&self, db: &DatabaseConnection, entity: &mut Order) -> Result<(), ApiError> {
        entity.items = load_items(db, entity.id).await?;
        entity.store_name = store::Entity::find_by_id(entity.store_id)
            .one(db)
            .await
            .map_err(ApiError::database)?
            .map(|s| s.name);
        Ok(())
    }

    async fn before_create(&self, db: &DatabaseConnection, data: &OrderCreate) -> Result<(), ApiError> {
        ensure_store_active(db, data.store_id).await?;
        if let Some(distributor_id) = data.distributor_id {
            user::find_active_distributor(db, distributor_id).await?;
        }
        Ok(())
    }

    async fn perform_create(&self, db: &DatabaseConnection, data: OrderCreate) -> Result<Order, ApiError> {
        let items = data.items.clone();
        let order_id = Uuid::new_v4();
        let mut header: ActiveModel = data.into();
        header.id = Set(order_id);

        let txn = db.begin().await.map_err(ApiError::database)?;
        let (lines, total) = price_lines(&txn, order_id, &items).await?;
        header.total_eur = Set(total.eur);
        header.total_syp = Set(total.syp);
        let model = header.insert(&txn).await.map_err(ApiError::from)?;
        order_item::Entity::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(ApiError::from)?;
        txn.commit().await.map_err(ApiError::database)?;

        tracing::info!(order = %model.order_number, total_eur = %total.eur, "Order created");
        Ok(Order::from(model))
    }

    async fn after_create(&self, db: &DatabaseConnection, entity: &mut Order) -> Result<(), ApiError> {
        self.after_get_one(db, entity).await
    }

    async fn before_update(&self, db: &DatabaseConnection, id: Uuid, data: &OrderUpdate) -> Result<(), ApiError> {
        let order = find_order(db, id).await?;
        if order.status.is_terminal() && data.touches_fulfilment() {
            return Err(ApiError::bad_request("لا يمكن تعديل طلب مكتمل أو ملغي"));
        }
        if data.items.is_some() && !order.status.is_open() {
            return Err(ApiError::bad_request("لا يمكن تعديل منتجات الطلب بعد بدء التوصيل"));
        }
        if order.status == OrderStatus::InDelivery && matches!(data.distributor_id, Some(None)) {
            return Err(ApiError::bad_request("لا يمكن إلغاء تعيين الموزع أثناء التوصيل"));
        }
        if let Some(store_id) = data.store_id {
            ensure_store_active(db, store_id).await?;
        }
        if let Some(Some(distributor_id)) = data.distributor_id {
            user::find_active_distributor(db, distributor_id).await?;
        }

        // Moving an order onto a distributor's day counts against their capacity
        let reschedules = data.distributor_id.is_some() || data.delivery_date.is_some();
        let distributor_id = data.distributor_id.unwrap_or(order.distributor_id);
        let delivery_date = data.delivery_date.unwrap_or(order.delivery_date);
        if reschedules && order.status != OrderStatus::Cancelled {
            if let (Some(distributor_id), Some(date)) = (distributor_id, delivery_date) {
                let distributor = user::find_active_distributor(db, distributor_id).await?;
                ensure_capacity(db, &distributor, date, order.id).await?;
            }
        }
        Ok(())
    }

    async fn perform_update(&self, db: &DatabaseConnection, id: Uuid, data: OrderUpdate) -> Result<Order, ApiError> {
        let mut data = data;
        let items = data.items.take();

        let txn = db.begin().await.map_err(ApiError::database)?;
        let existing = find_order(&txn, id).await?;

        let order_date = data.order_date.unwrap_or(existing.order_date);
        let delivery_date = data.delivery_date.unwrap_or(existing.delivery_date);
        let mut errors = ValidationErrors::new();
        validate_dates(&mut errors, order_date, delivery_date);
        errors.result()?;

        let mut active = data.merge_into_activemodel(existing.into_active_model())?;
        if let Some(items) = items {
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.eq(id))
                .exec(&txn)
                .await
                .map_err(ApiError::from)?;
            let (lines, total) = price_lines(&txn, id, &items).await?;
            order_item::Entity::insert_many(lines)
                .exec(&txn)
                .await
                .map_err(ApiError::from)?;
            active.total_eur = Set(total.eur);
            active.total_syp = Set(total.syp);
        }
        let updated = active.update(&txn).await.map_err(ApiError::from)?;
        txn.commit().await.map_err(ApiError::database)?;
        Ok(Order::from(updated))
    }

    async fn after_update(&self, db: &DatabaseConnection, entity: &mut Order) -> Result<(), ApiError> {
        self.after_get_one(db, entity).await
    }

    async fn before_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let order = find_order(db, id).await?;
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled) {
            return Err(ApiError::conflict("لا يمكن حذف طلب مؤكد أو قيد التوصيل أو مكتمل"));
        }
        Ok(())
    }

    async fn perform_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<Uuid, ApiError> {
        let txn = db.begin().await.map_err(ApiError::database)?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await
            .map_err(ApiError::from)?;
        let result = Entity::delete_by_id(id).exec(&txn).await.map_err(ApiError::from)?;
        if result.rows_affected == 0 {
            return Err(ApiError::not_found(Order::RESOURCE_LABEL, Some(id.to_string())));
        }
        txn.commit().await.map_err(ApiError::database)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_graph() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(InDelivery));
        assert!(Confirmed.can_transition_to(Pending));
        assert!(Confirmed.can_transition_to(InDelivery));
        assert!(InDelivery.can_transition_to(Delivered));
        assert!(!InDelivery.can_transition_to(Pending));
        for next in OrderStatus::ALL {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert!(number.starts_with("ORD-20240503-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_create_requires_items_with_positive_quantity() {
        let mut create = OrderCreate {
            store_id: Uuid::new_v4(),
            distributor_id: None,
            order_date: None,
            delivery_date: None,
            priority: None,
            payment_status: None,
            notes: None,
            items: vec![],
        };
        assert!(create.validate().is_err());

        create.items.push(OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price_eur: None,
            unit_price_syp: None,
        });
        let errors = create.validate().unwrap_err();
        assert_eq!(errors.errors()[0].message, "الكمية يجب أن تكون أكبر من صفر");
    }

    #[test]
    fn test_delivery_before_order_date_is_rejected() {
        let create = OrderCreate {
            store_id: Uuid::new_v4(),
            distributor_id: None,
            order_date: NaiveDate::from_ymd_opt(2024, 5, 3),
            delivery_date: NaiveDate::from_ymd_opt(2024, 5, 2),
            priority: None,
            payment_status: None,
            notes: None,
            items: vec![OrderItemInput {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price_eur: None,
                unit_price_syp: None,
            }],
        };
        assert!(create.validate().is_err());
    }
}
