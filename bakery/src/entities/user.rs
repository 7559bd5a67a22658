//! Users: admins, managers and distributors (delivery drivers).

use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DeriveActiveEnum, EntityTrait,
    PaginatorTrait, QueryFilter, entity::prelude::*, sea_query::StringLen,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::order::{self, OrderStatus};
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::ApiError;
use crate::validation::{Validatable, ValidationErrors, validators};

pub const DEFAULT_MAX_DAILY_ORDERS: i32 = 30;
pub const MSG_DUPLICATE_PHONE: &str = "رقم الهاتف مستخدم مسبقاً";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "distributor")]
    Distributor,
}

impl UserRole {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "مدير النظام",
            Self::Manager => "مدير",
            Self::Distributor => "موزع",
        }
    }

    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub working_area: Option<String>,
    pub max_daily_orders: i32,
    #[sea_orm(unique)]
    pub api_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 64 hex characters from two v4 UUIDs
#[must_use]
pub fn generate_api_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// API representation. The token is only ever returned by the rotation endpoint.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub role_label: String,
    pub is_active: bool,
    pub working_area: Option<String>,
    pub max_daily_orders: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            role: model.role,
            role_label: model.role.label().to_string(),
            is_active: model.is_active,
            working_area: model.working_area,
            max_daily_orders: model.max_daily_orders,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct UserCreate {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_active: Option<bool>,
    pub working_area: Option<String>,
    pub max_daily_orders: Option<i32>,
}

impl From<UserCreate> for ActiveModel {
    fn from(create: UserCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            phone: Set(create.phone.trim().to_string()),
            email: Set(create.email.map(|e| e.trim().to_lowercase())),
            role: Set(create.role),
            is_active: Set(create.is_active.unwrap_or(true)),
            working_area: Set(create.working_area),
            max_daily_orders: Set(create.max_daily_orders.unwrap_or(DEFAULT_MAX_DAILY_ORDERS)),
            api_token: Set(generate_api_token()),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for UserCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("name", "الاسم", &self.name));
        errors.check(validators::validate_length("name", "الاسم", &self.name, Some(2), Some(100)));
        errors.check(validators::validate_phone("phone", &self.phone));
        if let Some(email) = &self.email {
            errors.check(validators::validate_email("email", email));
        }
        if let Some(max) = self.max_daily_orders {
            errors.check(validators::validate_range(
                "max_daily_orders",
                "الحد الأقصى للطلبات اليومية",
                max,
                Some(1),
                Some(500),
            ));
        }
        errors.result()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub email: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub working_area: Option<Option<String>>,
    pub max_daily_orders: Option<i32>,
}

impl MergeIntoActiveModel<ActiveModel> for UserUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name.trim().to_string());
        }
        if let Some(phone) = self.phone {
            existing.phone = Set(phone.trim().to_string());
        }
        if let Some(email) = self.email {
            existing.email = Set(email.map(|e| e.trim().to_lowercase()));
        }
        if let Some(role) = self.role {
            existing.role = Set(role);
        }
        if let Some(is_active) = self.is_active {
            existing.is_active = Set(is_active);
        }
        if let Some(working_area) = self.working_area {
            existing.working_area = Set(working_area);
        }
        if let Some(max) = self.max_daily_orders {
            existing.max_daily_orders = Set(max);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for UserUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validators::validate_required("name", "الاسم", name));
            errors.check(validators::validate_length("name", "الاسم", name, Some(2), Some(100)));
        }
        if let Some(phone) = &self.phone {
            errors.check(validators::validate_phone("phone", phone));
        }
        if let Some(Some(email)) = &self.email {
            errors.check(validators::validate_email("email", email));
        }
        if let Some(max) = self.max_daily_orders {
            errors.check(validators::validate_range(
                "max_daily_orders",
                "الحد الأقصى للطلبات اليومية",
                max,
                Some(1),
                Some(500),
            ));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for User {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = UserCreate;
    type UpdateModel = UserUpdate;
    type ListModel = User;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "user";
    const RESOURCE_NAME_PLURAL: &'static str = "users";
    const RESOURCE_LABEL: &'static str = "المستخدم";

    fn default_index_column() -> Self::ColumnType {
        Column::Name
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("role", Column::Role),
            ("working_area", Column::WorkingArea),
            ("max_daily_orders", Column::MaxDailyOrders),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("phone", Column::Phone),
            ("email", Column::Email),
            ("role", Column::Role),
            ("is_active", Column::IsActive),
            ("working_area", Column::WorkingArea),
        ]
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "role"
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["name", "phone", "working_area"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("name", Column::Name),
            ("phone", Column::Phone),
            ("working_area", Column::WorkingArea),
        ]
    }
}

/// Load a user that can receive deliveries: an active distributor.
///
/// # Errors
///
/// `BadRequest` when the id is unknown, inactive or not a distributor.
pub async fn find_active_distributor<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model, ApiError> {
    Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .filter(|user| user.role == UserRole::Distributor && user.is_active)
        .ok_or_else(|| ApiError::bad_request("الموزع غير موجود أو غير نشط"))
}

async fn ensure_phone_available(db: &DatabaseConnection, phone: &str, except: Option<Uuid>) -> Result<(), ApiError> {
    let mut query = Entity::find().filter(Column::Phone.eq(phone.trim()));
    if let Some(id) = except {
        query = query.filter(Column::Id.ne(id));
    }
    if query.count(db).await.map_err(ApiError::database)? > 0 {
        tracing::warn!("Rejected duplicate user phone");
        return Err(ApiError::conflict(MSG_DUPLICATE_PHONE));
    }
    Ok(())
}

#[derive(Clone, Copy, Default)]
pub struct UserOperations;

impl FromRef<AppState> for UserOperations {
    fn from_ref(_: &AppState) -> Self {
        Self
    }
}

#[async_trait]
impl CRUDOperations for UserOperations {
    type Resource = User;

    async fn before_create(&self, db: &DatabaseConnection, data: &UserCreate) -> Result<(), ApiError> {
        ensure_phone_available(db, &data.phone, None).await
    }

    async fn before_update(&self, db: &DatabaseConnection, id: Uuid, data: &UserUpdate) -> Result<(), ApiError> {
        if let Some(phone) = &data.phone {
            ensure_phone_available(db, phone, Some(id)).await?;
        }
        Ok(())
    }

    async fn before_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let active_orders = order::Entity::find()
            .filter(order::Column::DistributorId.eq(id))
            .filter(order::Column::Status.is_in([OrderStatus::Confirmed, OrderStatus::InDelivery]))
            .count(db)
            .await
            .map_err(ApiError::database)?;
        if active_orders > 0 {
            return Err(ApiError::conflict("لا يمكن حذف موزع لديه طلبات قيد التنفيذ"));
        }
        Ok(())
    }
}
