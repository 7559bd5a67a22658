//! Stores (points of sale) that order bread and get deliveries.

use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    entity::prelude::*,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{order, user};
use crate::ApiError;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::{Validatable, ValidationErrors, validators};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub owner_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub area: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub preferred_distributor_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub owner_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub area: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub preferred_distributor_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Store {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner_name: model.owner_name,
            phone: model.phone,
            address: model.address,
            area: model.area,
            latitude: model.latitude,
            longitude: model.longitude,
            is_active: model.is_active,
            preferred_distributor_id: model.preferred_distributor_id,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct StoreCreate {
    pub name: String,
    pub owner_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub area: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: Option<bool>,
    pub preferred_distributor_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl From<StoreCreate> for ActiveModel {
    fn from(create: StoreCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            owner_name: Set(create.owner_name),
            phone: Set(create.phone.map(|p| p.trim().to_string())),
            address: Set(create.address),
            area: Set(create.area.trim().to_string()),
            latitude: Set(create.latitude),
            longitude: Set(create.longitude),
            is_active: Set(create.is_active.unwrap_or(true)),
            preferred_distributor_id: Set(create.preferred_distributor_id),
            notes: Set(create.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_coordinates(errors: &mut ValidationErrors, latitude: Option<f64>, longitude: Option<f64>) {
    if let Some(lat) = latitude {
        errors.check(validators::validate_range("latitude", "خط العرض", lat, Some(-90.0), Some(90.0)));
    }
    if let Some(lng) = longitude {
        errors.check(validators::validate_range("longitude", "خط الطول", lng, Some(-180.0), Some(180.0)));
    }
}

impl Validatable for StoreCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("name", "اسم المتجر", &self.name));
        errors.check(validators::validate_length("name", "اسم المتجر", &self.name, None, Some(150)));
        errors.check(validators::validate_required("area", "المنطقة", &self.area));
        if let Some(phone) = &self.phone {
            errors.check(validators::validate_phone("phone", phone));
        }
        validate_coordinates(&mut errors, self.latitude, self.longitude);
        errors.result()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct StoreUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub owner_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub address: Option<Option<String>>,
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub longitude: Option<Option<f64>>,
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub preferred_distributor_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for StoreUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name.trim().to_string());
        }
        if let Some(owner_name) = self.owner_name {
            existing.owner_name = Set(owner_name);
        }
        if let Some(phone) = self.phone {
            existing.phone = Set(phone.map(|p| p.trim().to_string()));
        }
        if let Some(address) = self.address {
            existing.address = Set(address);
        }
        if let Some(area) = self.area {
            existing.area = Set(area.trim().to_string());
        }
        if let Some(latitude) = self.latitude {
            existing.latitude = Set(latitude);
        }
        if let Some(longitude) = self.longitude {
            existing.longitude = Set(longitude);
        }
        if let Some(is_active) = self.is_active {
            existing.is_active = Set(is_active);
        }
        if let Some(distributor) = self.preferred_distributor_id {
            existing.preferred_distributor_id = Set(distributor);
        }
        if let Some(notes) = self.notes {
            existing.notes = Set(notes);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for StoreUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validators::validate_required("name", "اسم المتجر", name));
        }
        if let Some(area) = &self.area {
            errors.check(validators::validate_required("area", "المنطقة", area));
        }
        if let Some(Some(phone)) = &self.phone {
            errors.check(validators::validate_phone("phone", phone));
        }
        validate_coordinates(&mut errors, self.latitude.flatten(), self.longitude.flatten());
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Store {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = StoreCreate;
    type UpdateModel = StoreUpdate;
    type ListModel = Store;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "store";
    const RESOURCE_NAME_PLURAL: &'static str = "stores";
    const RESOURCE_LABEL: &'static str = "المتجر";

    fn default_index_column() -> Self::ColumnType {
        Column::Name
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("area", Column::Area),
            ("owner_name", Column::OwnerName),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("owner_name", Column::OwnerName),
            ("phone", Column::Phone),
            ("area", Column::Area),
            ("is_active", Column::IsActive),
            ("preferred_distributor_id", Column::PreferredDistributorId),
        ]
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["name", "owner_name", "phone", "area"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("name", Column::Name),
            ("owner_name", Column::OwnerName),
            ("area", Column::Area),
            ("address", Column::Address),
        ]
    }
}

#[derive(Clone, Copy, Default)]
pub struct StoreOperations;

impl FromRef<AppState> for StoreOperations {
    fn from_ref(_: &AppState) -> Self {
        Self
    }
}

#[async_trait]
impl CRUDOperations for StoreOperations {
    type Resource = Store;

    async fn before_create(&self, db: &DatabaseConnection, data: &StoreCreate) -> Result<(), ApiError> {
        if let Some(distributor_id) = data.preferred_distributor_id {
            user::find_active_distributor(db, distributor_id).await?;
        }
        Ok(())
    }

    async fn before_update(&self, db: &DatabaseConnection, _id: Uuid, data: &StoreUpdate) -> Result<(), ApiError> {
        if let Some(Some(distributor_id)) = data.preferred_distributor_id {
            user::find_active_distributor(db, distributor_id).await?;
        }
        Ok(())
    }

    async fn before_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let orders = order::Entity::find()
            .filter(order::Column::StoreId.eq(id))
            .count(db)
            .await
            .map_err(ApiError::database)?;
        if orders > 0 {
            return Err(ApiError::conflict("لا يمكن حذف متجر لديه طلبات، يمكن إيقافه بدلاً من ذلك"));
        }
        Ok(())
    }
}
