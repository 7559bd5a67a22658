use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DeriveActiveEnum, EntityTrait, PaginatorTrait,
    QueryFilter, entity::prelude::*, sea_query::StringLen,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::order_item;
use crate::ApiError;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::{Validatable, ValidationErrors, validators};

pub const PRICE_LABEL: &str = "السعر";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ProductUnit {
    #[sea_orm(string_value = "piece")]
    Piece,
    #[sea_orm(string_value = "kg")]
    Kg,
    #[sea_orm(string_value = "pack")]
    Pack,
    #[sea_orm(string_value = "tray")]
    Tray,
}

impl ProductUnit {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Piece => "قطعة",
            Self::Kg => "كيلوغرام",
            Self::Pack => "ربطة",
            Self::Tray => "صينية",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub category: Option<String>,
    pub unit: ProductUnit,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price_eur: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub price_syp: Decimal,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit: ProductUnit,
    pub unit_label: String,
    pub price_eur: Decimal,
    pub price_syp: Decimal,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            category: model.category,
            unit: model.unit,
            unit_label: model.unit.label().to_string(),
            price_eur: model.price_eur,
            price_syp: model.price_syp,
            is_active: model.is_active,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct ProductCreate {
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit: Option<ProductUnit>,
    pub price_eur: Decimal,
    pub price_syp: Decimal,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

impl From<ProductCreate> for ActiveModel {
    fn from(create: ProductCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            sku: Set(create.sku.trim().to_uppercase()),
            category: Set(create.category),
            unit: Set(create.unit.unwrap_or(ProductUnit::Piece)),
            price_eur: Set(create.price_eur),
            price_syp: Set(create.price_syp),
            is_active: Set(create.is_active.unwrap_or(true)),
            description: Set(create.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for ProductCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("name", "اسم المنتج", &self.name));
        errors.check(validators::validate_length("name", "اسم المنتج", &self.name, None, Some(150)));
        errors.check(validators::validate_required("sku", "رمز المنتج", &self.sku));
        errors.check(validators::validate_length("sku", "رمز المنتج", &self.sku, None, Some(50)));
        errors.check(validators::validate_non_negative("price_eur", PRICE_LABEL, self.price_eur));
        errors.check(validators::validate_non_negative("price_syp", PRICE_LABEL, self.price_syp));
        errors.result()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub category: Option<Option<String>>,
    pub unit: Option<ProductUnit>,
    pub price_eur: Option<Decimal>,
    pub price_syp: Option<Decimal>,
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for ProductUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name.trim().to_string());
        }
        if let Some(sku) = self.sku {
            existing.sku = Set(sku.trim().to_uppercase());
        }
        if let Some(category) = self.category {
            existing.category = Set(category);
        }
        if let Some(unit) = self.unit {
            existing.unit = Set(unit);
        }
        if let Some(price) = self.price_eur {
            existing.price_eur = Set(price);
        }
        if let Some(price) = self.price_syp {
            existing.price_syp = Set(price);
        }
        if let Some(is_active) = self.is_active {
            existing.is_active = Set(is_active);
        }
        if let Some(description) = self.description {
            existing.description = Set(description);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for ProductUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validators::validate_required("name", "اسم المنتج", name));
        }
        if let Some(sku) = &self.sku {
            errors.check(validators::validate_required("sku", "رمز المنتج", sku));
        }
        if let Some(price) = self.price_eur {
            errors.check(validators::validate_non_negative("price_eur", PRICE_LABEL, price));
        }
        if let Some(price) = self.price_syp {
            errors.check(validators::validate_non_negative("price_syp", PRICE_LABEL, price));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Product {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ProductCreate;
    type UpdateModel = ProductUpdate;
    type ListModel = Product;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "product";
    const RESOURCE_NAME_PLURAL: &'static str = "products";
    const RESOURCE_LABEL: &'static str = "المنتج";

    fn default_index_column() -> Self::ColumnType {
        Column::Name
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("sku", Column::Sku),
            ("category", Column::Category),
            ("price_eur", Column::PriceEur),
            ("price_syp", Column::PriceSyp),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("sku", Column::Sku),
            ("category", Column::Category),
            ("unit", Column::Unit),
            ("price_eur", Column::PriceEur),
            ("price_syp", Column::PriceSyp),
            ("is_active", Column::IsActive),
        ]
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "unit"
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["name", "category"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("name", Column::Name),
            ("sku", Column::Sku),
            ("category", Column::Category),
            ("description", Column::Description),
        ]
    }
}

#[derive(Clone, Copy, Default)]
pub struct ProductOperations;

impl FromRef<AppState> for ProductOperations {
    fn from_ref(_: &AppState) -> Self {
        Self
    }
}

async fn ensure_sku_available(db: &DatabaseConnection, sku: &str, except: Option<Uuid>) -> Result<(), ApiError> {
    let mut query = Entity::find().filter(Column::Sku.eq(sku.trim().to_uppercase()));
    if let Some(id) = except {
        query = query.filter(Column::Id.ne(id));
    }
    if query.count(db).await.map_err(ApiError::database)? > 0 {
        return Err(ApiError::conflict("رمز المنتج مستخدم مسبقاً"));
    }
    Ok(())
}

#[async_trait]
impl CRUDOperations for ProductOperations {
    type Resource = Product;

    async fn before_create(&self, db: &DatabaseConnection, data: &ProductCreate) -> Result<(), ApiError> {
        ensure_sku_available(db, &data.sku, None).await
    }

    async fn before_update(&self, db: &DatabaseConnection, id: Uuid, data: &ProductUpdate) -> Result<(), ApiError> {
        if let Some(sku) = &data.sku {
            ensure_sku_available(db, sku, Some(id)).await?;
        }
        Ok(())
    }

    async fn before_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let ordered = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ApiError::database)?;
        if ordered > 0 {
            return Err(ApiError::conflict("لا يمكن حذف منتج مرتبط بطلبات، يمكن إيقافه بدلاً من ذلك"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(price_eur: i64, price_syp: i64) -> ProductCreate {
        ProductCreate {
            name: "خبز عربي".into(),
            sku: "BRD-001".into(),
            category: None,
            unit: None,
            price_eur: Decimal::new(price_eur, 2),
            price_syp: Decimal::new(price_syp, 0),
            is_active: None,
            description: None,
        }
    }

    #[test]
    fn test_negative_price_message() {
        let errors = payload(-150, 1500).validate().unwrap_err();
        assert_eq!(errors.errors()[0].message, "السعر يجب ألا يكون سالباً");
    }

    #[test]
    fn test_zero_price_is_allowed() {
        assert!(payload(0, 0).validate().is_ok());
    }

    #[test]
    fn test_sku_is_upper_cased_on_create() {
        let mut create = payload(100, 1000);
        create.sku = " brd-002 ".into();
        let active: ActiveModel = create.into();
        assert_eq!(active.sku, Set("BRD-002".to_string()));
    }
}
