//! Order lines. Prices are a snapshot taken when the line is written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::money::Money;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price_eur: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub unit_price_syp: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub line_total_eur: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub line_total_syp: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[must_use]
    pub const fn line_total(&self) -> Money {
        Money::new(self.line_total_eur, self.line_total_syp)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price_eur: Decimal,
    pub unit_price_syp: Decimal,
    pub line_total_eur: Decimal,
    pub line_total_syp: Decimal,
}

impl From<Model> for OrderItem {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: None,
            quantity: model.quantity,
            unit_price_eur: model.unit_price_eur,
            unit_price_syp: model.unit_price_syp,
            line_total_eur: model.line_total_eur,
            line_total_syp: model.line_total_syp,
        }
    }
}

/// One requested line. Prices default to the product's current prices.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_eur: Option<Decimal>,
    pub unit_price_syp: Option<Decimal>,
}
