//! Price list maintenance in both currencies.

use std::collections::HashSet;

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiError;
use crate::core::CRUDResource;
use crate::entities::product::{self, PRICE_LABEL, Product, ProductUnit};
use crate::extract::Json;
use crate::money::{AMOUNT_OUT_OF_RANGE, Money, convert_to_syp};
use crate::operations::MAX_BATCH_SIZE;
use crate::state::AppState;
use crate::validation::{ValidationError, ValidationErrors, validators};

pub const DEFAULT_SYP_ROUNDING: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(price_list))
        .route("/bulk", put(bulk_update))
        .route("/recalculate-syp", post(recalculate_syp))
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PriceEntry {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: ProductUnit,
    pub unit_label: String,
    pub price_eur: Decimal,
    pub price_syp: Decimal,
    /// SYP per EUR implied by the two prices
    pub implied_rate: Option<Decimal>,
}

impl From<product::Model> for PriceEntry {
    fn from(model: product::Model) -> Self {
        Self {
            implied_rate: Money::new(model.price_eur, model.price_syp).implied_rate(),
            product_id: model.id,
            name: model.name,
            sku: model.sku,
            unit: model.unit,
            unit_label: model.unit.label().to_string(),
            price_eur: model.price_eur,
            price_syp: model.price_syp,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct PriceUpdate {
    pub product_id: Uuid,
    pub price_eur: Option<Decimal>,
    pub price_syp: Option<Decimal>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct BulkPriceUpdate {
    pub updates: Vec<PriceUpdate>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct SypRecalculation {
    /// SYP per EUR
    pub exchange_rate: Decimal,
    /// Round to the nearest multiple, 100 when omitted
    pub round_to: Option<Decimal>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct RecalculationOutcome {
    pub exchange_rate: Decimal,
    pub round_to: Decimal,
    pub updated: usize,
    pub prices: Vec<PriceEntry>,
}

fn validate_bulk(request: &BulkPriceUpdate) -> Result<(), ApiError> {
    if request.updates.is_empty() {
        return Err(ApiError::bad_request("لا توجد أسعار لتحديثها"));
    }
    if request.updates.len() > MAX_BATCH_SIZE {
        return Err(ApiError::bad_request(format!(
            "لا يمكن تحديث أكثر من {MAX_BATCH_SIZE} سعر في عملية واحدة"
        )));
    }

    let mut errors = ValidationErrors::new();
    let mut seen = HashSet::new();
    for update in &request.updates {
        if !seen.insert(update.product_id) {
            errors.add(ValidationError::new("product_id", "المنتج مكرر في قائمة التحديث"));
        }
        if update.price_eur.is_none() && update.price_syp.is_none() {
            errors.add(ValidationError::new("updates", "يجب تحديد سعر واحد على الأقل"));
        }
        if let Some(price) = update.price_eur {
            errors.check(validators::validate_non_negative("price_eur", PRICE_LABEL, price));
        }
        if let Some(price) = update.price_syp {
            errors.check(validators::validate_non_negative("price_syp", PRICE_LABEL, price));
        }
    }
    errors.result()?;
    Ok(())
}

async fn active_products<C: ConnectionTrait>(db: &C) -> Result<Vec<product::Model>, ApiError> {
    product::Entity::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(ApiError::database)
}

#[utoipa::path(
    get,
    path = "/api/pricing",
    responses((status = 200, description = "Active products with both prices", body = [PriceEntry])),
    tag = "pricing"
)]
pub async fn price_list(State(state): State<AppState>) -> Result<Json<Vec<PriceEntry>>, ApiError> {
    let products = active_products(&state.db).await?;
    Ok(Json(products.into_iter().map(PriceEntry::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/pricing/bulk",
    request_body = BulkPriceUpdate,
    responses(
        (status = 200, description = "Updated prices", body = [PriceEntry]),
        (status = 400, description = "Invalid batch"),
        (status = 404, description = "Unknown product")
    ),
    tag = "pricing"
)]
pub async fn bulk_update(
    State(state): State<AppState>,
    Json(request): Json<BulkPriceUpdate>,
) -> Result<Json<Vec<PriceEntry>>, ApiError> {
    validate_bulk(&request)?;

    let now = Utc::now();
    let txn = state.db.begin().await.map_err(ApiError::database)?;
    let mut updated = Vec::with_capacity(request.updates.len());
    for update in request.updates {
        let existing = product::Entity::find_by_id(update.product_id)
            .one(&txn)
            .await
            .map_err(ApiError::database)?
            .ok_or_else(|| ApiError::not_found(Product::RESOURCE_LABEL, Some(update.product_id.to_string())))?;
        let mut active = existing.into_active_model();
        if let Some(price) = update.price_eur {
            active.price_eur = Set(price);
        }
        if let Some(price) = update.price_syp {
            active.price_syp = Set(price);
        }
        active.updated_at = Set(now);
        let model = active.update(&txn).await.map_err(ApiError::from)?;
        updated.push(PriceEntry::from(model));
    }
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(count = updated.len(), "Prices updated");
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/pricing/recalculate-syp",
    request_body = SypRecalculation,
    responses(
        (status = 200, description = "SYP prices recalculated", body = RecalculationOutcome),
        (status = 400, description = "Exchange rate not positive")
    ),
    tag = "pricing"
)]
pub async fn recalculate_syp(
    State(state): State<AppState>,
    Json(request): Json<SypRecalculation>,
) -> Result<Json<RecalculationOutcome>, ApiError> {
    if request.exchange_rate <= Decimal::ZERO {
        return Err(ApiError::bad_request("سعر الصرف يجب أن يكون أكبر من صفر"));
    }
    let round_to = request.round_to.unwrap_or_else(|| Decimal::from(DEFAULT_SYP_ROUNDING));
    if round_to < Decimal::ZERO {
        return Err(ApiError::bad_request("قيمة التقريب يجب ألا تكون سالبة"));
    }

    let now = Utc::now();
    let txn = state.db.begin().await.map_err(ApiError::database)?;
    let products = active_products(&txn).await?;
    let mut prices = Vec::with_capacity(products.len());
    for model in products {
        let syp = convert_to_syp(model.price_eur, request.exchange_rate, round_to)
            .ok_or_else(|| ApiError::bad_request(AMOUNT_OUT_OF_RANGE))?;
        let mut active = model.into_active_model();
        active.price_syp = Set(syp);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ApiError::from)?;
        prices.push(PriceEntry::from(updated));
    }
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(rate = %request.exchange_rate, %round_to, count = prices.len(), "SYP prices recalculated");
    Ok(Json(RecalculationOutcome {
        exchange_rate: request.exchange_rate,
        round_to,
        updated: prices.len(),
        prices,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(price_eur: Option<Decimal>, price_syp: Option<Decimal>) -> PriceUpdate {
        PriceUpdate {
            product_id: Uuid::new_v4(),
            price_eur,
            price_syp,
        }
    }

    #[test]
    fn test_bulk_rejects_negative_prices() {
        let request = BulkPriceUpdate {
            updates: vec![update(Some(Decimal::new(-1, 0)), None)],
        };
        let err = validate_bulk(&request).unwrap_err();
        assert_eq!(err.user_message(), "السعر يجب ألا يكون سالباً");
    }

    #[test]
    fn test_bulk_requires_a_price() {
        let request = BulkPriceUpdate {
            updates: vec![update(None, None)],
        };
        assert!(validate_bulk(&request).is_err());
        assert!(validate_bulk(&BulkPriceUpdate { updates: vec![] }).is_err());
    }

    #[test]
    fn test_bulk_rejects_oversized_batch() {
        let request = BulkPriceUpdate {
            updates: (0..=MAX_BATCH_SIZE).map(|_| update(Some(Decimal::ONE), None)).collect(),
        };
        assert!(validate_bulk(&request).is_err());
    }
}
