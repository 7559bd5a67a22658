//! OpenAPI document, served by Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::entities::{order, order_item, product, scheduling_draft, store, user, vehicle};
use crate::money::Money;
use crate::routes::{auto_scheduling, distribution, health, orders, pricing, users, vehicles};
use crate::scheduling;

struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bakery distribution API",
        description = "Orders, pricing, fleet and delivery scheduling for a bakery. \
                       Every `/api` route takes `Authorization: Bearer <token>`."
    ),
    paths(
        health::health,
        users::rotate_token,
        vehicles::maintenance_due,
        vehicles::record_maintenance,
        orders::summary,
        orders::change_status,
        distribution::schedule,
        distribution::my_orders,
        distribution::assign,
        pricing::price_list,
        pricing::bulk_update,
        pricing::recalculate_syp,
        auto_scheduling::ingest,
        auto_scheduling::generate,
        auto_scheduling::approve,
        auto_scheduling::reject,
        auto_scheduling::modify,
        auto_scheduling::bulk_approve,
        auto_scheduling::stats,
    ),
    components(schemas(
        Money,
        user::User,
        user::UserCreate,
        user::UserUpdate,
        user::UserRole,
        vehicle::Vehicle,
        vehicle::VehicleCreate,
        vehicle::VehicleUpdate,
        vehicle::VehicleType,
        vehicle::VehicleStatus,
        product::Product,
        product::ProductCreate,
        product::ProductUpdate,
        product::ProductUnit,
        store::Store,
        store::StoreCreate,
        store::StoreUpdate,
        order::Order,
        order::OrderList,
        order::OrderCreate,
        order::OrderUpdate,
        order::OrderStatus,
        order::OrderPriority,
        order::PaymentStatus,
        order_item::OrderItem,
        order_item::OrderItemInput,
        scheduling_draft::SchedulingDraft,
        scheduling_draft::DraftSuggestion,
        scheduling_draft::DraftModification,
        scheduling_draft::DraftStatus,
        scheduling_draft::ConfidenceLevel,
        scheduling::IngestOutcome,
        scheduling::BulkApproveOutcome,
        scheduling::BulkFailure,
        scheduling::DraftStats,
    )),
    modifiers(&BearerToken),
    tags(
        (name = "users", description = "Staff and distributor accounts"),
        (name = "vehicles", description = "Delivery fleet and maintenance"),
        (name = "orders", description = "Store orders"),
        (name = "pricing", description = "EUR/SYP price list"),
        (name = "distribution", description = "Daily delivery assignment"),
        (name = "auto-scheduling", description = "Review of suggested assignments"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_custom_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/auto-scheduling/drafts/{id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/pricing/recalculate-syp"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
