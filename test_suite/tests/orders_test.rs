// Order lifecycle: creation with computed totals, status graph, deletion and summary

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

mod common;
use common::{ADMIN_TOKEN, TestApp, dec, id_of, setup_test_app};

struct Catalogue {
    store_id: String,
    bread_id: String,
    cake_id: String,
}

async fn catalogue(app: &TestApp) -> Catalogue {
    let store = app.create_store("بقالية الياسمين", "المزة").await;
    let bread = app.create_product("خبز", "BRD-1", "0.5", "7500").await;
    let cake = app.create_product("كعك", "CAKE-1", "2.25", "30000").await;
    Catalogue {
        store_id: id_of(&store),
        bread_id: id_of(&bread),
        cake_id: id_of(&cake),
    }
}

async fn assign(app: &TestApp, order_id: &str, distributor_id: &str) -> Value {
    let response = app
        .post(
            "/api/distribution/assign",
            ADMIN_TOKEN,
            json!({"order_ids": [order_id], "distributor_id": distributor_id, "delivery_date": "2024-06-02"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    response.body
}

#[tokio::test]
async fn test_create_order_computes_totals() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;

    let response = app
        .post(
            "/api/orders",
            ADMIN_TOKEN,
            json!({
                "store_id": c.store_id,
                "order_date": "2024-06-01",
                "priority": "high",
                "items": [
                    {"product_id": c.bread_id, "quantity": 12},
                    {"product_id": c.cake_id, "quantity": 2}
                ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let order = response.body;

    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-20240601-"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["status_label"], "قيد الانتظار");
    assert_eq!(order["priority_label"], "عالية");
    assert_eq!(order["store_name"], "بقالية الياسمين");
    // 12 x 0.5 + 2 x 2.25
    assert_eq!(dec(&order["total_eur"]), Decimal::new(105, 1));
    assert_eq!(dec(&order["total_syp"]), Decimal::from(150_000));

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let bread = items.iter().find(|i| i["product_id"] == c.bread_id.as_str()).unwrap();
    assert_eq!(bread["product_name"], "خبز");
    assert_eq!(dec(&bread["line_total_eur"]), Decimal::from(6));
}

#[tokio::test]
async fn test_order_validation() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;

    let response = app
        .post("/api/orders", ADMIN_TOKEN, json!({"store_id": c.store_id, "items": []}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "يجب أن يحتوي الطلب على منتج واحد على الأقل");

    let response = app
        .post(
            "/api/orders",
            ADMIN_TOKEN,
            json!({"store_id": c.store_id, "items": [{"product_id": c.bread_id, "quantity": 0}]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "الكمية يجب أن تكون أكبر من صفر");

    let response = app
        .post(
            "/api/orders",
            ADMIN_TOKEN,
            json!({
                "store_id": c.store_id,
                "order_date": "2024-06-05",
                "delivery_date": "2024-06-01",
                "items": [{"product_id": c.bread_id, "quantity": 1}]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/orders",
            ADMIN_TOKEN,
            json!({"store_id": uuid::Uuid::new_v4(), "items": [{"product_id": c.bread_id, "quantity": 1}]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "المتجر غير موجود");
}

#[tokio::test]
async fn test_order_total_out_of_range() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;

    let response = app
        .post(
            "/api/orders",
            ADMIN_TOKEN,
            json!({
                "store_id": c.store_id,
                "items": [{"product_id": c.bread_id, "quantity": 2, "unit_price_eur": "79228162514264337593543950335"}]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "المبلغ يتجاوز الحد المسموح");

    let response = app.get("/api/orders", ADMIN_TOKEN).await;
    assert_eq!(response.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_malformed_requests_use_error_body() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let order = app.create_order(&c.store_id, &c.bread_id, 1, None).await;

    let response = app
        .patch(
            &format!("/api/orders/{}/status", id_of(&order)),
            ADMIN_TOKEN,
            json!({"status": "shipped"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "صيغة البيانات المرسلة غير صالحة");

    let response = app.get("/api/orders/not-an-id", ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "المعرف غير صالح");

    let response = app.get("/api/orders/summary?from=yesterday", ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "معايير البحث غير صالحة");
}

#[tokio::test]
async fn test_status_transitions() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let order = app.create_order(&c.store_id, &c.bread_id, 10, None).await;
    let url = format!("/api/orders/{}/status", id_of(&order));

    // pending -> delivered skips the graph
    let response = app.patch(&url, ADMIN_TOKEN, json!({"status": "delivered"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.patch(&url, ADMIN_TOKEN, json!({"status": "confirmed"})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "confirmed");

    let response = app.patch(&url, ADMIN_TOKEN, json!({"status": "in_delivery"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "يجب تعيين موزع قبل بدء التوصيل");

    let response = app.patch(&url, ADMIN_TOKEN, json!({"status": "cancelled"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "سبب الإلغاء مطلوب");

    let response = app
        .patch(&url, ADMIN_TOKEN, json!({"status": "cancelled", "reason": "المتجر مغلق"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "cancelled");
    assert_eq!(response.body["cancel_reason"], "المتجر مغلق");

    // Cancelled is terminal
    let response = app.patch(&url, ADMIN_TOKEN, json!({"status": "pending"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_distributor_reports_delivery_on_own_orders_only() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let sami = app.create_distributor("سامي", "0944200001").await;
    let rami = app.create_distributor("رامي", "0944200002").await;
    let sami_token = app.token_for(&id_of(&sami)).await;
    let rami_token = app.token_for(&id_of(&rami)).await;

    let order = app.create_order(&c.store_id, &c.bread_id, 10, None).await;
    let assigned = assign(&app, &id_of(&order), &id_of(&sami)).await;
    assert_eq!(assigned[0]["status"], "confirmed");
    let url = format!("/api/orders/{}/status", id_of(&order));

    let response = app.patch(&url, &rami_token, json!({"status": "in_delivery"})).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .patch(&url, &sami_token, json!({"status": "cancelled", "reason": "لا أحد"}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.patch(&url, &sami_token, json!({"status": "in_delivery"})).await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app.patch(&url, &sami_token, json!({"status": "delivered"})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status_label"], "تم التسليم");

    // Distributors still cannot edit orders directly
    let response = app
        .put(&format!("/api/orders/{}", id_of(&order)), &sami_token, json!({"notes": "x"}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_only_pending_or_cancelled() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let pending = app.create_order(&c.store_id, &c.bread_id, 1, None).await;
    let confirmed = app.create_order(&c.store_id, &c.bread_id, 1, None).await;
    let response = app
        .patch(
            &format!("/api/orders/{}/status", id_of(&confirmed)),
            ADMIN_TOKEN,
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .delete(&format!("/api/orders/{}", id_of(&confirmed)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .delete(&format!("/api/orders/{}", id_of(&pending)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app.get(&format!("/api/orders/{}", id_of(&pending)), ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_replaces_items_and_totals() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let order = app.create_order(&c.store_id, &c.bread_id, 4, None).await;
    assert_eq!(dec(&order["total_eur"]), Decimal::from(2));

    let response = app
        .put(
            &format!("/api/orders/{}", id_of(&order)),
            ADMIN_TOKEN,
            json!({"items": [{"product_id": c.cake_id, "quantity": 4}]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(dec(&response.body["total_eur"]), Decimal::from(9));
    assert_eq!(dec(&response.body["total_syp"]), Decimal::from(120_000));
}

#[tokio::test]
async fn test_summary() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let delivered_later = app.create_order(&c.store_id, &c.bread_id, 10, None).await;
    app.create_order(&c.store_id, &c.cake_id, 2, None).await;
    let cancelled = app.create_order(&c.store_id, &c.cake_id, 100, None).await;

    let response = app
        .patch(
            &format!("/api/orders/{}/status", id_of(&cancelled)),
            ADMIN_TOKEN,
            json!({"status": "cancelled", "reason": "تكرار"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let distributor = app.create_distributor("سامي", "0944200003").await;
    assign(&app, &id_of(&delivered_later), &id_of(&distributor)).await;
    for status in ["in_delivery", "delivered"] {
        let response = app
            .patch(
                &format!("/api/orders/{}/status", id_of(&delivered_later)),
                ADMIN_TOKEN,
                json!({"status": status}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .get("/api/orders/summary?from=2024-06-01&to=2024-06-30", ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let summary = response.body;
    assert_eq!(summary["total_orders"], 3);
    // 10 x 0.5 + 2 x 2.25, the cancelled order excluded
    assert_eq!(dec(&summary["totals"]["eur"]), Decimal::new(95, 1));
    assert_eq!(dec(&summary["delivered"]["eur"]), Decimal::from(5));
    let count_of = |status: &str| {
        summary["by_status"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["status"] == status)
            .unwrap()["count"]
            .clone()
    };
    assert_eq!(count_of("cancelled"), 1);
    assert_eq!(count_of("delivered"), 1);
    assert_eq!(count_of("pending"), 1);

    let response = app.get("/api/orders/summary?from=2024-07-01", ADMIN_TOKEN).await;
    assert_eq!(response.body["total_orders"], 0);

    let response = app
        .get("/api/orders/summary?from=2024-06-30&to=2024-06-01", ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_cannot_overbook_distributor() {
    let app = setup_test_app().await;
    let c = catalogue(&app).await;
    let driver = app.create_user("مازن", "0944200004", "distributor", 1).await;
    let booked = app.create_order(&c.store_id, &c.bread_id, 2, None).await;
    let other = app.create_order(&c.store_id, &c.bread_id, 2, None).await;
    assign(&app, &id_of(&booked), &id_of(&driver)).await;

    let response = app
        .put(
            &format!("/api/orders/{}", id_of(&other)),
            ADMIN_TOKEN,
            json!({"distributor_id": id_of(&driver), "delivery_date": "2024-06-02"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT, "{}", response.body);
    let current = app.get(&format!("/api/orders/{}", id_of(&other)), ADMIN_TOKEN).await.body;
    assert!(current["distributor_id"].is_null());

    // Another day is free
    let response = app
        .put(
            &format!("/api/orders/{}", id_of(&other)),
            ADMIN_TOKEN,
            json!({"distributor_id": id_of(&driver), "delivery_date": "2024-06-03"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    // Moving it onto the booked day is refused as well
    let response = app
        .put(
            &format!("/api/orders/{}", id_of(&other)),
            ADMIN_TOKEN,
            json!({"delivery_date": "2024-06-02"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // The booked order itself does not count against its own slot
    let response = app
        .put(
            &format!("/api/orders/{}", id_of(&booked)),
            ADMIN_TOKEN,
            json!({"delivery_date": "2024-06-02", "notes": "باكراً"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
}
