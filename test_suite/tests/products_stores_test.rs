// Product and store catalogue: validation, uniqueness, listing and deletion rules

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

mod common;
use common::{ADMIN_TOKEN, dec, encode, id_of, setup_test_app};

#[tokio::test]
async fn test_create_product_normalizes_sku() {
    let app = setup_test_app().await;
    let product = app.create_product("خبز عربي", " brd-01 ", "0.5", "7500").await;

    assert_eq!(product["sku"], "BRD-01");
    assert_eq!(product["is_active"], true);
    assert_eq!(dec(&product["price_eur"]), Decimal::new(5, 1));
    assert_eq!(dec(&product["price_syp"]), Decimal::from(7500));
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .post(
            "/api/products",
            ADMIN_TOKEN,
            json!({"name": "كعك", "sku": "CAKE-1", "price_eur": "-1", "price_syp": "1000"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "السعر يجب ألا يكون سالباً");
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let app = setup_test_app().await;
    app.create_product("كرواسون", "CRS-1", "1", "15000").await;

    let response = app
        .post(
            "/api/products",
            ADMIN_TOKEN,
            json!({"name": "كرواسون بالشوكولا", "sku": "crs-1", "price_eur": "1.5", "price_syp": "20000"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "رمز المنتج مستخدم مسبقاً");
}

#[tokio::test]
async fn test_product_update_and_unknown_id() {
    let app = setup_test_app().await;
    let product = app.create_product("معمول", "MAM-1", "2", "30000").await;
    let url = format!("/api/products/{}", id_of(&product));

    let response = app.put(&url, ADMIN_TOKEN, json!({"price_eur": "2.25"})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(dec(&response.body["price_eur"]), Decimal::new(225, 2));
    assert_eq!(dec(&response.body["price_syp"]), Decimal::from(30000));

    let response = app
        .get(&format!("/api/products/{}", uuid::Uuid::new_v4()), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_paginates_and_filters() {
    let app = setup_test_app().await;
    app.create_product("خبز", "BRD-1", "0.5", "7500").await;
    app.create_product("خبز أسمر", "BRD-2", "0.75", "10000").await;
    app.create_product("كعك", "CAKE-1", "3", "45000").await;

    let uri = format!(
        "/api/products?range={}&sort={}",
        encode("[0,1]"),
        encode(r#"["sku","ASC"]"#)
    );
    let response = app.get(&uri, ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 2);
    assert_eq!(response.body[0]["sku"], "BRD-1");
    assert_eq!(response.headers.get("content-range").unwrap(), "products 0-1/3");
    assert_eq!(response.headers.get("x-total-count").unwrap(), "3");

    // A page wider than the table ends at the last row
    let uri = format!("/api/products?range={}", encode("[0,9]"));
    let response = app.get(&uri, ADMIN_TOKEN).await;
    assert_eq!(response.body.as_array().unwrap().len(), 3);
    assert_eq!(response.headers.get("content-range").unwrap(), "products 0-2/3");

    let uri = format!("/api/products?range={}", encode("[10,19]"));
    let response = app.get(&uri, ADMIN_TOKEN).await;
    assert_eq!(response.body.as_array().unwrap().len(), 0);
    assert_eq!(response.headers.get("content-range").unwrap(), "products */3");

    let uri = format!("/api/products?filter={}", encode(r#"{"q":"brd"}"#));
    let response = app.get(&uri, ADMIN_TOKEN).await;
    assert_eq!(response.body.as_array().unwrap().len(), 2);

    let uri = format!("/api/products?filter={}", encode(r#"{"sku":"CAKE-1"}"#));
    let response = app.get(&uri, ADMIN_TOKEN).await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);
    assert_eq!(response.body[0]["name"], "كعك");
}

#[tokio::test]
async fn test_store_requires_name_and_area() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/stores", ADMIN_TOKEN, json!({"name": "  ", "area": "المزة"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "اسم المتجر مطلوب");

    let response = app
        .post("/api/stores", ADMIN_TOKEN, json!({"name": "", "area": ""}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errors"].as_array().unwrap().len(), 2);

    let store = app.create_store("بقالية الشام", "كفرسوسة").await;
    assert_eq!(store["area"], "كفرسوسة");
    assert_eq!(store["is_active"], true);
}

#[tokio::test]
async fn test_referenced_product_and_store_cannot_be_deleted() {
    let app = setup_test_app().await;
    let product = app.create_product("خبز", "BRD-1", "0.5", "7500").await;
    let store = app.create_store("بقالية النور", "المزة").await;
    app.create_order(&id_of(&store), &id_of(&product), 10, None).await;

    let response = app
        .delete(&format!("/api/products/{}", id_of(&product)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .delete(&format!("/api/stores/{}", id_of(&store)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Unreferenced rows delete cleanly
    let spare = app.create_product("كعك", "CAKE-1", "3", "45000").await;
    let response = app
        .delete(&format!("/api/products/{}", id_of(&spare)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app
        .get(&format!("/api/products/{}", id_of(&spare)), ADMIN_TOKEN)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
