// Authentication and role checks across the API

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{ADMIN_TOKEN, id_of, setup_test_app};

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app.request("GET", "/api/products", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "غير مصرح بالوصول");

    let response = app.get("/api/products", "not-a-real-token").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = setup_test_app().await;

    let response = app.request("GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"status": "ok", "database": "ok"}));
}

#[tokio::test]
async fn test_distributor_reads_but_cannot_write() {
    let app = setup_test_app().await;
    let distributor = app.create_distributor("سامر", "0944000001").await;
    let token = app.token_for(&id_of(&distributor)).await;

    let response = app.get("/api/products", &token).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post(
            "/api/products",
            &token,
            json!({"name": "خبز", "sku": "BRD-1", "price_eur": "1", "price_syp": "1000"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "ليس لديك صلاحية لتنفيذ هذا الإجراء");

    let response = app.get("/api/auto-scheduling/stats", &token).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_users_resource_is_admin_only() {
    let app = setup_test_app().await;
    let manager = app.create_user("ليلى", "0944000002", "manager", 30).await;
    let token = app.token_for(&id_of(&manager)).await;

    let response = app.get("/api/users", &token).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Managers are staff everywhere else
    let response = app
        .post(
            "/api/products",
            &token,
            json!({"name": "كعك", "sku": "CAKE-1", "price_eur": "2.5", "price_syp": "35000"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_token_rotation_revokes_previous_token() {
    let app = setup_test_app().await;
    let user = app.create_distributor("رامي", "0944000003").await;
    let user_id = id_of(&user);

    let first = app.token_for(&user_id).await;
    assert_eq!(app.get("/api/products", &first).await.status, StatusCode::OK);

    let second = app.token_for(&user_id).await;
    assert_ne!(first, second);
    assert_eq!(app.get("/api/products", &first).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/products", &second).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_responses_never_include_token() {
    let app = setup_test_app().await;
    let user = app.create_distributor("هادي", "0944000004").await;
    assert!(user.get("api_token").is_none());
    assert_eq!(user["role_label"], "موزع");

    let response = app.get(&format!("/api/users/{}", id_of(&user)), ADMIN_TOKEN).await;
    assert!(response.body.get("api_token").is_none());
}

#[tokio::test]
async fn test_deactivated_user_is_locked_out() {
    let app = setup_test_app().await;
    let user = app.create_distributor("وسيم", "0944000005").await;
    let user_id = id_of(&user);
    let token = app.token_for(&user_id).await;

    let response = app
        .put(&format!("/api/users/{user_id}"), ADMIN_TOKEN, json!({"is_active": false}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(app.get("/api/products", &token).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_phone_conflicts() {
    let app = setup_test_app().await;
    app.create_distributor("أحمد", "0944000006").await;

    let response = app
        .post(
            "/api/users",
            ADMIN_TOKEN,
            json!({"name": "محمود", "phone": "0944000006", "role": "distributor"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "رقم الهاتف مستخدم مسبقاً");
}
