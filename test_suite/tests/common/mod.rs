#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bakery::scheduling::SuggestionSource;
use bakery::{AppState, Config, Migrator};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

fn test_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect(&test_database_url())
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

fn test_config() -> Config {
    Config {
        database_url: test_database_url(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..Config::default()
    }
}

pub async fn setup_test_app() -> TestApp {
    let db = setup_test_db().await;
    let state = AppState::new(db.clone(), test_config()).expect("Failed to build state");
    TestApp {
        app: bakery::app(state),
        db,
    }
}

pub async fn setup_test_app_with_scheduler(source: Arc<dyn SuggestionSource>) -> TestApp {
    let db = setup_test_db().await;
    let state = AppState::new(db.clone(), test_config())
        .expect("Failed to build state")
        .with_scheduler(source);
    TestApp {
        app: bakery::app(state),
        db,
    }
}

/// Percent-encode a query value such as a JSON filter
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Decimals come back as JSON strings; compare them numerically
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("not a decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("not a decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        Response { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Response {
        self.request("PUT", uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Response {
        self.request("PATCH", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.request("DELETE", uri, Some(token), None).await
    }

    /// POST as admin and insist on 201
    async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.post(uri, ADMIN_TOKEN, body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "creating {uri} failed: {}",
            response.body
        );
        response.body
    }

    pub async fn create_user(&self, name: &str, phone: &str, role: &str, max_daily_orders: i32) -> Value {
        self.create(
            "/api/users",
            json!({
                "name": name,
                "phone": phone,
                "role": role,
                "working_area": "المزة",
                "max_daily_orders": max_daily_orders
            }),
        )
        .await
    }

    pub async fn create_distributor(&self, name: &str, phone: &str) -> Value {
        self.create_user(name, phone, "distributor", 30).await
    }

    /// Rotate the user's token and return the new one
    pub async fn token_for(&self, user_id: &str) -> String {
        let response = self
            .post(&format!("/api/users/{user_id}/token"), ADMIN_TOKEN, json!({}))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["api_token"].as_str().unwrap().to_string()
    }

    pub async fn create_product(&self, name: &str, sku: &str, price_eur: &str, price_syp: &str) -> Value {
        self.create(
            "/api/products",
            json!({
                "name": name,
                "sku": sku,
                "unit": "piece",
                "price_eur": price_eur,
                "price_syp": price_syp
            }),
        )
        .await
    }

    pub async fn create_store(&self, name: &str, area: &str) -> Value {
        self.create(
            "/api/stores",
            json!({
                "name": name,
                "owner_name": "أبو خالد",
                "phone": "+963 944 123456",
                "area": area
            }),
        )
        .await
    }

    /// A pending order for `quantity` units of one product
    pub async fn create_order(&self, store_id: &str, product_id: &str, quantity: i32, delivery_date: Option<&str>) -> Value {
        self.create(
            "/api/orders",
            json!({
                "store_id": store_id,
                "order_date": "2024-06-01",
                "delivery_date": delivery_date,
                "items": [{"product_id": product_id, "quantity": quantity}]
            }),
        )
        .await
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("missing id").to_string()
}
