#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tutuplapak_api::{
    config::AppConfig,
    db,
    entities::{file, payment_detail, product, product_category, purchase, user},
    events::{self, EventSender},
    AppState,
};

/// Application harness backed by a file SQLite database in a temp dir.
/// The pool holds a single connection, so transactions run one at a time.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("tutuplapak_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = tutuplapak_api::app_router(state.clone()).expect("build test router");

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Send a request against the full router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// POST a JSON body and return the status with the decoded response.
    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self.request(Method::POST, uri, Some(body)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn seed_seller(&self, name: &str, account_number: &str) -> user::Model {
        user::ActiveModel {
            name: Set(name.to_string()),
            email: Set(Some(format!("{}@seller.id", name.to_lowercase()))),
            phone: Set(None),
            bank_account_name: Set("BCA".to_string()),
            bank_account_holder: Set(name.to_string()),
            bank_account_number: Set(account_number.to_string()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed seller")
    }

    pub async fn seed_category(&self, name: &str) -> product_category::Model {
        product_category::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed category")
    }

    pub async fn seed_file(&self, owner_id: i32) -> file::Model {
        file::ActiveModel {
            user_id: Set(owner_id),
            file_uri: Set("https://cdn.tutuplapak.id/files/proof.jpg".to_string()),
            file_thumbnail_uri: Set("https://cdn.tutuplapak.id/files/proof_thumb.jpg".to_string()),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed file")
    }

    pub async fn seed_product(
        &self,
        seller_id: i32,
        category_id: i32,
        sku: &str,
        price: &str,
        qty: i32,
    ) -> product::Model {
        product::ActiveModel {
            user_id: Set(seller_id),
            name: Set(format!("Product {}", sku)),
            sku: Set(sku.to_string()),
            category_id: Set(category_id),
            qty: Set(qty),
            price: Set(price.to_string()),
            file_id: Set(None),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product")
    }

    pub async fn product(&self, id: i32) -> product::Model {
        product::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load product")
            .expect("product exists")
    }

    pub async fn set_price(&self, id: i32, price: &str) {
        let mut model: product::ActiveModel = self.product(id).await.into();
        model.price = Set(price.to_string());
        model
            .update(self.state.db.as_ref())
            .await
            .expect("update product price");
    }

    pub async fn set_qty(&self, id: i32, qty: i32) {
        let mut model: product::ActiveModel = self.product(id).await.into();
        model.qty = Set(qty);
        model
            .update(self.state.db.as_ref())
            .await
            .expect("update product stock");
    }

    pub async fn purchase(&self, id: i32) -> purchase::Model {
        purchase::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load purchase")
            .expect("purchase exists")
    }

    pub async fn payment_details(&self, purchase_id: i32) -> Vec<payment_detail::Model> {
        payment_detail::Entity::find()
            .filter(payment_detail::Column::PurchaseId.eq(purchase_id))
            .all(self.state.db.as_ref())
            .await
            .expect("load payment details")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Standard purchase body for a set of `(product_id, qty)` lines.
pub fn purchase_body(lines: &[(i32, i64)]) -> Value {
    serde_json::json!({
        "purchasedItems": lines
            .iter()
            .map(|(product_id, qty)| serde_json::json!({
                "productId": product_id.to_string(),
                "qty": qty,
            }))
            .collect::<Vec<_>>(),
        "senderName": "Budi Santoso",
        "senderContactType": "phone",
        "senderContactDetail": "+6281234567890",
    })
}
