#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use product_grouping::{
    config::AppConfig,
    db,
    entities::{product_batch, BatchStatus},
    handlers::AppServices,
    repositories::ProductBatchRepository,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("grouping_test.db");
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // SQLite allows a single writer
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.grouping_enabled = false;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let state = AppState {
            db: db.clone(),
            config: cfg,
            services: AppServices::new(db, None),
            shutdown: CancellationToken::new(),
        };
        let router = product_grouping::app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
        }
    }

    pub fn batches(&self) -> ProductBatchRepository {
        ProductBatchRepository::new(self.state.db.clone())
    }

    /// Inserts one fresh batch and returns it.
    pub async fn seed_batch(&self, name: &str, price: Decimal, quantity: i32) -> product_batch::Model {
        let batch = new_batch(name, price, quantity);
        self.batches()
            .add_batches(vec![batch.clone()])
            .await
            .expect("failed to seed batch");
        batch
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(bytes) => {
                builder = builder.header("content-type", "text/plain; charset=utf-8");
                Body::from(bytes)
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<&str>) -> axum::response::Response {
        self.request(Method::POST, uri, body.map(|b| b.as_bytes().to_vec()))
            .await
    }
}

pub fn new_batch(name: &str, price: Decimal, quantity: i32) -> product_batch::Model {
    product_batch::Model {
        id: Uuid::new_v4(),
        name: name.to_string(),
        unit: "pcs".to_string(),
        unit_price: price,
        initial_quantity: quantity,
        remaining_quantity: quantity,
        status: BatchStatus::New,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// Reads the whole body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

/// Parses a decimal that the API rendered as a JSON string or number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("not a decimal string"),
        Value::Number(n) => n.to_string().parse().expect("not a decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
