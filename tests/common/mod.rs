use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use stockroom_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::item,
    events::{self, EventSender},
    handlers::AppServices,
    services::items::NewItem,
    services::requests::NewRequest,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        // A single connection keeps every query on the same in-memory
        // database.
        let db_config = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route(
                "/health",
                axum::routing::get(stockroom_api::handlers::health::health),
            )
            .nest("/api/v1", stockroom_api::api_v1_routes())
            .layer(axum::middleware::from_fn(
                stockroom_api::middleware_helpers::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Sends a request to the in-process router.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should answer")
    }

    /// Seeds an item and returns the stored model.
    pub async fn seed_item(&self, name: &str, quantity: i32, unit_price: Decimal) -> item::Model {
        self.state
            .services
            .items
            .create_item(NewItem {
                item_name: name.to_string(),
                item_group: "G-1".to_string(),
                unit_of_measurement: "U-1".to_string(),
                quantity,
                price_without_vat: unit_price,
                status: "stocked".to_string(),
                storage_location: None,
                contact_person: None,
                photo_path: None,
            })
            .await
            .expect("seed item")
    }

    /// Seeds a standalone request for an item and returns its id.
    pub async fn seed_request(&self, item_id: i64, quantity: i32) -> i64 {
        self.state
            .services
            .requests
            .create_request(NewRequest {
                employee_id: 1,
                item_id,
                quantity,
                comment: String::new(),
            })
            .await
            .expect("seed request")
            .request_id
    }

    /// Current quantity on hand for an item.
    pub async fn item_quantity(&self, item_id: i64) -> i32 {
        self.state
            .services
            .items
            .get_item(item_id)
            .await
            .expect("item should exist")
            .quantity
    }
}

/// Parses a response body as JSON.
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
