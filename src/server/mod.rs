// Bull Registry - REST API with Axum
// Resource endpoints over the record store, JSON or form-encoded input.

pub mod error;
pub mod handlers;
pub mod params;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::db::SqliteBullStore;

pub use error::ApiError;
pub use params::{parse_bull_params, BullParams};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SqliteBullStore>>,
}

impl AppState {
    pub fn new(store: SqliteBullStore) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: &str) -> Self {
        self.notice = Some(notice.to_string());
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/bulls", get(handlers::index).post(handlers::create))
        .route("/bulls/new", get(handlers::new_bull))
        .route(
            "/bulls/:id",
            get(handlers::show)
                .patch(handlers::update)
                .put(handlers::update)
                .delete(handlers::destroy),
        )
        .route("/bulls/:id/edit", get(handlers::edit))
        .with_state(state)
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    response
}
