// REST API
// Thin axum layer over `dyn Ledger`: decode, validate, call, encode.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::model::{NewOrder, NewProduct, Order, Product, ProductId};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }
}

// ============================================================================
// Errors → HTTP
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),

    /// Body or path could not be decoded
    Rejected { status: StatusCode, message: String },

    /// Worker task failed before producing a result
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Ledger(LedgerError::ProductNotFound(_)) => {
                detail(StatusCode::NOT_FOUND, "Product not found")
            }
            ApiError::Ledger(LedgerError::InsufficientStock { .. }) => {
                detail(StatusCode::BAD_REQUEST, "Not enough quantity available")
            }
            ApiError::Ledger(LedgerError::Validation(msg)) => {
                detail(StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            ApiError::Ledger(e) => {
                error!(error = %e, "ledger failure");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            ApiError::Rejected { status, message } => detail(status, message),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request task failed");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// Extractors wrapped in Result so decode failures answer with `{"detail": ..}`
type JsonBody<T> = Result<Json<T>, JsonRejection>;
type IdPath = Result<Path<ProductId>, PathRejection>;

/// Ledger calls may block on SQLite; keep them off the async workers
async fn with_ledger<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn Ledger) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    let result = tokio::task::spawn_blocking(move || f(ledger.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(result?)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "store": state.ledger.kind() }))
}

/// GET /products/
async fn list_products(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    with_ledger(&state, |ledger| ledger.list_products()).await.map(Json)
}

/// GET /products/:id
async fn get_product(State(state): State<AppState>, id: IdPath) -> ApiResult<Product> {
    let Path(id) = id?;
    with_ledger(&state, move |ledger| ledger.get_product(id)).await.map(Json)
}

/// POST /products/
async fn add_product(
    State(state): State<AppState>,
    body: JsonBody<NewProduct>,
) -> ApiResult<Product> {
    let Json(product) = body?;
    with_ledger(&state, move |ledger| ledger.add_product(product)).await.map(Json)
}

/// PUT /products/:id - full replacement
async fn update_product(
    State(state): State<AppState>,
    id: IdPath,
    body: JsonBody<NewProduct>,
) -> ApiResult<Product> {
    let Path(id) = id?;
    let Json(product) = body?;
    with_ledger(&state, move |ledger| ledger.update_product(id, product))
        .await
        .map(Json)
}

/// DELETE /products/:id
async fn delete_product(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<serde_json::Value> {
    let Path(id) = id?;
    with_ledger(&state, move |ledger| ledger.delete_product(id)).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// POST /orders/
async fn place_order(
    State(state): State<AppState>,
    body: JsonBody<NewOrder>,
) -> ApiResult<Order> {
    let Json(order) = body?;
    with_ledger(&state, move |ledger| ledger.place_order(order)).await.map(Json)
}

/// GET /orders/
async fn list_orders(State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    with_ledger(&state, |ledger| ledger.list_orders()).await.map(Json)
}

/// GET /admin-dashboard
async fn admin_dashboard() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the Admin Dashboard. You can manage products and orders here."
    }))
}

// ============================================================================
// Router
// ============================================================================

/// Build the full router; the admin dashboard exists only for the memory store
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/products", get(list_products).post(add_product))
        .route("/products/", get(list_products).post(add_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/", get(list_orders).post(place_order));

    if state.ledger.kind() == "memory" {
        router = router.route("/admin-dashboard", get(admin_dashboard));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
