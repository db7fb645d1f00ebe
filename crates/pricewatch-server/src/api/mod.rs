mod prices;
mod products;
mod stores;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{request_id, RequestId};

pub const DEFAULT_PAGE_NUMBER: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }

    pub(super) fn not_found(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "not_found", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(super) struct PageQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PageRequest {
    pub page_number: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub(super) fn from_query(request_id: &str, query: PageQuery) -> Result<Self, ApiError> {
        let page_number = query.page_number.unwrap_or(DEFAULT_PAGE_NUMBER);
        if page_number < 1 {
            return Err(ApiError::validation(
                request_id,
                format!("page_number must be at least 1, got {page_number}"),
            ));
        }

        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::validation(
                request_id,
                format!("page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            ));
        }

        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub(super) fn offset(self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_count: i64,
}

impl<T: Serialize> Page<T> {
    pub(super) fn new(items: Vec<T>, total_count: i64, page: PageRequest) -> Self {
        let total_pages = (total_count + page.page_size - 1) / page.page_size;
        Self {
            items,
            page_number: page.page_number,
            page_size: page.page_size,
            total_pages,
            total_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction and validation helpers
// ---------------------------------------------------------------------------

pub(super) fn json_body<T>(
    request_id: &str,
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(request_id, rejection.body_text()))
}

pub(super) fn query_params<T>(
    request_id: &str,
    query: Result<axum::extract::Query<T>, QueryRejection>,
) -> Result<T, ApiError> {
    query
        .map(|axum::extract::Query(value)| value)
        .map_err(|rejection| ApiError::validation(request_id, rejection.body_text()))
}

pub(super) fn parse_id(request_id: &str, field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::validation(request_id, format!("'{field}' must be a UUID, got '{raw}'"))
    })
}

/// Validates an absolute http(s) URL of at most `max_len` characters.
pub(super) fn validate_url(
    request_id: &str,
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<(), ApiError> {
    if value.chars().count() > max_len {
        return Err(ApiError::validation(
            request_id,
            format!("'{field}' must be at most {max_len} characters"),
        ));
    }
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ApiError::validation(
            request_id,
            format!("'{field}' must be a valid URL, got '{value}'"),
        )),
    }
}

/// Trims `value` and checks it is 1..=`max_len` characters.
pub(super) fn validate_name(
    request_id: &str,
    value: &str,
    max_len: usize,
) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > max_len {
        return Err(ApiError::validation(
            request_id,
            format!("name must be 1-{max_len} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn map_db_error(request_id: String, error: &pricewatch_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/stores",
            get(stores::list_stores).post(stores::create_store),
        )
        .route(
            "/api/v1/stores/{store_id}",
            get(stores::get_store).put(stores::update_store),
        )
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/products/{product_id}",
            get(products::get_product).put(products::update_product),
        )
        .route(
            "/api/v1/products/{product_id}/prices",
            get(prices::list_prices).post(prices::add_price),
        )
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn not_found(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::not_found(&req_id.0, "resource not found")
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pricewatch_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
