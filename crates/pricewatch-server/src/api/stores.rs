//! Store handlers: list, create, get, replace.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use pricewatch_core::Store;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{
    json_body, map_db_error, parse_id, query_params, validate_name, validate_url, ApiError,
    ApiResponse, AppState, Page, PageQuery, PageRequest, ResponseMeta,
};

const MAX_NAME_LEN: usize = 1024;
const MAX_URL_LEN: usize = 2048;

#[derive(Debug, Deserialize)]
pub(super) struct StoreQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StoreRequest {
    pub name: String,
    pub url: String,
}

impl StoreRequest {
    fn validate(self, request_id: &str) -> Result<Self, ApiError> {
        let name = validate_name(request_id, &self.name, MAX_NAME_LEN)?;
        let url = self.url.trim().to_owned();
        validate_url(request_id, "url", &url, MAX_URL_LEN)?;
        Ok(Self { name, url })
    }
}

/// GET /api/v1/stores
pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<StoreQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<Store>>>, ApiError> {
    let rid = &req_id.0;
    let query = query_params(rid, query)?;
    let page = PageRequest::from_query(
        rid,
        PageQuery {
            page_number: query.page_number,
            page_size: query.page_size,
        },
    )?;
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let (rows, total) = pricewatch_db::list_stores(
        &state.pool,
        pricewatch_db::StoreListFilters {
            name,
            limit: page.page_size,
            offset: page.offset(),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let items = rows.into_iter().map(Store::from).collect();

    Ok(Json(ApiResponse {
        data: Page::new(items, total, page),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/stores
pub(super) async fn create_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<StoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Store>>), ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?.validate(rid)?;

    let row = pricewatch_db::insert_store(&state.pool, &body.name, &body.url)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(store_id = %row.store_id, "store created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/stores/{store_id}
pub(super) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Store>>, ApiError> {
    let rid = &req_id.0;
    let store_id = parse_id(rid, "store_id", &raw_id)?;

    let row = pricewatch_db::get_store(&state.pool, store_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(rid, format!("store {store_id} not found")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/stores/{store_id}
pub(super) async fn update_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
    body: Result<Json<StoreRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Store>>, ApiError> {
    let rid = &req_id.0;
    let store_id = parse_id(rid, "store_id", &raw_id)?;
    let body = json_body(rid, body)?.validate(rid)?;

    let row = pricewatch_db::update_store(&state.pool, store_id, &body.name, &body.url)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(rid, format!("store {store_id} not found")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
