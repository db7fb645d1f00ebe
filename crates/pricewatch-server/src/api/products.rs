//! Product handlers: list, create, get, replace.
//!
//! Cached pricing fields are read-only here; they only change through
//! `POST /api/v1/products/{product_id}/prices`.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use pricewatch_core::{Currency, Product};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    json_body, map_db_error, parse_id, query_params, validate_name, validate_url, ApiError,
    ApiResponse, AppState, Page, PageQuery, PageRequest, ResponseMeta,
};

const MAX_NAME_LEN: usize = 1024;
const MAX_URL_LEN: usize = 2048;

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub name: Option<String>,
    pub store_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub store_id: Uuid,
    pub name: String,
    pub url: String,
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: String,
    pub url: String,
    pub currency: Currency,
}

fn validate_fields(request_id: &str, name: &str, url: &str) -> Result<(String, String), ApiError> {
    let name = validate_name(request_id, name, MAX_NAME_LEN)?;
    let url = url.trim().to_owned();
    validate_url(request_id, "url", &url, MAX_URL_LEN)?;
    Ok((name, url))
}

pub(super) fn product_from_row(
    request_id: &str,
    row: pricewatch_db::ProductRow,
) -> Result<Product, ApiError> {
    Product::try_from(row).map_err(|e| map_db_error(request_id.to_owned(), &e))
}

/// Resolves a product or returns a 404 envelope.
pub(super) async fn resolve_product(
    state: &AppState,
    request_id: &str,
    product_id: Uuid,
) -> Result<pricewatch_db::ProductRow, ApiError> {
    pricewatch_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::not_found(request_id, format!("product {product_id} not found")))
}

/// GET /api/v1/products
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<Product>>>, ApiError> {
    let rid = &req_id.0;
    let query = query_params(rid, query)?;
    let page = PageRequest::from_query(
        rid,
        PageQuery {
            page_number: query.page_number,
            page_size: query.page_size,
        },
    )?;
    let store_id = query
        .store_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|raw| parse_id(rid, "store_id", raw))
        .transpose()?;
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let (rows, total) = pricewatch_db::list_products(
        &state.pool,
        pricewatch_db::ProductListFilters {
            name,
            store_id,
            limit: page.page_size,
            offset: page.offset(),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let items = rows
        .into_iter()
        .map(|row| product_from_row(rid, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse {
        data: Page::new(items, total, page),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?;
    let (name, url) = validate_fields(rid, &body.name, &body.url)?;

    let store_exists = pricewatch_db::get_store(&state.pool, body.store_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .is_some();
    if !store_exists {
        return Err(ApiError::not_found(
            rid,
            format!("store {} not found", body.store_id),
        ));
    }

    let row = pricewatch_db::insert_product(
        &state.pool,
        &pricewatch_db::NewProduct {
            store_id: body.store_id,
            name: &name,
            url: &url,
            currency: body.currency,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = %row.product_id, store_id = %row.store_id, "product created");
    let product = product_from_row(rid, row)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: product,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/products/{product_id}
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, "product_id", &raw_id)?;
    let product = product_from_row(rid, resolve_product(&state, rid, product_id).await?)?;

    Ok(Json(ApiResponse {
        data: product,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/products/{product_id}
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, "product_id", &raw_id)?;
    let body = json_body(rid, body)?;
    let (name, url) = validate_fields(rid, &body.name, &body.url)?;

    let row = pricewatch_db::update_product(
        &state.pool,
        product_id,
        &pricewatch_db::ProductUpdate {
            name: &name,
            url: &url,
            currency: body.currency,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?
    .ok_or_else(|| ApiError::not_found(rid, format!("product {product_id} not found")))?;
    let product = product_from_row(rid, row)?;

    Ok(Json(ApiResponse {
        data: product,
        meta: ResponseMeta::new(req_id.0),
    }))
}
