//! Price-history handlers.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use pricewatch_core::{is_recordable_price, PriceHistory, MAX_PRICE};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::products::resolve_product;
use super::{
    json_body, map_db_error, parse_id, query_params, ApiError, ApiResponse, AppState, Page,
    PageQuery, PageRequest, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct AddPriceRequest {
    pub price: Decimal,
}

/// GET /api/v1/products/{product_id}/prices, newest first.
pub(super) async fn list_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<PriceHistory>>>, ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, "product_id", &raw_id)?;
    let page = PageRequest::from_query(rid, query_params(rid, query)?)?;
    resolve_product(&state, rid, product_id).await?;

    let (rows, total) = pricewatch_db::list_price_histories(
        &state.pool,
        product_id,
        page.page_size,
        page.offset(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let items = rows.into_iter().map(PriceHistory::from).collect();

    Ok(Json(ApiResponse {
        data: Page::new(items, total, page),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products/{product_id}/prices: records a price through the
/// same transactional path the scheduled refresh uses.
pub(super) async fn add_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
    body: Result<Json<AddPriceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PriceHistory>>), ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, "product_id", &raw_id)?;
    let body = json_body(rid, body)?;

    if !is_recordable_price(body.price) {
        return Err(ApiError::validation(
            rid,
            format!(
                "price must be greater than 0 and at most {MAX_PRICE}, got {}",
                body.price
            ),
        ));
    }

    let history = match pricewatch_db::record_price(&state.pool, product_id, body.price).await {
        Ok(row) => PriceHistory::from(row),
        Err(pricewatch_db::DbError::NotFound) => {
            return Err(ApiError::not_found(
                rid,
                format!("product {product_id} not found"),
            ));
        }
        Err(e @ pricewatch_db::DbError::PriceChange(_)) => {
            return Err(ApiError::validation(rid, e.to_string()));
        }
        Err(e) => return Err(map_db_error(rid.clone(), &e)),
    };

    tracing::info!(
        product_id = %product_id,
        price = %history.price,
        "price recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: history,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
