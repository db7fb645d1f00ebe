//! Database operations for `price_histories`, including the transactional
//! recorder that keeps each product's cached pricing columns in step with its
//! newest history row.

use chrono::{DateTime, Utc};
use pricewatch_core::{price_change_percentage, PriceHistory, MAX_PRICE};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `price_histories` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub price_history_id: Uuid,
    pub product_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl From<PriceHistoryRow> for PriceHistory {
    fn from(row: PriceHistoryRow) -> Self {
        Self {
            price_history_id: row.price_history_id,
            product_id: row.product_id,
            timestamp: row.timestamp,
            price: row.price,
        }
    }
}

/// Records a newly observed price for a product.
///
/// Inside one transaction:
/// 1. locks the product row (`SELECT ... FOR UPDATE`) and reads its prior
///    `current_price`;
/// 2. appends a `price_histories` row stamped with the current time;
/// 3. sets `current_price`, `price_change_percentage` (see
///    [`price_change_percentage`]), and `last_updated` to the new row's
///    timestamp.
///
/// Any failure rolls the whole unit back, so a history row never exists
/// without the matching product update and vice versa.
///
/// # Errors
///
/// - [`DbError::NonPositivePrice`] if `price <= 0`; nothing is written.
/// - [`DbError::PriceTooLarge`] if `price` exceeds [`MAX_PRICE`]; nothing is written.
/// - [`DbError::NotFound`] if the product does not exist; nothing is written.
/// - [`DbError::PriceChange`] if the percent change overflows; the
///   transaction is rolled back.
/// - [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn record_price(
    pool: &PgPool,
    product_id: Uuid,
    price: Decimal,
) -> Result<PriceHistoryRow, DbError> {
    if price <= Decimal::ZERO {
        return Err(DbError::NonPositivePrice(price));
    }
    if price > MAX_PRICE {
        return Err(DbError::PriceTooLarge(price));
    }

    let mut tx = pool.begin().await?;

    let prior: Option<Decimal> = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT current_price FROM products WHERE product_id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let change = price_change_percentage(prior, price)?;

    let history = sqlx::query_as::<_, PriceHistoryRow>(
        "INSERT INTO price_histories (price_history_id, product_id, \"timestamp\", price) \
         VALUES ($1, $2, $3, $4) \
         RETURNING price_history_id, product_id, \"timestamp\", price",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(Utc::now())
    .bind(price)
    .fetch_one(&mut *tx)
    .await?;

    // Use the timestamp as stored (microsecond precision) so `last_updated`
    // compares equal to the history row.
    sqlx::query(
        "UPDATE products \
         SET current_price = $2, price_change_percentage = $3, last_updated = $4 \
         WHERE product_id = $1",
    )
    .bind(product_id)
    .bind(price)
    .bind(change)
    .bind(history.timestamp)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(history)
}

/// Returns one page of a product's price history, newest first, plus the
/// total number of rows for that product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_price_histories(
    pool: &PgPool,
    product_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PriceHistoryRow>, i64), DbError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM price_histories WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT price_history_id, product_id, \"timestamp\", price \
         FROM price_histories \
         WHERE product_id = $1 \
         ORDER BY \"timestamp\" DESC, price_history_id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}
