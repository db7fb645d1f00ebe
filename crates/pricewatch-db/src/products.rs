//! Database operations for `products`.
//!
//! The cached pricing columns (`current_price`, `price_change_percentage`,
//! `last_updated`) are never written here; see
//! [`record_price`](crate::price_histories::record_price).

use chrono::{DateTime, Utc};
use pricewatch_core::{Currency, Product};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "product_id, store_id, name, url, currency, current_price, \
                               price_change_percentage, last_updated, created_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub url: String,
    /// `'PEN'` or `'USD'`, enforced by a CHECK constraint.
    pub currency: String,
    pub current_price: Option<Decimal>,
    pub price_change_percentage: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency = row
            .currency
            .parse::<Currency>()
            .map_err(|_| DbError::InvalidColumn {
                column: "products.currency",
                value: row.currency.clone(),
            })?;

        Ok(Product {
            product_id: row.product_id,
            store_id: row.store_id,
            name: row.name,
            url: row.url,
            currency,
            current_price: row.current_price,
            price_change_percentage: row.price_change_percentage,
            last_updated: row.last_updated,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub store_id: Uuid,
    pub name: &'a str,
    pub url: &'a str,
    pub currency: Currency,
}

/// Editable product fields. Pricing fields are deliberately absent.
#[derive(Debug, Clone)]
pub struct ProductUpdate<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub currency: Currency,
}

/// Input filters for product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductListFilters<'a> {
    /// Case-insensitive substring match on `name`.
    pub name: Option<&'a str>,
    pub store_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Inserts a product with empty pricing fields.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a foreign-key
/// violation when `store_id` does not exist.
pub async fn insert_product(pool: &PgPool, product: &NewProduct<'_>) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (product_id, store_id, name, url, currency) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(Uuid::now_v7())
    .bind(product.store_id)
    .bind(product.name)
    .bind(product.url)
    .bind(product.currency.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a product by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, product_id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Updates a product's descriptive fields. Returns `None` when the product
/// does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    product_id: Uuid,
    update: &ProductUpdate<'_>,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET name = $2, url = $3, currency = $4 \
         WHERE product_id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(update.name)
    .bind(update.url)
    .bind(update.currency.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns one page of products plus the total number of matching rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: ProductListFilters<'_>,
) -> Result<(Vec<ProductRow>, i64), DbError> {
    let predicate = "($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0) \
                     AND ($2::UUID IS NULL OR store_id = $2)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {predicate}"))
        .bind(filters.name)
        .bind(filters.store_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE {predicate} \
         ORDER BY product_id \
         LIMIT $3 OFFSET $4"
    ))
    .bind(filters.name)
    .bind(filters.store_id)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}

/// Returns every tracked product in creation order.
///
/// Product ids are UUID v7, so ordering by id is ordering by insertion time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY product_id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
