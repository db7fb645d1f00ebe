//! Database operations for `stores`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `stores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRow {
    pub store_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoreRow> for pricewatch_core::Store {
    fn from(row: StoreRow) -> Self {
        Self {
            store_id: row.store_id,
            name: row.name,
            url: row.url,
        }
    }
}

/// Input filters for store listing.
#[derive(Debug, Clone, Default)]
pub struct StoreListFilters<'a> {
    /// Case-insensitive substring match on `name`.
    pub name: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Inserts a store with a freshly generated UUID v7 id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_store(pool: &PgPool, name: &str, url: &str) -> Result<StoreRow, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "INSERT INTO stores (store_id, name, url) \
         VALUES ($1, $2, $3) \
         RETURNING store_id, name, url, created_at",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a store by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_store(pool: &PgPool, store_id: Uuid) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "SELECT store_id, name, url, created_at FROM stores WHERE store_id = $1",
    )
    .bind(store_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces a store's `name` and `url`. Returns `None` when the store does
/// not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_store(
    pool: &PgPool,
    store_id: Uuid,
    name: &str,
    url: &str,
) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "UPDATE stores SET name = $2, url = $3 \
         WHERE store_id = $1 \
         RETURNING store_id, name, url, created_at",
    )
    .bind(store_id)
    .bind(name)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns one page of stores plus the total number of matching rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_stores(
    pool: &PgPool,
    filters: StoreListFilters<'_>,
) -> Result<(Vec<StoreRow>, i64), DbError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM stores \
         WHERE ($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0)",
    )
    .bind(filters.name)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, StoreRow>(
        "SELECT store_id, name, url, created_at FROM stores \
         WHERE ($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0) \
         ORDER BY store_id \
         LIMIT $2 OFFSET $3",
    )
    .bind(filters.name)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}
