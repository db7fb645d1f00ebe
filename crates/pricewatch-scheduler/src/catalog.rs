//! Postgres-backed [`ProductCatalog`].

use async_trait::async_trait;
use pricewatch_core::{PriceHistory, Product};
use pricewatch_db::DbError;
use pricewatch_scraper::{CatalogError, ProductCatalog};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: DbError) -> CatalogError {
    CatalogError::Backend(Box::new(e))
}

#[async_trait]
impl ProductCatalog for PgCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        pricewatch_db::list_all_products(&self.pool)
            .await
            .map_err(backend)?
            .into_iter()
            .map(|row| Product::try_from(row).map_err(backend))
            .collect()
    }

    async fn record_price(
        &self,
        product_id: Uuid,
        price: Decimal,
    ) -> Result<PriceHistory, CatalogError> {
        match pricewatch_db::record_price(&self.pool, product_id, price).await {
            Ok(row) => Ok(row.into()),
            Err(DbError::NotFound) => Err(CatalogError::ProductNotFound(product_id)),
            Err(e) => Err(backend(e)),
        }
    }
}
