//! # Product Repository
//!
//! Database operations for the product catalog, including the Stock Ledger
//! primitive that all sale operations go through.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write from the caller (lost-update race)        │
//! │     q = SELECT quantity ...; UPDATE ... SET quantity = q - 3           │
//! │                                                                         │
//! │  ✅ CORRECT: single conditional delta update                           │
//! │     UPDATE products SET quantity = quantity + ?delta                   │
//! │     WHERE id = ? AND quantity + ?delta >= 0                            │
//! │                                                                         │
//! │  Two concurrent sales against the same product each apply their own    │
//! │  delta; one that would drive the count negative affects zero rows and  │
//! │  fails its transaction instead of corrupting stock.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tilly_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products available for sale: quantity > 0, ordered by name.
    pub async fn list_available(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_name, quantity, unit_price_cents,
                   reorder_level, created_at, updated_at
            FROM products
            WHERE quantity > 0
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed available products");
        Ok(products)
    }

    /// Lists products at or below their reorder level, lowest stock first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_name, quantity, unit_price_cents,
                   reorder_level, created_at, updated_at
            FROM products
            WHERE quantity <= reorder_level
            ORDER BY quantity, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_name, quantity, unit_price_cents,
                   reorder_level, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_name, quantity, unit_price_cents,
                   reorder_level, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category_name, quantity, unit_price_cents,
                reorder_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_name)
        .bind(product.quantity)
        .bind(product.unit_price_cents)
        .bind(product.reorder_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a signed stock delta atomically (the Stock Ledger mutation).
    ///
    /// Takes a connection rather than the pool so the caller can run it
    /// inside the same transaction as the rest of a sale operation.
    ///
    /// ## Arguments
    /// * `delta` - Negative for sales, positive for restorations
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product
    /// * `Err(DbError::InsufficientStock)` - Delta would drive quantity
    ///   negative; the row is left untouched
    pub async fn apply_delta(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id = %product_id, delta = %delta, "Applying stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?2,
                updated_at = ?3
            WHERE id = ?1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Zero rows is either a missing product or an underflow refusal.
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            return Err(match available {
                None => DbError::not_found("Product", product_id),
                Some(quantity) => DbError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available: quantity,
                    requested: -delta,
                },
            });
        }

        Ok(())
    }

    /// Counts products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
