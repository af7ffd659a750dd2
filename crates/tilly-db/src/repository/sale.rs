//! # Sale Repository
//!
//! Database operations for sale headers and line items.
//!
//! Mutating methods take a `SqliteConnection` so the SaleManager can run
//! them inside one transaction per lifecycle operation; read methods work
//! directly against the pool.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tilly_core::{Sale, SaleItem};

/// Prefix of every generated sale number.
const SALE_NUMBER_PREFIX: &str = "SALE";

/// A line item joined with its product summary, as returned to callers
/// listing sales.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleItemDetail {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

/// A sale header with its nested line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads (pool)
    // -------------------------------------------------------------------------

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, sale_number, customer_name, customer_contact,
                   total_amount_cents, payment_method, payment_status,
                   notes, sale_date, created_at, updated_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents,
                   total_price_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists all sales ordered by sale date, newest first, with nested
    /// items and product summaries.
    pub async fn list_recent(&self) -> DbResult<Vec<SaleWithItems>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, sale_number, customer_name, customer_contact,
                   total_amount_cents, payment_method, payment_status,
                   notes, sale_date, created_at, updated_at
            FROM sales
            ORDER BY sale_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let details = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.id, si.sale_id, si.product_id,
                   p.name AS product_name, p.sku AS product_sku,
                   si.quantity, si.unit_price_cents, si.total_price_cents
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            ORDER BY si.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_sale: HashMap<String, Vec<SaleItemDetail>> = HashMap::new();
        for detail in details {
            by_sale.entry(detail.sale_id.clone()).or_default().push(detail);
        }

        let result = sales
            .into_iter()
            .map(|sale| {
                let items = by_sale.remove(&sale.id).unwrap_or_default();
                SaleWithItems { sale, items }
            })
            .collect();

        debug!("Listed recent sales");
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Writes (connection, transactional)
    // -------------------------------------------------------------------------

    /// Loads a sale inside a transaction.
    pub async fn load(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, sale_number, customer_name, customer_contact,
                   total_amount_cents, payment_method, payment_status,
                   notes, sale_date, created_at, updated_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Loads a sale's items inside a transaction.
    pub async fn load_items(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents,
                   total_price_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Inserts a sale header.
    pub async fn insert(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, customer_name, customer_contact,
                total_amount_cents, payment_method, payment_status,
                notes, sale_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.sale_number)
        .bind(&sale.customer_name)
        .bind(&sale.customer_contact)
        .bind(sale.total_amount_cents)
        .bind(sale.payment_method)
        .bind(sale.payment_status)
        .bind(&sale.notes)
        .bind(sale.sale_date)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Updates the mutable header fields of an existing sale.
    ///
    /// Sale number, payment status, and sale date are deliberately not
    /// touched: they survive edits.
    pub async fn update_header(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_name = ?2,
                customer_contact = ?3,
                payment_method = ?4,
                notes = ?5,
                total_amount_cents = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_name)
        .bind(&sale.customer_contact)
        .bind(sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.total_amount_cents)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    /// Deletes a sale header.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Inserts a sale line item.
    ///
    /// ## Snapshot Pattern
    /// The unit price is copied from the cart line, which froze it when the
    /// product was staged. Later product price changes do not affect it.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Inserting sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity,
                unit_price_cents, total_price_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes all items for a sale (used by edit and delete).
    pub async fn delete_items(&self, conn: &mut SqliteConnection, sale_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Allocates the next sale number for the given day.
    ///
    /// ## Format
    /// `SALE-YYYYMMDD-NNNN` where NNNN is a monotonic per-day sequence.
    ///
    /// The sequence is derived from the highest existing number sharing the
    /// day prefix, inside the caller's transaction; the UNIQUE constraint
    /// on `sales.sale_number` backs it and the manager retries allocation
    /// on a collision.
    pub async fn next_sale_number(
        &self,
        conn: &mut SqliteConnection,
        date: DateTime<Utc>,
    ) -> DbResult<String> {
        let prefix = format!("{}-{}-", SALE_NUMBER_PREFIX, date.format("%Y%m%d"));
        let pattern = format!("{prefix}%");

        let last: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sale_number FROM sales
            WHERE sale_number LIKE ?1
            ORDER BY sale_number DESC
            LIMIT 1
            "#,
        )
        .bind(&pattern)
        .fetch_optional(&mut *conn)
        .await?;

        let next = last
            .and_then(|number| number.rsplit('-').next()?.parse::<u32>().ok())
            .map_or(1, |seq| seq + 1);

        Ok(format!("{prefix}{next:04}"))
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
