//! # Sale Transaction Manager
//!
//! Orchestrates the sale lifecycle: create, edit, delete. Each operation
//! runs inside a single SQLite transaction, so a failure at any step rolls
//! back every side effect.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart ──► empty? reject ──► BEGIN                                       │
//! │            ├─ allocate sale number (per-day sequence)                   │
//! │            ├─ insert sale header                                        │
//! │            ├─ per line: insert item, stock -= qty, append out movement  │
//! │            ├─ append ledger entry (sale total)                          │
//! │            └─ COMMIT ── any step fails → ROLLBACK, nothing persisted    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edit restores the stock held by the current item set, replaces the items
//! wholesale from the new cart, and swaps the ledger entry. Delete restores
//! stock, appends compensating `in` movements, and removes the sale, its
//! items, and its ledger entry.

use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, SaleError, SaleResult};
use crate::pool::Database;
use crate::repository::ledger::build_sale_entry;
use crate::repository::movement::build_movement;
use crate::repository::sale::{generate_sale_id, generate_sale_item_id};
use tilly_core::{
    Cart, PaymentMethod, PaymentStatus, ReferenceType, Sale, SaleItem, ValidationError,
};

/// How many times sale-number allocation is retried on a collision before
/// giving up. Collisions need two creates racing on the same day sequence,
/// so one retry almost always suffices.
const MAX_SALE_NUMBER_ATTEMPTS: u32 = 5;

/// Header fields supplied by the caller when creating or editing a sale.
#[derive(Debug, Clone, Default)]
pub struct SaleMeta {
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Actor identity, or None when unauthenticated.
    pub created_by: Option<String>,
}

/// Coordinates the sale lifecycle against the repositories.
///
/// ## Usage
/// ```rust,ignore
/// let manager = db.sale_manager();
/// let sale = manager.create(&cart, SaleMeta::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleManager {
    db: Database,
}

impl SaleManager {
    /// Creates a new SaleManager over the given database handle.
    pub fn new(db: Database) -> Self {
        SaleManager { db }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Commits a cart as a new sale.
    ///
    /// ## Effects (all-or-nothing)
    /// - Sale header with a fresh per-day sale number, status `completed`
    /// - One item row per cart line (prices frozen from the cart)
    /// - Stock decremented per line
    /// - One `out` movement per line
    /// - One ledger entry for the sale total
    ///
    /// ## Errors
    /// - `ValidationError::EmptyCart` - nothing staged, nothing persisted
    /// - `DbError::InsufficientStock` - another writer consumed the stock
    ///   between cart staging and commit
    pub async fn create(&self, cart: &Cart, meta: SaleMeta) -> SaleResult<Sale> {
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        // The per-day sequence is read inside the transaction, but two
        // concurrent creates can still pick the same number; the UNIQUE
        // constraint catches that and we retry with a fresh allocation.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(cart, &meta).await {
                Err(SaleError::Db(DbError::UniqueViolation { ref field, .. }))
                    if field.contains("sale_number") =>
                {
                    if attempt >= MAX_SALE_NUMBER_ATTEMPTS {
                        return Err(DbError::SaleNumberExhausted { attempts: attempt }.into());
                    }
                    debug!(attempt, "Sale number collision, retrying allocation");
                }
                other => return other,
            }
        }
    }

    async fn try_create(&self, cart: &Cart, meta: &SaleMeta) -> SaleResult<Sale> {
        let sales = self.db.sales();

        let mut tx = self.begin().await?;

        let now = Utc::now();
        let sale_number = sales.next_sale_number(&mut tx, now).await?;

        let sale = Sale {
            id: generate_sale_id(),
            sale_number,
            customer_name: meta.customer_name.clone(),
            customer_contact: meta.customer_contact.clone(),
            total_amount_cents: cart.total_cents(),
            payment_method: meta.payment_method,
            payment_status: PaymentStatus::Completed,
            notes: meta.notes.clone(),
            sale_date: now,
            created_at: now,
            updated_at: now,
        };

        sales.insert(&mut tx, &sale).await?;

        self.apply_cart(&mut tx, &sale, cart, meta).await?;

        let entry = build_sale_entry(&sale, meta.created_by.clone());
        self.db.ledger().append(&mut tx, &entry).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_number = %sale.sale_number,
            total_cents = sale.total_amount_cents,
            lines = cart.line_count(),
            "Sale created"
        );
        Ok(sale)
    }

    // -------------------------------------------------------------------------
    // Edit
    // -------------------------------------------------------------------------

    /// Replaces a sale's contents with a new cart.
    ///
    /// The sale number, payment status, and sale date are preserved. The
    /// item set is replaced wholesale: stock held by the current items is
    /// restored, the new cart is applied as if creating, and the ledger
    /// entry is swapped for one carrying the new total.
    ///
    /// ## Errors
    /// - `ValidationError::EmptyCart` - an edit cannot empty a sale
    /// - `DbError::NotFound` - no such sale
    /// - `DbError::InsufficientStock` - the new item set does not fit the
    ///   stock on hand after restoration
    pub async fn edit(&self, sale_id: &str, cart: &Cart, meta: SaleMeta) -> SaleResult<Sale> {
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        let sales = self.db.sales();
        let products = self.db.products();
        let ledger = self.db.ledger();

        let mut tx = self.begin().await?;

        let existing = sales
            .load(&mut tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        // Give back the stock the current item set holds. Inside the
        // transaction this nets out against the re-deduction below, so no
        // compensating movements are written for it.
        let old_items = sales.load_items(&mut tx, sale_id).await?;
        for item in &old_items {
            products
                .apply_delta(&mut tx, &item.product_id, item.quantity)
                .await?;
        }

        sales.delete_items(&mut tx, sale_id).await?;
        ledger.delete_for_reference(&mut tx, sale_id).await?;

        let updated = Sale {
            customer_name: meta.customer_name.clone(),
            customer_contact: meta.customer_contact.clone(),
            total_amount_cents: cart.total_cents(),
            payment_method: meta.payment_method,
            notes: meta.notes.clone(),
            updated_at: Utc::now(),
            ..existing
        };

        sales.update_header(&mut tx, &updated).await?;

        self.apply_cart(&mut tx, &updated, cart, &meta).await?;

        let entry = build_sale_entry(&updated, meta.created_by.clone());
        ledger.append(&mut tx, &entry).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_number = %updated.sale_number,
            total_cents = updated.total_amount_cents,
            "Sale edited"
        );
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    /// Deletes a sale, restoring the stock it consumed.
    ///
    /// ## Effects (all-or-nothing)
    /// - Stock incremented per item
    /// - One compensating `in` movement per item, referencing the deletion
    /// - Ledger entry removed (no reversing entry)
    /// - Items and header removed
    ///
    /// Deletion is terminal; the sale and its items are gone, only the
    /// movement history remembers it.
    pub async fn delete(&self, sale_id: &str, deleted_by: Option<String>) -> SaleResult<()> {
        let sales = self.db.sales();
        let products = self.db.products();
        let movements = self.db.movements();
        let ledger = self.db.ledger();

        let mut tx = self.begin().await?;

        let sale = sales
            .load(&mut tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let items = sales.load_items(&mut tx, sale_id).await?;
        for item in &items {
            products
                .apply_delta(&mut tx, &item.product_id, item.quantity)
                .await?;

            let movement = build_movement(
                &item.product_id,
                item.quantity,
                ReferenceType::SaleDeletion,
                &sale.id,
                Some(format!("Sale {} deleted", sale.sale_number)),
                deleted_by.clone(),
            );
            movements.append(&mut tx, &movement).await?;
        }

        ledger.delete_for_reference(&mut tx, sale_id).await?;
        sales.delete_items(&mut tx, sale_id).await?;
        sales.delete(&mut tx, sale_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_number = %sale.sale_number, "Sale deleted, stock restored");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Shared steps
    // -------------------------------------------------------------------------

    /// Applies a cart to a sale: item rows, stock decrements, and `out`
    /// movements, one per line.
    async fn apply_cart(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        sale: &Sale,
        cart: &Cart,
        meta: &SaleMeta,
    ) -> SaleResult<()> {
        let sales = self.db.sales();
        let products = self.db.products();
        let movements = self.db.movements();

        let now = Utc::now();

        for line in cart.lines() {
            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                total_price_cents: line.total_price_cents(),
                created_at: now,
            };
            sales.insert_item(&mut *tx, &item).await?;

            products
                .apply_delta(&mut *tx, &line.product_id, -line.quantity)
                .await?;

            let movement = build_movement(
                &line.product_id,
                -line.quantity,
                ReferenceType::Sale,
                &sale.id,
                Some(format!("Sale {}", sale.sale_number)),
                meta.created_by.clone(),
            );
            movements.append(&mut *tx, &movement).await?;
        }

        Ok(())
    }

    async fn begin(&self) -> SaleResult<Transaction<'static, Sqlite>> {
        let tx = self.db.pool().begin().await.map_err(DbError::from)?;
        Ok(tx)
    }
}
