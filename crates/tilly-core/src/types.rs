//! # Domain Types
//!
//! Core domain types used throughout Tilly.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │      Sale       │   │      SaleItem       │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)          │   │
//! │  │  sku (business) │   │  sale_number    │   │  sale_id (FK)       │   │
//! │  │  quantity       │   │  total_amount   │   │  unit_price (snap)  │   │
//! │  │  unit_price     │   │  payment_method │   │  quantity           │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌──────────────────────┐                   │
//! │  │  InventoryMovement   │   │ FinancialTransaction │                   │
//! │  │  ──────────────────  │   │  ──────────────────  │                   │
//! │  │  append-only audit   │   │  append-only ledger  │                   │
//! │  │  of stock deltas     │   │  of money movement   │                   │
//! │  └──────────────────────┘   └──────────────────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Sales have two identifiers:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `sale_number`: human-readable, unique, printed on receipts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_price_cents, validate_product_name, validate_sku};

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `quantity` is the current on-hand stock (the Stock Ledger state). It is
/// never mutated directly; the db layer applies signed deltas so a sale,
/// edit, or deletion cannot drive it negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique per catalog.
    pub sku: String,

    /// Display name shown on screens and receipts.
    pub name: String,

    /// Optional category name (denormalized; the category catalog itself
    /// lives outside this core).
    pub category_name: Option<String>,

    /// Current on-hand quantity. Never negative.
    pub quantity: i64,

    /// Unit price in cents (smallest currency unit).
    pub unit_price_cents: i64,

    /// Threshold quantity below which the product is flagged for restock.
    pub reorder_level: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a validated product with a fresh UUID.
    ///
    /// ## Rules
    /// - SKU: non-empty, ≤ 50 chars, alphanumeric/hyphen/underscore
    /// - Name: non-empty, ≤ 200 chars
    /// - Unit price: ≥ 0
    /// - Quantity: ≥ 0
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
        reorder_level: i64,
    ) -> Result<Self, ValidationError> {
        let sku = sku.into();
        let name = name.into();

        validate_sku(&sku)?;
        validate_product_name(&name)?;
        validate_price_cents(unit_price_cents)?;

        if quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }

        let now = Utc::now();
        Ok(Product {
            id: uuid::Uuid::new_v4().to_string(),
            sku,
            name,
            category_name: None,
            quantity,
            unit_price_cents,
            reorder_level,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Whether any stock is on hand.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Whether the product has fallen to or below its reorder level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid. Persisted as lowercase snake_case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Credit,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement status of a sale.
///
/// Create fixes this to `Completed`; edit preserves whatever the sale
/// already carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale transaction.
///
/// Lifecycle: created → edited (any number of times) → deleted (terminal).
/// There is no voided or cancelled intermediate state; deletion removes the
/// sale and its items while compensating stock and movement history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Human-readable number, format `SALE-YYYYMMDD-NNNN`, unique.
    pub sale_number: String,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    /// Sum of line totals, in cents.
    pub total_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    /// Defaults to creation time.
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total amount as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: `unit_price_cents` is frozen at sale time and
/// is not re-read when the product price changes later. Items are immutable
/// once written; a sale edit replaces the full item set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity sold. Always > 0.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents.
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
}

/// The business event a movement or ledger entry refers back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    SaleDeletion,
}

/// An immutable audit record of a stock quantity change and its cause.
///
/// Movements are append-only history, not current-state storage: reversing
/// a sale appends a compensating `in` movement rather than deleting the
/// prior `out` movements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Signed delta: negative for `out`, positive for `in`.
    pub quantity: i64,
    pub reference_type: ReferenceType,
    /// The id of the causing sale.
    pub reference_id: String,
    pub note: Option<String>,
    /// Actor identity, or None when unauthenticated.
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Financial Transaction
// =============================================================================

/// Business category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
}

/// An immutable ledger record of money movement tied to a business event.
///
/// Unlike movements, the ledger row for a sale is hard-deleted when the
/// sale is edited or removed; no reversing entry is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FinancialTransaction {
    pub id: String,
    pub transaction_type: TransactionType,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub amount_cents: i64,
    pub description: String,
    pub payment_method: PaymentMethod,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_new_validates() {
        let p = Product::new("COKE-330", "Coca-Cola 330ml", 10, 500, 5).unwrap();
        assert_eq!(p.quantity, 10);
        assert!(p.in_stock());
        assert!(!p.is_low_stock());

        assert!(Product::new("", "Coca-Cola", 10, 500, 5).is_err());
        assert!(Product::new("COKE-330", "", 10, 500, 5).is_err());
        assert!(Product::new("COKE-330", "Coca-Cola", -1, 500, 5).is_err());
        assert!(Product::new("COKE-330", "Coca-Cola", 10, -500, 5).is_err());
    }

    #[test]
    fn test_low_stock_flag() {
        let mut p = Product::new("A-1", "Widget", 5, 100, 5).unwrap();
        assert!(p.is_low_stock());
        p.quantity = 6;
        assert!(!p.is_low_stock());
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        let back: PaymentMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_reference_type_serde() {
        let json = serde_json::to_string(&ReferenceType::SaleDeletion).unwrap();
        assert_eq!(json, "\"sale_deletion\"");
    }
}
