//! # Cart
//!
//! The client-side staging area that precedes a sale commit.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cart Staging Flow                                  │
//! │                                                                         │
//! │  Select Product ─────────► add_item() ────────► line staged/merged      │
//! │                                │                                        │
//! │                                ├── qty <= 0? → ValidationError          │
//! │                                └── qty > known stock? → ValidationError │
//! │                                                                         │
//! │  Click Remove ───────────► remove_item() ─────► line dropped entirely   │
//! │                                                                         │
//! │  Commit Sale ────────────► SaleManager::create(cart, meta)              │
//! │                                                                         │
//! │  Cancel ─────────────────► cart dropped, nothing persisted              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock checks here run against the quantity known when the product list
//! was fetched, which may be stale. The db layer re-enforces the invariant
//! at commit time with a conditional update.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// A staged line: one product with a quantity and a frozen unit price.
///
/// ## Price Freezing
/// The price is captured when the product is first staged. Later product
/// price changes do not affect this line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// SKU at time of staging (frozen).
    pub sku: String,

    /// Product name at time of staging (frozen).
    pub name: String,

    /// Price in cents at time of staging (frozen).
    pub unit_price_cents: i64,

    /// Quantity staged.
    pub quantity: i64,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.unit_price_cents,
            quantity,
        }
    }

    /// Line total: quantity × unit price, in cents.
    #[inline]
    pub fn total_price_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The staging area for candidate sale items.
///
/// ## Invariants
/// - Lines are unique by `product_id` (re-adding merges quantities)
/// - Every line quantity is > 0 and within the stock known at fetch time
/// - At most MAX_CART_LINES lines, MAX_LINE_QUANTITY per line
///
/// Cart state is never persisted; cancelling the surrounding operation
/// simply drops it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Stages a product, or merges into the existing line for it.
    ///
    /// ## Behavior
    /// - Rejects non-positive or oversized quantities
    /// - Rejects a quantity exceeding `product.quantity` (stock known at
    ///   fetch time)
    /// - If the product is already staged, the merged quantity is
    ///   re-validated against available stock
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<(), ValidationError> {
        validate_quantity(quantity)?;

        if quantity > product.quantity {
            return Err(ValidationError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.quantity,
                requested: quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity + quantity;
            if merged > product.quantity {
                return Err(ValidationError::InsufficientStock {
                    sku: product.sku.clone(),
                    available: product.quantity,
                    requested: merged,
                });
            }
            if merged > MAX_LINE_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(ValidationError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Removes the staged line for a product entirely.
    ///
    /// No partial-quantity removal; removing an absent product is a no-op.
    pub fn remove_item(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Clears all staged lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Returns the staged lines.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of staged lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals, in cents. Pure, no side effect.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.total_price_cents()).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, quantity: i64, price_cents: i64) -> Product {
        let mut p = Product::new(format!("SKU-{id}"), format!("Product {id}"), quantity, price_cents, 0)
            .unwrap();
        p.id = id.to_string();
        p
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        let p = product("1", 10, 999);

        cart.add_item(&p, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total_cents(), 1998);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new();
        let p = product("1", 10, 999);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut cart = Cart::new();
        let p = product("1", 10, 999);

        assert!(matches!(
            cart.add_item(&p, 0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            cart.add_item(&p, -3),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rejects_quantity_over_stock() {
        let mut cart = Cart::new();
        let p = product("1", 10, 999);

        assert!(matches!(
            cart.add_item(&p, 11),
            Err(ValidationError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rejects_merged_quantity_over_stock() {
        let mut cart = Cart::new();
        let p = product("1", 10, 999);

        cart.add_item(&p, 6).unwrap();
        assert!(matches!(
            cart.add_item(&p, 6),
            Err(ValidationError::InsufficientStock {
                available: 10,
                requested: 12,
                ..
            })
        ));
        // Failed merge leaves the original line untouched.
        assert_eq!(cart.total_quantity(), 6);
    }

    #[test]
    fn test_remove_item_drops_whole_line() {
        let mut cart = Cart::new();
        let p1 = product("1", 10, 999);
        let p2 = product("2", 10, 500);

        cart.add_item(&p1, 2).unwrap();
        cart.add_item(&p2, 1).unwrap();

        cart.remove_item("1");
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].product_id, "2");

        // Removing something absent is a no-op.
        cart.remove_item("nope");
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_price_frozen_on_first_add() {
        let mut cart = Cart::new();
        let mut p = product("1", 10, 500);

        cart.add_item(&p, 1).unwrap();
        p.unit_price_cents = 900;
        cart.add_item(&p, 1).unwrap();

        assert_eq!(cart.total_cents(), 1000);
    }
}
