//! Integration tests for the sale lifecycle against an in-memory database.
//!
//! Covers the reconciliation guarantees: create/edit/delete keep stock,
//! items, movements, and ledger entries consistent, and a failed operation
//! leaves no partial state behind.

use chrono::Utc;
use tilly_core::{Cart, MovementType, PaymentMethod, Product, ReferenceType, ValidationError};
use tilly_db::{Database, DbConfig, DbError, SaleError, SaleMeta};

async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn seed_product(db: &Database, sku: &str, quantity: i64, price_cents: i64) -> Product {
    let product = Product::new(sku, format!("{sku} test product"), quantity, price_cents, 5)
        .unwrap();
    db.products().insert(&product).await.unwrap();
    product
}

fn walk_in() -> SaleMeta {
    SaleMeta {
        customer_name: Some("Walk-in".to_string()),
        payment_method: PaymentMethod::Cash,
        ..SaleMeta::default()
    }
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_commits_cart_with_all_side_effects() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 10, 500).await;

    let mut cart = Cart::new();
    cart.add_item(&product, 3).unwrap();

    let sale = db.sale_manager().create(&cart, walk_in()).await.unwrap();

    assert_eq!(sale.total_amount_cents, 1500);
    assert_eq!(sale.customer_name.as_deref(), Some("Walk-in"));

    // Stock decremented.
    let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 7);

    // One item row, price frozen from the cart.
    let items = db.sales().get_items(&sale.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].unit_price_cents, 500);
    assert_eq!(items[0].total_price_cents, 1500);

    // One `out` movement carrying the signed delta.
    let movements = db.movements().list_for_reference(&sale.id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Out);
    assert_eq!(movements[0].quantity, -3);
    assert_eq!(movements[0].reference_type, ReferenceType::Sale);

    // One ledger entry for the sale total.
    let entries = db.ledger().find_for_reference(&sale.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount_cents, 1500);
    assert_eq!(entries[0].payment_method, PaymentMethod::Cash);
}

#[tokio::test]
async fn create_rejects_empty_cart_without_side_effects() {
    let db = setup().await;
    seed_product(&db, "COKE-330", 10, 500).await;

    let cart = Cart::new();
    let err = db.sale_manager().create(&cart, walk_in()).await.unwrap_err();
    assert!(matches!(
        err,
        SaleError::Validation(ValidationError::EmptyCart)
    ));

    let sales = db.sales().list_recent().await.unwrap();
    assert!(sales.is_empty());
}

#[tokio::test]
async fn create_rolls_back_whole_sale_when_stock_ran_out() {
    let db = setup().await;
    let plenty = seed_product(&db, "PLENTY", 10, 100).await;
    let scarce = seed_product(&db, "SCARCE", 10, 200).await;

    // Cart staged while both products showed 10 on hand.
    let mut cart = Cart::new();
    cart.add_item(&plenty, 2).unwrap();
    cart.add_item(&scarce, 5).unwrap();

    // Another writer consumes the scarce stock before commit.
    let mut conn = db.pool().acquire().await.unwrap();
    db.products()
        .apply_delta(&mut conn, &scarce.id, -8)
        .await
        .unwrap();
    drop(conn);

    let err = db.sale_manager().create(&cart, walk_in()).await.unwrap_err();
    assert!(matches!(
        err,
        SaleError::Db(DbError::InsufficientStock {
            available: 2,
            requested: 5,
            ..
        })
    ));

    // Nothing persisted: the first line's decrement rolled back too.
    let plenty_after = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
    assert_eq!(plenty_after.quantity, 10);
    let scarce_after = db.products().get_by_id(&scarce.id).await.unwrap().unwrap();
    assert_eq!(scarce_after.quantity, 2);

    assert!(db.sales().list_recent().await.unwrap().is_empty());
    assert!(db
        .movements()
        .list_for_product(&plenty.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sale_numbers_form_a_per_day_sequence() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 10, 500).await;

    let mut cart = Cart::new();
    cart.add_item(&product, 1).unwrap();

    let first = db.sale_manager().create(&cart, walk_in()).await.unwrap();
    let second = db.sale_manager().create(&cart, walk_in()).await.unwrap();

    let prefix = format!("SALE-{}-", Utc::now().format("%Y%m%d"));
    assert_eq!(first.sale_number, format!("{prefix}0001"));
    assert_eq!(second.sale_number, format!("{prefix}0002"));
}

// =============================================================================
// Edit
// =============================================================================

#[tokio::test]
async fn edit_replaces_items_and_reconciles_stock() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 10, 500).await;

    let mut cart = Cart::new();
    cart.add_item(&product, 3).unwrap();
    let sale = db.sale_manager().create(&cart, walk_in()).await.unwrap();

    // Stock is 7 now; editing to quantity 5 means restore 3, deduct 5.
    let current = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(current.quantity, 7);

    let mut new_cart = Cart::new();
    new_cart.add_item(&current, 5).unwrap();

    let edited = db
        .sale_manager()
        .edit(&sale.id, &new_cart, walk_in())
        .await
        .unwrap();

    assert_eq!(edited.sale_number, sale.sale_number);
    assert_eq!(edited.payment_status, sale.payment_status);
    assert_eq!(edited.total_amount_cents, 2500);

    let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 5);

    // Item set replaced wholesale.
    let items = db.sales().get_items(&sale.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);

    // Ledger entry swapped, not accumulated.
    let entries = db.ledger().find_for_reference(&sale.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount_cents, 2500);
}

#[tokio::test]
async fn edit_rejects_empty_cart_and_keeps_sale_intact() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 10, 500).await;

    let mut cart = Cart::new();
    cart.add_item(&product, 3).unwrap();
    let sale = db.sale_manager().create(&cart, walk_in()).await.unwrap();

    let err = db
        .sale_manager()
        .edit(&sale.id, &Cart::new(), walk_in())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SaleError::Validation(ValidationError::EmptyCart)
    ));

    let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 7);
    assert_eq!(db.sales().get_items(&sale.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn edit_missing_sale_is_not_found() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 10, 500).await;

    let mut cart = Cart::new();
    cart.add_item(&product, 1).unwrap();

    let err = db
        .sale_manager()
        .edit("no-such-sale", &cart, walk_in())
        .await
        .unwrap_err();
    assert!(matches!(err, SaleError::Db(DbError::NotFound { .. })));
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_restores_stock_exactly_and_removes_records() {
    let db = setup().await;
    let coke = seed_product(&db, "COKE-330", 10, 500).await;
    let chips = seed_product(&db, "CHIPS-L", 20, 300).await;

    let mut cart = Cart::new();
    cart.add_item(&coke, 3).unwrap();
    cart.add_item(&chips, 4).unwrap();
    let sale = db.sale_manager().create(&cart, walk_in()).await.unwrap();

    db.sale_manager()
        .delete(&sale.id, Some("manager".to_string()))
        .await
        .unwrap();

    // Quantities are exactly what they were before the sale.
    let coke_after = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
    assert_eq!(coke_after.quantity, 10);
    let chips_after = db.products().get_by_id(&chips.id).await.unwrap().unwrap();
    assert_eq!(chips_after.quantity, 20);

    // Sale, items, and ledger entry are gone.
    assert!(db.sales().get_by_id(&sale.id).await.unwrap().is_none());
    assert!(db.sales().get_items(&sale.id).await.unwrap().is_empty());
    assert!(db
        .ledger()
        .find_for_reference(&sale.id)
        .await
        .unwrap()
        .is_empty());

    // Movement history keeps both the sale and its reversal.
    let movements = db.movements().list_for_reference(&sale.id).await.unwrap();
    assert_eq!(movements.len(), 4);
    let restorations: Vec<_> = movements
        .iter()
        .filter(|m| m.reference_type == ReferenceType::SaleDeletion)
        .collect();
    assert_eq!(restorations.len(), 2);
    assert!(restorations
        .iter()
        .all(|m| m.movement_type == MovementType::In && m.quantity > 0));
    assert!(restorations
        .iter()
        .all(|m| m.created_by.as_deref() == Some("manager")));
}

#[tokio::test]
async fn delete_missing_sale_is_not_found() {
    let db = setup().await;

    let err = db
        .sale_manager()
        .delete("no-such-sale", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SaleError::Db(DbError::NotFound { .. })));
}

// =============================================================================
// Stock Ledger
// =============================================================================

#[tokio::test]
async fn apply_delta_refuses_underflow_and_leaves_row_untouched() {
    let db = setup().await;
    let product = seed_product(&db, "COKE-330", 5, 500).await;

    let mut conn = db.pool().acquire().await.unwrap();
    let err = db
        .products()
        .apply_delta(&mut conn, &product.id, -6)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::InsufficientStock {
            available: 5,
            requested: 6,
            ..
        }
    ));
    drop(conn);

    let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 5);
}

#[tokio::test]
async fn apply_delta_unknown_product_is_not_found() {
    let db = setup().await;

    let mut conn = db.pool().acquire().await.unwrap();
    let err = db
        .products()
        .apply_delta(&mut conn, "no-such-product", -1)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn listings_respect_stock_levels() {
    let db = setup().await;
    seed_product(&db, "GONE", 0, 100).await;
    seed_product(&db, "LOW", 3, 100).await;
    seed_product(&db, "FULL", 50, 100).await;

    let available = db.products().list_available().await.unwrap();
    let skus: Vec<_> = available.iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(skus, vec!["FULL", "LOW"]);

    // Reorder level is 5: both the empty and the low product qualify.
    let low = db.products().list_low_stock().await.unwrap();
    let skus: Vec<_> = low.iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(skus, vec!["GONE", "LOW"]);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn list_recent_nests_items_with_product_summaries() {
    let db = setup().await;
    let coke = seed_product(&db, "COKE-330", 10, 500).await;
    let chips = seed_product(&db, "CHIPS-L", 20, 300).await;

    let mut first = Cart::new();
    first.add_item(&coke, 1).unwrap();
    db.sale_manager().create(&first, walk_in()).await.unwrap();

    let mut second = Cart::new();
    second.add_item(&coke, 2).unwrap();
    second.add_item(&chips, 1).unwrap();
    db.sale_manager().create(&second, walk_in()).await.unwrap();

    let sales = db.sales().list_recent().await.unwrap();
    assert_eq!(sales.len(), 2);

    let two_liner = sales
        .iter()
        .find(|s| s.items.len() == 2)
        .expect("sale with two items");
    assert_eq!(two_liner.sale.total_amount_cents, 1300);
    assert!(two_liner
        .items
        .iter()
        .any(|i| i.product_sku == "CHIPS-L" && i.product_name.contains("CHIPS-L")));
}
