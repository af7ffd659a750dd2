//! # Inventory Movement Repository
//!
//! Append-only stock movement history (the Movement Recorder).
//!
//! Movements are never updated or deleted. Reversing a sale appends a
//! compensating `in` movement referencing the deletion rather than erasing
//! the original `out` rows, so the history of every stock change survives.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tilly_core::{InventoryMovement, MovementType, ReferenceType};

/// Repository for inventory movement records.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement record inside the caller's transaction.
    ///
    /// `quantity` is signed: negative for `out`, positive for `in`. The
    /// caller builds the record so the sign and movement type agree.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        movement: &InventoryMovement,
    ) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            quantity = %movement.quantity,
            "Recording inventory movement"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, movement_type, quantity,
                reference_type, reference_id, note, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.reference_type)
        .bind(&movement.reference_id)
        .bind(&movement.note)
        .bind(&movement.created_by)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Lists the movement history for a product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, product_id, movement_type, quantity,
                   reference_type, reference_id, note, created_by, created_at
            FROM inventory_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Lists all movements caused by a given sale (by its id).
    pub async fn list_for_reference(&self, reference_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, product_id, movement_type, quantity,
                   reference_type, reference_id, note, created_by, created_at
            FROM inventory_movements
            WHERE reference_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Builds a movement record for a stock change.
///
/// The movement type is derived from the sign of `quantity`: negative
/// deltas are `out` (sale consumed stock), positive deltas are `in`
/// (stock restored by edit or deletion).
pub fn build_movement(
    product_id: &str,
    quantity: i64,
    reference_type: ReferenceType,
    reference_id: &str,
    note: Option<String>,
    created_by: Option<String>,
) -> InventoryMovement {
    let movement_type = if quantity < 0 {
        MovementType::Out
    } else {
        MovementType::In
    };

    InventoryMovement {
        id: uuid::Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        movement_type,
        quantity,
        reference_type,
        reference_id: reference_id.to_string(),
        note,
        created_by,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_movement_derives_type_from_sign() {
        let out = build_movement("p1", -3, ReferenceType::Sale, "s1", None, None);
        assert_eq!(out.movement_type, MovementType::Out);
        assert_eq!(out.quantity, -3);

        let restored =
            build_movement("p1", 3, ReferenceType::SaleDeletion, "s1", None, None);
        assert_eq!(restored.movement_type, MovementType::In);
        assert_eq!(restored.quantity, 3);
    }
}
