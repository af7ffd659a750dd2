//! # Financial Ledger Repository
//!
//! Ledger entries tie money movement to the sale that caused it.
//!
//! Unlike inventory movements, ledger rows are not compensated: editing or
//! deleting a sale hard-deletes its ledger entry (and the edit writes a
//! fresh one). A sale therefore has at most one live ledger row at a time.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tilly_core::{FinancialTransaction, ReferenceType, Sale, TransactionType};

/// Repository for financial transaction records.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends a ledger entry inside the caller's transaction.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        entry: &FinancialTransaction,
    ) -> DbResult<()> {
        debug!(
            reference_id = %entry.reference_id,
            amount_cents = %entry.amount_cents,
            "Recording ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO financial_transactions (
                id, transaction_type, reference_type, reference_id,
                amount_cents, description, payment_method, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.transaction_type)
        .bind(entry.reference_type)
        .bind(&entry.reference_id)
        .bind(entry.amount_cents)
        .bind(&entry.description)
        .bind(entry.payment_method)
        .bind(&entry.created_by)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes all ledger entries referencing a sale. Returns the number
    /// of rows removed.
    pub async fn delete_for_reference(
        &self,
        conn: &mut SqliteConnection,
        reference_id: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM financial_transactions WHERE reference_id = ?1")
            .bind(reference_id)
            .execute(&mut *conn)
            .await?;

        debug!(
            reference_id = %reference_id,
            removed = result.rows_affected(),
            "Deleted ledger entries"
        );
        Ok(result.rows_affected())
    }

    /// Finds the ledger entries for a sale, oldest first.
    pub async fn find_for_reference(
        &self,
        reference_id: &str,
    ) -> DbResult<Vec<FinancialTransaction>> {
        let entries = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            SELECT id, transaction_type, reference_type, reference_id,
                   amount_cents, description, payment_method, created_by, created_at
            FROM financial_transactions
            WHERE reference_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Builds the ledger entry recording a sale's revenue.
pub fn build_sale_entry(sale: &Sale, created_by: Option<String>) -> FinancialTransaction {
    FinancialTransaction {
        id: uuid::Uuid::new_v4().to_string(),
        transaction_type: TransactionType::Sale,
        reference_type: ReferenceType::Sale,
        reference_id: sale.id.clone(),
        amount_cents: sale.total_amount_cents,
        description: format!("Sale {}", sale.sale_number),
        payment_method: sale.payment_method,
        created_by,
        created_at: Utc::now(),
    }
}
