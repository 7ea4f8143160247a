//! ACID transaction helper
//!
//! Every mutating tracker operation runs inside exactly one transaction.

use crate::errors::{Result, TrackerError};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Execute operation within an ACID transaction
///
/// Commits when the closure returns `Ok`. On `Err` the transaction is dropped
/// uncommitted, which rolls it back, so no partial state is left behind.
///
/// `Immediate` takes the write lock up front; a revision reads the current
/// version pointer and writes the new one under the same lock.
pub fn execute_in_transaction<F, T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn
        .transaction_with_behavior(behavior)
        .map_err(|e| TrackerError::storage_with_source("failed to begin transaction", e))?;

    match operation(&tx) {
        Ok(result) => {
            tx.commit()
                .map_err(|e| TrackerError::storage_with_source("failed to commit transaction", e))?;
            Ok(result)
        }
        Err(e) => {
            // Rollback happens via Drop
            tracing::debug!(
                error = %e,
                category = e.category().as_str(),
                "Transaction rolled back"
            );
            Err(e)
        }
    }
}
