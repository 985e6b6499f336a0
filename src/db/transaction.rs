/*!
 * Transaction Helper Utilities
 *
 * Purchase operations open a transaction, do all their reads and writes on
 * it, then hand the outcome to [`TrackedTransaction::settle`], which commits
 * on success and rolls back explicitly on failure.
 */

use crate::errors::ServiceError;
use metrics::{counter, histogram};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// A transaction that records its outcome and duration
pub struct TrackedTransaction {
    txn: DatabaseTransaction,
    operation: &'static str,
    transaction_id: Uuid,
    started: Instant,
}

impl TrackedTransaction {
    /// Opens a transaction. On PostgreSQL a non-empty `lock_timeout` bounds
    /// how long any row lock taken inside it may wait.
    pub async fn begin(
        db: &DatabaseConnection,
        operation: &'static str,
        lock_timeout: Option<Duration>,
    ) -> Result<Self, DbErr> {
        let transaction_id = Uuid::new_v4();
        let txn = db.begin().await?;

        if let Some(timeout) = lock_timeout {
            if txn.get_database_backend() == DbBackend::Postgres {
                txn.execute(Statement::from_string(
                    DbBackend::Postgres,
                    format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()),
                ))
                .await?;
            }
        }

        debug!(transaction_id = %transaction_id, operation, "Starting database transaction");
        counter!("tutuplapak_db.transaction.started", 1, "operation" => operation);

        Ok(Self {
            txn,
            operation,
            transaction_id,
            started: Instant::now(),
        })
    }

    pub fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits when `result` is `Ok`, rolls back otherwise. A failed commit
    /// is reported as a persistence failure.
    pub async fn settle<T>(self, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
        let Self {
            txn,
            operation,
            transaction_id,
            started,
        } = self;

        let outcome = match result {
            Ok(value) => match txn.commit().await {
                Ok(()) => {
                    counter!("tutuplapak_db.transaction.committed", 1, "operation" => operation);
                    debug!(transaction_id = %transaction_id, operation, "Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    counter!("tutuplapak_db.transaction.commit_failed", 1, "operation" => operation);
                    warn!(transaction_id = %transaction_id, operation, error = %e, "Commit failed");
                    Err(ServiceError::DatabaseError(e))
                }
            },
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(
                        transaction_id = %transaction_id,
                        operation,
                        error = %rollback_err,
                        "Explicit rollback failed; the connection drop will discard the transaction"
                    );
                }
                counter!("tutuplapak_db.transaction.rolled_back", 1, "operation" => operation);
                debug!(transaction_id = %transaction_id, operation, error = %err, "Transaction rolled back");
                Err(err)
            }
        };

        histogram!(
            "tutuplapak_db.transaction.duration",
            started.elapsed(),
            "operation" => operation
        );
        outcome
    }
}
