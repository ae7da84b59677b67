use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::errors::domain::DomainError;
use crate::infra::db_errors;

/// Execute a closure within a database transaction.
///
/// Begins a transaction on the given connection, runs the closure, commits on
/// Ok and performs a best-effort rollback on Err (preserving the original
/// error). All-or-nothing duel mutations (escrow on accept, payout on finish)
/// go through here.
pub async fn with_txn<R, F>(db: &DatabaseConnection, f: F) -> Result<R, DomainError>
where
    F: for<'c> FnOnce(
        &'c DatabaseTransaction,
    ) -> Pin<Box<dyn Future<Output = Result<R, DomainError>> + Send + 'c>>,
{
    let txn = db.begin().await.map_err(db_errors::map_db_err)?;
    let out = f(&txn).await;

    match out {
        Ok(val) => {
            txn.commit().await.map_err(db_errors::map_db_err)?;
            Ok(val)
        }
        Err(err) => {
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}
