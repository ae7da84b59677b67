//! XP ledger repository functions.
//!
//! Balances default to zero for members without a counter row. Deltas are
//! applied in place so they can share a transaction with duel mutations
//! (escrow on accept, payout on finish).

use sea_orm::ConnectionTrait;

use crate::adapters::ledger_sea;
use crate::errors::domain::DomainError;
use crate::infra::db_errors;

pub async fn get_balance<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
) -> Result<i64, DomainError> {
    let row = ledger_sea::find_balance(conn, space_id, member_id)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(row.map(|r| r.xp).unwrap_or(0))
}

pub async fn apply_delta<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
    delta: i64,
) -> Result<(), DomainError> {
    ledger_sea::apply_delta(conn, space_id, member_id, delta)
        .await
        .map_err(db_errors::map_db_err)
}
