//! The authoritative user balance (§4.A LedgerStore, §3 "Balance"). Debits performed elsewhere
//! (e.g. `withdrawal::redeem_withdraw`) happen via a `Balance` value loaded and saved through
//! [`get`]/[`update`] so that they benefit from the same optimistic-concurrency guard.

use crate::database;
use crate::sats::Sats;
use crate::{concurrency, user};

mod entities;

pub use entities::{Balance, InsufficientBalance, LockedBalance};

pub async fn get(data_tx: &mut database::Transaction, user_id: &user::Id) -> Balance {
    sqlx::query_as::<_, BalanceRow>("SELECT id AS user_id, balance_sats FROM users WHERE id = $1")
        .bind(user_id.as_str())
        .fetch_one(data_tx)
        .await
        .unwrap()
        .into_entity()
}

/// Same read as [`get`], but outside of a transaction. Used by `SessionCache`'s cache-miss
/// fallback, which only needs a point-in-time snapshot to serve back to the client (§4.B).
pub async fn get_pool(db: &database::Database, user_id: &user::Id) -> Balance {
    sqlx::query_as::<_, BalanceRow>("SELECT id AS user_id, balance_sats FROM users WHERE id = $1")
        .bind(user_id.as_str())
        .fetch_one(db)
        .await
        .unwrap()
        .into_entity()
}

/// Optimistic-concurrency CAS update (§9 design note on the ad-hoc advisory mutex: the
/// guarantee must come from the database, not an in-process lock). A no-op if `balance` was
/// never mutated since it was loaded.
pub async fn update(
    data_tx: &mut database::Transaction,
    balance: &Balance,
) -> Result<(), concurrency::ConflictError> {
    if balance.changed() {
        sqlx::query(
            "UPDATE users SET balance_sats = $1 WHERE id = $2 AND balance_sats = $3 RETURNING id",
        )
        .bind(balance.amount().0)
        .bind(balance.user_id().as_str())
        .bind(balance.original_amount().0)
        .fetch_optional(data_tx)
        .await
        .unwrap()
        .ok_or(concurrency::ConflictError)?;
    }
    Ok(())
}

/// Inserts the reservation row proving `amount` sats are locked against `payment_hash`.
/// ON-CONFLICT-DO-NOTHING per the redeem contract's retry-safety requirement (§4.A step 4).
pub async fn lock_balance(data_tx: &mut database::Transaction, locked: &LockedBalance) {
    sqlx::query(
        "INSERT INTO locked_balances (payment_hash, user_id, amount_sats) VALUES ($1, $2, $3)
            ON CONFLICT (payment_hash) DO NOTHING",
    )
    .bind(&locked.payment_hash)
    .bind(locked.user_id.as_str())
    .bind(locked.amount.0)
    .execute(data_tx)
    .await
    .unwrap();
}

/// Removes the reservation row. Returns the amount that was locked, or `None` if it had
/// already been released (idempotent under duplicate stream delivery, §8 property 3/4).
pub async fn release_locked_balance(
    data_tx: &mut database::Transaction,
    payment_hash: &str,
) -> Option<Sats> {
    sqlx::query_as::<_, SumRow>(
        "DELETE FROM locked_balances WHERE payment_hash = $1 RETURNING amount_sats AS sum",
    )
    .bind(payment_hash)
    .fetch_optional(data_tx)
    .await
    .unwrap()
    .map(|row| Sats(row.sum))
}

#[derive(sqlx::FromRow, Debug)]
struct BalanceRow {
    user_id: String,
    balance_sats: i64,
}

impl BalanceRow {
    fn into_entity(self) -> Balance {
        Balance::new(user::Id::new(self.user_id).unwrap(), Sats(self.balance_sats))
    }
}

#[derive(sqlx::FromRow, Debug)]
struct SumRow {
    sum: i64,
}
