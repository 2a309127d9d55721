//! Immutable ledger entries (§3 "Transaction"), appended only on successful settlement of a
//! withdraw or a deposit. The unique index on `(payment_hash, direction)` is the concrete
//! mechanism that makes `finalize_payment`/`deposit_finalize` idempotent against duplicate
//! stream delivery (§8 properties 3 and 4): a replayed event's insert becomes a no-op.

use crate::database;
use crate::sats::Sats;
use crate::user;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Withdraw,
    Deposit,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub user_id: user::Id,
    pub payment_hash: String,
    pub direction: Direction,
    pub amount: Sats,
    pub ts_create: DateTime<Utc>,
}

impl Transaction {
    pub fn new(user_id: user::Id, payment_hash: String, direction: Direction, amount: Sats) -> Self {
        Self {
            user_id,
            payment_hash,
            direction,
            amount,
            ts_create: Utc::now(),
        }
    }
}

/// Returns `true` if a new row was inserted, `false` if one already existed for this
/// `(payment_hash, direction)` pair.
pub async fn insert(data_tx: &mut database::Transaction, transaction: &Transaction) -> bool {
    sqlx::query(
        r#"INSERT INTO transactions (user_id, payment_hash, direction, amount_sats, ts_create)
            VALUES ($1, $2, $3, $4, $5) ON CONFLICT (payment_hash, direction) DO NOTHING"#,
    )
    .bind(transaction.user_id.as_str())
    .bind(&transaction.payment_hash)
    .bind(direction_text(transaction.direction))
    .bind(transaction.amount.0)
    .bind(transaction.ts_create)
    .execute(data_tx)
    .await
    .unwrap()
    .rows_affected()
        > 0
}

fn direction_text(direction: Direction) -> &'static str {
    match direction {
        Direction::Withdraw => "WITHDRAW",
        Direction::Deposit => "DEPOSIT",
    }
}
