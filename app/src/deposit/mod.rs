//! The deposit side of LedgerStore (§4.A). Unlike the source this was distilled from,
//! `create_deposit_request` writes only to the deposit tables (§9 Design Note #2) — never
//! routed through `withdrawal::create_withdraw_request`.

use crate::database::{self, Database};
use crate::sats::Sats;
use crate::{invoice, ln, transaction, user};
use chrono::{DateTime, Utc};

mod entities;

pub use entities::{DepositRequest, Status};

/// Inserts `DepositRequest` and the deposit `Invoice` atomically (§4.A).
pub async fn create_deposit_request(db: &Database, req: &DepositRequest, decoded: &ln::Invoice) {
    let mut data_tx = db.begin().await.unwrap();
    sqlx::query(
        "INSERT INTO deposit_requests (payment_hash, user_id, status, amount_sats, ts_created)
            VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&req.payment_hash)
    .bind(req.user_id.as_str())
    .bind(status_text(req.status))
    .bind(req.amount.0)
    .bind(req.ts_created)
    .execute(&mut data_tx)
    .await
    .unwrap();

    invoice::insert(
        &mut data_tx,
        &invoice::Invoice::from_decoded(decoded.clone(), invoice::Direction::Deposit),
    )
    .await;

    data_tx.commit().await.unwrap();
}

pub async fn get_deposit_request(db: &Database, payment_hash: &str) -> Option<DepositRequest> {
    sqlx::query_as::<_, DepositRequestRow>(
        "SELECT payment_hash, user_id, status, amount_sats, ts_created FROM deposit_requests WHERE payment_hash = $1",
    )
    .bind(payment_hash)
    .fetch_optional(db)
    .await
    .unwrap()
    .map(|row| row.into_entity())
}

/// Driven by `DepositReconciler` on a `SETTLED` incoming invoice (§4.E). The join key is the
/// invoice's own `payment_hash`, matching the `DepositRequest` primary key in this schema (§9
/// Design Note #4). Idempotent: a second delivery finds the invoice already `SETTLED` and the
/// transaction insert becomes a no-op, so the balance credit below only actually needs to run
/// once — guarded the same way `finalize_payment` guards its credit.
pub async fn deposit_finalize(db: &Database, decoded: &ln::Invoice) {
    let mut data_tx = db.begin().await.unwrap();

    let already_settled = sqlx::query_as::<_, database::CountRow>(
        "SELECT COUNT(*) AS count FROM invoices WHERE payment_hash = $1 AND state = 'SETTLED'",
    )
    .bind(&decoded.payment_hash)
    .fetch_one(&mut data_tx)
    .await
    .unwrap()
    .count
        > 0;

    if already_settled {
        data_tx.commit().await.unwrap();
        return;
    }

    invoice::set_state(&mut data_tx, &decoded.payment_hash, ln::InvoiceState::Settled).await;

    let request = sqlx::query_as::<_, DepositRequestRow>(
        "SELECT payment_hash, user_id, status, amount_sats, ts_created FROM deposit_requests WHERE payment_hash = $1",
    )
    .bind(&decoded.payment_hash)
    .fetch_optional(&mut data_tx)
    .await
    .unwrap()
    .map(|row| row.into_entity());

    let Some(request) = request else {
        data_tx.commit().await.unwrap();
        return;
    };

    let inserted = transaction::insert(
        &mut data_tx,
        &transaction::Transaction::new(
            request.user_id.clone(),
            decoded.payment_hash.clone(),
            transaction::Direction::Deposit,
            Sats(decoded.num_satoshis),
        ),
    )
    .await;

    if inserted {
        sqlx::query("UPDATE users SET balance_sats = balance_sats + $1 WHERE id = $2")
            .bind(decoded.num_satoshis)
            .bind(request.user_id.as_str())
            .execute(&mut data_tx)
            .await
            .unwrap();
    }

    sqlx::query("UPDATE deposit_requests SET status = 'SETTLED' WHERE payment_hash = $1")
        .bind(&decoded.payment_hash)
        .execute(&mut data_tx)
        .await
        .unwrap();

    data_tx.commit().await.unwrap();
}

fn status_text(status: Status) -> &'static str {
    match status {
        Status::Created => "CREATED",
        Status::Paid => "PAID",
        Status::Settled => "SETTLED",
        Status::PaymentFailed => "PAYMENT_FAILED",
    }
}

#[derive(sqlx::FromRow, Debug)]
struct DepositRequestRow {
    payment_hash: String,
    user_id: String,
    status: String,
    amount_sats: i64,
    ts_created: DateTime<Utc>,
}

impl DepositRequestRow {
    fn into_entity(self) -> DepositRequest {
        DepositRequest {
            payment_hash: self.payment_hash,
            user_id: user::Id::new(self.user_id).unwrap(),
            status: match self.status.as_str() {
                "CREATED" => Status::Created,
                "PAID" => Status::Paid,
                "SETTLED" => Status::Settled,
                "PAYMENT_FAILED" => Status::PaymentFailed,
                other => unreachable!("unknown deposit request status {:?}", other),
            },
            amount: Sats(self.amount_sats),
            ts_created: self.ts_created,
        }
    }
}
