use crate::database;

mod entities;

pub use entities::{Payment, Status};

/// Inserts the row created as the final step of `withdrawal::redeem_withdraw` (§4.A step 6).
pub async fn insert(data_tx: &mut database::Transaction, payment: &Payment) {
    sqlx::query(
        r#"INSERT INTO payments (payment_hash, user_id, preimage, value_sat, status, fee_sat, ts_create, failure_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(&payment.payment_hash)
    .bind(payment.user_id.as_str())
    .bind(&payment.preimage)
    .bind(payment.value_sat.0)
    .bind(status_text(payment.status))
    .bind(payment.fee_sat.map(|fee| fee.0))
    .bind(payment.ts_create)
    .bind(&payment.failure_reason)
    .execute(data_tx)
    .await
    .unwrap();
}

pub async fn get(data_tx: &mut database::Transaction, payment_hash: &str) -> Option<Payment> {
    sqlx::query_as::<_, PaymentRow>(
        r#"SELECT payment_hash, user_id, preimage, value_sat, status, fee_sat, ts_create, failure_reason
            FROM payments WHERE payment_hash = $1"#,
    )
    .bind(payment_hash)
    .fetch_optional(data_tx)
    .await
    .unwrap()
    .map(|row| row.into_entity())
}

/// Marks a payment `SUCCEEDED`. A no-op (zero rows touched) if it is already in that state,
/// which makes duplicate stream delivery idempotent (§8 property 3).
pub async fn mark_succeeded(
    data_tx: &mut database::Transaction,
    payment_hash: &str,
    preimage: &str,
    fee_sat: crate::sats::Sats,
) -> bool {
    sqlx::query(
        "UPDATE payments SET status = 'SUCCEEDED', preimage = $1, fee_sat = $2
            WHERE payment_hash = $3 AND status != 'SUCCEEDED'",
    )
    .bind(preimage)
    .bind(fee_sat.0)
    .bind(payment_hash)
    .execute(&mut *data_tx)
    .await
    .unwrap()
    .rows_affected()
        > 0
}

/// Marks a payment `FAILED`. A no-op if already terminal.
pub async fn mark_failed(
    data_tx: &mut database::Transaction,
    payment_hash: &str,
    reason: &str,
) -> bool {
    sqlx::query(
        "UPDATE payments SET status = 'FAILED', failure_reason = $1
            WHERE payment_hash = $2 AND status NOT IN ('SUCCEEDED', 'FAILED')",
    )
    .bind(reason)
    .bind(payment_hash)
    .execute(&mut *data_tx)
    .await
    .unwrap()
    .rows_affected()
        > 0
}

fn status_text(status: Status) -> &'static str {
    match status {
        Status::Initiated => "INITIATED",
        Status::InFlight => "IN_FLIGHT",
        Status::Succeeded => "SUCCEEDED",
        Status::Failed => "FAILED",
    }
}

#[derive(sqlx::FromRow, Debug)]
struct PaymentRow {
    payment_hash: String,
    user_id: String,
    preimage: Option<String>,
    value_sat: i64,
    status: String,
    fee_sat: Option<i64>,
    ts_create: chrono::DateTime<chrono::Utc>,
    failure_reason: Option<String>,
}

impl PaymentRow {
    fn into_entity(self) -> Payment {
        Payment {
            payment_hash: self.payment_hash,
            user_id: crate::user::Id::new(self.user_id).unwrap(),
            preimage: self.preimage,
            value_sat: crate::sats::Sats(self.value_sat),
            status: match self.status.as_str() {
                "INITIATED" => Status::Initiated,
                "IN_FLIGHT" => Status::InFlight,
                "SUCCEEDED" => Status::Succeeded,
                "FAILED" => Status::Failed,
                other => unreachable!("unknown payment status {:?}", other),
            },
            fee_sat: self.fee_sat.map(crate::sats::Sats),
            ts_create: self.ts_create,
            failure_reason: self.failure_reason,
        }
    }
}
