//! The withdraw side of LedgerStore (§4.A): creation, the LNURL callback transitions, and the
//! critical atomic redeem. `redeem_withdraw` is "the heart of the system" (§4.A) — precondition
//! check, debit, reservation and payment-row creation all happen in one transaction so that the
//! `VERIFIED → QUEUED` transition happens at most once per `k1` regardless of concurrent callers
//! (§8 invariant 1).

use crate::database::{self, Database};
use crate::sats::Sats;
use crate::{balance, invoice, ln, payment, transaction, user};
use chrono::{DateTime, Duration, Utc};

mod entities;

pub use entities::{Error, Status, WithdrawRequest};

pub enum Selector<'a> {
    K1(&'a str),
    PaymentHash(&'a str),
}

pub async fn create_withdraw_request(db: &Database, req: &WithdrawRequest) -> Result<(), Error> {
    sqlx::query(
        r#"INSERT INTO withdraw_requests (k1, user_id, clearnet_url, lnurl, lnurlw, status, ts_created, redeemed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(&req.k1)
    .bind(req.user_id.as_str())
    .bind(&req.clearnet_url)
    .bind(&req.lnurl)
    .bind(&req.lnurlw)
    .bind(status_text(req.status))
    .bind(req.ts_created)
    .bind(req.redeemed)
    .execute(db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(e) if e.code().as_deref() == Some("23505") => Error::DuplicateK1,
        e => panic!("unexpected error creating withdraw request: {:?}", e),
    })?;
    Ok(())
}

pub async fn get_withdraw_request(db: &Database, k1: &str) -> Option<WithdrawRequest> {
    sqlx::query_as::<_, WithdrawRequestRow>(&format!(
        "SELECT {} FROM withdraw_requests WHERE k1 = $1",
        COLUMNS
    ))
    .bind(k1)
    .fetch_optional(db)
    .await
    .unwrap()
    .map(|row| row.into_entity())
}

async fn get_by_payment_hash(
    data_tx: &mut database::Transaction,
    payment_hash: &str,
) -> Option<WithdrawRequest> {
    sqlx::query_as::<_, WithdrawRequestRow>(&format!(
        "SELECT {} FROM withdraw_requests WHERE payment_hash = $1",
        COLUMNS
    ))
    .bind(payment_hash)
    .fetch_optional(&mut *data_tx)
    .await
    .unwrap()
    .map(|row| row.into_entity())
}

/// Counts requests for `user_id` that have not yet reached a terminal status and were created
/// within `window` of now (§4.A, default window = 5 minutes).
pub async fn count_pending_withdraws(db: &Database, user_id: &user::Id, window: Duration) -> i64 {
    sqlx::query_as::<_, database::CountRow>(
        r#"SELECT COUNT(*) AS count FROM withdraw_requests
            WHERE user_id = $1 AND status NOT IN ('PAID', 'REJECTED', 'PAYMENT_FAILED')
            AND ts_created > $2"#,
    )
    .bind(user_id.as_str())
    .bind(Utc::now() - window)
    .fetch_one(db)
    .await
    .unwrap()
    .count
}

/// Idempotent on `k1`: called from `RequestFlow::SubmitInvoice` before any `status` transition
/// has been attempted, so a repeat call simply re-records the same fields.
pub async fn mark_withdraw_rejected(db: &Database, k1: &str, invoice: &ln::Invoice, reason: &str) {
    sqlx::query(
        r#"UPDATE withdraw_requests SET status = 'REJECTED', reason = $1, payment_hash = $2,
            bolt11 = $3, amount = $4, destination = $5 WHERE k1 = $6"#,
    )
    .bind(reason)
    .bind(&invoice.payment_hash)
    .bind(&invoice.bolt11)
    .bind(invoice.num_satoshis)
    .bind(&invoice.destination)
    .bind(k1)
    .execute(db)
    .await
    .unwrap();
}

/// Transitions a `CREATED` request to `VERIFIED`. Idempotent: repeating the callback against an
/// already-`VERIFIED` row is legal and simply leaves it unchanged (§4.D Withdraw 2 step 4).
pub async fn verify(db: &Database, k1: &str) -> Option<WithdrawRequest> {
    sqlx::query("UPDATE withdraw_requests SET status = 'VERIFIED' WHERE k1 = $1 AND status = 'CREATED'")
        .bind(k1)
        .execute(db)
        .await
        .unwrap();
    get_withdraw_request(db, k1).await
}

/// The atomic redeem contract (§4.A). Returns `None` if no `VERIFIED` row for `k1` exists (either
/// it never did, or another concurrent caller already won the race) or if the debit would leave
/// the balance negative.
pub async fn redeem_withdraw(
    db: &Database,
    k1: &str,
    decoded: &ln::Invoice,
) -> Option<WithdrawRequest> {
    let mut data_tx = db.begin().await.unwrap();

    let row = sqlx::query_as::<_, WithdrawRequestRow>(&format!(
        r#"UPDATE withdraw_requests SET redeemed = true, payment_hash = $1, bolt11 = $2,
            ts_invoice = $3, amount = $4, destination = $5, status = 'QUEUED'
            WHERE k1 = $6 AND status = 'VERIFIED'
            RETURNING {}"#,
        COLUMNS
    ))
    .bind(&decoded.payment_hash)
    .bind(&decoded.bolt11)
    .bind(Utc::now())
    .bind(decoded.num_satoshis)
    .bind(&decoded.destination)
    .bind(k1)
    .fetch_optional(&mut data_tx)
    .await
    .unwrap();

    let request = row?.into_entity();

    let debited = sqlx::query_as::<_, database::SumRow<i64>>(
        "UPDATE users SET balance_sats = balance_sats - $1 WHERE id = $2 AND balance_sats >= $1
            RETURNING balance_sats AS sum",
    )
    .bind(decoded.num_satoshis)
    .bind(request.user_id.as_str())
    .fetch_optional(&mut data_tx)
    .await
    .unwrap();

    if debited.is_none() {
        data_tx.rollback().await.unwrap();
        return None;
    }

    invoice::insert(
        &mut data_tx,
        &invoice::Invoice::from_decoded(decoded.clone(), invoice::Direction::Withdraw),
    )
    .await;

    // payments must exist before locked_balances: locked_balances.payment_hash references
    // payments, and the FK is checked at statement end, not at commit.
    payment::insert(
        &mut data_tx,
        &payment::Payment::initiated(
            request.user_id.clone(),
            decoded.payment_hash.clone(),
            Sats(decoded.num_satoshis),
        ),
    )
    .await;

    balance::lock_balance(
        &mut data_tx,
        &balance::LockedBalance {
            payment_hash: decoded.payment_hash.clone(),
            user_id: request.user_id.clone(),
            amount: Sats(decoded.num_satoshis),
        },
    )
    .await;

    data_tx.commit().await.unwrap();
    Some(request)
}

pub async fn update_withdraw_status(db: &Database, selector: Selector<'_>, status: Status, reason: Option<&str>) {
    match selector {
        Selector::K1(k1) => {
            sqlx::query("UPDATE withdraw_requests SET status = $1, reason = $2 WHERE k1 = $3")
                .bind(status_text(status))
                .bind(reason)
                .bind(k1)
                .execute(db)
                .await
                .unwrap();
        }
        Selector::PaymentHash(payment_hash) => {
            sqlx::query(
                "UPDATE withdraw_requests SET status = $1, reason = $2 WHERE payment_hash = $3",
            )
            .bind(status_text(status))
            .bind(reason)
            .bind(payment_hash)
            .execute(db)
            .await
            .unwrap();
        }
    }
}

/// Driven by `PaymentReconciler` on a `SUCCEEDED` payment status (§4.E). Idempotent: a duplicate
/// delivery observes `payment::mark_succeeded` return `false` and does nothing further (§8
/// property 3).
pub async fn finalize_payment(
    db: &Database,
    payment_hash: &str,
    preimage: &str,
    fee_sat: Sats,
) {
    let mut data_tx = db.begin().await.unwrap();

    if !payment::mark_succeeded(&mut data_tx, payment_hash, preimage, fee_sat).await {
        data_tx.commit().await.unwrap();
        return;
    }

    let locked_amount = balance::release_locked_balance(&mut data_tx, payment_hash).await;
    let request = get_by_payment_hash(&mut data_tx, payment_hash).await;

    if let Some(request) = request {
        let amount = locked_amount.unwrap_or(request.amount.unwrap_or(Sats(0)));
        transaction::insert(
            &mut data_tx,
            &transaction::Transaction::new(
                request.user_id.clone(),
                payment_hash.to_owned(),
                transaction::Direction::Withdraw,
                amount,
            ),
        )
        .await;
        sqlx::query("UPDATE withdraw_requests SET status = 'PAID', ts_paid = $1 WHERE k1 = $2")
            .bind(Utc::now())
            .bind(&request.k1)
            .execute(&mut data_tx)
            .await
            .unwrap();
    }

    invoice::set_preimage(&mut data_tx, payment_hash, preimage).await;

    data_tx.commit().await.unwrap();
}

/// Driven by `PaymentReconciler` on a `FAILED` payment status (§4.E). Credits the locked amount
/// back to the user's spendable balance.
pub async fn fail_payment(db: &Database, payment_hash: &str, reason: &str) {
    let mut data_tx = db.begin().await.unwrap();

    if !payment::mark_failed(&mut data_tx, payment_hash, reason).await {
        data_tx.commit().await.unwrap();
        return;
    }

    if let Some(amount) = balance::release_locked_balance(&mut data_tx, payment_hash).await {
        if let Some(request) = get_by_payment_hash(&mut data_tx, payment_hash).await {
            let mut user_balance = balance::get(&mut data_tx, &request.user_id).await;
            user_balance.credit(amount);
            balance::update(&mut data_tx, &user_balance).await.unwrap();
        }
    }

    sqlx::query("UPDATE withdraw_requests SET status = 'PAYMENT_FAILED' WHERE payment_hash = $1")
        .bind(payment_hash)
        .execute(&mut data_tx)
        .await
        .unwrap();

    data_tx.commit().await.unwrap();
}

fn status_text(status: Status) -> &'static str {
    match status {
        Status::Created => "CREATED",
        Status::Verified => "VERIFIED",
        Status::Rejected => "REJECTED",
        Status::Queued => "QUEUED",
        Status::Paid => "PAID",
        Status::PaymentFailed => "PAYMENT_FAILED",
    }
}

const COLUMNS: &str = "k1, user_id, clearnet_url, lnurl, lnurlw, status, reason, payment_hash, bolt11, amount, destination, ts_created, ts_invoice, ts_paid, redeemed";

#[derive(sqlx::FromRow, Debug)]
struct WithdrawRequestRow {
    k1: String,
    user_id: String,
    clearnet_url: String,
    lnurl: String,
    lnurlw: String,
    status: String,
    reason: Option<String>,
    payment_hash: Option<String>,
    bolt11: Option<String>,
    amount: Option<i64>,
    destination: Option<String>,
    ts_created: DateTime<Utc>,
    ts_invoice: Option<DateTime<Utc>>,
    ts_paid: Option<DateTime<Utc>>,
    redeemed: bool,
}

impl WithdrawRequestRow {
    fn into_entity(self) -> WithdrawRequest {
        WithdrawRequest {
            k1: self.k1,
            user_id: user::Id::new(self.user_id).unwrap(),
            clearnet_url: self.clearnet_url,
            lnurl: self.lnurl,
            lnurlw: self.lnurlw,
            status: match self.status.as_str() {
                "CREATED" => Status::Created,
                "VERIFIED" => Status::Verified,
                "REJECTED" => Status::Rejected,
                "QUEUED" => Status::Queued,
                "PAID" => Status::Paid,
                "PAYMENT_FAILED" => Status::PaymentFailed,
                other => unreachable!("unknown withdraw request status {:?}", other),
            },
            reason: self.reason,
            payment_hash: self.payment_hash,
            bolt11: self.bolt11,
            amount: self.amount.map(Sats),
            destination: self.destination,
            ts_created: self.ts_created,
            ts_invoice: self.ts_invoice,
            ts_paid: self.ts_paid,
            redeemed: self.redeemed,
        }
    }
}
