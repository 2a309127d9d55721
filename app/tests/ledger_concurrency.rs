//! Integration tests against a live Postgres instance (§8, §10.D). These exercise the
//! transactional guarantees that no amount of in-process mocking can stand in for: the
//! `VERIFIED → QUEUED` race in `redeem_withdraw` (invariant 1) and the idempotency of the
//! stream-reconciliation paths (invariants 3 and 4) under duplicate delivery.
//!
//! Run with a reachable database: `DATABASE_URL=postgres://... cargo test -- --ignored`.

use app::sats::Sats;
use app::{challenge, database, deposit, ln, payment, user, withdrawal};
use url::Url;

async fn test_db() -> database::Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = database::connect(&Url::parse(&url).unwrap()).await;
    database::run_migrations(&db).await;
    db
}

async fn seed_user(db: &database::Database, balance_sats: i64) -> user::Id {
    let id = user::Id::new(challenge::random_k1()[..32].to_owned()).unwrap();
    sqlx::query("INSERT INTO users (id, balance_sats) VALUES ($1, $2)")
        .bind(id.as_str())
        .bind(balance_sats)
        .execute(db)
        .await
        .unwrap();
    id
}

async fn current_balance(db: &database::Database, user_id: &user::Id) -> i64 {
    sqlx::query_as::<_, (i64,)>("SELECT balance_sats FROM users WHERE id = $1")
        .bind(user_id.as_str())
        .fetch_one(db)
        .await
        .unwrap()
        .0
}

fn invoice_for(payment_hash: &str, num_satoshis: i64) -> ln::Invoice {
    ln::Invoice {
        payment_hash: payment_hash.to_owned(),
        bolt11: format!("lnfaketest1{}", payment_hash),
        destination: "a".repeat(66),
        num_satoshis,
        timestamp: chrono::Utc::now(),
        expiry: 3600,
        description: None,
        description_hash: None,
        fallback_addr: None,
        cltv_expiry: 40,
        route_hints: String::new(),
        payment_addr: None,
        features: None,
        preimage: None,
        state: None,
    }
}

async fn verified_withdraw_request(db: &database::Database, user_id: &user::Id) -> String {
    let k1 = challenge::random_k1();
    let req = withdrawal::WithdrawRequest::new(
        k1.clone(),
        user_id.clone(),
        format!("https://fancy.domain/withdraw/ln/cb?k1={}", k1),
        format!("lightning:LNURL1{}", k1),
        format!("lnurlw://fancy.domain/withdraw/ln/cb?k1={}", k1),
    );
    withdrawal::create_withdraw_request(db, &req).await.unwrap();
    withdrawal::verify(db, &k1).await.unwrap();
    k1
}

/// §8 invariant 1 / scenario S4: of N concurrent `redeem_withdraw` calls against the same
/// `VERIFIED` request, exactly one observes the row and debits the balance; the rest see no
/// `VERIFIED` row and return `None`.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn only_one_concurrent_redeem_wins_the_race() {
    let db = test_db().await;
    let user_id = seed_user(&db, 1_000_000).await;
    let k1 = verified_withdraw_request(&db, &user_id).await;
    let payment_hash = challenge::random_k1();
    let invoice = invoice_for(&payment_hash, 60_000);

    const CONCURRENCY: usize = 8;
    let mut tasks = Vec::with_capacity(CONCURRENCY);
    for _ in 0..CONCURRENCY {
        let db = db.clone();
        let k1 = k1.clone();
        let invoice = invoice.clone();
        tasks.push(tokio::spawn(async move {
            withdrawal::redeem_withdraw(&db, &k1, &invoice).await
        }));
    }

    let mut wins = 0;
    for task in tasks {
        if task.await.unwrap().is_some() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1, "exactly one concurrent redeemer should win the race");
    assert_eq!(current_balance(&db, &user_id).await, 940_000);

    let locked = sqlx::query_as::<_, (i64,)>(
        "SELECT amount_sats FROM locked_balances WHERE payment_hash = $1",
    )
    .bind(&payment_hash)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(locked.0, 60_000);
}

/// §8 invariant 2: redeeming an amount above the user's balance leaves the ledger untouched.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn redeem_aborts_when_it_would_overdraw_the_balance() {
    let db = test_db().await;
    let user_id = seed_user(&db, 10_000).await;
    let k1 = verified_withdraw_request(&db, &user_id).await;
    let payment_hash = challenge::random_k1();
    let invoice = invoice_for(&payment_hash, 60_000);

    let result = withdrawal::redeem_withdraw(&db, &k1, &invoice).await;
    assert!(result.is_none());
    assert_eq!(current_balance(&db, &user_id).await, 10_000);
}

/// §8 invariant 3 / scenario S5: replaying a `SUCCEEDED` payment event is a no-op the second
/// time — the withdraw stays `PAID` and no second Transaction row is inserted.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn duplicate_finalize_payment_is_idempotent() {
    let db = test_db().await;
    let user_id = seed_user(&db, 1_000_000).await;
    let k1 = verified_withdraw_request(&db, &user_id).await;
    let payment_hash = challenge::random_k1();
    let invoice = invoice_for(&payment_hash, 60_000);
    withdrawal::redeem_withdraw(&db, &k1, &invoice).await.unwrap();

    withdrawal::finalize_payment(&db, &payment_hash, "preimage", Sats(10)).await;
    withdrawal::finalize_payment(&db, &payment_hash, "preimage", Sats(10)).await;

    let request = withdrawal::get_withdraw_request(&db, &k1).await.unwrap();
    assert_eq!(request.status, withdrawal::Status::Paid);
    assert_eq!(current_balance(&db, &user_id).await, 940_000);

    let count = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM transactions WHERE payment_hash = $1",
    )
    .bind(&payment_hash)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(count.0, 1);
}

/// §8 scenario S6: a `FAILED` payment event releases the lock and credits the balance back.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn fail_payment_credits_the_locked_amount_back() {
    let db = test_db().await;
    let user_id = seed_user(&db, 1_000_000).await;
    let k1 = verified_withdraw_request(&db, &user_id).await;
    let payment_hash = challenge::random_k1();
    let invoice = invoice_for(&payment_hash, 60_000);
    withdrawal::redeem_withdraw(&db, &k1, &invoice).await.unwrap();
    assert_eq!(current_balance(&db, &user_id).await, 940_000);

    withdrawal::fail_payment(&db, &payment_hash, "no route").await;

    assert_eq!(current_balance(&db, &user_id).await, 1_000_000);
    let request = withdrawal::get_withdraw_request(&db, &k1).await.unwrap();
    assert_eq!(request.status, withdrawal::Status::PaymentFailed);
}

/// §8 invariant 4 / scenario S5 deposit analogue: replaying a `SETTLED` deposit invoice credits
/// the balance exactly once.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn duplicate_deposit_finalize_is_idempotent() {
    let db = test_db().await;
    let user_id = seed_user(&db, 0).await;
    let payment_hash = challenge::random_k1();
    let decoded = invoice_for(&payment_hash, 25_000);
    let req = deposit::DepositRequest::new(payment_hash.clone(), user_id.clone(), Sats(25_000));
    deposit::create_deposit_request(&db, &req, &decoded).await;

    deposit::deposit_finalize(&db, &decoded).await;
    deposit::deposit_finalize(&db, &decoded).await;

    assert_eq!(current_balance(&db, &user_id).await, 25_000);
    let request = deposit::get_deposit_request(&db, &payment_hash).await.unwrap();
    assert_eq!(request.status, deposit::Status::Settled);
}

/// `payment::insert` rejects a second row sharing a `payment_hash` (§3 invariant 5).
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn payments_cannot_share_a_payment_hash() {
    let db = test_db().await;
    let user_id = seed_user(&db, 1_000_000).await;
    let payment_hash = challenge::random_k1();
    let mut data_tx = db.begin().await.unwrap();
    payment::insert(
        &mut data_tx,
        &payment::Payment::initiated(user_id.clone(), payment_hash.clone(), Sats(1_000)),
    )
    .await;
    data_tx.commit().await.unwrap();

    let mut data_tx = db.begin().await.unwrap();
    let result = sqlx::query(
        "INSERT INTO payments (payment_hash, user_id, value_sat, status, ts_create)
            VALUES ($1, $2, $3, 'INITIATED', now())",
    )
    .bind(&payment_hash)
    .bind(user_id.as_str())
    .bind(1_000_i64)
    .execute(&mut data_tx)
    .await;
    assert!(result.is_err());
}

/// A withdraw's transition `VERIFIED -> QUEUED` is the only path `redeemed` can flip to `true`
/// on (§3 invariant 4); `mark_withdraw_rejected` never touches it.
#[tokio::test]
#[ignore = "requires a live Postgres instance (DATABASE_URL)"]
async fn rejected_withdraw_request_stays_unredeemed() {
    let db = test_db().await;
    let user_id = seed_user(&db, 1_000).await;
    let k1 = verified_withdraw_request(&db, &user_id).await;
    let payment_hash = challenge::random_k1();
    let invoice = invoice_for(&payment_hash, 60_000);

    withdrawal::mark_withdraw_rejected(&db, &k1, &invoice, "Insufficient balance").await;

    let request = withdrawal::get_withdraw_request(&db, &k1).await.unwrap();
    assert_eq!(request.status, withdrawal::Status::Rejected);
    assert!(!request.redeemed);
}
