//! Development fixtures only (§10.A: seeded when a debug feature/flag is enabled). Seeds a couple
//! of users with a starting balance so the LNURL handshake can be exercised against a freshly
//! migrated database without a real auth collaborator minting accounts first.

use super::{Database, Transaction};

const SEED_USERS: &[(&str, i64)] = &[("u1", 1_000_000), ("u2", 1_000_000)];

pub async fn seed_development_data(db: &Database) {
    let mut data_tx = db.begin().await.unwrap();
    for (user_id, balance_sats) in SEED_USERS {
        seed_user(&mut data_tx, user_id, *balance_sats).await;
    }
    data_tx.commit().await.unwrap();
}

async fn seed_user(data_tx: &mut Transaction, user_id: &str, balance_sats: i64) {
    sqlx::query("INSERT INTO users (id, balance_sats) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(user_id)
        .bind(balance_sats)
        .execute(&mut *data_tx)
        .await
        .unwrap();
}
