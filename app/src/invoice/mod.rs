//! Persisted Lightning invoice rows (§3 "Invoice"), backing both the withdraw and deposit sides
//! of the ledger. `withdrawal`/`deposit` own the transactional writes against this table as part
//! of their larger redeem/finalize transactions; this module just owns the row shape and the
//! plain reads used outside those transactions.

use crate::database;
use crate::ln;

mod entities;

pub use entities::{Direction, Invoice};

pub async fn insert(data_tx: &mut database::Transaction, invoice: &Invoice) {
    sqlx::query(
        r#"INSERT INTO invoices (
            payment_hash, direction, bolt11, destination, num_satoshis, timestamp, expiry,
            description, description_hash, fallback_addr, cltv_expiry, route_hints, payment_addr,
            features, preimage, state
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"#,
    )
    .bind(&invoice.payment_hash)
    .bind(direction_text(invoice.direction))
    .bind(&invoice.bolt11)
    .bind(&invoice.destination)
    .bind(invoice.num_satoshis)
    .bind(invoice.timestamp)
    .bind(invoice.expiry)
    .bind(&invoice.description)
    .bind(&invoice.description_hash)
    .bind(&invoice.fallback_addr)
    .bind(invoice.cltv_expiry)
    .bind(&invoice.route_hints)
    .bind(&invoice.payment_addr)
    .bind(&invoice.features)
    .bind(&invoice.preimage)
    .bind(invoice.state.map(state_text))
    .execute(data_tx)
    .await
    .unwrap();
}

pub async fn get(data_tx: &mut database::Transaction, payment_hash: &str) -> Option<Invoice> {
    sqlx::query_as::<_, InvoiceRow>(
        r#"SELECT payment_hash, direction, bolt11, destination, num_satoshis, timestamp, expiry,
            description, description_hash, fallback_addr, cltv_expiry, route_hints, payment_addr,
            features, preimage, state
            FROM invoices WHERE payment_hash = $1"#,
    )
    .bind(payment_hash)
    .fetch_optional(data_tx)
    .await
    .unwrap()
    .map(|row| row.into_entity())
}

pub async fn set_preimage(data_tx: &mut database::Transaction, payment_hash: &str, preimage: &str) {
    sqlx::query("UPDATE invoices SET preimage = $1 WHERE payment_hash = $2")
        .bind(preimage)
        .bind(payment_hash)
        .execute(data_tx)
        .await
        .unwrap();
}

pub async fn set_state(
    data_tx: &mut database::Transaction,
    payment_hash: &str,
    state: ln::InvoiceState,
) {
    sqlx::query("UPDATE invoices SET state = $1 WHERE payment_hash = $2")
        .bind(state_text(state))
        .bind(payment_hash)
        .execute(data_tx)
        .await
        .unwrap();
}

fn direction_text(direction: Direction) -> &'static str {
    match direction {
        Direction::Withdraw => "WITHDRAW",
        Direction::Deposit => "DEPOSIT",
    }
}

fn state_text(state: ln::InvoiceState) -> &'static str {
    match state {
        ln::InvoiceState::Open => "OPEN",
        ln::InvoiceState::Settled => "SETTLED",
        ln::InvoiceState::Cancelled => "CANCELLED",
    }
}

#[derive(sqlx::FromRow, Debug)]
struct InvoiceRow {
    payment_hash: String,
    direction: String,
    bolt11: String,
    destination: String,
    num_satoshis: i64,
    timestamp: chrono::DateTime<chrono::Utc>,
    expiry: i64,
    description: Option<String>,
    description_hash: Option<String>,
    fallback_addr: Option<String>,
    cltv_expiry: i64,
    route_hints: String,
    payment_addr: Option<String>,
    features: Option<String>,
    preimage: Option<String>,
    state: Option<String>,
}

impl InvoiceRow {
    fn into_entity(self) -> Invoice {
        Invoice {
            payment_hash: self.payment_hash,
            direction: match self.direction.as_str() {
                "WITHDRAW" => Direction::Withdraw,
                "DEPOSIT" => Direction::Deposit,
                other => unreachable!("unknown invoice direction {:?}", other),
            },
            bolt11: self.bolt11,
            destination: self.destination,
            num_satoshis: self.num_satoshis,
            timestamp: self.timestamp,
            expiry: self.expiry,
            description: self.description,
            description_hash: self.description_hash,
            fallback_addr: self.fallback_addr,
            cltv_expiry: self.cltv_expiry,
            route_hints: self.route_hints,
            payment_addr: self.payment_addr,
            features: self.features,
            preimage: self.preimage,
            state: self.state.map(|s| match s.as_str() {
                "OPEN" => ln::InvoiceState::Open,
                "SETTLED" => ln::InvoiceState::Settled,
                "CANCELLED" => ln::InvoiceState::Cancelled,
                other => unreachable!("unknown invoice state {:?}", other),
            }),
        }
    }
}
