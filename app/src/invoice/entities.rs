//! Persisted form of a decoded Lightning invoice (§3 "Invoice"). One shared table backs both the
//! withdraw-side invoice (attached to a `WithdrawRequest` on redeem) and the deposit-side invoice
//! (attached to a `DepositRequest` on issuance); `direction` distinguishes the two uses, since both
//! key on the same `payment_hash` and carry an otherwise identical field set.

use crate::ln;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Withdraw,
    Deposit,
}

#[derive(Debug, Clone)]
pub struct Invoice {
    pub payment_hash: String,
    pub direction: Direction,
    pub bolt11: String,
    pub destination: String,
    pub num_satoshis: i64,
    pub timestamp: DateTime<Utc>,
    pub expiry: i64,
    pub description: Option<String>,
    pub description_hash: Option<String>,
    pub fallback_addr: Option<String>,
    pub cltv_expiry: i64,
    pub route_hints: String,
    pub payment_addr: Option<String>,
    pub features: Option<String>,
    pub preimage: Option<String>,
    pub state: Option<ln::InvoiceState>,
}

impl Invoice {
    pub fn from_decoded(decoded: ln::Invoice, direction: Direction) -> Self {
        Self {
            payment_hash: decoded.payment_hash,
            direction,
            bolt11: decoded.bolt11,
            destination: decoded.destination,
            num_satoshis: decoded.num_satoshis,
            timestamp: decoded.timestamp,
            expiry: decoded.expiry,
            description: decoded.description,
            description_hash: decoded.description_hash,
            fallback_addr: decoded.fallback_addr,
            cltv_expiry: decoded.cltv_expiry,
            route_hints: decoded.route_hints,
            payment_addr: decoded.payment_addr,
            features: decoded.features,
            preimage: decoded.preimage,
            state: decoded.state,
        }
    }
}
