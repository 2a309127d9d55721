//! A user's LNURL-pay deposit request (§3 "DepositRequest", §3 Lifecycles). Keyed by
//! `payment_hash` once an invoice has been issued for it (§4.D Deposit 3).

use crate::sats::Sats;
use crate::user;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Paid,
    Settled,
    PaymentFailed,
}

#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub payment_hash: String,
    pub user_id: user::Id,
    pub status: Status,
    pub amount: Sats,
    pub ts_created: DateTime<Utc>,
}

impl DepositRequest {
    pub fn new(payment_hash: String, user_id: user::Id, amount: Sats) -> Self {
        Self {
            payment_hash,
            user_id,
            status: Status::Created,
            amount,
            ts_created: Utc::now(),
        }
    }
}
