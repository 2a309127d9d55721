//! A user's outstanding LNURL-withdraw request (§3 "WithdrawRequest", §3 Lifecycles). Keyed by
//! `k1`; most transitions are driven through SQL directly (see `super::redeem_withdraw`) rather
//! than loaded, mutated, and saved back as an entity, since the critical `VERIFIED → QUEUED`
//! transition must be expressed as a single atomic `UPDATE ... RETURNING` to get its
//! concurrency guarantee from the database rather than from in-process state (§9).

use crate::sats::Sats;
use crate::user;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a withdraw request with this k1 already exists")]
    DuplicateK1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Verified,
    Rejected,
    Queued,
    Paid,
    PaymentFailed,
}

#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub k1: String,
    pub user_id: user::Id,
    pub clearnet_url: String,
    pub lnurl: String,
    pub lnurlw: String,
    pub status: Status,
    pub reason: Option<String>,
    pub payment_hash: Option<String>,
    pub bolt11: Option<String>,
    pub amount: Option<Sats>,
    pub destination: Option<String>,
    pub ts_created: DateTime<Utc>,
    pub ts_invoice: Option<DateTime<Utc>>,
    pub ts_paid: Option<DateTime<Utc>>,
    pub redeemed: bool,
}

impl WithdrawRequest {
    pub fn new(
        k1: String,
        user_id: user::Id,
        clearnet_url: String,
        lnurl: String,
        lnurlw: String,
    ) -> Self {
        Self {
            k1,
            user_id,
            clearnet_url,
            lnurl,
            lnurlw,
            status: Status::Created,
            reason: None,
            payment_hash: None,
            bolt11: None,
            amount: None,
            destination: None,
            ts_created: Utc::now(),
            ts_invoice: None,
            ts_paid: None,
            redeemed: false,
        }
    }
}
