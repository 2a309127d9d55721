//! An outgoing Lightning payment (§3 "Payment"). Rows are created with `status=INITIATED` inside
//! `withdrawal::redeem_withdraw` and driven to a terminal status only by `PaymentReconciler`
//! consuming `NodeClient::track_payments` (§4.E); `IN_FLIGHT` events are informational and never
//! change the persisted row (§4.E).

use crate::sats::Sats;
use crate::user;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Initiated,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_hash: String,
    pub user_id: user::Id,
    pub preimage: Option<String>,
    pub value_sat: Sats,
    pub status: Status,
    pub fee_sat: Option<Sats>,
    pub ts_create: DateTime<Utc>,
    pub failure_reason: Option<String>,
}

impl Payment {
    pub fn initiated(user_id: user::Id, payment_hash: String, value_sat: Sats) -> Self {
        Self {
            payment_hash,
            user_id,
            preimage: None,
            value_sat,
            status: Status::Initiated,
            fee_sat: None,
            ts_create: Utc::now(),
            failure_reason: None,
        }
    }
}
