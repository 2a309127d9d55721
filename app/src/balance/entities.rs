//! The user's spendable balance, plus [`LockedBalance`]: the reservation proof that sats have
//! left the spendable balance pending an outgoing payment's outcome (§3 "LockedBalance").

use crate::sats::Sats;
use crate::user;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("insufficient balance")]
pub struct InsufficientBalance;

/// Notice that this struct stores the original amount as well as any updates done on the
/// balance. This allows us to write SQL queries that avoid concurrency issues - a balance is
/// only updated successfully if no other process updated the balance in between the time it
/// was loaded and the time the update was attempted (see [`super::update`]).
#[derive(Debug, Clone)]
pub struct Balance {
    user_id: user::Id,
    original_amount: Sats,
    amount: Sats,
}

impl Balance {
    pub fn new(user_id: user::Id, amount: Sats) -> Self {
        Self {
            user_id,
            original_amount: amount,
            amount,
        }
    }

    pub fn user_id(&self) -> &user::Id {
        &self.user_id
    }

    pub fn original_amount(&self) -> Sats {
        self.original_amount
    }

    pub fn amount(&self) -> Sats {
        self.amount
    }

    pub fn changed(&self) -> bool {
        self.original_amount != self.amount
    }

    pub fn credit(&mut self, amount: Sats) {
        self.amount += amount;
    }

    /// Debits the balance in place. Fails without mutating anything if the amount exceeds the
    /// current balance (invariant 6, §3: a user's balance is non-negative at every committed
    /// checkpoint).
    pub fn debit(&mut self, amount: Sats) -> Result<(), InsufficientBalance> {
        if amount > self.amount {
            return Err(InsufficientBalance);
        }
        self.amount -= amount;
        Ok(())
    }
}

/// A reservation against a user's balance for the duration of an outgoing payment (§3
/// "LockedBalance"). Present only while the payment is in flight; removed on both success
/// ([`super::release_locked_balance`] is not called, the row is deleted by `finalize_payment`)
/// and failure (released and credited back by `fail_payment`).
#[derive(Debug, Clone)]
pub struct LockedBalance {
    pub payment_hash: String,
    pub user_id: user::Id,
    pub amount: Sats,
}
