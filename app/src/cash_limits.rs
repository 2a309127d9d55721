//! Range checks on satoshi amounts for the withdraw and deposit flows. Distinct from
//! [`crate::ledger`] bookkeeping: these are pure, stateless guards applied before a ledger call is
//! even attempted.

use crate::sats::Sats;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("amount too low")]
    AmountTooLow,
    #[error("amount too high")]
    AmountTooHigh,
}

/// The numeric constants from the external-interfaces contract, loaded from configuration with
/// the spec's own values as defaults.
#[derive(Debug, Clone, Copy)]
pub struct CashLimits {
    pub min_withdraw_sats: Sats,
    pub fee_limit_sats: Sats,
    pub min_sendable_sats: Sats,
    pub max_sendable_sats: Sats,
}

impl Default for CashLimits {
    fn default() -> Self {
        Self {
            min_withdraw_sats: Sats(50_000),
            fee_limit_sats: Sats(10_000),
            min_sendable_sats: Sats(10_000),
            max_sendable_sats: Sats(100_000_000),
        }
    }
}

impl CashLimits {
    /// Guards `MIN_WITHDRAW_SATS ≤ amount ≤ balance` (Withdraw 3 step 5).
    pub fn check_withdraw(&self, amount: Sats, balance: Sats) -> Result<(), Error> {
        if amount < self.min_withdraw_sats {
            Err(Error::AmountTooLow)
        } else if amount > balance {
            Err(Error::AmountTooHigh)
        } else {
            Ok(())
        }
    }

    /// Guards the deposit invoice amount requested at `/deposit/ln` (Deposit 3).
    pub fn check_sendable(&self, amount: Sats) -> Result<(), Error> {
        if amount < self.min_sendable_sats {
            Err(Error::AmountTooLow)
        } else if amount > self.max_sendable_sats {
            Err(Error::AmountTooHigh)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdraw_below_minimum_is_rejected() {
        let limits = CashLimits::default();
        assert_eq!(
            limits.check_withdraw(Sats(1_000), Sats(1_000_000)),
            Err(Error::AmountTooLow)
        );
    }

    #[test]
    fn withdraw_above_balance_is_rejected() {
        let limits = CashLimits::default();
        assert_eq!(
            limits.check_withdraw(Sats(60_000), Sats(59_999)),
            Err(Error::AmountTooHigh)
        );
    }

    #[test]
    fn sendable_within_range_is_accepted() {
        let limits = CashLimits::default();
        assert!(limits.check_sendable(Sats(20_000)).is_ok());
    }
}
