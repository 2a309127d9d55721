use thiserror::Error;

/// Marker for the one case that is expected, not a genuine failure: a caller lost the race on an
/// optimistic-concurrency check (e.g. `redeem_withdraw` observing no `VERIFIED` row). Distinct
/// from transient errors so callers can avoid logging it as a warning.
#[derive(Debug, Error)]
#[error("concurrency conflict")]
pub struct ConflictError;
