//! Implements the six operations of the LNURL-wallet handshake (§4.D). Each function is an
//! independent entry point from the HTTP boundary and takes a [`Context`] bundling every
//! collaborator it needs; nothing here is a hidden singleton (§9).

use crate::cash_limits::CashLimits;
use crate::database::Database;
use crate::rate_limit::RateLimiter;
use crate::sats::Sats;
use crate::{challenge, deposit, ln, lnurl, session, user, withdrawal};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type WithdrawRateLimiter = Arc<RateLimiter<user::Id>>;

/// The literal floor on `/deposit/ln`'s `amount` query parameter (§6 external interfaces table),
/// independent of `CashLimits::min_sendable_sats`.
const MIN_DEPOSIT_AMOUNT_SATS: i64 = 100_000;

const DEFAULT_WITHDRAW_DESCRIPTION: &str = "Some withdraw description";

#[derive(Clone)]
pub struct Config {
    pub schema: String,
    pub domain: String,
    pub limits: CashLimits,
    pub challenge_ttl: Duration,
    pub withdraw_rate_window: Duration,
    pub pending_window: ChronoDuration,
    pub fee_limit_sats: Sats,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: "https://".to_owned(),
            domain: String::new(),
            limits: CashLimits::default(),
            challenge_ttl: Duration::from_secs(600),
            withdraw_rate_window: Duration::from_secs(60),
            pending_window: ChronoDuration::minutes(5),
            fee_limit_sats: Sats(10_000),
        }
    }
}

/// The runtime object owning every collaborator RequestFlow calls into, constructed once at
/// startup (§9: "a process-scoped runtime object... no hidden singletons").
pub struct Context {
    pub db: Database,
    pub cache: session::SessionCache,
    pub node: Arc<dyn ln::NodeClient>,
    pub withdraw_limiter: WithdrawRateLimiter,
    pub config: Config,
}

/// Error kinds per §7's taxonomy. Each variant's doc names the kind it belongs to, rather than
/// the SQL/transport detail that produced it (§10.B).
#[derive(Debug, Error)]
pub enum Error {
    /// Precondition: RateLimiter denied the call.
    #[error("rate limited")]
    RateLimited,
    /// Precondition: balance below `MIN_WITHDRAW_SATS`.
    #[error("insufficient balance")]
    InsufficientBalance,
    /// Precondition: a non-terminal WithdrawRequest already exists for this user.
    #[error("pending request exists")]
    PendingRequestExists,
    /// Precondition: the challenge is missing, expired, or the request has left a re-callable
    /// status.
    #[error("request expired")]
    RequestExpired,
    /// InputInvalid: the bolt11 string failed to parse.
    #[error("invoice decode error")]
    InvoiceDecodeError,
    /// InputInvalid: amount outside the allowed range.
    #[error("amount out of range")]
    InputInvalid,
    /// Conflict: a concurrent redeem already won the race for this `k1`.
    #[error("invalid request")]
    Conflict,
    /// NodeFailure: the node returned no result for decode/create.
    #[error("node failure")]
    NodeFailure,
    /// Transient: the cache or database was unavailable.
    #[error("service unavailable")]
    Transient,
}

impl Error {
    /// The short, non-sensitive reason surfaced in an `LnurlErrorResponse` (§7, §10.B). The
    /// underlying cause is logged by the caller, never serialized into the response body.
    pub fn lnurl_reason(&self) -> &'static str {
        match self {
            Error::RateLimited => "Please try in a few minutes",
            Error::InsufficientBalance => "Insufficient balance",
            Error::PendingRequestExists => "A withdraw request is already pending",
            Error::RequestExpired => "Request expired",
            Error::InvoiceDecodeError => "Invoice decode error",
            Error::InputInvalid => "Invalid amount",
            Error::Conflict => "Invalid request",
            Error::NodeFailure => "Unable to reach the Lightning node",
            Error::Transient => "Service temporarily unavailable",
        }
    }
}

pub struct WithdrawRequestCreated {
    pub lnurl: String,
    pub lnurlw: String,
}

pub struct WithdrawCallback {
    pub callback: String,
    pub k1: String,
    pub max_withdrawable: i64,
    pub min_withdrawable: i64,
    pub default_description: String,
}

pub struct DepositRequestCreated {
    pub lnurl: String,
    pub lnurlp: String,
}

pub struct DepositCallback {
    pub callback: String,
    pub min_sendable: i64,
    pub max_sendable: i64,
    pub metadata: String,
}

pub struct DepositInvoiceIssued {
    pub bolt11: String,
}

/// Withdraw 1 — CreateWithdrawRequest (§4.D).
pub async fn create_withdraw_request(
    ctx: &Context,
    user_id: &user::Id,
) -> Result<WithdrawRequestCreated, Error> {
    if ctx.withdraw_limiter.register(user_id.clone()) {
        return Err(Error::RateLimited);
    }

    let balance = ctx.cache.get_balance_snapshot(&ctx.db, user_id).await;
    if balance < ctx.config.limits.min_withdraw_sats.0 {
        return Err(Error::InsufficientBalance);
    }

    let pending =
        withdrawal::count_pending_withdraws(&ctx.db, user_id, ctx.config.pending_window).await;
    if pending > 0 {
        return Err(Error::PendingRequestExists);
    }

    let k1 = challenge::random_k1();
    let clearnet_url = format!(
        "{}{}/withdraw/ln/cb?k1={}",
        ctx.config.schema, ctx.config.domain, k1
    );
    let lnurl = format!("lightning:{}", lnurl::encode(&clearnet_url));
    let lnurlw = format!(
        "lnurlw://{}/withdraw/ln/cb?k1={}",
        ctx.config.domain, k1
    );

    let request = withdrawal::WithdrawRequest::new(
        k1.clone(),
        user_id.clone(),
        clearnet_url,
        lnurl.clone(),
        lnurlw.clone(),
    );
    withdrawal::create_withdraw_request(&ctx.db, &request)
        .await
        .map_err(|_| Error::Conflict)?;

    ctx.cache
        .set_challenge(&k1, user_id, ctx.config.challenge_ttl)
        .await
        .map_err(|_| Error::Transient)?;

    Ok(WithdrawRequestCreated { lnurl, lnurlw })
}

/// Withdraw 2 — LnurlwCallback, invoked by the wallet (§4.D).
pub async fn lnurlw_callback(ctx: &Context, k1: &str) -> Result<WithdrawCallback, Error> {
    ctx.cache
        .get_challenge(k1)
        .await
        .map_err(|_| Error::Transient)?
        .ok_or(Error::RequestExpired)?;

    let request = withdrawal::get_withdraw_request(&ctx.db, k1)
        .await
        .ok_or(Error::RequestExpired)?;
    if !matches!(
        request.status,
        withdrawal::Status::Created | withdrawal::Status::Verified
    ) {
        // invariant 6 (§8): a k1 that has left CREATED/VERIFIED cannot be re-verified.
        return Err(Error::RequestExpired);
    }

    let balance = ctx.cache.get_balance_snapshot(&ctx.db, &request.user_id).await;
    if balance < ctx.config.limits.min_withdraw_sats.0 {
        return Err(Error::InsufficientBalance);
    }

    let request = withdrawal::verify(&ctx.db, k1)
        .await
        .ok_or(Error::RequestExpired)?;

    Ok(WithdrawCallback {
        callback: format!("{}{}/withdraw/ln", ctx.config.schema, ctx.config.domain),
        k1: request.k1,
        max_withdrawable: balance,
        min_withdrawable: ctx.config.limits.min_withdraw_sats.0,
        default_description: DEFAULT_WITHDRAW_DESCRIPTION.to_owned(),
    })
}

/// Withdraw 3 — SubmitInvoice (§4.D). The session lock is held by `_lock` for the remainder of
/// this function and released on drop regardless of which branch returns (§5, §10.E).
pub async fn submit_invoice(ctx: &Context, k1: &str, bolt11: &str) -> Result<(), Error> {
    let user_id = ctx
        .cache
        .get_challenge(k1)
        .await
        .map_err(|_| Error::Transient)?
        .ok_or(Error::RequestExpired)?;

    let decoded = ctx
        .node
        .decode_invoice(bolt11)
        .await
        .ok_or(Error::InvoiceDecodeError)?;

    let _lock = ctx
        .cache
        .lock_session(&user_id)
        .await
        .map_err(|_| Error::Transient)?;

    let balance = ctx.cache.get_balance_snapshot(&ctx.db, &user_id).await;
    if let Err(e) = ctx
        .config
        .limits
        .check_withdraw(Sats(decoded.num_satoshis), Sats(balance))
    {
        withdrawal::mark_withdraw_rejected(&ctx.db, k1, &decoded, &e.to_string()).await;
        return Err(Error::InsufficientBalance);
    }

    let _request = withdrawal::redeem_withdraw(&ctx.db, k1, &decoded)
        .await
        .ok_or(Error::Conflict)?;

    let node = Arc::clone(&ctx.node);
    let fee_limit_sats = ctx.config.fee_limit_sats.0;
    let bolt11 = decoded.bolt11;
    tokio::spawn(async move {
        node.pay_invoice(&bolt11, fee_limit_sats).await;
    });

    Ok(())
}

/// Deposit 1 — CreateDepositRequest (§4.D). Symmetric to Withdraw 1 minus the balance/pending
/// checks. The schema only has room for a `DepositRequest` row once its `payment_hash` is known
/// (Deposit 3); until then, the cached challenge alone stands in for the "placeholder" request.
pub async fn create_deposit_request(
    ctx: &Context,
    user_id: &user::Id,
) -> Result<DepositRequestCreated, Error> {
    let k1 = challenge::random_k1();
    let clearnet_url = format!(
        "{}{}/deposit/ln/cb?k1={}",
        ctx.config.schema, ctx.config.domain, k1
    );
    let lnurl = format!("lightning:{}", lnurl::encode(&clearnet_url));
    let lnurlp = format!("lnurlp://{}/deposit/ln/cb?k1={}", ctx.config.domain, k1);

    ctx.cache
        .set_challenge(&k1, user_id, ctx.config.challenge_ttl)
        .await
        .map_err(|_| Error::Transient)?;

    Ok(DepositRequestCreated { lnurl, lnurlp })
}

/// Deposit 2 — LnurlpCallback (§4.D). Does not mutate state.
pub async fn lnurlp_callback(ctx: &Context, k1: &str) -> Result<DepositCallback, Error> {
    ctx.cache
        .get_challenge(k1)
        .await
        .map_err(|_| Error::Transient)?
        .ok_or(Error::RequestExpired)?;

    Ok(DepositCallback {
        callback: format!("{}{}/deposit/ln?k1={}", ctx.config.schema, ctx.config.domain, k1),
        min_sendable: ctx.config.limits.min_sendable_sats.0,
        max_sendable: ctx.config.limits.max_sendable_sats.0,
        metadata: format!(
            "[[\"text/plain\",\"Deposit to {}\"]]",
            ctx.config.domain
        ),
    })
}

/// Deposit 3 — IssueDepositInvoice (§4.D). `amount` is checked against the literal `>100000`
/// floor from the HTTP contract (§6) in addition to `CashLimits::check_sendable` (§9 design
/// note 5: both guards are kept since the wire contract and the internal limits aren't
/// currently the same numbers).
pub async fn issue_deposit_invoice(
    ctx: &Context,
    k1: &str,
    amount_sats: i64,
) -> Result<DepositInvoiceIssued, Error> {
    if amount_sats <= MIN_DEPOSIT_AMOUNT_SATS {
        return Err(Error::InputInvalid);
    }
    ctx.config
        .limits
        .check_sendable(Sats(amount_sats))
        .map_err(|_| Error::InputInvalid)?;

    let user_id = ctx
        .cache
        .get_challenge(k1)
        .await
        .map_err(|_| Error::Transient)?
        .ok_or(Error::RequestExpired)?;

    let decoded = ctx
        .node
        .create_invoice(amount_sats, "Deposit to ")
        .await
        .ok_or(Error::NodeFailure)?;

    let request = deposit::DepositRequest::new(
        decoded.payment_hash.clone(),
        user_id,
        Sats(amount_sats),
    );
    deposit::create_deposit_request(&ctx.db, &request, &decoded).await;

    Ok(DepositInvoiceIssued {
        bolt11: decoded.bolt11,
    })
}
