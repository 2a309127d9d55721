//! Starts and supervises the long-lived background consumers (§4.E). Two reconcile the node's
//! payment/invoice streams against the ledger; a third sweeps stale RateLimiter entries (§10.E).
//! Each is wrapped in [`supervise`]: cancellation propagates and stops the task, any other exit
//! is logged and retried after a fixed backoff. The retry loop is iterative, never recursive
//! (§9: "no recursive restart that unbounds stack depth").

use crate::database::Database;
use crate::request_flow::WithdrawRateLimiter;
use crate::sats::Sats;
use crate::{deposit, ln, withdrawal};
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const RESTART_BACKOFF: Duration = Duration::from_secs(5);
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const RATE_LIMIT_SWEEP_GRACE: Duration = Duration::from_secs(60);

pub struct Supervisor {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Starts the payment reconciler, the deposit reconciler, and the rate-limit sweeper.
    pub fn start(db: Database, node: Arc<dyn ln::NodeClient>, withdraw_limiter: WithdrawRateLimiter) -> Self {
        let token = CancellationToken::new();

        let payment_reconciler = {
            let db = db.clone();
            let node = Arc::clone(&node);
            tokio::spawn(supervise(token.child_token(), "payment_reconciler", move || {
                run_payment_reconciler(db.clone(), Arc::clone(&node))
            }))
        };

        let deposit_reconciler = {
            let db = db.clone();
            let node = Arc::clone(&node);
            tokio::spawn(supervise(token.child_token(), "deposit_reconciler", move || {
                run_deposit_reconciler(db.clone(), Arc::clone(&node))
            }))
        };

        let rate_limit_sweeper = {
            let limiter = Arc::clone(&withdraw_limiter);
            tokio::spawn(supervise(token.child_token(), "rate_limit_sweeper", move || {
                run_rate_limit_sweeper(Arc::clone(&limiter))
            }))
        };

        Self {
            token,
            handles: vec![payment_reconciler, deposit_reconciler, rate_limit_sweeper],
        }
    }

    /// Cancels every consumer and awaits their clean exit (§5: the shutdown hook cancels all
    /// background consumers and no partial state should be committed after cancellation).
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn supervise<F, Fut>(token: CancellationToken, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("{} cancelled, stopping", name);
                return;
            }
            result = AssertUnwindSafe(run()).catch_unwind() => {
                if let Err(panic) = result {
                    log::error!("{} panicked: {:?}", name, panic);
                }
                log::warn!("{} exited, restarting in {:?}", name, RESTART_BACKOFF);
            }
        }
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("{} cancelled during backoff, stopping", name);
                return;
            }
            _ = tokio::time::sleep(RESTART_BACKOFF) => {}
        }
    }
}

/// Consumes `track_payments()` (§4.E). `SUCCEEDED` finalizes the withdraw, `FAILED` releases and
/// credits the locked balance back; `IN_FLIGHT` is informational only. Both transitions are
/// idempotent against duplicate delivery (§8 invariant 3).
async fn run_payment_reconciler(db: Database, node: Arc<dyn ln::NodeClient>) {
    let mut stream = node.track_payments();
    while let Some(status) = stream.next().await {
        match status.status {
            ln::PaymentState::Succeeded => {
                withdrawal::finalize_payment(
                    &db,
                    &status.payment_hash,
                    status.payment_preimage.as_deref().unwrap_or_default(),
                    Sats(status.fee_sat.unwrap_or(0)),
                )
                .await;
            }
            ln::PaymentState::Failed => {
                withdrawal::fail_payment(&db, &status.payment_hash, "payment failed").await;
            }
            ln::PaymentState::InFlight => {}
        }
    }
}

/// Consumes `paid_invoices_stream()` (§4.E). Only a `SETTLED` state change triggers
/// `deposit_finalize`; other state changes are ignored for ledger purposes.
async fn run_deposit_reconciler(db: Database, node: Arc<dyn ln::NodeClient>) {
    let mut stream = node.paid_invoices_stream();
    while let Some(invoice) = stream.next().await {
        if invoice.state == Some(ln::InvoiceState::Settled) {
            deposit::deposit_finalize(&db, &invoice).await;
        }
    }
}

/// Periodic sweep of stale RateLimiter entries (§4.F, §10.E). Not one of the two permanent
/// consumers named in §4.E, but supervised the same way since it is a third long-lived task.
async fn run_rate_limit_sweeper(limiter: WithdrawRateLimiter) {
    loop {
        tokio::time::sleep(RATE_LIMIT_SWEEP_INTERVAL).await;
        limiter.sweep(RATE_LIMIT_SWEEP_GRACE);
    }
}
