//! Abstracts over a Lightning node (§4.C NodeClient). The wire protocol to the operator's node
//! (gRPC/REST to LND, CLN, Eclair, ...) is an external collaborator out of scope for this crate;
//! only the logical operations below are specified. [`node::FakeNode`] is the one implementation
//! shipped here, used both in tests and as the production wiring until a real node integration is
//! plugged in behind the same trait.

pub mod node;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

pub use node::FakeNode;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node did not return a result")]
    NoResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Open,
    Settled,
    Cancelled,
}

/// A decoded Lightning invoice (§3 Invoice). `route_hints` and `features` are opaque structured
/// blobs from the node's point of view; we only ever round-trip them as serialized text.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub payment_hash: String,
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
    pub state: Option<InvoiceState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    InFlight,
    Succeeded,
    Failed,
}

/// An element of the `track_payments` stream (§4.C).
#[derive(Debug, Clone)]
pub struct PaymentStatus {
    pub payment_hash: String,
    pub payment_preimage: Option<String>,
    pub value_sat: i64,
    pub status: PaymentState,
    pub fee_sat: Option<i64>,
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Parses and validates a BOLT-11 string.
    async fn decode_invoice(&self, bolt11: &str) -> Option<Invoice>;

    /// Produces a new invoice payable to the operator's node.
    async fn create_invoice(&self, amount_sats: i64, unhashed_description: &str) -> Option<Invoice>;

    /// Initiates an outgoing payment. Must not block the caller; the outcome is observed later
    /// via [`NodeClient::track_payments`].
    async fn pay_invoice(&self, bolt11: &str, fee_limit_sats: i64);

    /// Infinite, restartable stream of payment outcomes.
    fn track_payments(&self) -> BoxStream<'static, PaymentStatus>;

    /// Infinite, restartable stream of incoming invoice state changes.
    fn paid_invoices_stream(&self) -> BoxStream<'static, Invoice>;
}
