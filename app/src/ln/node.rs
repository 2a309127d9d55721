//! A simulated Lightning node. There is no real gRPC/REST wire client in this crate (§1/§6
//! explicitly place the node's wire protocol out of scope); `FakeNode` stands in for it, backed by
//! broadcast channels so tests and the development binary can drive invoice settlement and payment
//! outcomes without a live node.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use lightning_invoice::Invoice as Bolt11;
use rand::RngCore;
use tokio::sync::broadcast;

use super::{Invoice, InvoiceState, NodeClient, PaymentState, PaymentStatus};

const CHANNEL_CAPACITY: usize = 256;

pub struct FakeNode {
    payment_tx: broadcast::Sender<PaymentStatus>,
    invoice_tx: broadcast::Sender<Invoice>,
    settle_delay: Duration,
    counter: AtomicU64,
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl FakeNode {
    pub fn new(settle_delay: Duration) -> Self {
        let (payment_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (invoice_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            payment_tx,
            invoice_tx,
            settle_delay,
            counter: AtomicU64::new(0),
        }
    }

    /// Test/dev hook: injects a payment outcome as if the node had observed it.
    pub fn emit_payment(&self, status: PaymentStatus) {
        let _ = self.payment_tx.send(status);
    }

    /// Test/dev hook: injects an incoming invoice state change as if the node had observed it.
    pub fn emit_invoice(&self, invoice: Invoice) {
        let _ = self.invoice_tx.send(invoice);
    }

    fn next_payment_hash(&self) -> String {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        hex::encode(raw)
    }
}

fn stream_from<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

#[async_trait::async_trait]
impl NodeClient for FakeNode {
    async fn decode_invoice(&self, bolt11: &str) -> Option<Invoice> {
        let parsed = Bolt11::from_str(bolt11).ok()?;
        let payment_hash = hex::encode(parsed.payment_hash().0);
        let destination = parsed
            .payee_pub_key()
            .copied()
            .or_else(|| parsed.recover_payee_pub_key().ok())?
            .serialize();
        let num_satoshis = parsed.amount_milli_satoshis().map(|msat| (msat / 1000) as i64)?;
        let timestamp = DateTime::<Utc>::from(parsed.timestamp());
        let route_hints = parsed
            .route_hints()
            .iter()
            .map(|hint| {
                hint.0
                    .iter()
                    .map(|hop| {
                        format!(
                            "{}:{}:{}",
                            hop.src_node_id, hop.short_channel_id, hop.fees.base_msat
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join(";");
        let description_hash = match parsed.description() {
            lightning_invoice::InvoiceDescription::Direct(_) => None,
            lightning_invoice::InvoiceDescription::Hash(h) => Some(hex::encode(h.0.into_inner())),
        };
        let description = match parsed.description() {
            lightning_invoice::InvoiceDescription::Direct(d) => Some(d.clone().into_inner()),
            lightning_invoice::InvoiceDescription::Hash(_) => None,
        };
        Some(Invoice {
            payment_hash,
            bolt11: bolt11.to_owned(),
            destination: hex::encode(destination),
            num_satoshis,
            timestamp,
            expiry: parsed.expiry_time().as_secs() as i64,
            description,
            description_hash,
            fallback_addr: None,
            cltv_expiry: parsed.min_final_cltv_expiry() as i64,
            route_hints,
            payment_addr: None,
            features: None,
            preimage: None,
            state: Some(InvoiceState::Open),
        })
    }

    async fn create_invoice(&self, amount_sats: i64, unhashed_description: &str) -> Option<Invoice> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let payment_hash = self.next_payment_hash();
        Some(Invoice {
            payment_hash,
            bolt11: format!("lnfake1{}", seq),
            destination: "fakefakefakefakefakefakefakefakefakefakefakefakefakefakefakefake".to_owned(),
            num_satoshis: amount_sats,
            timestamp: Utc::now(),
            expiry: 3600,
            description: Some(unhashed_description.to_owned()),
            description_hash: None,
            fallback_addr: None,
            cltv_expiry: 40,
            route_hints: String::new(),
            payment_addr: None,
            features: None,
            preimage: None,
            state: Some(InvoiceState::Open),
        })
    }

    async fn pay_invoice(&self, bolt11: &str, fee_limit_sats: i64) {
        let payment_hash = self
            .decode_invoice(bolt11)
            .await
            .map(|invoice| invoice.payment_hash)
            .unwrap_or_else(|| self.next_payment_hash());
        let value_sat = self
            .decode_invoice(bolt11)
            .await
            .map(|invoice| invoice.num_satoshis)
            .unwrap_or(0);
        let payment_tx = self.payment_tx.clone();
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = payment_tx.send(PaymentStatus {
                payment_hash,
                payment_preimage: Some(hex::encode([0u8; 32])),
                value_sat,
                status: PaymentState::Succeeded,
                fee_sat: Some(fee_limit_sats.min(1)),
            });
        });
    }

    fn track_payments(&self) -> BoxStream<'static, PaymentStatus> {
        stream_from(self.payment_tx.subscribe())
    }

    fn paid_invoices_stream(&self) -> BoxStream<'static, Invoice> {
        stream_from(self.invoice_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pay_invoice_eventually_reports_success() {
        let node = FakeNode::new(Duration::from_millis(5));
        let mut stream = node.track_payments();
        node.pay_invoice("lnfakebolt11", 1_000).await;
        let status = stream.next().await.unwrap();
        assert_eq!(status.status, PaymentState::Succeeded);
    }

    #[tokio::test]
    async fn emit_invoice_is_observed_on_the_paid_invoices_stream() {
        let node = FakeNode::new(Duration::from_millis(5));
        let mut stream = node.paid_invoices_stream();
        let invoice = node.create_invoice(10_000, "test").await.unwrap();
        node.emit_invoice(invoice.clone());
        let observed = stream.next().await.unwrap();
        assert_eq!(observed.payment_hash, invoice.payment_hash);
    }
}
