//! AlertSenderActor - Delivers alerts to the collector one at a time
//!
//! Probes hand alerts to an [`AlertSender`] handle. The handle feeds a bounded channel that is
//! drained by exactly one worker task, so the collector sees alerts in submission order and never
//! more than one request at a time.
//!
//! ## Message Flow
//!
//! ```text
//! Probe failure → AlertSender::send → bounded mpsc → AlertSenderActor → AlertTransport::deliver
//!                     ↑ waits while the queue is full
//! ```
//!
//! A failed delivery is logged and the alert is discarded. The worker keeps going with the next
//! queued alert; there is no retry.

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::alert::Alert;
use crate::transport::{AlertTransport, HttpTransport};

/// Default number of alerts that may wait for delivery before probes block
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Worker owning the receiving end of the alert queue
pub struct AlertSenderActor {
    transport: Box<dyn AlertTransport>,

    alerts: mpsc::Receiver<Alert>,
}

impl AlertSenderActor {
    pub fn new(transport: Box<dyn AlertTransport>, alerts: mpsc::Receiver<Alert>) -> Self {
        Self { transport, alerts }
    }

    /// Run the worker loop
    ///
    /// Runs until every [`AlertSender`] handle has been dropped and the queue is drained.
    #[instrument(skip(self), fields(endpoint = %self.transport.endpoint()))]
    pub async fn run(mut self) {
        debug!("starting alert sender");

        while let Some(alert) = self.alerts.recv().await {
            self.handle_alert(alert).await;
        }

        debug!("alert queue closed, sender stopped");
    }

    async fn handle_alert(&self, alert: Alert) {
        debug!(name = alert.name(), "received alert");

        match self.transport.deliver(&alert).await {
            Ok(()) => info!(name = alert.name(), "alert delivered"),
            Err(e) => error!(name = alert.name(), "could not send alert: {e:#}"),
        }

        let queued = self.alerts.len();
        let capacity = self.alerts.max_capacity();
        debug!(
            "alert queue at {}% capacity ({queued}/{capacity})",
            queued * 100 / capacity
        );
    }
}

/// Handle for submitting alerts
///
/// Cloning the handle is cheap; every clone feeds the same queue and worker.
#[derive(Debug, Clone)]
pub struct AlertSender {
    alerts: mpsc::Sender<Alert>,
}

impl AlertSender {
    /// Spawn the worker for `transport` with a queue holding up to `capacity` alerts
    pub fn spawn(transport: impl AlertTransport + 'static, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            bail!("alert queue capacity must be at least 1");
        }

        let (tx, rx) = mpsc::channel(capacity);
        let actor = AlertSenderActor::new(Box::new(transport), rx);

        tokio::spawn(actor.run());

        Ok(Self { alerts: tx })
    }

    /// Spawn a sender posting to the collector at `collector_addr` (`host:port`)
    pub fn http(collector_addr: &str, capacity: usize) -> Result<Self> {
        Self::spawn(HttpTransport::new(collector_addr)?, capacity)
    }

    /// Queue an alert for delivery, waiting for room if the queue is full
    pub async fn send(&self, alert: Alert) {
        if let Err(e) = self.alerts.send(alert).await {
            // only reachable if the worker task died
            error!(name = e.0.name(), "alert sender is gone, dropping alert");
        }
    }

    /// Number of alerts currently waiting for delivery
    pub fn queued(&self) -> usize {
        self.alerts.max_capacity() - self.alerts.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.alerts.max_capacity()
    }
}
