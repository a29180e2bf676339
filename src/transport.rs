//! Delivery of alerts to the remote collector
//!
//! The sender worker talks to the collector through the [`AlertTransport`] trait so the
//! delivery mechanism can be swapped (e.g. for an instrumented transport in tests).

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use tracing::{Level, debug, enabled};

use crate::alert::Alert;

/// Timeout for a single delivery request
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Something that can hand one alert to the collector.
///
/// Implementations must be `Send + Sync` since they are owned by the sender's
/// worker task. A returned error means the delivery failed; the caller decides
/// what to do with that (the sender logs and moves on).
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;

    /// Human readable destination, used in log lines
    fn endpoint(&self) -> &str;
}

/// Posts alerts as JSON to `http://<collector>/report_alert`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport for a collector given as `host:port`
    pub fn new(collector_addr: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .context("failed to build delivery HTTP client")?;

        Ok(Self {
            endpoint: report_alert_url(collector_addr),
            client,
        })
    }
}

pub fn report_alert_url(collector_addr: &str) -> String {
    format!("http://{collector_addr}/report_alert")
}

#[async_trait]
impl AlertTransport for HttpTransport {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "text/plain")
            .header(CONTENT_TYPE, "application/json")
            .json(alert)
            .send()
            .await
            .context("request to collector failed")?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("server returned HTTP {status}");
        }

        if enabled!(Level::DEBUG) {
            debug!("response status: {status}");
            debug!("response headers: {:?}", response.headers());
            let body = response.text().await.unwrap_or_default();
            debug!("response body: {body}");
        }

        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
