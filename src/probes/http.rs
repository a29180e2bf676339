//! HTTP reachability probe

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{instrument, trace};

use super::{Probe, ProbeOutcome};

/// Timeout for a single probe request
pub const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues one GET request per check and expects a 2xx answer
#[derive(Debug, Clone)]
pub struct HttpProbe {
    name: String,
    url: String,
    client: Client,
}

impl HttpProbe {
    pub fn new(name: impl ToString, url: impl ToString) -> Result<Self> {
        Ok(Self::with_client(name, url, probe_client(HTTP_PROBE_TIMEOUT)?))
    }

    /// Create a probe sharing an existing client (and its timeout)
    pub fn with_client(name: impl ToString, url: impl ToString, client: Client) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            client,
        }
    }
}

/// Build the client used by HTTP probes
///
/// Automatic retries are not a thing in reqwest, so one check maps to exactly one request.
pub fn probe_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build probe HTTP client")
}

/// Classify a received status code: anything in `200..=299` is healthy
pub fn classify_status(status: StatusCode, latency: Duration) -> ProbeOutcome {
    if status.is_success() {
        ProbeOutcome::Healthy { latency }
    } else {
        ProbeOutcome::Failed(format!(
            "Received the following non-2xx response: {status}"
        ))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(probe = %self.name, url = %self.url))]
    async fn check(&self) -> ProbeOutcome {
        let start = Instant::now();

        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Failed(format!("{:#}", anyhow::Error::new(e))),
        };

        let status = response.status();
        let latency = start.elapsed();

        // drain the body so the connection is released back to the pool
        if let Err(e) = response.bytes().await {
            trace!("failed to drain response body: {e}");
        }

        classify_status(status, latency)
    }
}
