//! Health probes run by the agent on every round
//!
//! A probe performs exactly one check against its target and classifies the result. Probes never
//! fail themselves: transport problems and unexpected responses are reported through
//! [`ProbeOutcome`], and only [`ProbeOutcome::Failed`] is escalated to an alert.

use std::time::Duration;

use async_trait::async_trait;

pub mod dns;
pub mod http;

pub use dns::DnsProbe;
pub use http::HttpProbe;

/// Result of a single probe invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered as expected
    Healthy { latency: Duration },

    /// Something looks off, but not bad enough to raise an alert (e.g. empty DNS answer)
    Warning(String),

    /// The check failed; the message becomes the alert description
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeOutcome::Failed(_))
    }
}

/// A check the agent runs once per round
///
/// Implementations hold only read-only configuration, so a single instance can be shared
/// by the tasks of consecutive rounds.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Logical check identifier, used as the alert name
    fn name(&self) -> &str;

    /// What the probe looks at (hostname, URL, ...), for logging
    fn target(&self) -> &str;

    async fn check(&self) -> ProbeOutcome;
}
