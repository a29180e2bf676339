use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

use crate::actors::sender::DEFAULT_QUEUE_CAPACITY;

pub const METADATA_DNS: &str = "MetaData DNS";
pub const RANCHER_METADATA: &str = "Rancher Metadata";
pub const KUBE_API: &str = "Kube API";
pub const ETCD_HEALTH: &str = "Etcd Health";

const METADATA_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(169, 254, 169, 250));

/// Whether the orchestration (Kubernetes) probes are part of every round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestrationMode {
    Enabled,
    #[default]
    Disabled,
    /// Decide once at start-up by probing [`Targets::detection_url`]
    Detect,
}

/// Endpoints probed by the agent
///
/// Defaults point at the Rancher infrastructure services. Any subset can be
/// overridden from a JSON file, see [`read_targets_file`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Targets {
    /// Resolver queried by the DNS probe (port 53)
    pub dns_resolver: SocketAddr,

    /// Hostname resolved by the DNS probe
    pub metadata_hostname: String,

    pub metadata_url: String,

    pub kube_api_url: String,

    pub etcd_health_url: String,

    /// Answering 200 here means the orchestration probes are enabled
    pub detection_url: String,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            dns_resolver: SocketAddr::new(METADATA_IP, 53),
            metadata_hostname: "rancher-metadata.rancher.internal".to_string(),
            metadata_url: format!("http://{METADATA_IP}"),
            kube_api_url: "http://kubernetes.kubernetes.rancher.internal".to_string(),
            etcd_health_url: "http://etcd.kubernetes.rancher.internal:2379/health".to_string(),
            detection_url: "http://kubernetes.kubernetes.rancher.internal/healthz".to_string(),
        }
    }
}

/// Validated settings the agent is built from
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub poll_interval: Duration,

    /// Collector address as `host:port`
    pub collector_addr: String,

    pub orchestration: OrchestrationMode,

    pub alert_queue_capacity: usize,

    pub targets: Targets,
}

impl AgentConfig {
    pub fn new(poll_interval: Duration, collector_addr: impl ToString) -> Self {
        Self {
            poll_interval,
            collector_addr: collector_addr.to_string(),
            orchestration: OrchestrationMode::default(),
            alert_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            targets: Targets::default(),
        }
    }
}

pub fn read_targets_file(path: impl AsRef<Path>) -> anyhow::Result<Targets> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read targets file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid targets file provided: {e}"))
        .inspect(|targets| trace!("loaded targets: {targets:?}"))
}
