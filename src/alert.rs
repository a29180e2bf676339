//! Alert records produced by failing probes.

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// A single detected failure, as delivered to the alert collector.
///
/// Records are immutable once built. They move from the probe that detected the
/// failure into the sender queue and are dropped after the delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    name: String,
    description: String,
    #[serde(rename = "host")]
    source_host: String,
}

impl Alert {
    /// Create an alert for the machine the agent runs on.
    ///
    /// The hostname is resolved at construction time. If it cannot be determined
    /// the host field is left empty rather than failing the probe.
    pub fn new(name: impl ToString, description: impl ToString) -> Self {
        Self::with_host(name, description, System::host_name().unwrap_or_default())
    }

    pub fn with_host(name: impl ToString, description: impl ToString, host: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            source_host: host.to_string(),
        }
    }

    /// Logical check identifier, e.g. `Kube API`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source_host(&self) -> &str {
        &self.source_host
    }
}
