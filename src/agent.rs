//! Probe scheduler
//!
//! The agent runs its probes in rounds. Every tick of a fixed interval starts one round: each
//! probe is spawned as its own task, and the round only ends once all of them have finished.
//! A round never overlaps the next one, so at most one round's worth of probes is in flight.
//!
//! ```text
//! tick → spawn probes → join all → (next tick)
//!            │
//!            └─ Failed outcome → Alert → AlertSender
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::actors::sender::AlertSender;
use crate::alert::Alert;
use crate::config::{
    AgentConfig, ETCD_HEALTH, KUBE_API, METADATA_DNS, OrchestrationMode, RANCHER_METADATA,
    Targets,
};
use crate::probes::http::{HTTP_PROBE_TIMEOUT, probe_client};
use crate::probes::{DnsProbe, HttpProbe, Probe, ProbeOutcome};

/// What happened to one probe during a round
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub name: String,
    pub outcome: ProbeOutcome,
    pub started: Instant,
    /// Set after the alert (if any) has been queued
    pub finished: Instant,
}

pub struct Agent {
    interval: Duration,
    probes: Vec<Arc<dyn Probe>>,
    sender: AlertSender,
}

impl Agent {
    /// Build the agent with the standard probe set
    ///
    /// With [`OrchestrationMode::Detect`] the detection request happens here, once.
    /// Its result holds for the lifetime of the agent.
    pub async fn new(config: AgentConfig, sender: AlertSender) -> Result<Self> {
        let client = probe_client(HTTP_PROBE_TIMEOUT)?;

        let orchestration = match config.orchestration {
            OrchestrationMode::Enabled => true,
            OrchestrationMode::Disabled => false,
            OrchestrationMode::Detect => {
                detect_orchestration(&client, &config.targets.detection_url).await
            }
        };
        info!("orchestration probes enabled: {orchestration}");

        let probes = standard_probes(&config.targets, &client, orchestration);

        Ok(Self::with_probes(config.poll_interval, probes, sender))
    }

    pub fn with_probes(
        interval: Duration,
        probes: Vec<Arc<dyn Probe>>,
        sender: AlertSender,
    ) -> Self {
        Self {
            interval,
            probes,
            sender,
        }
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    /// Run rounds forever
    ///
    /// The first round starts immediately. If a round takes longer than the interval the
    /// next one starts right after it, and the schedule shifts instead of bursting.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn start(&self) {
        debug!("starting agent with probes {:?}", self.probe_names());

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let reports = self.run_round().await;
            debug!(
                "round finished, {} of {} probes failed",
                reports.iter().filter(|r| r.outcome.is_failure()).count(),
                reports.len()
            );
        }
    }

    /// Run every probe once, concurrently, and wait for all of them
    pub async fn run_round(&self) -> Vec<ProbeReport> {
        let tasks = self
            .probes
            .iter()
            .map(|probe| tokio::spawn(run_probe(probe.clone(), self.sender.clone())));

        join_all(tasks)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("probe task failed: {e}");
                    None
                }
            })
            .collect()
    }
}

async fn run_probe(probe: Arc<dyn Probe>, sender: AlertSender) -> ProbeReport {
    let started = Instant::now();
    let outcome = probe.check().await;

    match &outcome {
        ProbeOutcome::Healthy { latency } => {
            info!(
                probe = probe.name(),
                "{} succeeded in {latency:?}",
                probe.target()
            );
        }
        ProbeOutcome::Warning(msg) => {
            warn!(probe = probe.name(), "{}: {msg}", probe.target());
        }
        ProbeOutcome::Failed(msg) => {
            error!(probe = probe.name(), "{}: check failed: {msg}", probe.target());
            sender.send(Alert::new(probe.name(), msg)).await;
        }
    }

    ProbeReport {
        name: probe.name().to_string(),
        outcome,
        started,
        finished: Instant::now(),
    }
}

/// The metadata probes, plus the orchestration probes when enabled
pub fn standard_probes(
    targets: &Targets,
    client: &Client,
    orchestration: bool,
) -> Vec<Arc<dyn Probe>> {
    let mut probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(DnsProbe::new(
            METADATA_DNS,
            &targets.metadata_hostname,
            targets.dns_resolver,
        )),
        Arc::new(HttpProbe::with_client(
            RANCHER_METADATA,
            &targets.metadata_url,
            client.clone(),
        )),
    ];

    if orchestration {
        probes.push(Arc::new(HttpProbe::with_client(
            KUBE_API,
            &targets.kube_api_url,
            client.clone(),
        )));
        probes.push(Arc::new(HttpProbe::with_client(
            ETCD_HEALTH,
            &targets.etcd_health_url,
            client.clone(),
        )));
    }

    probes
}

/// One-shot check whether this is an orchestrated environment
///
/// Only a 200 answer counts. Failures are logged and never alerted.
pub async fn detect_orchestration(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            debug!("orchestration detection at {url} returned {status}");
            status == StatusCode::OK
        }
        Err(e) => {
            debug!("orchestration detection at {url} failed: {e}");
            false
        }
    }
}
