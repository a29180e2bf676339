use std::path::PathBuf;
use std::time::Duration;

use alerting_agent::{
    Agent, AlertSender,
    actors::sender::DEFAULT_QUEUE_CAPACITY,
    config::{AgentConfig, OrchestrationMode, Targets, read_targets_file},
    liveness::{self, DEFAULT_LIVENESS_PORT},
};
use anyhow::bail;
use clap::{Parser, ValueEnum};
use tokio::spawn;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum K8s {
    True,
    False,
    /// Probe the orchestration API once at start-up
    Auto,
}

impl From<K8s> for OrchestrationMode {
    fn from(value: K8s) -> Self {
        match value {
            K8s::True => OrchestrationMode::Enabled,
            K8s::False => OrchestrationMode::Disabled,
            K8s::Auto => OrchestrationMode::Detect,
        }
    }
}

/// Container to monitor Rancher Infrastructure Services
#[derive(Debug, Clone, Parser)]
#[command(version)]
struct Args {
    /// Debug logging
    #[arg(short, long, env = "DEBUG")]
    debug: bool,

    /// Polling interval for checks, in seconds
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Alerting server
    #[arg(long, env = "SERVER_HOSTNAME", default_value = "localhost")]
    server_hostname: String,

    /// Alerting server port
    #[arg(long, env = "SERVER_PORT", default_value_t = 5050)]
    server_port: u16,

    /// Specify if environment is a kubernetes environment (true, false or auto, any case)
    #[arg(long, env = "K8S", value_enum, ignore_case = true, default_value_t = K8s::False)]
    k8s: K8s,

    /// Number of alerts buffered before probes wait for the collector
    #[arg(long, env = "ALERT_BUFFER", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    alert_buffer: usize,

    /// Port of the /ping liveness endpoint
    #[arg(long, env = "LIVENESS_PORT", default_value_t = DEFAULT_LIVENESS_PORT)]
    liveness_port: u16,

    /// JSON file overriding probe targets
    #[arg(long, env = "TARGETS_FILE")]
    targets: Option<PathBuf>,
}

fn init(debug: bool) {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_target("alerting_agent", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.debug);
    trace!("started with args: {args:?}");

    if args.server_hostname.is_empty() {
        bail!("SERVER_HOSTNAME not set");
    }

    let targets = match &args.targets {
        Some(path) => read_targets_file(path)?,
        None => Targets::default(),
    };

    let config = AgentConfig {
        poll_interval: Duration::from_secs(args.poll_interval),
        collector_addr: format!("{}:{}", args.server_hostname, args.server_port),
        orchestration: args.k8s.into(),
        alert_queue_capacity: args.alert_buffer,
        targets,
    };

    let liveness = spawn(serve_liveness(args.liveness_port));

    let sender = AlertSender::http(&config.collector_addr, config.alert_queue_capacity)?;
    let agent = Agent::new(config, sender).await?;

    // the agent and the /ping responder live and die together
    tokio::select! {
        _ = agent.start() => {}
        _ = liveness => bail!("liveness handler stopped"),
    }

    Ok(())
}

async fn serve_liveness(port: u16) {
    info!("liveness handler is listening on :{port}");
    if let Err(e) = liveness::rocket(port).launch().await {
        error!("liveness handler stopped: {e}");
    }
}
