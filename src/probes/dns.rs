//! DNS resolution probe
//!
//! Sends a single A query straight to a fixed resolver over UDP. The message is encoded and
//! decoded with hickory-proto; no resolver cache or retry logic sits in between.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::instrument;

use super::{Probe, ProbeOutcome};

/// Round-trip timeout for one query
pub const DNS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_RESPONSE_SIZE: usize = 4096;

/// Resolves one hostname against one resolver and expects at least one answer
#[derive(Debug, Clone)]
pub struct DnsProbe {
    name: String,
    hostname: String,
    resolver: SocketAddr,
    timeout: Duration,
}

impl DnsProbe {
    pub fn new(name: impl ToString, hostname: impl ToString, resolver: SocketAddr) -> Self {
        Self {
            name: name.to_string(),
            hostname: hostname.to_string(),
            resolver,
            timeout: DNS_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(&self) -> Result<Message> {
        let query = build_query(&self.hostname, rand::random())?;
        let id = query.id();
        let bytes = query.to_bytes().context("failed to encode query")?;

        let local: SocketAddr = if self.resolver.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.resolver).await?;
        socket.send(&bytes).await?;

        let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
        let len = socket.recv(&mut buf).await?;

        let response = Message::from_bytes(&buf[..len]).context("malformed response")?;
        if response.id() != id {
            bail!("response id {} does not match query id {id}", response.id());
        }
        if response.message_type() != MessageType::Response {
            bail!("malformed response: not a response message");
        }

        Ok(response)
    }
}

fn build_query(hostname: &str, id: u16) -> Result<Message> {
    let fqdn = if hostname.ends_with('.') {
        hostname.to_string()
    } else {
        format!("{hostname}.")
    };
    let name = Name::from_ascii(&fqdn).with_context(|| format!("invalid hostname {hostname}"))?;

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(name, RecordType::A));

    Ok(message)
}

#[async_trait]
impl Probe for DnsProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        &self.hostname
    }

    #[instrument(skip(self), fields(probe = %self.name, host = %self.hostname, resolver = %self.resolver))]
    async fn check(&self) -> ProbeOutcome {
        let start = Instant::now();

        let response = match timeout(self.timeout, self.exchange()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return ProbeOutcome::Failed(format!("{e:#}")),
            Err(_) => {
                return ProbeOutcome::Failed(format!(
                    "query to {} timed out after {:?}",
                    self.resolver, self.timeout
                ));
            }
        };

        if response.answers().is_empty() {
            // intentionally not escalated
            return ProbeOutcome::Warning("No results".to_string());
        }

        ProbeOutcome::Healthy {
            latency: start.elapsed(),
        }
    }
}
