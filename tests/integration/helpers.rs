//! Helper types and functions for integration tests

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alerting_agent::Alert;
use alerting_agent::probes::{Probe, ProbeOutcome};
use alerting_agent::transport::AlertTransport;
use anyhow::{Result, bail};
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::{RData, Record, rdata::A};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

/// What a [`RecordingTransport`] has seen
#[derive(Default)]
pub struct DeliveryStats {
    pub attempts: Mutex<Vec<Alert>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl DeliveryStats {
    pub fn attempted(&self) -> Vec<Alert> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

/// Transport that records every delivery attempt and tracks concurrency
pub struct RecordingTransport {
    stats: Arc<DeliveryStats>,
    fail_first: usize,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingTransport {
    pub fn new() -> (Self, Arc<DeliveryStats>) {
        let stats = Arc::new(DeliveryStats::default());
        let transport = Self {
            stats: stats.clone(),
            fail_first: 0,
            delay: Duration::ZERO,
            gate: None,
        };
        (transport, stats)
    }

    /// Fail the first `n` attempts
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every attempt consumes one permit before it completes
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        tokio::time::sleep(self.delay).await;

        let attempt = {
            let mut attempts = self.stats.attempts.lock().unwrap();
            attempts.push(alert.clone());
            attempts.len()
        };

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        if attempt <= self.fail_first {
            bail!("server returned HTTP 500");
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "recording"
    }
}

/// Probe with a fixed outcome and delay, logging (start, finish) of every invocation
pub struct TimedProbe {
    name: String,
    delay: Duration,
    outcome: ProbeOutcome,
    pub runs: Arc<Mutex<Vec<(Instant, Instant)>>>,
}

impl TimedProbe {
    pub fn new(name: &str, delay: Duration, outcome: ProbeOutcome) -> Self {
        Self {
            name: name.to_string(),
            delay,
            outcome,
            runs: Arc::default(),
        }
    }
}

#[async_trait]
impl Probe for TimedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        "timed"
    }

    async fn check(&self) -> ProbeOutcome {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.runs.lock().unwrap().push((start, Instant::now()));
        self.outcome.clone()
    }
}

/// Local UDP DNS responder, answering with one A record when `with_answer` is set
pub async fn spawn_dns_responder(with_answer: bool) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
            let request = Message::from_bytes(&buf[..len]).unwrap();
            let mut response = Message::new();
            response
                .set_id(request.id())
                .set_message_type(MessageType::Response)
                .set_op_code(OpCode::Query);
            for query in request.queries() {
                response.add_query(query.clone());
                if with_answer {
                    response.add_answer(Record::from_rdata(
                        query.name().clone(),
                        60,
                        RData::A(A::new(10, 42, 0, 1)),
                    ));
                }
            }
            let _ = socket.send_to(&response.to_bytes().unwrap(), peer).await;
        }
    });

    addr
}

/// Poll `condition` until it holds or two seconds have passed
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
