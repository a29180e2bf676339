//! Integration tests for alert delivery
//!
//! These tests verify that:
//! - Alerts reach the collector in submission order
//! - Only one delivery is in flight at any time
//! - Failed deliveries do not stop the worker
//! - A full queue makes producers wait instead of dropping alerts

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use alerting_agent::{Alert, AlertSender};
use pretty_assertions::assert_eq;
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{RecordingTransport, wait_until};

fn alert(i: usize) -> Alert {
    Alert::with_host(format!("check-{i}"), format!("failure {i}"), "node-1")
}

#[tokio::test]
async fn test_fifo_and_single_in_flight() {
    let (transport, stats) = RecordingTransport::new();
    let sender = AlertSender::spawn(transport.with_delay(Duration::from_millis(5)), 64).unwrap();

    // submit concurrently from several producers, each in its own order
    let mut producers = vec![];
    for p in 0..4 {
        let sender = sender.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..5 {
                sender.send(alert(p * 100 + i)).await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    assert!(wait_until(|| stats.attempt_count() == 20).await);
    assert_eq!(stats.max_in_flight.load(Ordering::SeqCst), 1);

    // per producer, order is preserved
    let names: Vec<String> = stats
        .attempted()
        .iter()
        .map(|a| a.name().to_string())
        .collect();
    for p in 0..4 {
        let positions: Vec<usize> = (0..5)
            .map(|i| format!("check-{}", p * 100 + i))
            .map(|e| names.iter().position(|n| *n == e).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{names:?}");
    }
}

#[tokio::test]
async fn test_sequential_submissions_arrive_in_order() {
    let (transport, stats) = RecordingTransport::new();
    let sender = AlertSender::spawn(transport, 8).unwrap();

    for i in 0..10 {
        sender.send(alert(i)).await;
    }

    assert!(wait_until(|| stats.attempt_count() == 10).await);
    assert_eq!(stats.attempted(), (0..10).map(alert).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_failures_do_not_stop_the_worker() {
    let (transport, stats) = RecordingTransport::new();
    let sender = AlertSender::spawn(transport.failing_first(3), 16).unwrap();

    for i in 0..8 {
        sender.send(alert(i)).await;
    }

    assert!(wait_until(|| stats.attempt_count() == 8).await);
    assert_eq!(stats.attempted(), (0..8).map(alert).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_full_queue_blocks_producer() {
    let gate = Arc::new(Semaphore::new(0));
    let (transport, stats) = RecordingTransport::new();
    let sender = AlertSender::spawn(transport.gated(gate.clone()), 1).unwrap();

    // first alert is picked up by the worker and held at the gate
    sender.send(alert(0)).await;
    // second one waits in the queue
    sender.send(alert(1)).await;
    assert_eq!(sender.queued(), 1);

    let blocked = tokio::time::timeout(Duration::from_millis(100), sender.send(alert(2))).await;
    assert!(blocked.is_err(), "send should wait while the queue is full");

    gate.add_permits(3);
    sender.send(alert(2)).await;

    assert!(wait_until(|| stats.attempt_count() == 3).await);
    assert_eq!(stats.attempted(), (0..3).map(alert).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_http_sender_survives_collector_errors() {
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report_alert"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&collector)
        .await;
    Mock::given(method("POST"))
        .and(path("/report_alert"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&collector)
        .await;

    let sender = AlertSender::http(&collector.address().to_string(), 8).unwrap();
    for i in 0..5 {
        sender.send(alert(i)).await;
    }

    let mut received = vec![];
    for _ in 0..200 {
        received = collector.received_requests().await.unwrap_or_default();
        if received.len() == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let names: Vec<String> = received
        .iter()
        .map(|r| {
            let body: serde_json::Value = r.body_json().unwrap();
            body["name"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(names, (0..5).map(|i| format!("check-{i}")).collect::<Vec<_>>());
}
