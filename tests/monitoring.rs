//! Request log, health state machine and the monitored fetch wrapper.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use bankwatch::error::{FetchError, TransportError};
use bankwatch::fetch::{MonitoredFetch, Relayed, Transport};
use bankwatch::health::{self, LATENCY_WINDOW};
use bankwatch::latency;
use bankwatch::logstore::{self, LogStore, LOG_CAPACITY};
use bankwatch::monitor::Monitor;
use bankwatch::types::*;

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("bankwatch-test-{}", uuid::Uuid::new_v4().simple()))
}

fn event(status: u16, latency: u64) -> LogEvent {
    LogEvent {
        id: uuid::Uuid::new_v4().simple().to_string(),
        timestamp: Utc::now(),
        endpoint: "/api/test".to_string(),
        status,
        latency,
        log_type: LogType::classify(status, latency),
        message: String::new(),
    }
}

/// Replays scripted transport outcomes, optionally after a delay.
struct Scripted {
    responses: Mutex<VecDeque<Result<Relayed, TransportError>>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(responses: Vec<Result<Relayed, TransportError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), delay: Duration::ZERO, calls: Mutex::new(Vec::new()) }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn get(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        self.calls.lock().push(endpoint.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

fn ok(body: Value) -> Result<Relayed, TransportError> {
    Ok(Relayed { status: 200, body })
}

// ── Classification ──

#[test]
fn test_log_type_classification() {
    assert_eq!(LogType::classify(200, 0), LogType::Success);
    assert_eq!(LogType::classify(200, 2000), LogType::Success);
    assert_eq!(LogType::classify(204, 2001), LogType::Risk);
    assert_eq!(LogType::classify(399, 10), LogType::Success);
    assert_eq!(LogType::classify(400, 10), LogType::Error);
    assert_eq!(LogType::classify(404, 5000), LogType::Error);
    assert_eq!(LogType::classify(500, 4500), LogType::Error);
}

// ── Log store ──

#[test]
fn test_store_caps_at_capacity_newest_first() {
    let mut store = LogStore::in_memory();
    for i in 0..60u64 {
        store.append(NewLogEvent::observed("/api/x", 200, i, i.to_string()));
    }
    assert_eq!(store.len(), LOG_CAPACITY);
    assert_eq!(store.logs()[0].message, "59");
    assert_eq!(store.logs()[LOG_CAPACITY - 1].message, "10");
    assert!(store.path().is_none());
}

#[test]
fn test_append_stamps_id_and_timestamp() {
    let mut store = LogStore::in_memory();
    let before = Utc::now();
    let a = store.append(NewLogEvent::observed("/a", 200, 5, "OK"));
    let b = store.append(NewLogEvent::observed("/b", 503, 5, "HTTP 503"));
    assert_ne!(a.id, b.id);
    assert!(a.timestamp >= before);
    assert_eq!(b.log_type, LogType::Error);
    assert_eq!(store.logs()[0], b);
}

#[test]
fn test_store_persists_and_restores() {
    let dir = temp_dir();
    {
        let mut store = LogStore::open(&dir);
        assert!(store.is_empty());
        for i in 0..3u64 {
            store.append(NewLogEvent::observed(format!("/api/{i}"), 200, 100 * i, "OK"));
        }
    }
    let path = logstore::storage_path(&dir);
    assert!(path.ends_with("sys_logs.json"));
    assert!(path.exists());

    let restored = LogStore::open(&dir);
    let endpoints: Vec<_> = restored.logs().iter().map(|l| l.endpoint.as_str()).collect();
    assert_eq!(endpoints, vec!["/api/2", "/api/1", "/api/0"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_persisted_format() {
    let dir = temp_dir();
    let mut store = LogStore::open(&dir);
    store.append(NewLogEvent::observed("/api/accounts/1/balance", 200, 42, "OK"));

    let raw: Value = serde_json::from_slice(&std::fs::read(logstore::storage_path(&dir)).unwrap()).unwrap();
    let first = &raw[0];
    assert_eq!(first["endpoint"], json!("/api/accounts/1/balance"));
    assert_eq!(first["status"], json!(200));
    assert_eq!(first["latency"], json!(42));
    assert_eq!(first["type"], json!("SUCCESS"));
    assert_eq!(first["message"], json!("OK"));
    assert!(first["id"].is_string());
    assert!(first["timestamp"].is_string());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_or_corrupt_storage_starts_empty() {
    let dir = temp_dir();
    assert!(LogStore::load_initial(&logstore::storage_path(&dir)).is_empty());

    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(logstore::storage_path(&dir), b"{ not json").unwrap();
    let mut store = LogStore::open(&dir);
    assert!(store.is_empty());

    // The next append replaces the corrupt file.
    store.append(NewLogEvent::observed("/api/x", 200, 1, "OK"));
    assert_eq!(LogStore::open(&dir).len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_oversized_storage_truncated_on_load() {
    let dir = temp_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let events: Vec<LogEvent> = (0..70).map(|i| event(200, i)).collect();
    std::fs::write(logstore::storage_path(&dir), serde_json::to_vec(&events).unwrap()).unwrap();

    let store = LogStore::open(&dir);
    assert_eq!(store.len(), LOG_CAPACITY);
    assert_eq!(store.logs()[0].latency, 0);

    let _ = std::fs::remove_dir_all(&dir);
}

// ── Health ──

#[test]
fn test_health_empty_is_ok() {
    let report = health::assess(&Vec::<LogEvent>::new());
    assert_eq!(report.status, SystemStatus::Ok);
    assert_eq!(report.recent_errors, 0);
    assert_eq!(report.recent_latency, 0.0);
}

#[test]
fn test_health_critical_needs_three_server_errors() {
    let two = vec![event(500, 10), event(502, 10), event(200, 10)];
    assert_eq!(health::assess(&two).status, SystemStatus::Ok);

    let three = vec![event(500, 10), event(200, 10), event(503, 10), event(500, 10)];
    let report = health::assess(&three);
    assert_eq!(report.status, SystemStatus::Critical);
    assert_eq!(report.recent_errors, 3);
}

#[test]
fn test_health_client_errors_not_counted() {
    let logs: Vec<_> = (0..10).map(|_| event(404, 10)).collect();
    let report = health::assess(&logs);
    assert_eq!(report.recent_errors, 0);
    assert_eq!(report.status, SystemStatus::Ok);
}

#[test]
fn test_health_errors_outside_window_ignored() {
    let mut logs: Vec<_> = (0..10).map(|_| event(200, 10)).collect();
    logs.extend((0..5).map(|_| event(500, 10)));
    assert_eq!(health::assess(&logs).status, SystemStatus::Ok);
}

#[test]
fn test_health_degraded_on_slow_recent_calls() {
    let logs: Vec<_> = (0..5).map(|_| event(200, 2001)).collect();
    let report = health::assess(&logs);
    assert_eq!(report.status, SystemStatus::Degraded);
    assert_eq!(report.recent_latency, 2001.0);

    // Only the newest five count.
    let mut logs: Vec<_> = (0..5).map(|_| event(200, 100)).collect();
    logs.extend((0..5).map(|_| event(200, 9000)));
    assert_eq!(health::assess(&logs).status, SystemStatus::Ok);
}

#[test]
fn test_health_mean_divides_by_window_with_few_logs() {
    // 4 x 2400 = 9600, / 5 = 1920.
    let logs: Vec<_> = (0..4).map(|_| event(200, 2400)).collect();
    let report = health::assess(&logs);
    assert_eq!(report.recent_latency, 9600.0 / LATENCY_WINDOW as f64);
    assert_eq!(report.status, SystemStatus::Ok);

    // 4 x 2600 = 10400, / 5 = 2080.
    let logs: Vec<_> = (0..4).map(|_| event(200, 2600)).collect();
    assert_eq!(health::assess(&logs).status, SystemStatus::Degraded);
}

#[test]
fn test_health_critical_outranks_degraded() {
    let logs: Vec<_> = (0..5).map(|_| event(500, 9000)).collect();
    assert_eq!(health::assess(&logs).status, SystemStatus::Critical);
}

// ── Latency summary ──

#[test]
fn test_latency_summary() {
    assert_eq!(latency::summarize(&Vec::<LogEvent>::new()), latency::LatencySummary::default());

    let logs: Vec<_> = (1..=100).map(|i| event(200, i)).collect();
    let summary = latency::summarize(&logs);
    assert_eq!(summary.count, 100);
    assert_eq!(summary.min_ms, 1);
    assert_eq!(summary.max_ms, 100);
    assert_eq!(summary.p50_ms, 51);
    assert_eq!(summary.p95_ms, 96);
    assert_eq!(summary.p99_ms, 100);
}

// ── Monitor ──

#[test]
fn test_simulated_failures_go_critical() {
    let monitor = Monitor::in_memory();
    assert_eq!(monitor.status(), SystemStatus::Ok);

    let injected = monitor.simulate_failure();
    assert_eq!(injected.endpoint, "/api/simulated-crash");
    assert_eq!(injected.status, 500);
    assert_eq!(injected.latency, 4500);
    assert_eq!(injected.log_type, LogType::Error);
    assert_eq!(injected.message, "Simulated Critical Failure");

    monitor.simulate_failure();
    assert_ne!(monitor.status(), SystemStatus::Critical);
    monitor.simulate_failure();
    assert_eq!(monitor.status(), SystemStatus::Critical);
    assert_eq!(monitor.logs().len(), 3);
}

#[tokio::test]
async fn test_subscribers_receive_snapshot_per_append() {
    let monitor = Monitor::in_memory();
    let mut rx = monitor.subscribe();

    monitor.append(NewLogEvent::observed("/api/a", 200, 12, "OK"));
    monitor.simulate_failure();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.logs.len(), 1);
    assert_eq!(first.logs[0].endpoint, "/api/a");

    let second = rx.recv().await.unwrap();
    assert_eq!(second.logs.len(), 2);
    assert_eq!(second.logs[0].endpoint, "/api/simulated-crash");
    assert_eq!(second.latency.max_ms, 4500);
}

#[test]
fn test_concurrent_appends_respect_capacity() {
    let monitor = Arc::new(Monitor::in_memory());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let monitor = monitor.clone();
            std::thread::spawn(move || {
                for i in 0..20u64 {
                    monitor.append(NewLogEvent::observed(format!("/t{t}"), 200, i, "OK"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(monitor.logs().len(), LOG_CAPACITY);
}

// ── Monitored fetch ──

#[tokio::test]
async fn test_fetch_success_logs_once() {
    let monitor = Arc::new(Monitor::in_memory());
    let fetch = MonitoredFetch::new(Scripted::new(vec![ok(json!({ "balance": 10 }))]), monitor.clone());

    let body = fetch.fetch("/api/accounts/1/balance").await.unwrap();
    assert_eq!(body, json!({ "balance": 10 }));

    let logs = monitor.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].endpoint, "/api/accounts/1/balance");
    assert_eq!(logs[0].status, 200);
    assert_eq!(logs[0].log_type, LogType::Success);
    assert_eq!(logs[0].message, "OK");
}

#[tokio::test]
async fn test_fetch_non_2xx_logs_actual_status() {
    let monitor = Arc::new(Monitor::in_memory());
    let transport = Scripted::new(vec![Ok(Relayed { status: 404, body: Value::Null })]);
    let fetch = MonitoredFetch::new(transport, monitor.clone());

    let err = fetch.fetch("/api/missing").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404 }));
    assert_eq!(err.status(), 404);

    let logs = monitor.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, 404);
    assert_eq!(logs[0].log_type, LogType::Error);
    assert_eq!(logs[0].message, "HTTP 404");
}

#[tokio::test]
async fn test_fetch_transport_failure_logs_500() {
    let monitor = Arc::new(Monitor::in_memory());
    let transport = Scripted::new(vec![Err(TransportError::Other("connection refused".to_string()))]);
    let fetch = MonitoredFetch::new(transport, monitor.clone());

    let err = fetch.fetch("/api/down").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));

    let logs = monitor.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, 500);
    assert_eq!(logs[0].log_type, LogType::Error);
    assert!(logs[0].message.contains("connection refused"));
}

#[tokio::test]
async fn test_fetch_three_failures_turn_status_critical() {
    let monitor = Arc::new(Monitor::in_memory());
    let transport = Scripted::new(vec![
        Ok(Relayed { status: 503, body: Value::Null }),
        Ok(Relayed { status: 500, body: Value::Null }),
        Err(TransportError::Other("reset".to_string())),
    ]);
    let fetch = MonitoredFetch::new(transport, monitor.clone());

    for _ in 0..3 {
        assert!(fetch.fetch("/api/flaky").await.is_err());
    }
    assert_eq!(monitor.logs().len(), 3);
    assert_eq!(monitor.status(), SystemStatus::Critical);
}

#[tokio::test(start_paused = true)]
async fn test_slow_success_logged_as_risk() {
    let monitor = Arc::new(Monitor::in_memory());
    let transport = Scripted::new(vec![ok(json!([]))]).delayed(Duration::from_millis(2500));
    let fetch = MonitoredFetch::new(transport, monitor.clone());

    assert!(fetch.fetch("/api/slow").await.is_ok());

    let logs = monitor.logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].latency >= 2500, "latency {}", logs[0].latency);
    assert_eq!(logs[0].log_type, LogType::Risk);
    assert_eq!(logs[0].status, 200);
}

#[tokio::test(start_paused = true)]
async fn test_slow_calls_degrade_status() {
    let monitor = Arc::new(Monitor::in_memory());
    let responses = (0..5).map(|_| ok(json!({}))).collect();
    let transport = Scripted::new(responses).delayed(Duration::from_millis(2100));
    let fetch = MonitoredFetch::new(transport, monitor.clone());

    for _ in 0..5 {
        fetch.fetch("/api/slow").await.unwrap();
    }
    assert_eq!(monitor.status(), SystemStatus::Degraded);
}

#[tokio::test]
async fn test_fetch_persists_through_store() {
    let dir = temp_dir();
    let monitor = Arc::new(Monitor::new(LogStore::open(&dir)));
    let fetch = MonitoredFetch::new(Scripted::new(vec![ok(json!([]))]), monitor);
    fetch.fetch("/api/persisted").await.unwrap();

    let restored = LogStore::open(&dir);
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.logs()[0].endpoint, "/api/persisted");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_concurrent_appends_broadcast_in_order() {
    let monitor = Arc::new(Monitor::in_memory());
    let mut rx = monitor.subscribe();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let monitor = monitor.clone();
            std::thread::spawn(move || {
                for i in 0..10u64 {
                    monitor.append(NewLogEvent::observed(format!("/t{t}"), 200, i, "OK"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Each snapshot holds exactly one more log than the one before it.
    for expected in 1..=40 {
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.logs.len(), expected);
    }
    assert_eq!(monitor.snapshot().logs, monitor.logs());
}
