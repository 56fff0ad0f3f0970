//! Integration tests for the push channel lifecycle against a loopback
//! WebSocket server.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{wait_until, PushServer, RecordingSink, ServerCommand};
use slidepilot_backend::channel::{PushChannel, PushChannelConfig, PushChannelState};
use slidepilot_core::job::JobStatus;
use slidepilot_core::settings::{Settings, SettingsStore, BACKEND_WS_KEY};
use slidepilot_core::types::JobId;

fn settings_for(push_url: &str) -> Arc<SettingsStore> {
    Arc::new(SettingsStore::with_values(Settings::from([(
        BACKEND_WS_KEY.to_string(),
        push_url.to_string(),
    )])))
}

fn config(reconnect_delay_ms: u64) -> PushChannelConfig {
    PushChannelConfig {
        reconnect_delay: Duration::from_millis(reconnect_delay_ms),
    }
}

async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws")
}

// ---------------------------------------------------------------------------
// Test: job updates reach the sink, malformed frames do not kill the channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_updates_are_delivered_and_bad_frames_skipped() {
    let mut server = PushServer::start().await;
    let (sink, mut updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&server.url), sink, config(100));

    channel.connect();
    let conn = server.next_connection().await;
    assert!(wait_until(Duration::from_secs(2), || channel.is_connected()).await);

    conn.send(ServerCommand::Send("{not json".into())).unwrap();
    conn.send(ServerCommand::Send(r#"{"type":"heartbeat"}"#.into())).unwrap();
    conn.send(ServerCommand::Send(
        r#"{"type":"job-update","job_id":"j7","status":"running"}"#.into(),
    ))
    .unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no update delivered")
        .unwrap();
    assert_eq!(update.job_id, JobId::from("j7"));
    assert_eq!(update.status, JobStatus::Running);

    // Numeric ids are keyed exactly like the string form.
    conn.send(ServerCommand::Send(
        r#"{"type":"job-update","job_id":42,"status":"done"}"#.into(),
    ))
    .unwrap();
    let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("numeric job id update not delivered")
        .unwrap();
    assert_eq!(update.job_id, JobId::from("42"));
    assert_eq!(update.status, JobStatus::Done);

    assert!(channel.is_connected());
    assert_eq!(server.accepted(), 1);

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: a close triggers exactly one reconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_schedules_exactly_one_reconnect() {
    let mut server = PushServer::start().await;
    let (sink, _updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&server.url), sink, config(100));

    channel.connect();
    let first = server.next_connection().await;
    assert!(wait_until(Duration::from_secs(2), || channel.is_connected()).await);

    first.send(ServerCommand::Close).unwrap();
    let _second = server.next_connection().await;
    assert!(wait_until(Duration::from_secs(2), || channel.is_connected()).await);

    // Well past several reconnect delays: no further attempts while the
    // second connection stays open.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.accepted(), 2);
    assert_eq!(channel.stats().connection_attempts, 2);
    assert_eq!(channel.stats().sessions, 2);
    assert_eq!(server.max_open.load(Ordering::SeqCst), 1);

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: repeated connect() calls never open a second connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_is_idempotent() {
    let mut server = PushServer::start().await;
    let (sink, _updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&server.url), sink, config(100));

    for _ in 0..5 {
        channel.connect();
    }
    let _conn = server.next_connection().await;
    assert!(wait_until(Duration::from_secs(2), || channel.is_connected()).await);

    for _ in 0..5 {
        channel.connect();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(server.accepted(), 1);
    assert_eq!(server.max_open.load(Ordering::SeqCst), 1);
    assert_eq!(channel.stats().connection_attempts, 1);

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: unreachable endpoint is retried at the fixed delay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_endpoint_retries_at_fixed_delay() {
    let (sink, _updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&closed_port_url().await), sink, config(100));

    channel.connect();
    tokio::time::sleep(Duration::from_millis(550)).await;

    let attempts = channel.stats().connection_attempts;
    assert!(
        (3..=7).contains(&attempts),
        "expected a handful of fixed-delay attempts, got {attempts}"
    );
    assert_eq!(channel.stats().sessions, 0);
    assert!(!channel.is_connected());

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: connect() during the reconnect delay retries immediately, once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_during_delay_starts_attempt_immediately() {
    let (sink, _updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&closed_port_url().await), sink, config(10_000));

    channel.connect();
    assert!(
        wait_until(Duration::from_secs(2), || {
            channel.stats().connection_attempts == 1
                && channel.state() == PushChannelState::Disconnected
        })
        .await
    );

    channel.connect();
    assert!(
        wait_until(Duration::from_secs(2), || channel.stats().connection_attempts == 2).await
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(channel.stats().connection_attempts, 2);

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: shutdown closes the connection and stops reconnecting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_closes_connection() {
    let mut server = PushServer::start().await;
    let (sink, _updates) = RecordingSink::new();
    let channel = PushChannel::new(settings_for(&server.url), sink, config(50));

    channel.connect();
    let _conn = server.next_connection().await;
    assert!(wait_until(Duration::from_secs(2), || channel.is_connected()).await);

    channel.shutdown().await;
    assert_eq!(channel.state(), PushChannelState::Disconnected);
    assert!(wait_until(Duration::from_secs(2), || server.open.load(Ordering::SeqCst) == 0).await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.accepted(), 1);

    // connect() after shutdown is ignored.
    channel.connect();
    assert_eq!(channel.state(), PushChannelState::Disconnected);
}
