//! Integration tests for the server lifecycle actor.
//!
//! A mock listener stands in for the hyper layer so these tests exercise
//! the state machine alone: ordering, phase guards, error classification,
//! and teardown behavior.

use async_trait::async_trait;
use screenserve::content::templates::{ServedContent, DEFAULT_PIN_ADDRESS, DEFAULT_STREAM_ADDRESS};
use screenserve::content::{EmbeddedAssets, EnglishStrings};
use screenserve::error::{ErrorReporter, ServerError};
use screenserve::http::handler::{FrameSource, FrameStream};
use screenserve::http::listener::{ListenerController, ListenerHandle};
use screenserve::stats::{StatisticEvent, StatisticsSink};
use screenserve::{BindAddress, Phase, StreamServer, StreamSettings};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Default)]
struct MockListener {
    starts: Mutex<Vec<(BindAddress, ServedContent)>>,
    stops: AtomicUsize,
    fail_next: Mutex<Option<ServerError>>,
}

impl MockListener {
    fn fail_next_start(&self, error: ServerError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    fn started(&self) -> Vec<(BindAddress, ServedContent)> {
        self.starts.lock().unwrap().clone()
    }

    fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListenerController for MockListener {
    async fn start(
        &self,
        address: BindAddress,
        content: ServedContent,
        _frames: Arc<dyn FrameSource>,
        _statistics: Arc<dyn StatisticsSink>,
        _errors: Arc<dyn ErrorReporter>,
    ) -> Result<ListenerHandle, ServerError> {
        let addr = address.validate()?;
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        self.starts.lock().unwrap().push((address, content));
        let (shutdown, _) = watch::channel(false);
        Ok(ListenerHandle::new(addr, shutdown, tokio::spawn(async {})))
    }

    async fn stop(&self, _handle: ListenerHandle) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CollectingReporter {
    errors: Mutex<Vec<ServerError>>,
}

impl CollectingReporter {
    fn errors(&self) -> Vec<ServerError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: ServerError) {
        self.errors.lock().unwrap().push(error);
    }
}

struct NoFrames;

impl FrameSource for NoFrames {
    fn frames(&self) -> FrameStream {
        futures::stream::empty().boxed()
    }
}

struct NoStatistics;

impl StatisticsSink for NoStatistics {
    fn record(&self, _event: StatisticEvent) {}
}

fn server() -> (StreamServer, Arc<MockListener>, Arc<CollectingReporter>) {
    let listener = Arc::new(MockListener::default());
    let reporter = Arc::new(CollectingReporter::default());
    let server = StreamServer::new(
        listener.clone(),
        Arc::new(EmbeddedAssets),
        Arc::new(EnglishStrings),
        Arc::new(NoFrames),
        Arc::new(NoStatistics),
        reporter.clone(),
    );
    (server, listener, reporter)
}

async fn wait_for(server: &StreamServer, phase: Phase) {
    let mut watcher = server.subscribe_phase();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        watcher.wait_for(|p| *p == phase),
    )
    .await
    .expect("timed out waiting for phase")
    .expect("actor terminated while waiting for phase");
}

#[tokio::test]
async fn init_configure_start_stop_walks_the_happy_path() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::new().background_color(0x00FF00));
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    let started = listener.started();
    assert_eq!(started.len(), 1);
    let content = &started[0].1;
    assert!(content.index_html.contains("#00FF00"));
    assert!(content.index_html.contains(DEFAULT_STREAM_ADDRESS));
    assert_eq!(content.stream_path, DEFAULT_STREAM_ADDRESS);
    assert!(!content.pin_enabled);

    server.stop();
    wait_for(&server, Phase::Init).await;
    assert_eq!(listener.stop_count(), 1);
    assert!(reporter.errors().is_empty());
}

#[tokio::test]
async fn start_before_configure_is_a_fatal_illegal_transition() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Error).await;

    let errors = reporter.errors();
    assert_eq!(
        errors,
        vec![ServerError::IllegalTransition {
            phase: Phase::Init,
            event: "start",
        }]
    );
    assert!(errors[0].is_fatal());
    assert!(listener.started().is_empty());
}

#[tokio::test]
async fn start_after_stop_requires_a_fresh_configure() {
    let (server, _listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::new().with_pin("1234"));
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    server.stop();
    wait_for(&server, Phase::Init).await;

    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Error).await;
    assert_eq!(
        reporter.errors(),
        vec![ServerError::IllegalTransition {
            phase: Phase::Init,
            event: "start",
        }]
    );
}

#[tokio::test]
async fn out_of_range_ports_are_rejected_before_any_bind() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(80));
    wait_for(&server, Phase::Error).await;

    server.configure(StreamSettings::default());
    wait_for(&server, Phase::Configured).await;
    server.start(BindAddress::loopback(70000));
    wait_for(&server, Phase::Error).await;

    assert_eq!(
        reporter.errors(),
        vec![ServerError::InvalidPort(80), ServerError::InvalidPort(70000)]
    );
    assert!(reporter.errors().iter().all(ServerError::is_fatal));
    assert!(listener.started().is_empty());
}

#[tokio::test]
async fn stop_at_init_is_a_no_op() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.stop();
    // A queued configure proves the stop was processed without effect.
    server.configure(StreamSettings::default());
    wait_for(&server, Phase::Configured).await;

    assert!(reporter.errors().is_empty());
    assert_eq!(listener.stop_count(), 0);
}

#[tokio::test]
async fn configure_while_running_is_rejected() {
    let (server, _listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    server.configure(StreamSettings::default());
    wait_for(&server, Phase::Error).await;
    assert_eq!(
        reporter.errors(),
        vec![ServerError::IllegalTransition {
            phase: Phase::Running,
            event: "configure",
        }]
    );
}

#[tokio::test]
async fn busy_address_is_fixable_and_a_retry_succeeds() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    let busy = BindAddress::loopback(8085).validate().unwrap();
    listener.fail_next_start(ServerError::AddrInUse(busy));

    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Error).await;

    let errors = reporter.errors();
    assert_eq!(errors, vec![ServerError::AddrInUse(busy)]);
    assert!(errors[0].is_fixable());

    // Error phase accepts a new configure; the next start succeeds.
    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(8086));
    wait_for(&server, Phase::Running).await;
    assert_eq!(listener.started().len(), 1);
}

#[tokio::test]
async fn pin_gate_derives_random_path_and_pin_pages() {
    let (server, listener, _reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::new().with_pin("1234"));
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    let content = listener.started().remove(0).1;
    assert!(content.pin_enabled);
    assert_eq!(content.pin_path, format!("{}1234", DEFAULT_PIN_ADDRESS));
    assert_ne!(content.stream_path, DEFAULT_STREAM_ADDRESS);
    let suffix = content
        .stream_path
        .strip_prefix('/')
        .and_then(|s| s.strip_suffix(".mjpeg"))
        .expect("stream path shape");
    assert_eq!(suffix.len(), 16);
    assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(!content.pin_entry_html.is_empty());
    assert!(!content.pin_error_html.is_empty());
    assert!(content.pin_error_html.contains("Wrong PIN"));
}

#[tokio::test]
async fn every_configure_cycle_draws_a_fresh_stream_path() {
    let (server, listener, _reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::new().with_pin("1234"));
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;
    server.stop();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::new().with_pin("1234"));
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    let started = listener.started();
    assert_eq!(started.len(), 2);
    assert_ne!(started[0].1.stream_path, started[1].1.stream_path);
}

#[tokio::test]
async fn destroy_releases_the_listener_and_refuses_further_events() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(8085));
    wait_for(&server, Phase::Running).await;

    let mut watcher = server.subscribe_phase();
    server.destroy();
    // The phase channel closes when the actor terminates.
    while watcher.changed().await.is_ok() {}
    assert_eq!(listener.stop_count(), 1);

    server.configure(StreamSettings::default());
    assert_eq!(
        reporter.errors().last(),
        Some(&ServerError::EventQueueUnavailable)
    );
}

#[tokio::test]
async fn events_are_applied_in_submission_order() {
    let (server, listener, reporter) = server();
    wait_for(&server, Phase::Init).await;

    // Burst-enqueue a full cycle; the actor must serialize it as written.
    server.configure(StreamSettings::new().background_color(0xABCDEF));
    server.start(BindAddress::loopback(8085));
    server.stop();
    server.configure(StreamSettings::default());
    server.start(BindAddress::loopback(8086));

    // Both starts must have landed, in order, before the queue settles.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while listener.started().len() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "second start never landed");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    wait_for(&server, Phase::Running).await;

    assert!(reporter.errors().is_empty());
    let started = listener.started();
    assert_eq!(started.len(), 2);
    assert_eq!(started[0].0.port, 8085);
    assert_eq!(started[1].0.port, 8086);
    assert_eq!(listener.stop_count(), 1);
}
