//! End-to-end scheduler tests on a paused clock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use usagepulse_core::{CoreError, MetricsSink, ProviderKind, ProviderService};
use usagepulse_daemon::{
    CycleTrigger, DaemonError, DaemonScheduler, LifecycleState, MetricsDispatcher, SchedulerEvent,
    SLEEPING_MESSAGE,
};
use usagepulse_store::{DaemonConfig, StatusStore};

// ============================================================================
// Mocks
// ============================================================================

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
}

impl CountingSink {
    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSink for CountingSink {
    async fn send(
        &self,
        _value: i64,
        _host_label: &str,
        _metric_name: &str,
    ) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ClaudeLogs {
    tokens: Option<i64>,
}

#[async_trait]
impl ProviderService for ClaudeLogs {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ClaudeCode
    }

    async fn today_aggregate(&self) -> Result<i64, CoreError> {
        self.tokens
            .ok_or_else(|| CoreError::provider(ProviderKind::ClaudeCode, "log directory missing"))
    }
}

/// Primary source whose lookup takes a configurable time.
struct SlowLogs {
    delay_ms: Arc<AtomicU64>,
}

#[async_trait]
impl ProviderService for SlowLogs {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ClaudeCode
    }

    async fn today_aggregate(&self) -> Result<i64, CoreError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(100)
    }
}

fn build(interval_secs: u64, tokens: Option<i64>) -> (DaemonScheduler, Arc<CountingSink>) {
    build_with(interval_secs, Arc::new(ClaudeLogs { tokens }))
}

fn build_with(
    interval_secs: u64,
    primary: Arc<dyn ProviderService>,
) -> (DaemonScheduler, Arc<CountingSink>) {
    let sink = Arc::new(CountingSink::default());
    let dispatcher = MetricsDispatcher::builder(sink.clone(), Arc::new(StatusStore::new()))
        .primary(primary)
        .host_label("host1")
        .build();

    let mut config = DaemonConfig::default();
    config.general.interval_secs = interval_secs;
    config.general.handle_signals = false;
    (DaemonScheduler::new(Arc::new(dispatcher), config), sink)
}

async fn next_cycle(events: &mut broadcast::Receiver<SchedulerEvent>) -> (CycleTrigger, bool) {
    loop {
        match events.recv().await {
            Ok(SchedulerEvent::CycleCompleted { trigger, success }) => return (trigger, success),
            Ok(_) => {}
            Err(e) => panic!("event stream closed: {e}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_send_and_one_tick() {
    let (scheduler, sink) = build(1, Some(12345));
    scheduler.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let status = scheduler.status().get_status().await;
    assert!(status.is_running);
    assert_eq!(status.today_token_count, 12345);
    assert!(status.last_metrics_sent_at.is_some());
    assert!(status.next_metrics_send_at.is_some());
    assert!(sink.count() >= 2, "expected initial send plus one tick, got {}", sink.count());

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_fails_and_stop_twice_succeeds() {
    let (scheduler, _) = build(60, Some(1));

    scheduler.start().await.unwrap();
    assert!(matches!(scheduler.start().await, Err(DaemonError::AlreadyRunning)));

    scheduler.stop().await.unwrap();
    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.lifecycle(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_does_not_send() {
    let (scheduler, sink) = build(60, Some(1));
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;
    let before = sink.count();

    scheduler.stop().await.unwrap();
    assert_eq!(sink.count(), before);
}

#[tokio::test(start_paused = true)]
async fn test_sleep_suppresses_ticks_but_not_manual_trigger() {
    let (scheduler, sink) = build(10, Some(7));
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Tick, true));

    scheduler.on_system_sleep().await;
    let paused_at = sink.count();
    let status = scheduler.status().get_status().await;
    assert_eq!(status.last_error.as_deref(), Some(SLEEPING_MESSAGE));

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(sink.count(), paused_at, "ticks must not send while paused");

    scheduler.trigger().await.unwrap();
    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Manual, true));
    assert_eq!(sink.count(), paused_at + 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wake_sends_catch_up_after_settle_delay() {
    let (scheduler, sink) = build(3600, Some(7));
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;

    scheduler.on_system_sleep().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    let before_wake = sink.count();

    scheduler.on_system_wake().await;
    assert!(!scheduler.status().get_status().await.has_error());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(sink.count(), before_wake, "catch-up waits for the settle delay");

    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Wake, true));
    assert_eq!(sink.count(), before_wake + 1);
    assert!(scheduler.state().await.next_fire_at.is_some());

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_primary_failure_recorded_and_loop_keeps_running() {
    let (scheduler, _) = build(1, None);
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();

    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Tick, false));
    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Tick, false));

    let status = scheduler.status().get_status().await;
    assert!(status.last_error.unwrap().contains("log directory missing"));
    assert!(status.last_metrics_sent_at.is_none());
    assert_eq!(scheduler.lifecycle(), LifecycleState::Running);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_paused_ticks_keep_status_next_send_current() {
    let (scheduler, _) = build(10, Some(7));
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;
    let first = scheduler.status().get_status().await.next_metrics_send_at;

    scheduler.on_system_sleep().await;
    tokio::time::sleep(Duration::from_secs(35)).await;

    let status = scheduler.status().get_status().await;
    let state = scheduler.state().await;
    assert!(state.next_fire_at.is_some());
    assert_eq!(status.next_metrics_send_at, state.next_fire_at);
    assert_ne!(status.next_metrics_send_at, first);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sleep_during_settle_delay_skips_catch_up() {
    let (scheduler, sink) = build(3600, Some(7));
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;

    scheduler.on_system_sleep().await;
    scheduler.on_system_wake().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    scheduler.on_system_sleep().await;
    let before = sink.count();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(sink.count(), before, "no catch-up while asleep again");
    assert_eq!(scheduler.lifecycle(), LifecycleState::Paused);
    let status = scheduler.status().get_status().await;
    assert_eq!(status.last_error.as_deref(), Some(SLEEPING_MESSAGE));

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_catch_up() {
    let delay_ms = Arc::new(AtomicU64::new(0));
    let (scheduler, _) = build_with(
        3600,
        Arc::new(SlowLogs {
            delay_ms: Arc::clone(&delay_ms),
        }),
    );
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;

    delay_ms.store(10_000, Ordering::SeqCst);
    scheduler.on_system_sleep().await;
    scheduler.on_system_wake().await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    scheduler.stop().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let status = scheduler.status().get_status().await;
    let state = scheduler.state().await;
    assert!(!status.is_running);
    assert!(status.next_metrics_send_at.is_none());
    assert!(state.next_fire_at.is_none());
    assert!(!state.is_running);
    assert_eq!(scheduler.lifecycle(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_wake_keeps_errors_recorded_during_sleep() {
    let (scheduler, _) = build(3600, None);
    let mut events = scheduler.subscribe();
    scheduler.start().await.unwrap();
    next_cycle(&mut events).await;

    scheduler.on_system_sleep().await;
    scheduler.trigger().await.unwrap();
    assert_eq!(next_cycle(&mut events).await, (CycleTrigger::Manual, false));

    scheduler.on_system_wake().await;
    let status = scheduler.status().get_status().await;
    assert!(status.last_error.unwrap().contains("log directory missing"));
    assert!(status.last_error_at.is_some());

    scheduler.stop().await.unwrap();
}
