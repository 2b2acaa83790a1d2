//! Daemon scheduler.
//!
//! Runs [`MetricsDispatcher::send_cycle`] on a fixed interval from a single
//! background loop, reacts to manual triggers and quit requests, and
//! suppresses automatic sends while the system sleeps.
//!
//! ```text
//! Stopped -> Starting -> Running <-> Paused -> Stopping -> Stopped
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};
use usagepulse_store::{DaemonConfig, StatusStore, StoreError};

use crate::dispatcher::MetricsDispatcher;
use crate::error::DaemonError;
use crate::signals::spawn_signal_listener;

/// Status text recorded while the system is asleep.
pub const SLEEPING_MESSAGE: &str = "system sleeping";

const EVENT_CAPACITY: usize = 32;
const TRIGGER_CAPACITY: usize = 8;

// ============================================================================
// State Types
// ============================================================================

/// Lifecycle of a [`DaemonScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No loop is running.
    #[default]
    Stopped,
    /// `start` is setting up the loop.
    Starting,
    /// The loop is running and sending on every tick.
    Running,
    /// The loop is running but ticks are suppressed.
    Paused,
    /// `stop` is waiting for the loop to exit.
    Stopping,
}

/// Scheduling state, guarded separately from the status store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleState {
    /// Tick interval.
    pub interval: Duration,
    /// When the next automatic send is expected.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Whether ticks are suppressed.
    pub is_paused: bool,
    /// Whether the loop is running.
    pub is_running: bool,
}

/// What caused a dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    /// Periodic tick.
    Tick,
    /// Manual trigger.
    Manual,
    /// Catch-up after system wake.
    Wake,
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A dispatch cycle finished.
    CycleCompleted {
        /// What caused the cycle.
        trigger: CycleTrigger,
        /// Whether the cycle returned without error.
        success: bool,
    },
    /// Automatic sends were suspended.
    Paused,
    /// Automatic sends were resumed.
    Resumed,
    /// The loop exited.
    Stopped,
}

// ============================================================================
// Shared State
// ============================================================================

struct Shared {
    dispatcher: Arc<MetricsDispatcher>,
    status: Arc<StatusStore>,
    schedule: Mutex<ScheduleState>,
    lifecycle: watch::Sender<LifecycleState>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl Shared {
    async fn run_cycle(&self, trigger: CycleTrigger) -> Result<(), DaemonError> {
        let result = self.dispatcher.send_cycle().await;

        let next = match trigger {
            CycleTrigger::Tick | CycleTrigger::Wake => self.recompute_next_fire().await,
            CycleTrigger::Manual => self.schedule.lock().await.next_fire_at,
        };
        match &result {
            Ok(()) => self.status.record_send(Utc::now(), next).await,
            Err(e) => {
                self.status.record_error(e.to_string()).await;
                self.status.set_next_send(next).await;
            }
        }

        debug!(?trigger, success = result.is_ok(), "Cycle finished");
        let _ = self.events.send(SchedulerEvent::CycleCompleted {
            trigger,
            success: result.is_ok(),
        });
        result
    }

    async fn recompute_next_fire(&self) -> Option<DateTime<Utc>> {
        let mut schedule = self.schedule.lock().await;
        schedule.next_fire_at = TimeDelta::from_std(schedule.interval)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta));
        schedule.next_fire_at
    }

    async fn is_paused(&self) -> bool {
        self.schedule.lock().await.is_paused
    }

    async fn finish(&self) {
        {
            let mut schedule = self.schedule.lock().await;
            schedule.is_running = false;
            schedule.is_paused = false;
            schedule.next_fire_at = None;
        }
        self.status.set_running(false).await;
        self.lifecycle.send_replace(LifecycleState::Stopped);
        let _ = self.events.send(SchedulerEvent::Stopped);
        info!("Scheduler stopped");
    }
}

struct Runtime {
    cancel: CancellationToken,
    catch_ups: TaskTracker,
    handle: JoinHandle<()>,
    signals: Option<JoinHandle<()>>,
    trigger_tx: mpsc::Sender<()>,
    quit_tx: mpsc::Sender<()>,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Periodic driver of a [`MetricsDispatcher`].
pub struct DaemonScheduler {
    shared: Arc<Shared>,
    config: DaemonConfig,
    runtime: Mutex<Option<Runtime>>,
}

impl DaemonScheduler {
    /// Creates a stopped scheduler.
    ///
    /// The status store is the one the dispatcher writes to.
    pub fn new(dispatcher: Arc<MetricsDispatcher>, config: DaemonConfig) -> Self {
        let status = Arc::clone(dispatcher.status());
        let (lifecycle, _) = watch::channel(LifecycleState::Stopped);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let schedule = ScheduleState {
            interval: config.interval(),
            ..ScheduleState::default()
        };
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                status,
                schedule: Mutex::new(schedule),
                lifecycle,
                events,
            }),
            config,
            runtime: Mutex::new(None),
        }
    }

    /// Returns the current lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        *self.shared.lifecycle.borrow()
    }

    /// Returns a copy of the scheduling state.
    pub async fn state(&self) -> ScheduleState {
        self.shared.schedule.lock().await.clone()
    }

    /// Returns the status store.
    pub fn status(&self) -> &Arc<StatusStore> {
        &self.shared.status
    }

    /// Subscribes to scheduler events.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.events.subscribe()
    }

    /// Subscribes to lifecycle changes.
    pub fn watch_lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.shared.lifecycle.subscribe()
    }

    /// Starts the background loop.
    ///
    /// Returns once the loop task is spawned. The first tick fires
    /// immediately and counts as the initial send.
    ///
    /// # Errors
    ///
    /// - [`DaemonError::Config`] if the configuration is invalid
    /// - [`DaemonError::AlreadyRunning`] if the scheduler is not stopped
    #[instrument(skip(self), fields(interval = ?self.config.interval()))]
    pub async fn start(&self) -> Result<(), DaemonError> {
        self.config.validate().map_err(|e| match e {
            StoreError::Config(msg) => DaemonError::Config(msg),
            other => DaemonError::Store(other),
        })?;

        let mut runtime = self.runtime.lock().await;
        if self.lifecycle() != LifecycleState::Stopped {
            return Err(DaemonError::AlreadyRunning);
        }
        if let Some(stale) = runtime.take() {
            // Loop already exited after a quit request.
            let _ = stale.handle.await;
            if let Some(signals) = stale.signals {
                signals.abort();
            }
        }
        self.shared.lifecycle.send_replace(LifecycleState::Starting);

        let interval = self.config.interval();
        {
            let mut schedule = self.shared.schedule.lock().await;
            *schedule = ScheduleState {
                interval,
                next_fire_at: Some(Utc::now()),
                is_paused: false,
                is_running: true,
            };
        }
        self.shared.status.set_running(true).await;

        let cancel = CancellationToken::new();
        let catch_ups = TaskTracker::new();
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CAPACITY);
        let (quit_tx, quit_rx) = mpsc::channel(1);

        let signals = self
            .config
            .general
            .handle_signals
            .then(|| spawn_signal_listener(quit_tx.clone(), cancel.clone()));

        self.shared.lifecycle.send_replace(LifecycleState::Running);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            cancel.clone(),
            catch_ups.clone(),
            interval,
            trigger_rx,
            quit_rx,
        ));

        *runtime = Some(Runtime {
            cancel,
            catch_ups,
            handle,
            signals,
            trigger_tx,
            quit_tx,
        });
        info!("Scheduler started");
        Ok(())
    }

    /// Stops the background loop and waits for it to exit.
    ///
    /// No cycle is sent on the way out. A pending wake catch-up is dropped;
    /// one already sending is awaited. Stopping a stopped scheduler is a
    /// no-op.
    pub async fn stop(&self) -> Result<(), DaemonError> {
        let Some(runtime) = self.runtime.lock().await.take() else {
            debug!("Scheduler already stopped");
            return Ok(());
        };

        self.shared.lifecycle.send_if_modified(|state| {
            if *state == LifecycleState::Stopped {
                false
            } else {
                *state = LifecycleState::Stopping;
                true
            }
        });
        runtime.cancel.cancel();

        if let Err(e) = runtime.handle.await {
            warn!(error = %e, "Scheduler loop ended abnormally");
            runtime.catch_ups.close();
            runtime.catch_ups.wait().await;
            self.shared.finish().await;
        }
        if let Some(signals) = runtime.signals {
            let _ = signals.await;
        }
        Ok(())
    }

    /// Suspends automatic sends.
    ///
    /// The clock keeps ticking; ticks are skipped until
    /// [`DaemonScheduler::on_system_wake`]. Manual triggers still send.
    pub async fn on_system_sleep(&self) {
        self.shared.schedule.lock().await.is_paused = true;
        self.shared.lifecycle.send_if_modified(|state| {
            if *state == LifecycleState::Running {
                *state = LifecycleState::Paused;
                true
            } else {
                false
            }
        });
        self.shared.status.record_error(SLEEPING_MESSAGE).await;
        let _ = self.shared.events.send(SchedulerEvent::Paused);
        info!("System sleeping, automatic sends paused");
    }

    /// Resumes automatic sends.
    ///
    /// Returns immediately. If the loop is running, a background task waits
    /// for the settle delay and then sends one catch-up cycle unless the
    /// system went back to sleep; its outcome shows up only in the status
    /// store and the event stream. Only the sleeping error is cleared.
    pub async fn on_system_wake(&self) {
        self.shared.schedule.lock().await.is_paused = false;
        self.shared.lifecycle.send_if_modified(|state| {
            if *state == LifecycleState::Paused {
                *state = LifecycleState::Running;
                true
            } else {
                false
            }
        });
        self.shared.status.clear_error_if(SLEEPING_MESSAGE).await;
        let _ = self.shared.events.send(SchedulerEvent::Resumed);

        let (cancel, catch_ups) = match self.runtime.lock().await.as_ref() {
            Some(runtime) if !runtime.cancel.is_cancelled() => {
                (runtime.cancel.clone(), runtime.catch_ups.clone())
            }
            _ => {
                debug!("System woke while stopped, no catch-up");
                return;
            }
        };

        let shared = Arc::clone(&self.shared);
        let settle = self.config.wake_settle_delay();
        info!(settle = ?settle, "System woke, catch-up scheduled");
        catch_ups.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => debug!("Catch-up dropped, scheduler stopping"),
                () = tokio::time::sleep(settle) => {
                    if shared.is_paused().await {
                        debug!("Asleep again, catch-up skipped");
                        return;
                    }
                    let _ = shared.run_cycle(CycleTrigger::Wake).await;
                }
            }
        });
    }

    /// Asks the loop to send a cycle now, regardless of pause state.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotRunning`] if the loop is not running.
    pub async fn trigger(&self) -> Result<(), DaemonError> {
        let runtime = self.runtime.lock().await;
        let Some(runtime) = runtime.as_ref() else {
            return Err(DaemonError::NotRunning);
        };
        match runtime.trigger_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => Err(DaemonError::NotRunning),
        }
    }

    /// Asks the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotRunning`] if the loop is not running.
    pub async fn quit(&self) -> Result<(), DaemonError> {
        let runtime = self.runtime.lock().await;
        let Some(runtime) = runtime.as_ref() else {
            return Err(DaemonError::NotRunning);
        };
        match runtime.quit_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => Err(DaemonError::NotRunning),
        }
    }

    /// Runs one cycle on the caller's task, regardless of lifecycle state.
    ///
    /// # Errors
    ///
    /// Propagates the dispatcher's error.
    pub async fn send_now(&self) -> Result<(), DaemonError> {
        self.shared.run_cycle(CycleTrigger::Manual).await
    }
}

impl std::fmt::Debug for DaemonScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonScheduler")
            .field("lifecycle", &self.lifecycle())
            .field("interval", &self.config.interval())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Main Loop
// ============================================================================

async fn run_loop(
    shared: Arc<Shared>,
    cancel: CancellationToken,
    catch_ups: TaskTracker,
    interval: Duration,
    mut trigger_rx: mpsc::Receiver<()>,
    mut quit_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Lifecycle cancelled");
                break;
            }
            _ = ticker.tick() => {
                if shared.is_paused().await {
                    debug!("Paused, skipping tick");
                    let next = shared.recompute_next_fire().await;
                    shared.status.set_next_send(next).await;
                    continue;
                }
                if let Err(e) = shared.run_cycle(CycleTrigger::Tick).await {
                    warn!(error = %e, "Scheduled cycle failed");
                }
            }
            Some(()) = trigger_rx.recv() => {
                if let Err(e) = shared.run_cycle(CycleTrigger::Manual).await {
                    warn!(error = %e, "Manual cycle failed");
                }
            }
            Some(()) = quit_rx.recv() => {
                info!("Quit requested");
                cancel.cancel();
                break;
            }
        }
    }

    catch_ups.close();
    catch_ups.wait().await;
    shared.finish().await;
}

// ============================================================================
// Tests
// ============================================================================
