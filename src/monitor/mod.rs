// src/monitor/mod.rs

//! Polling activity monitor.
//!
//! ## Lifecycle
//!
//! A monitor starts idle. The first [`register`](ActivityMonitor::register)
//! call arms it: the community's watermark is read once from the store and a
//! polling task starts ticking at the configured interval. When the last
//! observer unregisters the task notices at its next wakeup and goes idle
//! again; a later registration re-arms it. [`stop`](ActivityMonitor::stop)
//! and dropping the monitor abort the task outright.
//!
//! ## Delivery
//!
//! Each tick fetches all feeds, merges them oldest first, and drops events
//! already covered by the watermark. Every remaining event is fanned out to
//! the observers in order. The watermark advances to the last delivered
//! timestamp plus one second, and is persisted, only when at least one event
//! was delivered and no feed failed; a failed feed keeps the watermark in
//! place so its events are retried next cycle.

pub mod cycle;
pub mod dispatch;
pub mod merge;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{ActivityEvent, MonitorConfig};
use crate::services::ActivitySource;
use crate::storage::{Watermark, WatermarkStore};

use dispatch::Registration;

pub use cycle::{run_cycle, CycleOutcome};
pub use dispatch::ActivityObserver;

/// Handle identifying one observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationId(u64);

struct MonitorState {
    registrations: Vec<Registration>,
    next_id: u64,
    watermark: Option<DateTime<Utc>>,
    task: Option<JoinHandle<()>>,
}

/// Polls one community for activity and fans events out to observers.
pub struct ActivityMonitor {
    source: Arc<dyn ActivitySource>,
    store: Arc<dyn WatermarkStore>,
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    closed: Arc<AtomicBool>,
}

impl ActivityMonitor {
    /// Create an idle monitor over the given source and watermark store.
    pub fn new(
        source: Arc<dyn ActivitySource>,
        store: Arc<dyn WatermarkStore>,
        config: MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            store,
            config,
            state: Arc::new(Mutex::new(MonitorState {
                registrations: Vec::new(),
                next_id: 1,
                watermark: None,
                task: None,
            })),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register an observer, arming the monitor if it was idle.
    ///
    /// `since` bounds delivery: only events at or after the instant reach
    /// this observer. Arming reads the stored watermark once; with
    /// `reset_watermark` set it starts empty instead and the reset is
    /// persisted.
    pub async fn register(
        &self,
        observer: Arc<dyn ActivityObserver>,
        since: Option<DateTime<Utc>>,
    ) -> Result<RegistrationId> {
        let mut state = self.state.lock().await;
        if state.task.is_none() {
            let watermark = if self.config.reset_watermark {
                self.store
                    .save(self.source.community(), &Watermark::default())
                    .await?;
                None
            } else {
                self.store.ensure(self.source.community()).await?.last
            };
            state.watermark = watermark;
            state.task = Some(tokio::spawn(run_loop(
                Arc::clone(&self.source),
                Arc::clone(&self.store),
                self.config.clone(),
                Arc::clone(&self.state),
                Arc::clone(&self.closed),
            )));
            log::info!(
                "Monitoring {} every {}s",
                self.source.community().base_url,
                self.config.poll_interval_secs
            );
        }
        let id = state.next_id;
        state.next_id += 1;
        state.registrations.push(Registration {
            id,
            observer,
            since,
        });
        Ok(RegistrationId(id))
    }

    /// Remove an observer registration.
    ///
    /// When the last one goes, polling stops at the next wakeup.
    pub async fn unregister(&self, id: RegistrationId) {
        let mut state = self.state.lock().await;
        state.registrations.retain(|r| r.id != id.0);
        if state.registrations.is_empty() && state.task.is_some() {
            log::info!(
                "Last observer for {} unregistered; polling stops at the next wakeup",
                self.source.community().base_url
            );
        }
    }

    /// Abort the polling task immediately. Observers stay registered and a
    /// later [`register`](ActivityMonitor::register) re-arms the monitor.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.task.take() {
            task.abort();
            log::info!(
                "Activity monitor for {} stopped",
                self.source.community().base_url
            );
        }
    }

    /// Number of currently registered observers.
    pub async fn observer_count(&self) -> usize {
        self.state.lock().await.registrations.len()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
        if let Ok(mut state) = self.state.try_lock() {
            if let Some(task) = state.task.take() {
                task.abort();
            }
        }
    }
}

async fn run_loop(
    source: Arc<dyn ActivitySource>,
    store: Arc<dyn WatermarkStore>,
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    closed: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval_at(
        tokio::time::Instant::now() + Duration::from_secs(config.initial_delay_secs),
        Duration::from_secs(config.poll_interval_secs),
    );
    loop {
        interval.tick().await;
        if closed.load(Ordering::Relaxed) {
            return;
        }
        {
            let mut guard = state.lock().await;
            if guard.registrations.is_empty() {
                guard.task = None;
                log::info!(
                    "Monitor for {} going idle",
                    source.community().base_url
                );
                return;
            }
        }
        tick(source.as_ref(), store.as_ref(), &config, &state).await;
    }
}

async fn tick(
    source: &dyn ActivitySource,
    store: &dyn WatermarkStore,
    config: &MonitorConfig,
    state: &Mutex<MonitorState>,
) {
    let (registrations, watermark) = {
        let guard = state.lock().await;
        (guard.registrations.clone(), guard.watermark)
    };
    if registrations.is_empty() {
        return;
    }

    let outcome = cycle::run_cycle(source, config, watermark).await;
    if !outcome.clean() {
        log::warn!(
            "{} feed(s) failed for {}; watermark stays put",
            outcome.errors.len(),
            source.community().base_url
        );
    }
    if outcome.events.is_empty() {
        return;
    }

    log::info!(
        "Dispatching {} event(s) for {}",
        outcome.events.len(),
        source.community().base_url
    );
    let timeout = Duration::from_millis(config.dispatch_timeout_ms);
    for event in &outcome.events {
        dispatch::dispatch_event(event, &registrations, timeout).await;
    }

    if !outcome.clean() {
        return;
    }
    if let Some(next) = merge::advance(&outcome.events, ActivityEvent::timestamp) {
        {
            let mut guard = state.lock().await;
            guard.watermark = Some(next);
        }
        let mark = Watermark { last: Some(next) };
        if let Err(e) = store.save(source.community(), &mark).await {
            log::error!(
                "Failed to persist watermark for {}: {e}",
                source.community().base_url
            );
        }
    }
}
