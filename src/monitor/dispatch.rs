// src/monitor/dispatch.rs

//! Observer fan-out with bounded waits and crash isolation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;

use crate::models::{ActivityEvent, ChangeEvent, PostEvent};

/// Receives activity events from a monitor.
///
/// Implementations override the callbacks they care about; the defaults do
/// nothing. For every event the kind-specific callback runs first, then
/// [`on_any`](ActivityObserver::on_any).
#[async_trait]
pub trait ActivityObserver: Send + Sync {
    /// A wiki change happened.
    async fn on_change(&self, _change: &ChangeEvent) {}

    /// A discussion post happened.
    async fn on_post(&self, _post: &PostEvent) {}

    /// Any activity happened; runs after the kind-specific callback.
    async fn on_any(&self, _event: &ActivityEvent) {}
}

/// One registered observer with its optional lower timestamp bound.
#[derive(Clone)]
pub(crate) struct Registration {
    pub id: u64,
    pub observer: Arc<dyn ActivityObserver>,
    pub since: Option<DateTime<Utc>>,
}

impl Registration {
    /// Whether this registration wants the event at all.
    fn wants(&self, event: &ActivityEvent) -> bool {
        match self.since {
            Some(since) => since <= event.timestamp(),
            None => true,
        }
    }
}

/// Deliver one event to every interested observer.
///
/// Each delivery runs in its own task, so a panicking observer cannot take
/// down its siblings or the monitor; panics surface as join errors and are
/// logged. The wait for the whole group is bounded by `timeout`. On timeout
/// the slow deliveries are left running detached and the monitor moves on.
pub(crate) async fn dispatch_event(
    event: &ActivityEvent,
    registrations: &[Registration],
    timeout: Duration,
) {
    let mut tasks = Vec::new();
    for registration in registrations {
        if !registration.wants(event) {
            continue;
        }
        let observer = Arc::clone(&registration.observer);
        let event = event.clone();
        tasks.push(tokio::spawn(async move {
            match &event {
                ActivityEvent::Change(change) => observer.on_change(change).await,
                ActivityEvent::Post(post) => observer.on_post(post).await,
            }
            observer.on_any(&event).await;
        }));
    }
    if tasks.is_empty() {
        return;
    }
    match tokio::time::timeout(timeout, future::join_all(tasks)).await {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    log::error!("Observer failed during dispatch: {e}");
                }
            }
        }
        Err(_) => {
            log::warn!(
                "Observers took longer than {}ms; abandoning the wait",
                timeout.as_millis()
            );
        }
    }
}
