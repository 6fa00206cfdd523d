//! Trait abstractions for runtime timers
//!
//! These traits enable testing the executor without waiting on real time.

use crate::state_machine::Event;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Delivers an event back to the runtime after a delay
pub trait Scheduler: Send + Sync {
    /// Send `event` on `events` once `delay` has elapsed, unless `cancel`
    /// fires first
    fn schedule(
        &self,
        delay: Duration,
        event: Event,
        events: mpsc::Sender<Event>,
        cancel: CancellationToken,
    );
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn schedule(
        &self,
        delay: Duration,
        event: Event,
        events: mpsc::Sender<Event>,
        cancel: CancellationToken,
    ) {
        (**self).schedule(delay, event, events, cancel);
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// One tokio task per timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        delay: Duration,
        event: Event,
        events: mpsc::Sender<Event>,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = events.send(event).await;
                }
            }
        });
    }
}
