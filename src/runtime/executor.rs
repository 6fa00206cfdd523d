//! Session runtime executor

use super::traits::Scheduler;

use crate::protocol::{decode, encode};
use crate::state_machine::{
    transition, Effect, Event, SessionContext, SessionState, TransitionError,
};
use crate::transport::{run_link, Connector, LinkEvent, TransportError};
use crate::view::{project, SessionView};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Drives one voting session: owns the state, applies transitions and
/// executes their effects
pub struct SessionRuntime<C, S>
where
    C: Connector + 'static,
    S: Scheduler + 'static,
{
    context: SessionContext,
    state: SessionState,
    connector: Arc<C>,
    scheduler: S,
    event_rx: mpsc::Receiver<Event>,
    /// Handed to timers so they can deliver back into the loop. Weak, so
    /// dropping every handle closes `event_rx`
    event_tx: mpsc::WeakSender<Event>,
    link_rx: mpsc::Receiver<LinkEvent>,
    link_tx: mpsc::Sender<LinkEvent>,
    view_tx: watch::Sender<SessionView>,
    /// Outbound queue of the live connection, if any
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Bumped on every connect; link events from older links are dropped
    generation: u64,
    link_cancel: CancellationToken,
    /// Parent of every timer token
    timers: CancellationToken,
    reconnect_timer: Option<CancellationToken>,
}

impl<C, S> SessionRuntime<C, S>
where
    C: Connector + 'static,
    S: Scheduler + 'static,
{
    pub fn new(
        context: SessionContext,
        connector: C,
        scheduler: S,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        view_tx: watch::Sender<SessionView>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::channel(64);
        Self {
            context,
            state: SessionState::new(),
            connector: Arc::new(connector),
            scheduler,
            event_rx,
            event_tx,
            link_rx,
            link_tx,
            view_tx,
            outbound: None,
            generation: 0,
            link_cancel: CancellationToken::new(),
            timers: CancellationToken::new(),
            reconnect_timer: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        self.execute_effect(Effect::Render);
        self.execute_effect(Effect::Connect { attempt: 0 });

        // Process events in a loop - no recursion
        while !self.state.is_closed() {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => {
                        tracing::info!("All session handles dropped");
                        self.process_event(Event::Shutdown);
                    }
                },
                Some(link_event) = self.link_rx.recv() => {
                    if let Some(event) = self.handle_link_event(link_event) {
                        self.process_event(event);
                    }
                }
                else => break,
            }
        }

        self.link_cancel.cancel();
        self.timers.cancel();
        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events synchronously
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let kind = current_event.kind();
            let user_intent = current_event.is_user_intent();

            // Pure state transition
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(TransitionError::StaleTimer(attempt)) => {
                    tracing::debug!(attempt, "Ignoring stale reconnect timer");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        event = kind,
                        phase = ?self.state.phase,
                        error = %e,
                        "Event rejected"
                    );
                    if user_intent {
                        events_to_process.push(Event::IntentRejected {
                            reason: e.to_string(),
                        });
                    }
                    continue;
                }
            };

            tracing::debug!(event = kind, phase = ?result.new_state.phase, "Transition applied");
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect) {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    /// Execute an effect and optionally return a generated event
    fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Send(action) => {
                let frame = match encode(&action) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(
                            action = action.name(),
                            error = %e,
                            "Failed to encode action"
                        );
                        return None;
                    }
                };
                let delivered = self
                    .outbound
                    .as_ref()
                    .is_some_and(|outbound| outbound.send(frame).is_ok());
                if delivered {
                    tracing::debug!(action = action.name(), "Action sent");
                    None
                } else {
                    tracing::warn!(action = action.name(), "Cannot send, not connected");
                    Some(Event::SendFailed {
                        error: TransportError::NotConnected.to_string(),
                    })
                }
            }

            Effect::Connect { attempt } => {
                self.open_link(attempt);
                None
            }

            Effect::Disconnect => {
                self.link_cancel.cancel();
                self.outbound = None;
                None
            }

            Effect::ScheduleReconnect { delay, attempt } => {
                if let Some(previous) = self.reconnect_timer.take() {
                    previous.cancel();
                }
                let Some(events) = self.event_tx.upgrade() else {
                    tracing::debug!(attempt, "No session handles left, not reconnecting");
                    return None;
                };
                tracing::info!(attempt, ?delay, "Scheduling reconnect");
                let token = self.timers.child_token();
                self.scheduler
                    .schedule(delay, Event::ReconnectDue { attempt }, events, token.clone());
                self.reconnect_timer = Some(token);
                None
            }

            Effect::ScheduleNoticeDismiss { id, delay } => {
                if let Some(events) = self.event_tx.upgrade() {
                    self.scheduler.schedule(
                        delay,
                        Event::NoticeExpired { id },
                        events,
                        self.timers.child_token(),
                    );
                }
                None
            }

            Effect::CancelTimers => {
                self.timers.cancel();
                self.timers = CancellationToken::new();
                self.reconnect_timer = None;
                None
            }

            Effect::Render => {
                self.view_tx.send_replace(project(&self.state));
                None
            }
        }
    }

    fn open_link(&mut self, attempt: u32) {
        self.link_cancel.cancel();
        self.outbound = None;
        self.generation += 1;
        self.link_cancel = CancellationToken::new();

        tracing::info!(attempt, generation = self.generation, "Connecting");

        let connector = Arc::clone(&self.connector);
        let generation = self.generation;
        let events = self.link_tx.clone();
        let cancel = self.link_cancel.clone();
        tokio::spawn(async move {
            run_link(connector.as_ref(), generation, events, cancel).await;
        });
    }

    /// Translate a link event into a session event
    fn handle_link_event(&mut self, link_event: LinkEvent) -> Option<Event> {
        if link_event.generation() != self.generation {
            tracing::debug!(
                generation = link_event.generation(),
                current = self.generation,
                "Dropping event from replaced link"
            );
            return None;
        }

        match link_event {
            LinkEvent::Established { outbound, .. } => {
                tracing::info!(generation = self.generation, "Connected");
                self.outbound = Some(outbound);
                Some(Event::Connected)
            }
            LinkEvent::Frame { text, .. } => match decode(&text) {
                Ok(server_event) => Some(Event::Server(server_event)),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable frame");
                    None
                }
            },
            LinkEvent::Closed { reason, .. } => {
                tracing::info!(%reason, "Disconnected");
                self.outbound = None;
                Some(Event::Disconnected { reason })
            }
            LinkEvent::Failed { error, .. } => {
                tracing::warn!(%error, "Connection attempt failed");
                Some(Event::ConnectFailed {
                    error: error.to_string(),
                })
            }
        }
    }
}
