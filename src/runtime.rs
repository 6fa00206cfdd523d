//! Runtime for a live voting session
//!
//! The runtime task is the only place session state is mutated. Callers talk
//! to it through a `SessionHandle`: user intents go in as events, fresh
//! `SessionView`s come out over a watch channel.

mod executor;
pub mod traits;


pub use executor::SessionRuntime;
pub use traits::*;

use crate::state_machine::{Event, SessionContext};
use crate::transport::Connector;
use crate::view::SessionView;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("session runtime has stopped")]
    Stopped,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    view_rx: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Queue an event for the runtime
    pub async fn dispatch(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    pub async fn submit_identity(
        &self,
        voter_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        self.dispatch(Event::submit_identity(voter_id, display_name))
            .await
    }

    pub async fn select(&self, candidate_id: impl Into<String>) -> Result<(), RuntimeError> {
        self.dispatch(Event::select(candidate_id)).await
    }

    pub async fn confirm_vote(&self) -> Result<(), RuntimeError> {
        self.dispatch(Event::ConfirmVote).await
    }

    pub async fn request_audit(&self) -> Result<(), RuntimeError> {
        self.dispatch(Event::RequestAudit).await
    }

    pub async fn go_back(&self) -> Result<(), RuntimeError> {
        self.dispatch(Event::GoBack).await
    }

    pub async fn toggle_reveal(&self) -> Result<(), RuntimeError> {
        self.dispatch(Event::ToggleReveal).await
    }

    /// Tear the session down. Idempotent once the runtime has stopped.
    pub async fn shutdown(&self) {
        let _ = self.dispatch(Event::Shutdown).await;
    }

    /// Latest published view
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every render
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }
}

/// Start a session runtime on the current tokio runtime
pub fn spawn_session<C, S>(
    context: SessionContext,
    connector: C,
    scheduler: S,
) -> (SessionHandle, JoinHandle<()>)
where
    C: Connector + 'static,
    S: Scheduler + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(32);
    let (view_tx, view_rx) = watch::channel(SessionView::default());

    let runtime = SessionRuntime::new(
        context,
        connector,
        scheduler,
        event_rx,
        event_tx.downgrade(),
        view_tx,
    );
    let task = tokio::spawn(runtime.run());

    (SessionHandle { event_tx, view_rx }, task)
}
