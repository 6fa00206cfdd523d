//! Pure state transition function
//!
//! Given the same state, context and event this always yields the same
//! result. All I/O is described by the returned effects.

use super::state::{
    ConnectionStatus, Notice, NoticeKind, PendingAction, Phase, SessionContext, SessionState,
    VoterIdentity,
};
use super::{Effect, Event};
use crate::protocol::{ActionOutcome, ResultsSnapshot, ServerEvent};
use thiserror::Error;

pub const MISSING_IDENTITY_FIELDS: &str = "Please fill in both voter ID and name";
pub const NO_SELECTION: &str = "Please select a candidate before confirming";
pub const NOT_CONNECTED: &str = "Not connected to the voting server";
pub const CONNECTION_LOST: &str = "Connection lost before the server replied, please try again";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Changed state: append `Render`
    fn rendered(self) -> Self {
        self.with_effect(Effect::Render)
    }
}

/// Events the current state refuses
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A register or vote request is already awaiting its reply")]
    ActionInFlight,
    #[error("Unknown candidate: {0}")]
    UnknownCandidate(String),
    #[error("Unexpected {0} with no matching request in flight")]
    UnexpectedReply(&'static str),
    #[error("Stale timer for reconnect attempt {0}")]
    StaleTimer(u32),
    #[error("Session is closed")]
    SessionClosed,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per row of the transition table
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if state.is_closed() {
        return Err(TransitionError::SessionClosed);
    }

    let mut next = state.clone();

    match (state.phase, event) {
        // ============================================================
        // Phase-independent events
        // ============================================================
        (
            _,
            Event::Server(
                ServerEvent::InitialState(snapshot) | ServerEvent::ResultsUpdate(snapshot),
            ),
        ) => {
            apply_snapshot(&mut next, snapshot);
            Ok(TransitionResult::new(next).rendered())
        }

        (_, Event::ToggleReveal) => {
            next.reveal = !next.reveal;
            Ok(TransitionResult::new(next).rendered())
        }

        (_, Event::NoticeExpired { id }) => {
            if next.notice.as_ref().is_some_and(|n| n.id == id) {
                next.notice = None;
                Ok(TransitionResult::new(next).rendered())
            } else {
                // Superseded by a newer notice
                Ok(TransitionResult::new(next))
            }
        }

        // ============================================================
        // Connection lifecycle
        // ============================================================
        (_, Event::Connected) => {
            next.connection = ConnectionStatus::Connected;
            Ok(TransitionResult::new(next).rendered())
        }

        (_, Event::Disconnected { .. } | Event::ConnectFailed { .. }) => {
            let attempt = match state.connection {
                ConnectionStatus::Reconnecting { attempt } => attempt.saturating_add(1),
                _ => 1,
            };
            next.connection = ConnectionStatus::Reconnecting { attempt };

            let mut result_effects = vec![Effect::ScheduleReconnect {
                delay: context.reconnect.delay(attempt),
                attempt,
            }];
            // A reply can never arrive on the next logical connection
            if next.pending.take().is_some() {
                result_effects.push(raise_notice(
                    &mut next,
                    context,
                    NoticeKind::Error,
                    CONNECTION_LOST,
                ));
            }
            Ok(TransitionResult::new(next)
                .with_effects(result_effects)
                .rendered())
        }

        (_, Event::ReconnectDue { attempt }) => match state.connection {
            ConnectionStatus::Reconnecting { attempt: current } if current == attempt => {
                Ok(TransitionResult::new(next).with_effect(Effect::Connect { attempt }))
            }
            _ => Err(TransitionError::StaleTimer(attempt)),
        },

        (_, Event::SendFailed { .. }) => {
            next.pending = None;
            let dismiss = raise_notice(&mut next, context, NoticeKind::Error, NOT_CONNECTED);
            Ok(TransitionResult::new(next).with_effect(dismiss).rendered())
        }

        (_, Event::IntentRejected { reason }) => {
            let dismiss = raise_notice(&mut next, context, NoticeKind::Error, &reason);
            Ok(TransitionResult::new(next).with_effect(dismiss).rendered())
        }

        (_, Event::Shutdown) => {
            next.connection = ConnectionStatus::Closed;
            next.pending = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::CancelTimers)
                .with_effect(Effect::Disconnect)
                .rendered())
        }

        // ============================================================
        // Identity
        // ============================================================
        (Phase::AwaitingIdentity, Event::SubmitIdentity { .. }) if state.is_busy() => {
            Err(TransitionError::ActionInFlight)
        }

        (
            Phase::AwaitingIdentity,
            Event::SubmitIdentity {
                voter_id,
                display_name,
            },
        ) => {
            let Some(identity) = VoterIdentity::from_input(&voter_id, &display_name) else {
                let dismiss =
                    raise_notice(&mut next, context, NoticeKind::Error, MISSING_IDENTITY_FIELDS);
                return Ok(TransitionResult::new(next).with_effect(dismiss).rendered());
            };
            let send = Effect::register(&identity.voter_id, &identity.display_name);
            next.pending = Some(PendingAction::Register { identity });
            next.notice = None;
            Ok(TransitionResult::new(next).with_effect(send).rendered())
        }

        (Phase::AwaitingIdentity, Event::Server(ServerEvent::RegisterResult(outcome))) => {
            let Some(PendingAction::Register { identity }) = next.pending.take() else {
                return Err(TransitionError::UnexpectedReply("register_result"));
            };
            if outcome.success {
                next.identity = Some(identity);
                next.phase = Phase::AwaitingVote;
                next.notice = None;
                let effects = success_notice(&mut next, context, &outcome);
                Ok(TransitionResult::new(next).with_effects(effects).rendered())
            } else {
                let dismiss =
                    raise_notice(&mut next, context, NoticeKind::Error, outcome.error_text());
                Ok(TransitionResult::new(next).with_effect(dismiss).rendered())
            }
        }

        // ============================================================
        // Voting
        // ============================================================
        (Phase::AwaitingVote, Event::SelectCandidate { .. } | Event::ConfirmVote | Event::GoBack)
            if state.is_busy() =>
        {
            Err(TransitionError::ActionInFlight)
        }

        (Phase::AwaitingVote, Event::SelectCandidate { candidate_id }) => {
            let known = state
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| snapshot.contains(&candidate_id));
            if !known {
                return Err(TransitionError::UnknownCandidate(candidate_id));
            }
            next.selection = Some(candidate_id);
            Ok(TransitionResult::new(next).rendered())
        }

        (Phase::AwaitingVote, Event::ConfirmVote) => {
            let Some(candidate_id) = state.selection.clone() else {
                let dismiss = raise_notice(&mut next, context, NoticeKind::Error, NO_SELECTION);
                return Ok(TransitionResult::new(next).with_effect(dismiss).rendered());
            };
            let Some(identity) = &state.identity else {
                return Err(TransitionError::InvalidTransition(
                    "confirm_vote without a registered identity".to_string(),
                ));
            };
            let send = Effect::vote(&identity.voter_id, &candidate_id);
            next.pending = Some(PendingAction::Vote { candidate_id });
            next.notice = None;
            Ok(TransitionResult::new(next).with_effect(send).rendered())
        }

        (Phase::AwaitingVote, Event::Server(ServerEvent::VoteResult(outcome))) => {
            let Some(PendingAction::Vote { .. }) = next.pending.take() else {
                return Err(TransitionError::UnexpectedReply("vote_result"));
            };
            if outcome.success {
                next.selection = None;
                next.phase = Phase::AwaitingConfirmation;
                next.notice = None;
                let effects = success_notice(&mut next, context, &outcome);
                Ok(TransitionResult::new(next).with_effects(effects).rendered())
            } else {
                let dismiss =
                    raise_notice(&mut next, context, NoticeKind::Error, outcome.error_text());
                Ok(TransitionResult::new(next).with_effect(dismiss).rendered())
            }
        }

        (Phase::AwaitingVote, Event::GoBack) => {
            next.phase = Phase::AwaitingIdentity;
            next.notice = None;
            Ok(TransitionResult::new(next).rendered())
        }

        // ============================================================
        // Results and audit
        // ============================================================
        (Phase::AwaitingConfirmation, Event::RequestAudit) => {
            next.phase = Phase::AuditView;
            next.notice = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::get_audit())
                .rendered())
        }

        // Refresh
        (Phase::AuditView, Event::RequestAudit) => {
            Ok(TransitionResult::new(next).with_effect(Effect::get_audit()))
        }

        // A reply may land after the user already went back
        (
            Phase::AuditView | Phase::AwaitingConfirmation,
            Event::Server(ServerEvent::Audit(entries)),
        ) => {
            next.audit = Some(entries);
            Ok(TransitionResult::new(next).rendered())
        }

        (Phase::AuditView, Event::GoBack) => {
            next.phase = Phase::AwaitingConfirmation;
            next.notice = None;
            Ok(TransitionResult::new(next).rendered())
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{} not allowed in {phase:?}",
            event.kind()
        ))),
    }
}

// Helper functions

/// Overwrite the snapshot. Never merged; a selection the server no longer
/// lists is dropped.
fn apply_snapshot(state: &mut SessionState, snapshot: ResultsSnapshot) {
    if let Some(selected) = &state.selection {
        if !snapshot.contains(selected) {
            state.selection = None;
        }
    }
    state.snapshot = Some(snapshot);
}

/// Replace the current notice and return the effect that will dismiss it
fn raise_notice(
    state: &mut SessionState,
    context: &SessionContext,
    kind: NoticeKind,
    message: &str,
) -> Effect {
    state.notice_seq += 1;
    let id = state.notice_seq;
    state.notice = Some(Notice {
        id,
        kind,
        message: message.to_string(),
    });
    Effect::ScheduleNoticeDismiss {
        id,
        delay: context.notice_ttl,
    }
}

fn success_notice(
    state: &mut SessionState,
    context: &SessionContext,
    outcome: &ActionOutcome,
) -> Option<Effect> {
    outcome
        .message
        .as_deref()
        .map(|message| raise_notice(state, context, NoticeKind::Info, message))
}
