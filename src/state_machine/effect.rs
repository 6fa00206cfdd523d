//! Effects produced by state transitions

use crate::protocol::ClientAction;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send an action over the current connection
    Send(ClientAction),

    /// Open a new connection
    Connect { attempt: u32 },

    /// Close the current connection
    Disconnect,

    /// Fire `ReconnectDue { attempt }` after `delay`, replacing any pending one
    ScheduleReconnect { delay: Duration, attempt: u32 },

    /// Fire `NoticeExpired { id }` after `delay`
    ScheduleNoticeDismiss { id: u64, delay: Duration },

    /// Cancel every pending timer
    CancelTimers,

    /// Publish a fresh view of the state
    Render,
}

impl Effect {
    pub fn register(voter_id: impl Into<String>, name: impl Into<String>) -> Self {
        Effect::Send(ClientAction::Register {
            voter_id: voter_id.into(),
            name: name.into(),
        })
    }

    pub fn vote(voter_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Effect::Send(ClientAction::Vote {
            voter_id: voter_id.into(),
            candidate_id: candidate_id.into(),
        })
    }

    pub fn get_audit() -> Self {
        Effect::Send(ClientAction::GetAudit)
    }

    pub fn is_send(&self) -> bool {
        matches!(self, Effect::Send(_))
    }
}
