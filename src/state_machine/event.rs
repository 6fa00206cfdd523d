//! Events that can occur in a voting session

use crate::protocol::ServerEvent;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    SubmitIdentity {
        voter_id: String,
        display_name: String,
    },
    SelectCandidate {
        candidate_id: String,
    },
    ConfirmVote,
    RequestAudit,
    GoBack,
    ToggleReveal,

    // Server events
    Server(ServerEvent),

    // Connection events
    Connected,
    Disconnected {
        reason: String,
    },
    ConnectFailed {
        error: String,
    },
    SendFailed {
        error: String,
    },
    /// A user event the session refused; shown to the user as a notice
    IntentRejected {
        reason: String,
    },

    // Timer events
    ReconnectDue {
        attempt: u32,
    },
    NoticeExpired {
        id: u64,
    },

    Shutdown,
}

impl Event {
    pub fn submit_identity(voter_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Event::SubmitIdentity {
            voter_id: voter_id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn select(candidate_id: impl Into<String>) -> Self {
        Event::SelectCandidate {
            candidate_id: candidate_id.into(),
        }
    }

    pub fn is_user_intent(&self) -> bool {
        matches!(
            self,
            Event::SubmitIdentity { .. }
                | Event::SelectCandidate { .. }
                | Event::ConfirmVote
                | Event::RequestAudit
                | Event::GoBack
                | Event::ToggleReveal
        )
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SubmitIdentity { .. } => "submit_identity",
            Event::SelectCandidate { .. } => "select_candidate",
            Event::ConfirmVote => "confirm_vote",
            Event::RequestAudit => "request_audit",
            Event::GoBack => "go_back",
            Event::ToggleReveal => "toggle_reveal",
            Event::Server(server) => server.type_name(),
            Event::Connected => "connected",
            Event::Disconnected { .. } => "disconnected",
            Event::ConnectFailed { .. } => "connect_failed",
            Event::SendFailed { .. } => "send_failed",
            Event::IntentRejected { .. } => "intent_rejected",
            Event::ReconnectDue { .. } => "reconnect_due",
            Event::NoticeExpired { .. } => "notice_expired",
            Event::Shutdown => "shutdown",
        }
    }
}
