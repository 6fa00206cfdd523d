//! Wire types shared by the codec and the state machine

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Outbound
// ============================================================================

/// Action sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Register { voter_id: String, name: String },
    Vote { voter_id: String, candidate_id: String },
    GetAudit,
}

impl ClientAction {
    /// Wire name of the action, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::Register { .. } => "register",
            ClientAction::Vote { .. } => "vote",
            ClientAction::GetAudit => "get_audit",
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Event pushed from server to client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    InitialState(ResultsSnapshot),
    ResultsUpdate(ResultsSnapshot),
    RegisterResult(ActionOutcome),
    VoteResult(ActionOutcome),
    Audit(Vec<AuditEntry>),
}

impl ServerEvent {
    /// Discriminators this client understands
    pub const KNOWN_TYPES: [&'static str; 5] = [
        "initial_state",
        "results_update",
        "register_result",
        "vote_result",
        "audit",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            ServerEvent::InitialState(_) => "initial_state",
            ServerEvent::ResultsUpdate(_) => "results_update",
            ServerEvent::RegisterResult(_) => "register_result",
            ServerEvent::VoteResult(_) => "vote_result",
            ServerEvent::Audit(_) => "audit",
        }
    }
}

/// A candidate as last reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub votes: u64,
}

/// Full aggregate tally. Always replaces whatever the client held before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    pub total_votes: u64,
    pub registered_voters: u64,
    pub voters_who_voted: u64,
    pub candidates: Vec<Candidate>,
}

impl ResultsSnapshot {
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.candidate(id).is_some()
    }
}

/// Reply to a `register` or `vote` action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Fallback when the server rejects without saying why
pub const UNSPECIFIED_REJECTION: &str = "Request rejected by server";

impl ActionOutcome {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
            message: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Server error text, verbatim
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or(UNSPECIFIED_REJECTION)
    }
}

/// One audit row. Holds both the pseudonymous and the real identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub candidate_name: String,
    pub hashed_voter: String,
    pub real_voter_id: String,
    pub voter_name: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
}

/// Accepts RFC 3339 as well as naive ISO-8601 (read as UTC)
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
