//! Render-ready projection of the session state
//!
//! `project` is pure: the same state always yields the same view. Adapters
//! only ever draw a `SessionView`, never the raw state.

use crate::protocol::{AuditEntry, Candidate, ResultsSnapshot};
use crate::state_machine::{ConnectionStatus, NoticeKind, Phase, SessionState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Label shown for candidates without a party
pub const INDEPENDENT: &str = "Independent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Identity,
    Voting,
    Confirmation,
    Audit,
}

impl From<Phase> for Panel {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::AwaitingIdentity => Panel::Identity,
            Phase::AwaitingVote => Panel::Voting,
            Phase::AwaitingConfirmation => Panel::Confirmation,
            Phase::AuditView => Panel::Audit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionIndicator {
    pub online: bool,
    pub label: String,
}

impl From<ConnectionStatus> for ConnectionIndicator {
    fn from(status: ConnectionStatus) -> Self {
        let label = match status {
            ConnectionStatus::Connecting => "Connecting".to_string(),
            ConnectionStatus::Connected => "Connected".to_string(),
            ConnectionStatus::Reconnecting { attempt } => {
                format!("Reconnecting (attempt {attempt})")
            }
            ConnectionStatus::Closed => "Disconnected".to_string(),
        };
        Self {
            online: matches!(status, ConnectionStatus::Connected),
            label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterBadge {
    pub voter_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_votes: u64,
    pub registered_voters: u64,
    pub voters_who_voted: u64,
    pub participation_pct: u8,
}

/// Candidate picture, or initials when the server sends none
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Badge {
    Image(String),
    Initials(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRow {
    pub id: String,
    pub name: String,
    pub party_label: String,
    pub badge: Badge,
    pub votes: u64,
    pub share_pct: u8,
    pub selected: bool,
}

/// Audit row. Real identity fields are only populated when revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRow {
    pub candidate_name: String,
    pub hashed_voter: String,
    pub timestamp: DateTime<Utc>,
    pub revealed: bool,
    pub real_voter_id: Option<String>,
    pub voter_name: Option<String>,
}

/// Everything an adapter needs to draw one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub panel: Panel,
    pub connection: ConnectionIndicator,
    pub notice: Option<NoticeView>,
    pub busy: bool,
    pub voter: Option<VoterBadge>,
    pub stats: Option<Stats>,
    pub candidates: Vec<CandidateRow>,
    pub audit: Vec<AuditRow>,
    pub audit_loaded: bool,
    pub reveal: bool,
}

impl Default for SessionView {
    fn default() -> Self {
        project(&SessionState::default())
    }
}

/// Project the session state into a view
pub fn project(state: &SessionState) -> SessionView {
    SessionView {
        panel: state.phase.into(),
        connection: state.connection.into(),
        notice: state.notice.as_ref().map(|n| NoticeView {
            kind: n.kind,
            message: n.message.clone(),
        }),
        busy: state.is_busy(),
        voter: state.identity.as_ref().map(|i| VoterBadge {
            voter_id: i.voter_id.clone(),
            display_name: i.display_name.clone(),
        }),
        stats: state.snapshot.as_ref().map(stats),
        candidates: state
            .snapshot
            .as_ref()
            .map(|snapshot| candidate_rows(snapshot, state.selection.as_deref()))
            .unwrap_or_default(),
        audit: state
            .audit
            .iter()
            .flatten()
            .map(|entry| audit_row(entry, state.reveal))
            .collect(),
        audit_loaded: state.audit.is_some(),
        reveal: state.reveal,
    }
}

fn stats(snapshot: &ResultsSnapshot) -> Stats {
    Stats {
        total_votes: snapshot.total_votes,
        registered_voters: snapshot.registered_voters,
        voters_who_voted: snapshot.voters_who_voted,
        participation_pct: percentage(snapshot.voters_who_voted, snapshot.registered_voters),
    }
}

fn candidate_rows(snapshot: &ResultsSnapshot, selection: Option<&str>) -> Vec<CandidateRow> {
    snapshot
        .candidates
        .iter()
        .map(|candidate| CandidateRow {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            party_label: candidate
                .party
                .clone()
                .unwrap_or_else(|| INDEPENDENT.to_string()),
            badge: badge(candidate),
            votes: candidate.votes,
            share_pct: percentage(candidate.votes, snapshot.total_votes),
            selected: selection == Some(candidate.id.as_str()),
        })
        .collect()
}

fn audit_row(entry: &AuditEntry, reveal: bool) -> AuditRow {
    AuditRow {
        candidate_name: entry.candidate_name.clone(),
        hashed_voter: entry.hashed_voter.clone(),
        timestamp: entry.timestamp,
        revealed: reveal,
        real_voter_id: reveal.then(|| entry.real_voter_id.clone()),
        voter_name: reveal.then(|| entry.voter_name.clone()),
    }
}

fn badge(candidate: &Candidate) -> Badge {
    match &candidate.image {
        Some(image) => Badge::Image(image.clone()),
        None => Badge::Initials(initials(&candidate.name)),
    }
}

/// First letter of up to two words, uppercased
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// `part / whole` as a percentage rounded half-up, clamped to `0..=100`.
/// Zero when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u128::from(part);
    let whole = u128::from(whole);
    let rounded = (part * 200 + whole) / (whole * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
