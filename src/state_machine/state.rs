//! Session state types

use crate::protocol::{AuditEntry, ResultsSnapshot};
use serde::Serialize;
use std::time::Duration;

// ============================================================================
// Phase
// ============================================================================

/// Step of the voting flow the client is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Identity entry, waiting for a successful registration
    #[default]
    AwaitingIdentity,
    /// Registered, choosing a candidate
    AwaitingVote,
    /// Vote accepted, watching live results
    AwaitingConfirmation,
    /// Inspecting the audit trail
    AuditView,
}

// ============================================================================
// Identity and pending actions
// ============================================================================

/// Identity acknowledged by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterIdentity {
    pub voter_id: String,
    pub display_name: String,
}

impl VoterIdentity {
    /// Build from raw user input. `None` if either field is blank after trim.
    pub fn from_input(voter_id: &str, display_name: &str) -> Option<Self> {
        let voter_id = voter_id.trim();
        let display_name = display_name.trim();
        if voter_id.is_empty() || display_name.is_empty() {
            return None;
        }
        Some(Self {
            voter_id: voter_id.to_string(),
            display_name: display_name.to_string(),
        })
    }
}

/// The single `register` or `vote` action awaiting its reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingAction {
    /// Identity is only stored once the server accepts it
    Register { identity: VoterIdentity },
    Vote { candidate_id: String },
}

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Error,
    Info,
}

/// Transient inline message, auto-dismissed by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

// ============================================================================
// Connection
// ============================================================================

/// Client view of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// First connection attempt in progress
    #[default]
    Connecting,
    Connected,
    /// Disconnected; `attempt` is the reconnect attempt scheduled or running
    Reconnecting { attempt: u32 },
    /// Session torn down, no further reconnects
    Closed,
}

// ============================================================================
// Session State
// ============================================================================

/// Everything the client knows about the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub identity: Option<VoterIdentity>,
    pub selection: Option<String>,
    pub snapshot: Option<ResultsSnapshot>,
    pub audit: Option<Vec<AuditEntry>>,
    pub reveal: bool,
    pub pending: Option<PendingAction>,
    pub notice: Option<Notice>,
    pub connection: ConnectionStatus,
    /// Last notice id handed out
    pub notice_seq: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a `register` or `vote` is awaiting its reply
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionStatus::Connected)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.connection, ConnectionStatus::Closed)
    }

    /// Builder-style phase override, mostly for tests
    #[must_use]
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, voter_id: &str, display_name: &str) -> Self {
        self.identity = VoterIdentity::from_input(voter_id, display_name);
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: ResultsSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    #[must_use]
    pub fn connected(mut self) -> Self {
        self.connection = ConnectionStatus::Connected;
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// Backoff between reconnect attempts
///
/// The delay for attempt `n` is `initial * multiplier^(n-1)`, capped at `max`.
/// With `initial == max` this is a constant delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::constant(Duration::from_secs(1))
    }
}

impl ReconnectPolicy {
    pub fn constant(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1,
        }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: 2,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial.checked_mul(factor).unwrap_or(self.max).min(self.max)
    }
}

/// Default lifetime of an inline notice
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);

/// Immutable configuration consulted by transitions
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub reconnect: ReconnectPolicy,
    pub notice_ttl: Duration,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl SessionContext {
    pub fn new(reconnect: ReconnectPolicy, notice_ttl: Duration) -> Self {
        Self {
            reconnect,
            notice_ttl,
        }
    }
}
