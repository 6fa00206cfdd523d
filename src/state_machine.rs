//! Voting session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{
    ConnectionStatus, Notice, NoticeKind, PendingAction, Phase, ReconnectPolicy, SessionContext,
    SessionState, VoterIdentity, DEFAULT_NOTICE_TTL,
};
pub use transition::{transition, TransitionError, TransitionResult};
