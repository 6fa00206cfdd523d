//! Ballot client - real-time voting session client
//!
//! A pure session state machine fed by a WebSocket sync protocol, with a
//! projector that turns state into render-ready views.

pub mod config;
pub mod protocol;
pub mod runtime;
pub mod state_machine;
pub mod terminal;
pub mod transport;
pub mod view;
