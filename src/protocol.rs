//! Wire protocol for the voting session
//!
//! JSON text frames over `/ws`. Outbound frames carry an `action`
//! discriminator, inbound frames a `type` discriminator plus `data` payload.

mod codec;
mod types;

pub use codec::{decode, encode, DecodeError};
pub use types::*;
