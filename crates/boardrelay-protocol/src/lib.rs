//! Wire protocol for boardrelay.
//!
//! - **Identifiers** ([`WorkerId`], [`ConnectionId`], [`BoardId`])
//! - **Text messages** ([`ClientMessage`], [`ServerMessage`]): JSON
//!   control frames
//! - **Event records** ([`EventRecord`]): per-player position state,
//!   relayed as binary frames
//! - **Codecs** ([`Codec`], [`JsonCodec`], [`BincodeCodec`])
//!
//! ```text
//! Transport (frames) → Protocol (messages, records) → Board engine
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "binary")]
pub use codec::BincodeCodec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BoardId, ClientMessage, ConnectionId, EventRecord, EventState, Role,
    ServerMessage, TerminalState, WorkerId,
};
