//! # boardrelay
//!
//! Multi-worker board matchmaking and state relay over WebSockets.
//!
//! Players connect, send `{"type":"initialize"}`, and are placed on a
//! board of up to five: the first player is the hunter, the rest are
//! targets. Position updates (binary frames) and lifecycle messages
//! (`dead`, `mongowin`, `ghostdead`) are relayed to everyone else on the
//! board.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use boardrelay::prelude::*;
//!
//! # async fn start() -> Result<(), BoardRelayError> {
//! let server = BoardRelayServer::<MemoryStore>::builder()
//!     .bind("0.0.0.0:3000")
//!     .workers(4)
//!     .build(Arc::new(MemoryStore::default()))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::BoardRelayError;
pub use server::{AdminHandle, BoardRelayServer, BoardRelayServerBuilder};

/// Common imports for running a server.
pub mod prelude {
    pub use crate::{AdminHandle, BoardRelayError, BoardRelayServer, BoardRelayServerBuilder, ServerConfig};
    pub use boardrelay_board::{BoardConfig, BoardError};
    pub use boardrelay_protocol::{
        BoardId, ClientMessage, ConnectionId, EventRecord, EventState, Role, ServerMessage,
    };
    pub use boardrelay_store::{Credentials, MemoryStore, Store, StoreConfig, CLOSED_SENTINEL};
    pub use boardrelay_transport::GAME_SUBPROTOCOL;
}
