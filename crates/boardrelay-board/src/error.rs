//! Error types for the board layer.

use boardrelay_protocol::{BoardId, ConnectionId, ProtocolError};
use boardrelay_registry::RegistryError;
use boardrelay_store::StoreError;

/// Errors that can occur while handling a player's message.
///
/// None of these are fatal for the worker: the handler logs them and
/// drops the message that caused them.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A message couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The in-memory index rejected an update.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The connection asked to join while already on a live board.
    #[error("connection {0} is already on board {1}")]
    AlreadyJoined(ConnectionId, BoardId),
}

impl BoardError {
    /// Returns `true` for failures worth retrying later (store outages).
    pub fn is_transient(&self) -> bool {
        matches!(self, BoardError::Store(StoreError::Unavailable(_)))
    }
}
