//! Error types for the registry layer.

use boardrelay_protocol::{BoardId, ConnectionId};

/// Errors from the per-worker in-memory maps.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The connection is already indexed on a board. Indexing it again
    /// would list it twice.
    #[error("connection {0} already indexed on board {1}")]
    AlreadyIndexed(ConnectionId, BoardId),
}
