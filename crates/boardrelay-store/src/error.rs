//! Error types for the store layer.

use boardrelay_protocol::BoardId;

/// Errors returned by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached. Transient: the caller drops the
    /// message that triggered the call and carries on.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The credentials were rejected. Fatal for the worker at startup.
    #[error("store authentication failed for user {0}")]
    AuthenticationFailed(String),

    /// A document with this id already exists.
    #[error("duplicate board id {0}")]
    DuplicateKey(BoardId),
}
