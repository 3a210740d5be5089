//! Unified error type for boardrelay.

use boardrelay_board::BoardError;
use boardrelay_protocol::ProtocolError;
use boardrelay_store::StoreError;
use boardrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BoardRelayError {
    /// Binding, accepting, or talking to a socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The store rejected a call (offline, bad credentials, ...).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A board operation failed.
    #[error(transparent)]
    Board(#[from] BoardError),
}
