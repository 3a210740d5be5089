//! Per-worker in-memory state for boardrelay.
//!
//! Two structures, both owned by exactly one worker and never shared
//! with other workers:
//!
//! 1. [`ConnectionRegistry`]: connection id → outbound channel of the
//!    live connection
//! 2. [`BoardIndex`]: board → ordered connection ids, and connection →
//!    board
//!
//! ```text
//! Board engine (above)  ← looks up who to send to
//!     ↕
//! Registry (this crate) ← who is connected, who sits on which board
//!     ↕
//! Transport (below)     ← frames reach the socket through the channel
//! ```

mod error;
mod index;
mod registry;

pub use error::RegistryError;
pub use index::BoardIndex;
pub use registry::{ConnectionRegistry, OutboundReceiver, OutboundSender};
