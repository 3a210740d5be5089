//! Shared persistent state for boardrelay.
//!
//! Two collections are shared by every worker:
//!
//! 1. the **board directory** ([`BoardDirectory`]): one document per
//!    board, mutated only through an atomic filter-then-update step;
//! 2. the **event log** ([`EventLog`]): one record per player per board,
//!    replayed to late joiners.
//!
//! Both are capped ([`CappedCollection`]): oldest documents are evicted
//! once the collection is full, which is how abandoned boards and dead
//! records are garbage collected. [`MemoryStore`] implements both over
//! process memory.

mod auth;
mod board;
mod capped;
mod error;
mod event;
mod memory;

pub use auth::{Credentials, Store};
pub use board::{
    BoardDirectory, BoardDocument, BoardFilter, BoardUpdate, CLOSED_SENTINEL,
    DEFAULT_MAX_CAPACITY, ReturnDocument,
};
pub use capped::CappedCollection;
pub use error::StoreError;
pub use event::{EventFilter, EventLog, EventUpdate};
pub use memory::{MemoryStore, StoreConfig};
