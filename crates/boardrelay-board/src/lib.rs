//! Board engine for boardrelay.
//!
//! Everything here runs inside one worker, against a [`Worker`] context:
//!
//! - **Matchmaking** ([`Worker::join`]) puts a connection on a board the
//!   worker owns, creating one when all are full.
//! - **Relay** ([`Worker::relay_position`], [`Worker::relay_lifecycle`])
//!   forwards position updates and `ghostdead` to the rest of the board.
//! - **Lifecycle** ([`Worker::close_board`]) ends a board on `dead` or
//!   `mongowin`.
//! - **Maintenance** ([`force_close_boards`]) closes boards in bulk.
//!
//! Workers never talk to each other. Everything they share goes through
//! the [`Store`](boardrelay_store::Store).

mod config;
mod error;
mod lifecycle;
mod maintenance;
mod matchmaking;
mod relay;
mod worker;

pub use config::BoardConfig;
pub use error::BoardError;
pub use lifecycle::CloseOutcome;
pub use maintenance::force_close_boards;
pub use matchmaking::JoinOutcome;
pub use relay::LifecycleMessage;
pub use worker::Worker;
