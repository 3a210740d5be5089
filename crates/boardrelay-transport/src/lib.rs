//! Transport abstraction layer for boardrelay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the message-based duplex channel players connect with, and the
//! [`Frame`] type that travels over it.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, GAME_SUBPROTOCOL, PendingConnection, WebSocketConnection,
    WebSocketTransport,
};

use std::net::SocketAddr;

/// One message on a connection.
///
/// Small structured messages travel as text; position records travel as
/// opaque binary blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 text frame (JSON control messages).
    Text(String),
    /// A binary frame (position records).
    Binary(Vec<u8>),
}

/// Accepts new incoming connections.
///
/// Accepting is split in two: [`accept`](Self::accept) only takes the
/// next raw stream off the listener, and [`upgrade`](Self::upgrade) runs
/// the protocol handshake on it. Accept loops hand the pending stream to
/// a per-connection task, so a client that never finishes its handshake
/// can't stall the loop.
pub trait Transport: Send + Sync + 'static {
    /// An accepted stream whose handshake hasn't run yet.
    type Pending: Send + 'static;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Completes the handshake on an accepted stream.
    async fn upgrade(pending: Self::Pending) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single connection that can send and receive frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, frame: Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
