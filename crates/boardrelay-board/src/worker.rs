//! The per-worker context every board operation runs against.
//!
//! A [`Worker`] owns this worker's connection registry and board index and
//! shares the store with every other worker. All board operations live in
//! sibling modules as `impl<S: Store> Worker<S>` blocks.
//!
//! # Locking
//!
//! The registry and index each sit behind their own mutex. Neither lock
//! is held across a store call, and the two are never held at once.

use std::sync::Arc;

use boardrelay_protocol::{
    BincodeCodec, BoardId, ClientMessage, Codec, ConnectionId, EventRecord, JsonCodec,
    ServerMessage, WorkerId,
};
use boardrelay_registry::{BoardIndex, ConnectionRegistry, OutboundSender};
use boardrelay_store::Store;
use boardrelay_transport::Frame;
use tokio::sync::Mutex;

use crate::relay::LifecycleMessage;
use crate::{BoardConfig, BoardError};

/// One worker's view of the system.
pub struct Worker<S> {
    pub(crate) id: WorkerId,
    pub(crate) config: BoardConfig,
    pub(crate) store: Arc<S>,
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) index: Mutex<BoardIndex>,
    json: JsonCodec,
    binary: BincodeCodec,
}

impl<S: Store> Worker<S> {
    /// Creates a worker with an empty registry and index.
    pub fn new(id: WorkerId, config: BoardConfig, store: Arc<S>) -> Self {
        Self {
            id,
            config: config.validated(),
            store,
            registry: Mutex::new(ConnectionRegistry::new(id)),
            index: Mutex::new(BoardIndex::new()),
            json: JsonCodec,
            binary: BincodeCodec,
        }
    }

    /// This worker's id. Stamped as the owner of every board it creates.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Registers a new connection and returns its id.
    pub async fn connect(&self, sender: OutboundSender) -> ConnectionId {
        self.registry.lock().await.register(sender)
    }

    /// Forgets a closed connection.
    ///
    /// Only the registry entry goes. Boards, event records and index
    /// entries stay until the board is closed or aged out of the store.
    pub async fn disconnect(&self, conn: ConnectionId) {
        if self.registry.lock().await.unregister(conn) {
            tracing::info!(worker = %self.id, conn_id = %conn, "connection closed");
        }
    }

    /// Routes one inbound frame: text frames carry control messages,
    /// binary frames carry position updates.
    pub async fn handle_frame(&self, conn: ConnectionId, frame: Frame) -> Result<(), BoardError> {
        match frame {
            Frame::Text(text) => {
                let msg: ClientMessage = self.json.decode(text.as_bytes())?;
                self.handle_message(conn, msg).await
            }
            Frame::Binary(payload) => self.relay_position(conn, payload).await.map(drop),
        }
    }

    /// Dispatches a decoded control message.
    pub async fn handle_message(
        &self,
        conn: ConnectionId,
        msg: ClientMessage,
    ) -> Result<(), BoardError> {
        match LifecycleMessage::from_client(msg) {
            Some(lifecycle) => self.relay_lifecycle(conn, lifecycle).await,
            None => self.join(conn).await.map(drop),
        }
    }

    /// Number of live connections on this worker.
    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// The board `conn` sits on, per this worker's index.
    pub async fn board_of(&self, conn: ConnectionId) -> Option<BoardId> {
        self.index.lock().await.board_of(conn)
    }

    /// Members of `board` known to this worker, in join order.
    pub async fn members(&self, board: BoardId) -> Vec<ConnectionId> {
        self.index.lock().await.members(board).to_vec()
    }

    /// Returns `true` if both directions of the board index agree.
    pub async fn index_is_consistent(&self) -> bool {
        self.index.lock().await.is_consistent()
    }

    // -- frame helpers -----------------------------------------------------

    pub(crate) fn text_frame(&self, msg: &ServerMessage) -> Result<Frame, BoardError> {
        Ok(Frame::Text(self.json.encode_text(msg)?))
    }

    pub(crate) fn record_frame(&self, record: &EventRecord) -> Result<Frame, BoardError> {
        Ok(Frame::Binary(self.binary.encode(record)?))
    }

    /// Queues a control message for one connection. Returns `false` if
    /// the connection is gone.
    pub(crate) async fn send_message(
        &self,
        conn: ConnectionId,
        msg: &ServerMessage,
    ) -> Result<bool, BoardError> {
        let frame = self.text_frame(msg)?;
        Ok(self.registry.lock().await.send(conn, frame))
    }
}
