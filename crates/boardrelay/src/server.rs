//! `BoardRelayServer` builder, worker supervisor, and admin handle.
//!
//! This is the entry point for running a boardrelay server. It ties
//! together all the layers: transport → protocol → board engine → store.
//!
//! One listener is shared by `workers` worker tasks. Workers share nothing
//! but the store; each keeps its own registry and index, and only ever
//! fills boards it created.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use boardrelay_board::{BoardConfig, Worker, force_close_boards};
use boardrelay_protocol::WorkerId;
use boardrelay_store::{CLOSED_SENTINEL, Credentials, Store};
use boardrelay_transport::{DEFAULT_HANDSHAKE_TIMEOUT, Transport, WebSocketTransport};
use tokio::task::{AbortHandle, JoinSet};

use crate::handler::serve_connection;
use crate::{BoardRelayError, ServerConfig};

/// Builder for configuring and starting a boardrelay server.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use boardrelay::prelude::*;
///
/// let store = Arc::new(MemoryStore::default());
/// let server = BoardRelayServer::builder()
///     .bind("0.0.0.0:3000")
///     .workers(4)
///     .build(store)
///     .await?;
/// server.run().await
/// ```
pub struct BoardRelayServerBuilder {
    bind_addr: String,
    workers: usize,
    board: BoardConfig,
    credentials: Credentials,
    restart_backoff: Duration,
    handshake_timeout: Duration,
}

impl BoardRelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            workers: 1,
            board: BoardConfig::default(),
            credentials: Credentials::default(),
            restart_backoff: Duration::from_secs(1),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Takes address, worker count, board sizing and credentials from
    /// `config`.
    pub fn with_config(self, config: &ServerConfig) -> Self {
        self.bind(&config.bind_addr())
            .workers(config.workers)
            .board_config(config.board)
            .credentials(config.credentials.clone())
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how many workers share the listener. At least one runs, and
    /// at most one per worker id slot.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, WorkerId::SLOTS as usize);
        self
    }

    /// Sets the board configuration.
    pub fn board_config(mut self, config: BoardConfig) -> Self {
        self.board = config.validated();
        self
    }

    /// Sets the credentials each worker presents to the store.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets how long the supervisor waits before replacing a worker.
    pub fn restart_backoff(mut self, backoff: Duration) -> Self {
        self.restart_backoff = backoff;
        self
    }

    /// Sets how long a client gets to finish the WebSocket handshake.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds a server over `store`.
    pub async fn build<S: Store>(self, store: Arc<S>) -> Result<BoardRelayServer<S>, BoardRelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        Ok(BoardRelayServer {
            transport,
            store,
            workers: self.workers,
            board: self.board,
            credentials: self.credentials,
            restart_backoff: self.restart_backoff,
        })
    }
}

impl Default for BoardRelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound boardrelay server.
///
/// Call [`run()`](Self::run) to start the workers.
pub struct BoardRelayServer<S> {
    transport: WebSocketTransport,
    store: Arc<S>,
    workers: usize,
    board: BoardConfig,
    credentials: Credentials,
    restart_backoff: Duration,
}

impl<S: Store> BoardRelayServer<S> {
    /// Creates a new builder.
    pub fn builder() -> BoardRelayServerBuilder {
        BoardRelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for maintenance operations on the shared store.
    pub fn admin(&self) -> AdminHandle<S> {
        AdminHandle {
            store: Arc::clone(&self.store),
            threshold: self.board.reset_threshold,
        }
    }

    /// Runs the worker supervisor.
    ///
    /// Starts the configured number of workers and replaces any that
    /// exit, after the restart back-off, with a fresh worker id. A
    /// replacement never takes the slot of a worker that is still
    /// running. Runs until the process is terminated.
    pub async fn run(self) -> Result<(), BoardRelayError> {
        tracing::info!(workers = self.workers, "boardrelay server running");

        let mut workers = JoinSet::new();
        let mut live: HashMap<u32, AbortHandle> = HashMap::new();
        let mut next_slot: u32 = 0;
        for _ in 0..self.workers {
            self.respawn(&mut workers, &mut live, &mut next_slot);
        }

        while let Some(exited) = workers.join_next().await {
            match exited {
                Ok((worker_id, Ok(()))) => {
                    tracing::warn!(%worker_id, "worker stopped");
                }
                Ok((worker_id, Err(e))) => {
                    tracing::error!(%worker_id, error = %e, "worker failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "worker panicked");
                }
            }
            tokio::time::sleep(self.restart_backoff).await;
            self.respawn(&mut workers, &mut live, &mut next_slot);
        }

        Ok(())
    }

    fn respawn(
        &self,
        workers: &mut JoinSet<(WorkerId, Result<(), BoardRelayError>)>,
        live: &mut HashMap<u32, AbortHandle>,
        next_slot: &mut u32,
    ) {
        live.retain(|_, handle| !handle.is_finished());
        match pick_slot(next_slot, |slot| live.contains_key(&slot)) {
            Some(slot) => {
                let handle = self.spawn_worker(workers, slot);
                live.insert(slot, handle);
            }
            None => {
                tracing::error!(live = live.len(), "no free worker slot, worker not replaced");
            }
        }
    }

    fn spawn_worker(
        &self,
        workers: &mut JoinSet<(WorkerId, Result<(), BoardRelayError>)>,
        slot: u32,
    ) -> AbortHandle {
        let id = WorkerId::for_process(slot);
        let transport = self.transport.clone();
        let store = Arc::clone(&self.store);
        let board = self.board;
        let credentials = self.credentials.clone();
        workers.spawn(async move {
            let result = run_worker(id, transport, store, board, credentials).await;
            (id, result)
        })
    }
}

/// Picks the first slot at or after `*next` (modulo [`WorkerId::SLOTS`])
/// that `in_use` rejects, and moves `*next` past it. `None` if every slot
/// is taken.
fn pick_slot(next: &mut u32, in_use: impl Fn(u32) -> bool) -> Option<u32> {
    for _ in 0..WorkerId::SLOTS {
        let slot = *next % WorkerId::SLOTS;
        *next = (slot + 1) % WorkerId::SLOTS;
        if !in_use(slot) {
            return Some(slot);
        }
    }
    None
}

/// Pause after a failed accept before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// One worker: log in to the store, then accept connections forever.
async fn run_worker<S: Store>(
    id: WorkerId,
    mut transport: WebSocketTransport,
    store: Arc<S>,
    board: BoardConfig,
    credentials: Credentials,
) -> Result<(), BoardRelayError> {
    store.authenticate(&credentials).await?;
    let worker = Arc::new(Worker::new(id, board, store));
    tracing::info!(worker_id = %id, "worker started");

    loop {
        match transport.accept().await {
            Ok(pending) => {
                tokio::spawn(serve_connection(pending, Arc::clone(&worker)));
            }
            Err(e) => {
                tracing::error!(worker_id = %id, error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

/// Administrative operations on the shared store.
pub struct AdminHandle<S> {
    store: Arc<S>,
    threshold: u32,
}

impl<S> Clone for AdminHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            threshold: self.threshold,
        }
    }
}

impl<S: Store> AdminHandle<S> {
    /// Closes every board below the configured reset threshold (by
    /// default, every live board). Returns how many were closed.
    pub async fn reset_boards(&self) -> Result<u64, BoardRelayError> {
        self.force_close_below(self.threshold).await
    }

    /// Closes every board whose capacity is below `threshold`.
    pub async fn force_close_below(&self, threshold: u32) -> Result<u64, BoardRelayError> {
        Ok(force_close_boards(self.store.as_ref(), threshold.min(CLOSED_SENTINEL)).await?)
    }
}
