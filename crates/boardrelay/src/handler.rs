//! Per-connection handler: registration, outbound writer, and the inbound
//! frame loop.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! so frames from one client are processed strictly in order while other
//! clients proceed independently. The flow is:
//!   0. Complete the WebSocket handshake (off the accept loop)
//!   1. Register with the worker → outbound channel + writer task
//!   2. Loop: receive frames → hand each to the worker
//!   3. On close: unregister (drop guard)

use std::sync::Arc;

use boardrelay_board::{BoardError, Worker};
use boardrelay_protocol::ConnectionId;
use boardrelay_registry::OutboundReceiver;
use boardrelay_store::Store;
use boardrelay_transport::{
    Connection, PendingConnection, Transport, WebSocketConnection, WebSocketTransport,
};
use tokio::sync::mpsc;

/// Drop guard that removes a connection from the registry when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct RegistrationGuard<S: Store> {
    conn_id: ConnectionId,
    worker: Arc<Worker<S>>,
}

impl<S: Store> Drop for RegistrationGuard<S> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let worker = Arc::clone(&self.worker);
        tokio::spawn(async move {
            worker.disconnect(conn_id).await;
        });
    }
}

/// Upgrades an accepted stream, then hands it to [`handle_connection`].
/// A failed or timed-out handshake just drops the stream.
pub(crate) async fn serve_connection<S: Store>(pending: PendingConnection, worker: Arc<Worker<S>>) {
    let peer = pending.peer_addr();
    match WebSocketTransport::upgrade(pending).await {
        Ok(conn) => handle_connection(conn, worker).await,
        Err(e) => {
            tracing::debug!(worker_id = %worker.id(), %peer, error = %e, "handshake failed");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S: Store>(conn: WebSocketConnection, worker: Arc<Worker<S>>) {
    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::unbounded_channel();
    let conn_id = worker.connect(tx).await;
    let _guard = RegistrationGuard {
        conn_id,
        worker: Arc::clone(&worker),
    };
    tracing::info!(worker_id = %worker.id(), %conn_id, peer = %conn.peer_addr(), "connection opened");

    let writer = tokio::spawn(write_frames(Arc::clone(&conn), conn_id, rx));

    loop {
        match conn.recv().await {
            Ok(Some(frame)) => {
                if let Err(e) = worker.handle_frame(conn_id, frame).await {
                    report_dropped(conn_id, &e);
                }
            }
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    writer.abort();
    // _guard drops here → registry entry removed.
}

/// Drains the outbound channel into the socket until either side goes
/// away.
async fn write_frames(conn: Arc<WebSocketConnection>, conn_id: ConnectionId, mut rx: OutboundReceiver) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(frame).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
}

fn report_dropped(conn_id: ConnectionId, err: &BoardError) {
    match err {
        BoardError::Protocol(e) => {
            tracing::debug!(%conn_id, error = %e, "undecodable message skipped");
        }
        BoardError::AlreadyJoined(_, board_id) => {
            tracing::debug!(%conn_id, %board_id, "duplicate initialize ignored");
        }
        e if e.is_transient() => {
            tracing::warn!(%conn_id, error = %e, "store unavailable, message dropped");
        }
        e => {
            tracing::warn!(%conn_id, error = %e, "message dropped");
        }
    }
}
