//! The connection registry: tracks every live connection on one worker.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself. It is owned by one
//! worker and guarded by that worker's mutex; the lock is only ever held
//! for map operations, never across store calls.

use std::collections::HashMap;

use boardrelay_protocol::{ConnectionId, WorkerId};
use boardrelay_transport::Frame;
use tokio::sync::mpsc;

/// Channel end used to push frames to a connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<Frame>;

/// The writer task's end of a connection's outbound channel.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Frame>;

/// Maps connection ids to live outbound channels.
///
/// Sending never blocks: the channel is unbounded and drained by a
/// per-connection writer task. A missing entry or a closed channel is
/// reported as "absent", never as an error, since peers vanish at any
/// moment.
pub struct ConnectionRegistry {
    worker: WorkerId,
    next_seq: u32,
    connections: HashMap<ConnectionId, OutboundSender>,
}

impl ConnectionRegistry {
    /// Creates an empty registry allocating ids for `worker`.
    pub fn new(worker: WorkerId) -> Self {
        Self {
            worker,
            next_seq: 1,
            connections: HashMap::new(),
        }
    }

    /// The worker this registry allocates ids for.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Allocates a fresh id and registers the connection under it.
    pub fn register(&mut self, sender: OutboundSender) -> ConnectionId {
        let mut id = ConnectionId::compose(self.worker, self.next_seq);
        // Only relevant after the counter wraps.
        while self.connections.contains_key(&id) {
            self.next_seq = self.next_seq.wrapping_add(1);
            id = ConnectionId::compose(self.worker, self.next_seq);
        }
        self.next_seq = self.next_seq.wrapping_add(1);
        self.connections.insert(id, sender);
        tracing::debug!(conn_id = %id, live = self.connections.len(), "connection registered");
        id
    }

    /// Removes a connection. Returns `false` if it wasn't registered.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            tracing::debug!(conn_id = %id, live = self.connections.len(), "connection unregistered");
        }
        removed
    }

    /// Returns `true` if the connection is registered.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Queues a frame for one connection.
    ///
    /// Returns `false` if the connection is absent or its writer is gone.
    pub fn send(&self, id: ConnectionId, frame: Frame) -> bool {
        match self.connections.get(&id) {
            Some(sender) => {
                let delivered = sender.send(frame).is_ok();
                if !delivered {
                    tracing::debug!(conn_id = %id, "writer gone, frame dropped");
                }
                delivered
            }
            None => {
                tracing::debug!(conn_id = %id, "connection absent, frame skipped");
                false
            }
        }
    }

    /// Queues `frame` for every target except `except`. Returns how many
    /// connections it was queued for.
    pub fn broadcast(
        &self,
        targets: impl IntoIterator<Item = ConnectionId>,
        except: Option<ConnectionId>,
        frame: &Frame,
    ) -> usize {
        targets
            .into_iter()
            .filter(|id| Some(*id) != except)
            .filter(|id| self.send(*id, frame.clone()))
            .count()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connections are live.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
