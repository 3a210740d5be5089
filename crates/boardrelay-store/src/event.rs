//! The shared event log: one record per (connection, board) pair.

use std::future::Future;

use boardrelay_protocol::{BoardId, ConnectionId, EventRecord, EventState};

use crate::{ReturnDocument, StoreError};

/// Which records an operation applies to. All set conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    connection: Option<ConnectionId>,
    board: Option<BoardId>,
    state: Option<EventState>,
}

impl EventFilter {
    /// Matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of this connection.
    pub fn connection(mut self, conn: ConnectionId) -> Self {
        self.connection = Some(conn);
        self
    }

    /// Records on this board.
    pub fn board(mut self, board: BoardId) -> Self {
        self.board = Some(board);
        self
    }

    /// Records in this state.
    pub fn state(mut self, state: EventState) -> Self {
        self.state = Some(state);
        self
    }

    /// Evaluates the filter against a record.
    pub fn matches(&self, rec: &EventRecord) -> bool {
        self.connection.is_none_or(|c| rec.connection == c)
            && self.board.is_none_or(|b| rec.board == b)
            && self.state.is_none_or(|s| rec.state == s)
    }
}

/// A mutation applied to matched records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventUpdate {
    /// Replace the position payload.
    SetPosition(Vec<u8>),
    /// Change the record state.
    SetState(EventState),
}

impl EventUpdate {
    /// Applies the mutation in place.
    pub fn apply(&self, rec: &mut EventRecord) {
        match self {
            EventUpdate::SetPosition(position) => rec.position = position.clone(),
            EventUpdate::SetState(state) => rec.state = *state,
        }
    }
}

/// The shared, persistent, capped log of per-player records.
pub trait EventLog: Send + Sync + 'static {
    /// Appends a record.
    fn insert_event(
        &self,
        record: EventRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically finds the first matching record, applies `update`, and
    /// returns it. `Ok(None)` if nothing matched.
    fn find_one_and_update_event(
        &self,
        filter: EventFilter,
        update: EventUpdate,
        ret: ReturnDocument,
    ) -> impl Future<Output = Result<Option<EventRecord>, StoreError>> + Send;

    /// Applies `update` to every matching record; returns how many changed.
    fn update_events(
        &self,
        filter: EventFilter,
        update: EventUpdate,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// All matching records, oldest first.
    fn find_events(
        &self,
        filter: EventFilter,
    ) -> impl Future<Output = Result<Vec<EventRecord>, StoreError>> + Send;
}
