//! Closing boards.
//!
//! The close is claimed with one atomic store update returning the board
//! as it was, so when several members report the end at once exactly one
//! of them does the teardown and the broadcast.

use boardrelay_protocol::{BoardId, ConnectionId, EventState, TerminalState};
use boardrelay_store::{
    BoardDirectory, BoardFilter, BoardUpdate, EventFilter, EventLog, EventUpdate,
    ReturnDocument, Store,
};

use crate::{BoardError, Worker};

/// Result of [`Worker::close_board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// This call closed the board.
    Closed {
        board: BoardId,
        /// Members the terminal message was queued for.
        notified: usize,
        /// Event records marked dead.
        invalidated: u64,
    },
    /// `conn` wasn't on a live board (already closed, or never joined).
    NotFound,
}

impl<S: Store> Worker<S> {
    /// Closes the live board `conn` sits on and tells every member how it
    /// ended.
    ///
    /// Records on the board are marked dead, the board leaves this
    /// worker's index, and `terminal`'s message goes to each member still
    /// connected here, `conn` included.
    pub async fn close_board(
        &self,
        conn: ConnectionId,
        terminal: TerminalState,
    ) -> Result<CloseOutcome, BoardError> {
        let before = self
            .store
            .find_one_and_update(
                BoardFilter::new().member(conn).live(),
                BoardUpdate::Close,
                ReturnDocument::Before,
            )
            .await?;
        let Some(board) = before else {
            tracing::debug!(conn_id = %conn, %terminal, "no live board to close");
            return Ok(CloseOutcome::NotFound);
        };

        // The board is closed from here on, so teardown continues even if
        // the records can't be invalidated.
        let invalidated = match self
            .store
            .update_events(EventFilter::new().board(board.id), EventUpdate::SetState(EventState::Dead))
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(board_id = %board.id, error = %e, "failed to invalidate records");
                0
            }
        };

        let members: Vec<_> = board.members().collect();
        self.index
            .lock()
            .await
            .remove_board(board.id, members.iter().copied());

        let frame = self.text_frame(&terminal.message())?;
        let notified = self.registry.lock().await.broadcast(members, None, &frame);

        tracing::info!(
            worker = %self.id,
            conn_id = %conn,
            board_id = %board.id,
            %terminal,
            notified,
            invalidated,
            "board closed"
        );
        Ok(CloseOutcome::Closed {
            board: board.id,
            notified,
            invalidated,
        })
    }
}
