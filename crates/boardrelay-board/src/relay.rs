//! State relay: position updates and lifecycle messages.

use boardrelay_protocol::{ClientMessage, ConnectionId, EventState, ServerMessage, TerminalState};
use boardrelay_store::{
    BoardDirectory, BoardFilter, EventFilter, EventLog, EventUpdate, ReturnDocument, Store,
};

use crate::{BoardError, Worker};

/// Control messages that act on the sender's current board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleMessage {
    /// `dead`: close the board in defeat.
    Dead,
    /// `mongowin`: close the board, hunter wins.
    HunterWin,
    /// `ghostdead`: tell the others a target is out. The board stays open.
    TargetDead(ConnectionId),
}

impl LifecycleMessage {
    /// Picks the lifecycle part out of a client message. `initialize`
    /// isn't one and yields `None`.
    pub fn from_client(msg: ClientMessage) -> Option<Self> {
        match msg {
            ClientMessage::Initialize => None,
            ClientMessage::Dead => Some(Self::Dead),
            ClientMessage::HunterWin => Some(Self::HunterWin),
            ClientMessage::TargetDead { id } => Some(Self::TargetDead(id)),
        }
    }
}

impl<S: Store> Worker<S> {
    /// Stores `payload` as `conn`'s latest position and forwards the
    /// updated record to every other member of its board.
    ///
    /// Only the record for the board `conn` is indexed on is updated.
    /// Returns how many connections the record was queued for. Zero,
    /// without error, if `conn` isn't indexed on this worker or its record
    /// there is no longer active.
    pub async fn relay_position(
        &self,
        conn: ConnectionId,
        payload: Vec<u8>,
    ) -> Result<usize, BoardError> {
        let Some((board, members)) = self.index.lock().await.board_members_of(conn) else {
            tracing::debug!(conn_id = %conn, "position from connection on no board");
            return Ok(0);
        };
        let updated = self
            .store
            .find_one_and_update_event(
                EventFilter::new()
                    .connection(conn)
                    .board(board)
                    .state(EventState::Active),
                EventUpdate::SetPosition(payload),
                ReturnDocument::After,
            )
            .await?;
        let Some(record) = updated else {
            tracing::debug!(conn_id = %conn, board_id = %board, "position for a board that has closed");
            return Ok(0);
        };

        let frame = self.record_frame(&record)?;
        let sent = self.registry.lock().await.broadcast(members, Some(conn), &frame);
        tracing::trace!(conn_id = %conn, board_id = %board, sent, "position relayed");
        Ok(sent)
    }

    /// Applies a lifecycle message from `conn`.
    pub async fn relay_lifecycle(
        &self,
        conn: ConnectionId,
        msg: LifecycleMessage,
    ) -> Result<(), BoardError> {
        match msg {
            LifecycleMessage::Dead => self.close_board(conn, TerminalState::Dead).await.map(drop),
            LifecycleMessage::HunterWin => {
                self.close_board(conn, TerminalState::HunterWin).await.map(drop)
            }
            LifecycleMessage::TargetDead(target) => self.target_dead(conn, target).await.map(drop),
        }
    }

    /// Tells every other member of `conn`'s live board that `target` is
    /// out. Returns the number of members notified; zero if `conn` isn't
    /// on a live board.
    pub async fn target_dead(
        &self,
        conn: ConnectionId,
        target: ConnectionId,
    ) -> Result<usize, BoardError> {
        let Some(board) = self
            .store
            .find_board(BoardFilter::new().member(conn).live())
            .await?
        else {
            tracing::debug!(conn_id = %conn, "ghostdead from connection on no live board");
            return Ok(0);
        };

        let frame = self.text_frame(&ServerMessage::TargetDead { id: target })?;
        let members: Vec<_> = board.members().collect();
        let sent = self.registry.lock().await.broadcast(members, Some(conn), &frame);
        tracing::info!(
            conn_id = %conn,
            board_id = %board.id,
            target = %target,
            sent,
            "target eliminated"
        );
        Ok(sent)
    }
}
