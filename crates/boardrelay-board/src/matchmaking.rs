//! Matchmaking: placing a connection on a board.
//!
//! A worker only ever fills boards it owns, because only it holds their
//! member lists. Claiming a slot is a single atomic store update, so two
//! workers (or two connections on one worker) can never overfill a board.

use boardrelay_protocol::{BoardId, ConnectionId, EventRecord, EventState, Role, ServerMessage};
use boardrelay_store::{
    BoardDirectory, BoardDocument, BoardFilter, BoardUpdate, EventFilter, EventLog,
    EventUpdate, ReturnDocument, Store,
};

use crate::{BoardError, Worker};

/// Result of a successful [`Worker::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The role the connection was given.
    pub role: Role,
    /// The board as it looked right after the join.
    pub board: BoardDocument,
}

impl<S: Store> Worker<S> {
    /// Places `conn` on a board this worker owns, creating one if every
    /// owned board is full.
    ///
    /// The creator of a board is its hunter; everyone after is a target.
    /// Targets get every event record already on the board replayed to
    /// them as binary frames, right after their `initialize` reply.
    ///
    /// # Errors
    /// - [`BoardError::AlreadyJoined`] if `conn` is still on a live board
    /// - [`BoardError::Store`] if the store fails before the join commits.
    ///   A slot already claimed for `conn` is given back first, so the
    ///   join can simply be retried.
    pub async fn join(&self, conn: ConnectionId) -> Result<JoinOutcome, BoardError> {
        self.release_stale_board(conn).await?;

        let claimed = self
            .store
            .find_one_and_update(
                BoardFilter::new().joinable().owner(self.id),
                BoardUpdate::Join(conn),
                ReturnDocument::After,
            )
            .await?;

        match claimed {
            Some(board) => self.join_existing(conn, board).await,
            None => self.create_board(conn).await,
        }
    }

    /// Fails with `AlreadyJoined` if `conn`'s indexed board is still
    /// live. An indexed board that was closed behind this worker's back
    /// (by a maintenance reset) is dropped from the index instead, and its
    /// records are marked dead so they stop taking position updates.
    async fn release_stale_board(&self, conn: ConnectionId) -> Result<(), BoardError> {
        let indexed = self.index.lock().await.board_of(conn);
        let Some(board) = indexed else {
            return Ok(());
        };

        let live = self
            .store
            .find_board(BoardFilter::new().id(board).live())
            .await?;
        if live.is_some() {
            return Err(BoardError::AlreadyJoined(conn, board));
        }

        let invalidated = self
            .store
            .update_events(
                EventFilter::new().board(board),
                EventUpdate::SetState(EventState::Dead),
            )
            .await?;
        let dropped = self.index.lock().await.remove_board(board, [conn]);
        tracing::debug!(
            worker = %self.id,
            board_id = %board,
            dropped = dropped.len(),
            invalidated,
            "dropped closed board from index"
        );
        Ok(())
    }

    async fn create_board(&self, conn: ConnectionId) -> Result<JoinOutcome, BoardError> {
        let id = BoardId::generate();
        let board = BoardDocument::create(id, self.id, conn, self.config.max_capacity);
        self.store.insert_board(board.clone()).await?;

        if let Err(e) = self.seat(conn, id, Role::Hunter).await {
            self.release_claim(conn, id, true).await;
            return Err(e);
        }
        self.send_message(conn, &ServerMessage::Initialize { is_hunter: true })
            .await?;

        tracing::info!(
            worker = %self.id,
            conn_id = %conn,
            board_id = %id,
            "board created"
        );
        Ok(JoinOutcome {
            role: Role::Hunter,
            board,
        })
    }

    async fn join_existing(
        &self,
        conn: ConnectionId,
        board: BoardDocument,
    ) -> Result<JoinOutcome, BoardError> {
        if let Err(e) = self.seat(conn, board.id, Role::Target).await {
            self.release_claim(conn, board.id, false).await;
            return Err(e);
        }
        self.send_message(conn, &ServerMessage::Initialize { is_hunter: false })
            .await?;

        tracing::info!(
            worker = %self.id,
            conn_id = %conn,
            board_id = %board.id,
            players = board.capacity,
            "joined board"
        );

        // The join already stands; a failed replay only costs the newcomer
        // the other players' last known positions.
        if let Err(e) = self.replay_board(conn, board.id).await {
            tracing::warn!(conn_id = %conn, board_id = %board.id, error = %e, "replay failed");
        }

        Ok(JoinOutcome {
            role: Role::Target,
            board,
        })
    }

    /// Records `conn` on a board whose slot it already holds.
    async fn seat(&self, conn: ConnectionId, board: BoardId, role: Role) -> Result<(), BoardError> {
        self.store
            .insert_event(EventRecord::joined(conn, board, role))
            .await?;
        self.index.lock().await.insert(board, conn)?;
        Ok(())
    }

    /// Gives back the slot `conn` claimed on `board` after [`seat`]
    /// failed. A board `conn` created is closed if nobody else has
    /// joined it yet; otherwise `conn` just leaves it.
    ///
    /// Best effort: if the store is down this logs and the slot stays
    /// taken until the board closes.
    ///
    /// [`seat`]: Self::seat
    async fn release_claim(&self, conn: ConnectionId, board: BoardId, created: bool) {
        if let Err(e) = self.give_back_slot(conn, board, created).await {
            tracing::error!(
                conn_id = %conn,
                board_id = %board,
                error = %e,
                "failed to release board slot after aborted join"
            );
        }
        if let Err(e) = self
            .store
            .update_events(
                EventFilter::new().connection(conn).board(board),
                EventUpdate::SetState(EventState::Dead),
            )
            .await
        {
            tracing::warn!(conn_id = %conn, board_id = %board, error = %e, "failed to retire record after aborted join");
        }
    }

    async fn give_back_slot(
        &self,
        conn: ConnectionId,
        board: BoardId,
        created: bool,
    ) -> Result<(), BoardError> {
        if created {
            let closed = self
                .store
                .find_one_and_update(
                    BoardFilter::new().id(board).member(conn).capacity_below(2),
                    BoardUpdate::Close,
                    ReturnDocument::Before,
                )
                .await?;
            if closed.is_some() {
                tracing::debug!(conn_id = %conn, board_id = %board, "closed board abandoned by its creator");
                return Ok(());
            }
        }

        let left = self
            .store
            .find_one_and_update(
                BoardFilter::new().id(board).member(conn).live(),
                BoardUpdate::Leave(conn),
                ReturnDocument::After,
            )
            .await?;
        if let Some(doc) = left {
            tracing::debug!(conn_id = %conn, board_id = %board, players = doc.capacity, "released board slot");
        }
        Ok(())
    }

    /// Sends every record on `board` to `conn`, oldest first.
    async fn replay_board(&self, conn: ConnectionId, board: BoardId) -> Result<usize, BoardError> {
        let records = self.store.find_events(EventFilter::new().board(board)).await?;
        let frames = records
            .iter()
            .map(|rec| self.record_frame(rec))
            .collect::<Result<Vec<_>, _>>()?;

        let registry = self.registry.lock().await;
        let sent = frames
            .into_iter()
            .map(|frame| registry.send(conn, frame))
            .filter(|delivered| *delivered)
            .count();
        tracing::debug!(conn_id = %conn, board_id = %board, sent, "replayed board state");
        Ok(sent)
    }
}
