//! The board-connection index: which connections sit on which board.
//!
//! Kept in two maps that must agree: `boards` (board → ordered members)
//! and `connections` (member → board). Every indexed connection maps to
//! a board whose member list contains it exactly once.

use std::collections::HashMap;

use boardrelay_protocol::{BoardId, ConnectionId};

use crate::RegistryError;

/// Two-way board ↔ connection map for one worker.
#[derive(Debug, Default)]
pub struct BoardIndex {
    boards: HashMap<BoardId, Vec<ConnectionId>>,
    connections: HashMap<ConnectionId, BoardId>,
}

impl BoardIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `conn` to `board`'s member list, creating the list if this
    /// worker hasn't seen the board before.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyIndexed`] if `conn` already sits on a board.
    pub fn insert(&mut self, board: BoardId, conn: ConnectionId) -> Result<(), RegistryError> {
        if let Some(existing) = self.connections.get(&conn) {
            return Err(RegistryError::AlreadyIndexed(conn, *existing));
        }
        self.boards.entry(board).or_default().push(conn);
        self.connections.insert(conn, board);
        Ok(())
    }

    /// The board `conn` sits on.
    pub fn board_of(&self, conn: ConnectionId) -> Option<BoardId> {
        self.connections.get(&conn).copied()
    }

    /// Members of `board`, in join order. Empty if the board is unknown.
    pub fn members(&self, board: BoardId) -> &[ConnectionId] {
        self.boards.get(&board).map(Vec::as_slice).unwrap_or_default()
    }

    /// The board `conn` sits on together with a copy of its members.
    pub fn board_members_of(&self, conn: ConnectionId) -> Option<(BoardId, Vec<ConnectionId>)> {
        let board = self.board_of(conn)?;
        Some((board, self.members(board).to_vec()))
    }

    /// Drops `board` from the index.
    ///
    /// Every connection on its member list, plus any in `extra`, loses
    /// its reverse entry if that entry points at `board`. Returns the
    /// connections whose reverse entry was removed.
    pub fn remove_board(
        &mut self,
        board: BoardId,
        extra: impl IntoIterator<Item = ConnectionId>,
    ) -> Vec<ConnectionId> {
        let mut candidates = self.boards.remove(&board).unwrap_or_default();
        candidates.extend(extra);

        let mut removed = Vec::with_capacity(candidates.len());
        for conn in candidates {
            if self.connections.get(&conn) == Some(&board) {
                self.connections.remove(&conn);
                removed.push(conn);
            }
        }
        removed
    }

    /// Number of boards with a member list.
    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    /// Number of indexed connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Checks that both maps agree: every reverse entry points at a
    /// member list containing the connection exactly once, and every
    /// listed member maps back to that board.
    pub fn is_consistent(&self) -> bool {
        let reverse_ok = self.connections.iter().all(|(conn, board)| {
            self.members(*board).iter().filter(|m| *m == conn).count() == 1
        });
        let forward_ok = self.boards.iter().all(|(board, members)| {
            members
                .iter()
                .all(|m| self.connections.get(m) == Some(board))
        });
        reverse_ok && forward_ok
    }
}
