//! Board documents and the shared board directory.
//!
//! The directory is the only place board membership is decided. Every
//! change to `capacity` or `player_slots` goes through
//! [`BoardDirectory::find_one_and_update`], which matches a filter and
//! applies an update as one indivisible step. Two workers racing for the
//! last slot cannot both win: the loser's filter simply stops matching.

use std::future::Future;

use boardrelay_protocol::{BoardId, ConnectionId, WorkerId};

use crate::StoreError;

/// Capacity value that marks a board closed. Always at least any
/// board's `max_capacity`, so a closed board never matches "joinable".
pub const CLOSED_SENTINEL: u32 = 100;

/// Default number of players per board.
pub const DEFAULT_MAX_CAPACITY: u32 = 5;

/// A board as stored in the shared directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDocument {
    /// Globally unique id.
    pub id: BoardId,
    /// The worker that created the board. Only it admits new players,
    /// since only it holds the in-memory index for the board.
    pub owner: WorkerId,
    /// Current player count, or [`CLOSED_SENTINEL`] once closed.
    pub capacity: u32,
    /// Maximum player count.
    pub max_capacity: u32,
    /// Ordered player slots. Slot 0 holds the hunter.
    pub player_slots: Vec<Option<ConnectionId>>,
}

impl BoardDocument {
    /// A new board with `first` in slot 0 and the remaining slots empty.
    pub fn create(
        id: BoardId,
        owner: WorkerId,
        first: ConnectionId,
        max_capacity: u32,
    ) -> Self {
        let mut player_slots = vec![None; max_capacity.max(1) as usize];
        player_slots[0] = Some(first);
        Self {
            id,
            owner,
            capacity: 1,
            max_capacity,
            player_slots,
        }
    }

    /// Occupied slots, in slot order.
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.player_slots.iter().flatten().copied()
    }

    /// Number of occupied slots.
    pub fn member_count(&self) -> usize {
        self.members().count()
    }

    /// Returns `true` if `conn` occupies a slot.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.members().any(|m| m == conn)
    }

    /// The connection in slot 0.
    pub fn hunter(&self) -> Option<ConnectionId> {
        self.player_slots.first().copied().flatten()
    }

    /// Returns `true` once the board has been closed.
    pub fn is_closed(&self) -> bool {
        self.capacity >= CLOSED_SENTINEL
    }

    /// Returns `true` while the board admits players.
    pub fn is_joinable(&self) -> bool {
        self.capacity < self.max_capacity && !self.is_closed()
    }
}

/// Which documents an operation applies to. All set conditions must hold.
///
/// ```rust
/// use boardrelay_store::BoardFilter;
/// use boardrelay_protocol::WorkerId;
///
/// let filter = BoardFilter::new().joinable().owner(WorkerId(7));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    id: Option<BoardId>,
    owner: Option<WorkerId>,
    member: Option<ConnectionId>,
    capacity_below: Option<u32>,
    joinable: bool,
    live: bool,
}

impl BoardFilter {
    /// Matches every board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Board with this id.
    pub fn id(mut self, id: BoardId) -> Self {
        self.id = Some(id);
        self
    }

    /// Boards owned by this worker.
    pub fn owner(mut self, owner: WorkerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Boards with `conn` in a slot.
    pub fn member(mut self, conn: ConnectionId) -> Self {
        self.member = Some(conn);
        self
    }

    /// Boards whose capacity is strictly below `threshold`.
    pub fn capacity_below(mut self, threshold: u32) -> Self {
        self.capacity_below = Some(threshold);
        self
    }

    /// Boards with `capacity < max_capacity`.
    pub fn joinable(mut self) -> Self {
        self.joinable = true;
        self
    }

    /// Boards that have not been closed.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &BoardDocument) -> bool {
        self.id.is_none_or(|id| doc.id == id)
            && self.owner.is_none_or(|owner| doc.owner == owner)
            && self.member.is_none_or(|conn| doc.contains(conn))
            && self.capacity_below.is_none_or(|t| doc.capacity < t)
            && (!self.joinable || doc.capacity < doc.max_capacity)
            && (!self.live || !doc.is_closed())
    }
}

/// A mutation applied to a matched board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    /// `capacity += 1` and place the connection in the first empty slot
    /// (appending if every slot is taken).
    Join(ConnectionId),
    /// Undo of `Join`: `capacity -= 1` and clear the connection's slot.
    /// No-op if the connection holds no slot.
    Leave(ConnectionId),
    /// `capacity = CLOSED_SENTINEL`.
    Close,
}

impl BoardUpdate {
    /// Applies the mutation in place.
    pub fn apply(&self, doc: &mut BoardDocument) {
        match self {
            BoardUpdate::Join(conn) => {
                doc.capacity += 1;
                match doc.player_slots.iter_mut().find(|s| s.is_none()) {
                    Some(slot) => *slot = Some(*conn),
                    None => doc.player_slots.push(Some(*conn)),
                }
            }
            BoardUpdate::Leave(conn) => {
                if let Some(slot) = doc.player_slots.iter_mut().find(|s| **s == Some(*conn)) {
                    *slot = None;
                    doc.capacity = doc.capacity.saturating_sub(1);
                }
            }
            BoardUpdate::Close => doc.capacity = CLOSED_SENTINEL,
        }
    }
}

/// Which version of the document `find_one_and_update` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    Before,
    /// The document as it is after the update.
    After,
}

/// The shared, persistent collection of boards.
pub trait BoardDirectory: Send + Sync + 'static {
    /// Atomically finds the first board matching `filter`, applies
    /// `update`, and returns it. `Ok(None)` if nothing matched.
    fn find_one_and_update(
        &self,
        filter: BoardFilter,
        update: BoardUpdate,
        ret: ReturnDocument,
    ) -> impl Future<Output = Result<Option<BoardDocument>, StoreError>> + Send;

    /// Inserts a new board. Fails with `DuplicateKey` if the id exists.
    fn insert_board(
        &self,
        board: BoardDocument,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reads the first board matching `filter`.
    fn find_board(
        &self,
        filter: BoardFilter,
    ) -> impl Future<Output = Result<Option<BoardDocument>, StoreError>> + Send;

    /// Applies `update` to every matching board; returns how many changed.
    fn update_boards(
        &self,
        filter: BoardFilter,
        update: BoardUpdate,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u64) -> ConnectionId {
        ConnectionId(n)
    }

    fn board() -> BoardDocument {
        BoardDocument::create(BoardId(1), WorkerId(9), c(1), DEFAULT_MAX_CAPACITY)
    }

    #[test]
    fn test_create_pads_slots_and_counts_one_member() {
        let b = board();
        assert_eq!(b.player_slots.len(), 5);
        assert_eq!(b.member_count(), 1);
        assert_eq!(b.capacity, 1);
        assert_eq!(b.hunter(), Some(c(1)));
    }

    #[test]
    fn test_join_fills_first_empty_slot() {
        let mut b = board();
        BoardUpdate::Join(c(2)).apply(&mut b);
        assert_eq!(b.player_slots[1], Some(c(2)));
        assert_eq!(b.capacity, 2);
    }

    #[test]
    fn test_join_appends_when_every_slot_is_taken() {
        let mut b = BoardDocument::create(BoardId(1), WorkerId(9), c(1), 1);
        BoardUpdate::Join(c(2)).apply(&mut b);
        assert_eq!(b.player_slots, vec![Some(c(1)), Some(c(2))]);
        assert_eq!(b.member_count() as u32, b.capacity);
    }

    #[test]
    fn test_leave_frees_the_slot_for_the_next_join() {
        let mut b = board();
        BoardUpdate::Join(c(2)).apply(&mut b);
        BoardUpdate::Join(c(3)).apply(&mut b);

        BoardUpdate::Leave(c(2)).apply(&mut b);
        assert_eq!(b.capacity, 2);
        assert!(!b.contains(c(2)));
        assert_eq!(b.member_count() as u32, b.capacity);

        BoardUpdate::Join(c(4)).apply(&mut b);
        assert_eq!(b.player_slots[1], Some(c(4)));
    }

    #[test]
    fn test_leave_by_non_member_changes_nothing() {
        let mut b = board();
        BoardUpdate::Leave(c(7)).apply(&mut b);
        assert_eq!(b, board());
    }

    #[test]
    fn test_close_sets_sentinel() {
        let mut b = board();
        BoardUpdate::Close.apply(&mut b);
        assert!(b.is_closed());
        assert!(!b.is_joinable());
    }

    #[test]
    fn test_filter_joinable_rejects_full_board() {
        let mut b = board();
        for n in 2..=5 {
            BoardUpdate::Join(c(n)).apply(&mut b);
        }
        assert!(!BoardFilter::new().joinable().matches(&b));
        // Full is not closed.
        assert!(BoardFilter::new().live().matches(&b));
    }

    #[test]
    fn test_filter_combines_conditions() {
        let b = board();
        assert!(BoardFilter::new().owner(WorkerId(9)).member(c(1)).matches(&b));
        assert!(!BoardFilter::new().owner(WorkerId(8)).matches(&b));
        assert!(!BoardFilter::new().member(c(2)).matches(&b));
        assert!(BoardFilter::new().capacity_below(2).matches(&b));
        assert!(!BoardFilter::new().capacity_below(1).matches(&b));
        assert!(BoardFilter::new().id(BoardId(1)).matches(&b));
    }
}
