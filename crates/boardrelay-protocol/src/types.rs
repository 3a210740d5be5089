//! Core protocol types for boardrelay's wire format.
//!
//! Everything here either travels on the wire (text control messages,
//! binary event records) or identifies something that does (workers,
//! connections, boards).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies one worker: an independent event loop with its own
/// connection registry and board index, sharing only the store.
///
/// Built from the process id (low 22 bits) and an in-process slot
/// number (next 8 bits), so two workers hosted by one process, or a
/// worker restarted in place, never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl WorkerId {
    const PID_BITS: u32 = 22;
    const PID_MASK: u32 = (1 << Self::PID_BITS) - 1;
    const SLOT_BITS: u32 = 8;
    const SLOT_MASK: u32 = (1 << Self::SLOT_BITS) - 1;

    /// Number of distinct slots. Slot numbers wrap modulo this.
    pub const SLOTS: u32 = 1 << Self::SLOT_BITS;

    /// Bits a worker id occupies.
    pub const BITS: u32 = Self::PID_BITS + Self::SLOT_BITS;

    /// Composes a worker id from a process id and a slot number.
    pub fn new(pid: u32, slot: u32) -> Self {
        Self(((slot & Self::SLOT_MASK) << Self::PID_BITS) | (pid & Self::PID_MASK))
    }

    /// A worker id for the current process in the given slot.
    pub fn for_process(slot: u32) -> Self {
        Self::new(std::process::id(), slot)
    }

    /// The process-id component.
    pub fn pid(self) -> u32 {
        self.0 & Self::PID_MASK
    }

    /// The slot component.
    pub fn slot(self) -> u32 {
        (self.0 >> Self::PID_BITS) & Self::SLOT_MASK
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{}.{}", self.pid(), self.slot())
    }
}

/// Identifies one live connection.
///
/// The owning worker's id sits above a 23-bit per-worker counter, which
/// makes ids unique across every worker sharing the store. Serializes as
/// a plain number, which is also how clients name each other in
/// `ghostdead` messages, so every id stays within the 53 bits a JSON
/// number holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    const SEQ_BITS: u32 = 23;
    const SEQ_MASK: u64 = (1 << Self::SEQ_BITS) - 1;

    /// Largest id [`compose`](Self::compose) can produce.
    pub const MAX: u64 = (1 << (WorkerId::BITS + Self::SEQ_BITS)) - 1;

    /// Composes an id from the owning worker and its local counter. Only
    /// the low 23 bits of `seq` are used.
    pub fn compose(worker: WorkerId, seq: u32) -> Self {
        Self((u64::from(worker.0) << Self::SEQ_BITS) | (u64::from(seq) & Self::SEQ_MASK))
    }

    /// The worker that allocated this id.
    pub fn worker(self) -> WorkerId {
        WorkerId((self.0 >> Self::SEQ_BITS) as u32)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Globally unique board identifier.
///
/// Generated like a store object id: creation time in seconds in the
/// high half, random bits in the low half.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BoardId(pub u64);

impl BoardId {
    /// Generates a fresh board id.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let entropy: u32 = rand::random();
        Self(((secs & 0xFFFF_FFFF) << 32) | u64::from(entropy))
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B-{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles and record states
// ---------------------------------------------------------------------------

/// A player's role on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The pursuer. Exactly one per board: whoever created it.
    Hunter,
    /// The pursued. Every later joiner.
    Target,
}

impl Role {
    /// Returns `true` for the hunter role.
    pub fn is_hunter(self) -> bool {
        matches!(self, Role::Hunter)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hunter => f.write_str("hunter"),
            Role::Target => f.write_str("target"),
        }
    }
}

/// Whether an event record still describes a live player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    /// The player is on an open board.
    Active,
    /// The board was torn down; the record is kept only until the
    /// capped log evicts it.
    Dead,
}

// ---------------------------------------------------------------------------
// EventRecord
// ---------------------------------------------------------------------------

/// Per-player record in the shared event log.
///
/// The `position` bytes are opaque: they are whatever the client last
/// sent in a binary frame. The whole record is what gets relayed to the
/// other players on the board, encoded with the binary codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The connection this record belongs to.
    pub connection: ConnectionId,
    /// The board the connection joined.
    pub board: BoardId,
    /// Role on that board.
    pub role: Role,
    /// Active or dead.
    pub state: EventState,
    /// Last position payload. Empty until the first binary frame.
    pub position: Vec<u8>,
}

impl EventRecord {
    /// A fresh active record with an empty position.
    pub fn joined(connection: ConnectionId, board: BoardId, role: Role) -> Self {
        Self {
            connection,
            board,
            role,
            state: EventState::Active,
            position: Vec::new(),
        }
    }

    /// Returns `true` while the record is active.
    pub fn is_active(&self) -> bool {
        self.state == EventState::Active
    }
}

// ---------------------------------------------------------------------------
// Text control messages
// ---------------------------------------------------------------------------

/// Client → server control messages, sent as JSON text frames.
///
/// Internally tagged on `type`: `{"type":"ghostdead","id":42}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// "Put me on a board."
    #[serde(rename = "initialize")]
    Initialize,

    /// The hunter was caught; the board ends in defeat.
    #[serde(rename = "dead")]
    Dead,

    /// The hunter won; the board ends.
    #[serde(rename = "mongowin")]
    HunterWin,

    /// One target was eliminated; the board continues.
    #[serde(rename = "ghostdead")]
    TargetDead {
        /// The eliminated target's connection id.
        id: ConnectionId,
    },
}

/// Server → client control messages, sent as JSON text frames.
///
/// Internally tagged on `state`: `{"state":"initialize","isHunter":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum ServerMessage {
    /// The join succeeded.
    #[serde(rename = "initialize")]
    Initialize {
        #[serde(rename = "isHunter")]
        is_hunter: bool,
    },

    /// The board ended in defeat.
    #[serde(rename = "dead")]
    Dead,

    /// The board ended with the hunter winning.
    #[serde(rename = "mongowin")]
    HunterWin,

    /// A target on this board was eliminated.
    #[serde(rename = "ghostdead")]
    TargetDead { id: ConnectionId },
}

/// How a board ended. Each variant maps to the broadcast members receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Hunter caught.
    Dead,
    /// Hunter won.
    HunterWin,
}

impl TerminalState {
    /// The message broadcast to every member when the board closes.
    pub fn message(self) -> ServerMessage {
        match self {
            TerminalState::Dead => ServerMessage::Dead,
            TerminalState::HunterWin => ServerMessage::HunterWin,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalState::Dead => f.write_str("dead"),
            TerminalState::HunterWin => f.write_str("mongowin"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what browser clients parse, so each
    //! message variant gets its exact encoding checked.

    use super::*;

    #[test]
    fn test_worker_id_packs_pid_and_slot() {
        let id = WorkerId::new(4242, 3);
        assert_eq!(id.pid(), 4242);
        assert_eq!(id.slot(), 3);
        assert_ne!(WorkerId::new(4242, 3), WorkerId::new(4242, 4));
    }

    #[test]
    fn test_connection_id_is_unique_across_workers() {
        let a = ConnectionId::compose(WorkerId::new(100, 0), 1);
        let b = ConnectionId::compose(WorkerId::new(101, 0), 1);
        assert_ne!(a, b);
        assert_eq!(a.worker(), WorkerId::new(100, 0));
    }

    #[test]
    fn test_connection_id_fits_a_json_number() {
        let worker = WorkerId::new(WorkerId::new(u32::MAX, 0).pid(), WorkerId::SLOTS - 1);
        let id = ConnectionId::compose(worker, u32::MAX);
        assert!(id.0 <= ConnectionId::MAX);
        assert!(ConnectionId::MAX < 1 << 53);
        // Survives the f64 round trip a JavaScript client does.
        assert_eq!(id.0 as f64 as u64, id.0);
        assert_eq!(id.worker(), worker);

        let busy = ConnectionId::compose(WorkerId::new(12345, 1), 1);
        assert_eq!(busy.0 as f64 as u64, busy.0);
        assert_eq!(busy.worker().slot(), 1);
    }

    #[test]
    fn test_worker_slot_wraps() {
        assert_eq!(WorkerId::new(7, WorkerId::SLOTS).slot(), 0);
        assert_eq!(WorkerId::new(7, WorkerId::SLOTS + 3).slot(), 3);
    }

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_board_id_generate_differs() {
        // 32 random bits; two consecutive ids colliding would mean the
        // rng is broken.
        assert_ne!(BoardId::generate(), BoardId::generate());
    }

    #[test]
    fn test_client_message_initialize_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"initialize"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Initialize);
    }

    #[test]
    fn test_client_message_mongowin_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"mongowin"}"#).unwrap();
        assert_eq!(msg, ClientMessage::HunterWin);
    }

    #[test]
    fn test_client_message_ghostdead_carries_id() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"ghostdead","id":7}"#).unwrap();
        assert_eq!(msg, ClientMessage::TargetDead { id: ConnectionId(7) });
    }

    #[test]
    fn test_client_message_ignores_extra_fields() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"dead","score":12}"#).unwrap();
        assert_eq!(msg, ClientMessage::Dead);
    }

    #[test]
    fn test_client_message_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"teleport"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_initialize_json_format() {
        let json = serde_json::to_value(ServerMessage::Initialize {
            is_hunter: true,
        })
        .unwrap();
        assert_eq!(json["state"], "initialize");
        assert_eq!(json["isHunter"], true);
    }

    #[test]
    fn test_server_message_terminal_json_format() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::Dead).unwrap(),
            r#"{"state":"dead"}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::HunterWin).unwrap(),
            r#"{"state":"mongowin"}"#
        );
    }

    #[test]
    fn test_server_message_ghostdead_json_format() {
        let json = serde_json::to_string(&ServerMessage::TargetDead {
            id: ConnectionId(9),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"ghostdead","id":9}"#);
    }

    #[test]
    fn test_terminal_state_maps_to_broadcast() {
        assert_eq!(TerminalState::Dead.message(), ServerMessage::Dead);
        assert_eq!(TerminalState::HunterWin.message(), ServerMessage::HunterWin);
    }

    #[test]
    fn test_event_record_joined_is_active_with_empty_position() {
        let rec = EventRecord::joined(ConnectionId(1), BoardId(2), Role::Hunter);
        assert!(rec.is_active());
        assert!(rec.position.is_empty());
        assert!(rec.role.is_hunter());
    }
}
