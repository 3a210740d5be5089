//! Board configuration.

use boardrelay_store::{CLOSED_SENTINEL, DEFAULT_MAX_CAPACITY};

/// Settings shared by every board a worker creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Players per board, hunter included.
    pub max_capacity: u32,

    /// Boards with a capacity below this are closed by a maintenance
    /// reset. The default closes every live board.
    pub reset_threshold: u32,
}

impl BoardConfig {
    /// Clamps `max_capacity` into `1..CLOSED_SENTINEL`, so a closed board
    /// can never look joinable.
    pub fn validated(self) -> Self {
        let max_capacity = self.max_capacity.clamp(1, CLOSED_SENTINEL - 1);
        if max_capacity != self.max_capacity {
            tracing::warn!(
                requested = self.max_capacity,
                used = max_capacity,
                "board max_capacity out of range"
            );
        }
        Self {
            max_capacity,
            ..self
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            reset_threshold: CLOSED_SENTINEL,
        }
    }
}
