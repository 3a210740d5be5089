//! Administrative maintenance.

use boardrelay_store::{BoardDirectory, BoardFilter, BoardUpdate, Store, StoreError};

use crate::{BoardError, Worker};

/// Closes every board in the directory whose capacity is below
/// `threshold`, whichever worker owns it. Returns how many were closed.
///
/// Only the directory changes: event records stay active and no member
/// is notified. Workers notice the close lazily, when an affected player
/// tries to join again.
pub async fn force_close_boards<D: BoardDirectory>(
    directory: &D,
    threshold: u32,
) -> Result<u64, StoreError> {
    let closed = directory
        .update_boards(BoardFilter::new().capacity_below(threshold), BoardUpdate::Close)
        .await?;
    tracing::warn!(threshold, closed, "boards force-closed");
    Ok(closed)
}

impl<S: Store> Worker<S> {
    /// [`force_close_boards`] with this worker's configured threshold.
    pub async fn reset_boards(&self) -> Result<u64, BoardError> {
        Ok(force_close_boards(self.store.as_ref(), self.config.reset_threshold).await?)
    }
}
