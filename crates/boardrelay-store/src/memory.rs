//! In-memory store backed by capped collections.
//!
//! Every collection sits behind its own mutex and each operation holds
//! that lock for its whole filter-then-mutate step, which is exactly the
//! atomicity the board directory contract asks for. Workers share one
//! `MemoryStore` through an `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};

use boardrelay_protocol::EventRecord;
use tokio::sync::Mutex;

use crate::{
    BoardDirectory, BoardDocument, BoardFilter, BoardUpdate, CappedCollection,
    Credentials, EventFilter, EventLog, EventUpdate, ReturnDocument, Store,
    StoreError,
};

/// Sizing and login for a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum board documents kept before the oldest is evicted.
    pub board_capacity: usize,
    /// Maximum event records kept before the oldest is evicted.
    pub event_capacity: usize,
    /// Credentials the store accepts.
    pub credentials: Credentials,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            board_capacity: 10_000,
            event_capacity: 50_000,
            credentials: Credentials::default(),
        }
    }
}

/// A [`Store`] that lives in process memory.
pub struct MemoryStore {
    boards: Mutex<CappedCollection<BoardDocument>>,
    events: Mutex<CappedCollection<EventRecord>>,
    credentials: Credentials,
    available: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            boards: Mutex::new(CappedCollection::new(config.board_capacity)),
            events: Mutex::new(CappedCollection::new(config.event_capacity)),
            credentials: config.credentials,
            available: AtomicBool::new(true),
        }
    }

    /// Takes the store offline (every call fails with `Unavailable`) or
    /// brings it back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        tracing::info!(available, "store availability changed");
    }

    /// Snapshot of every stored board, oldest first.
    pub async fn boards(&self) -> Vec<BoardDocument> {
        self.boards.lock().await.iter().cloned().collect()
    }

    /// Snapshot of every stored event record, oldest first.
    pub async fn events(&self) -> Vec<EventRecord> {
        self.events.lock().await.iter().cloned().collect()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store offline".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl BoardDirectory for MemoryStore {
    async fn find_one_and_update(
        &self,
        filter: BoardFilter,
        update: BoardUpdate,
        ret: ReturnDocument,
    ) -> Result<Option<BoardDocument>, StoreError> {
        self.check()?;
        let mut boards = self.boards.lock().await;
        let Some(doc) = boards.find_one_mut(|doc| filter.matches(doc)) else {
            return Ok(None);
        };
        let before = match ret {
            ReturnDocument::Before => Some(doc.clone()),
            ReturnDocument::After => None,
        };
        update.apply(doc);
        Ok(Some(before.unwrap_or_else(|| doc.clone())))
    }

    async fn insert_board(&self, board: BoardDocument) -> Result<(), StoreError> {
        self.check()?;
        let mut boards = self.boards.lock().await;
        if boards.find_one(|doc| doc.id == board.id).is_some() {
            return Err(StoreError::DuplicateKey(board.id));
        }
        if let Some(evicted) = boards.insert(board) {
            tracing::debug!(board_id = %evicted.id, "board aged out of capped directory");
        }
        Ok(())
    }

    async fn find_board(
        &self,
        filter: BoardFilter,
    ) -> Result<Option<BoardDocument>, StoreError> {
        self.check()?;
        let boards = self.boards.lock().await;
        Ok(boards.find_one(|doc| filter.matches(doc)).cloned())
    }

    async fn update_boards(
        &self,
        filter: BoardFilter,
        update: BoardUpdate,
    ) -> Result<u64, StoreError> {
        self.check()?;
        let mut boards = self.boards.lock().await;
        let mut changed = 0;
        for doc in boards.iter_mut().filter(|doc| filter.matches(doc)) {
            update.apply(doc);
            changed += 1;
        }
        Ok(changed)
    }
}

impl EventLog for MemoryStore {
    async fn insert_event(&self, record: EventRecord) -> Result<(), StoreError> {
        self.check()?;
        if let Some(evicted) = self.events.lock().await.insert(record) {
            tracing::debug!(
                conn_id = %evicted.connection,
                board_id = %evicted.board,
                "event record aged out of capped log"
            );
        }
        Ok(())
    }

    async fn find_one_and_update_event(
        &self,
        filter: EventFilter,
        update: EventUpdate,
        ret: ReturnDocument,
    ) -> Result<Option<EventRecord>, StoreError> {
        self.check()?;
        let mut events = self.events.lock().await;
        let Some(rec) = events.find_one_mut(|rec| filter.matches(rec)) else {
            return Ok(None);
        };
        let before = match ret {
            ReturnDocument::Before => Some(rec.clone()),
            ReturnDocument::After => None,
        };
        update.apply(rec);
        Ok(Some(before.unwrap_or_else(|| rec.clone())))
    }

    async fn update_events(
        &self,
        filter: EventFilter,
        update: EventUpdate,
    ) -> Result<u64, StoreError> {
        self.check()?;
        let mut events = self.events.lock().await;
        let mut changed = 0;
        for rec in events.iter_mut().filter(|rec| filter.matches(rec)) {
            update.apply(rec);
            changed += 1;
        }
        Ok(changed)
    }

    async fn find_events(
        &self,
        filter: EventFilter,
    ) -> Result<Vec<EventRecord>, StoreError> {
        self.check()?;
        let events = self.events.lock().await;
        Ok(events.iter().filter(|rec| filter.matches(rec)).cloned().collect())
    }
}

impl Store for MemoryStore {
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.check()?;
        if *credentials == self.credentials {
            tracing::debug!(user = %credentials.user, "store login accepted");
            Ok(())
        } else {
            Err(StoreError::AuthenticationFailed(credentials.user.clone()))
        }
    }
}
