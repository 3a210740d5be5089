//! Integration tests for `MemoryStore`: atomic conditional updates,
//! capped eviction, availability, and authentication.

use std::sync::Arc;

use boardrelay_protocol::{BoardId, ConnectionId, EventRecord, EventState, Role, WorkerId};
use boardrelay_store::{
    BoardDirectory, BoardDocument, BoardFilter, BoardUpdate, CLOSED_SENTINEL, Credentials,
    EventFilter, EventLog, EventUpdate, MemoryStore, ReturnDocument, Store, StoreConfig,
    StoreError,
};

// =========================================================================
// Helpers
// =========================================================================

const W: WorkerId = WorkerId(77);

fn c(n: u64) -> ConnectionId {
    ConnectionId(n)
}

fn store() -> MemoryStore {
    MemoryStore::new(StoreConfig::default())
}

async fn seed_board(store: &MemoryStore, id: u64, owner: WorkerId, first: u64) {
    store
        .insert_board(BoardDocument::create(BoardId(id), owner, c(first), 5))
        .await
        .expect("insert board");
}

// =========================================================================
// Board directory
// =========================================================================

#[tokio::test]
async fn test_find_one_and_update_returns_after_document() {
    let store = store();
    seed_board(&store, 1, W, 10).await;

    let doc = store
        .find_one_and_update(
            BoardFilter::new().joinable().owner(W),
            BoardUpdate::Join(c(11)),
            ReturnDocument::After,
        )
        .await
        .unwrap()
        .expect("board should match");

    assert_eq!(doc.capacity, 2);
    assert!(doc.contains(c(11)));
}

#[tokio::test]
async fn test_find_one_and_update_returns_before_document() {
    let store = store();
    seed_board(&store, 1, W, 10).await;

    let doc = store
        .find_one_and_update(
            BoardFilter::new().member(c(10)).live(),
            BoardUpdate::Close,
            ReturnDocument::Before,
        )
        .await
        .unwrap()
        .expect("board should match");

    assert_eq!(doc.capacity, 1);
    let stored = store.boards().await;
    assert_eq!(stored[0].capacity, CLOSED_SENTINEL);
}

#[tokio::test]
async fn test_find_one_and_update_no_match_is_none() {
    let store = store();
    seed_board(&store, 1, W, 10).await;

    let result = store
        .find_one_and_update(
            BoardFilter::new().joinable().owner(WorkerId(1)),
            BoardUpdate::Join(c(11)),
            ReturnDocument::After,
        )
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_concurrent_joins_never_overfill_a_board() {
    let store = Arc::new(store());
    seed_board(&store, 1, W, 1).await;

    let mut tasks = Vec::new();
    for n in 2..=20 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .find_one_and_update(
                    BoardFilter::new().joinable().owner(W),
                    BoardUpdate::Join(c(n)),
                    ReturnDocument::After,
                )
                .await
                .unwrap()
                .is_some()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 4, "only four slots were free");
    let boards = store.boards().await;
    let board = &boards[0];
    assert_eq!(board.capacity, 5);
    assert_eq!(board.member_count(), 5);
}

#[tokio::test]
async fn test_insert_duplicate_board_id_fails() {
    let store = store();
    seed_board(&store, 1, W, 10).await;
    let err = store
        .insert_board(BoardDocument::create(BoardId(1), W, c(11), 5))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(BoardId(1))));
}

#[tokio::test]
async fn test_update_boards_closes_everything_below_threshold() {
    let store = store();
    seed_board(&store, 1, W, 10).await;
    seed_board(&store, 2, W, 20).await;
    store
        .find_one_and_update(
            BoardFilter::new().id(BoardId(2)),
            BoardUpdate::Close,
            ReturnDocument::After,
        )
        .await
        .unwrap();

    let closed = store
        .update_boards(BoardFilter::new().capacity_below(CLOSED_SENTINEL), BoardUpdate::Close)
        .await
        .unwrap();

    assert_eq!(closed, 1, "board 2 was already closed");
    assert!(store.boards().await.iter().all(BoardDocument::is_closed));
}

#[tokio::test]
async fn test_board_directory_is_capped() {
    let store = MemoryStore::new(StoreConfig {
        board_capacity: 2,
        ..StoreConfig::default()
    });
    for id in 1..=3 {
        seed_board(&store, id, W, id * 10).await;
    }
    let ids: Vec<_> = store.boards().await.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![BoardId(2), BoardId(3)]);
}

// =========================================================================
// Event log
// =========================================================================

#[tokio::test]
async fn test_position_update_only_touches_active_record() {
    let store = store();
    let mut old = EventRecord::joined(c(1), BoardId(1), Role::Hunter);
    old.state = EventState::Dead;
    store.insert_event(old).await.unwrap();
    store
        .insert_event(EventRecord::joined(c(1), BoardId(2), Role::Target))
        .await
        .unwrap();

    let rec = store
        .find_one_and_update_event(
            EventFilter::new().connection(c(1)).state(EventState::Active),
            EventUpdate::SetPosition(vec![7]),
            ReturnDocument::After,
        )
        .await
        .unwrap()
        .expect("active record");

    assert_eq!(rec.board, BoardId(2));
    assert_eq!(rec.position, vec![7]);
    let all = store.events().await;
    assert!(all[0].position.is_empty(), "dead record untouched");
}

#[tokio::test]
async fn test_update_events_marks_board_dead_and_find_keeps_order() {
    let store = store();
    for n in 1..=3 {
        store
            .insert_event(EventRecord::joined(c(n), BoardId(5), Role::Target))
            .await
            .unwrap();
    }
    store
        .insert_event(EventRecord::joined(c(9), BoardId(6), Role::Hunter))
        .await
        .unwrap();

    let changed = store
        .update_events(
            EventFilter::new().board(BoardId(5)),
            EventUpdate::SetState(EventState::Dead),
        )
        .await
        .unwrap();
    assert_eq!(changed, 3);

    let on_board = store.find_events(EventFilter::new().board(BoardId(5))).await.unwrap();
    let order: Vec<_> = on_board.iter().map(|r| r.connection).collect();
    assert_eq!(order, vec![c(1), c(2), c(3)]);
    assert!(on_board.iter().all(|r| r.state == EventState::Dead));

    let other = store.find_events(EventFilter::new().board(BoardId(6))).await.unwrap();
    assert!(other[0].is_active());
}

// =========================================================================
// Availability and authentication
// =========================================================================

#[tokio::test]
async fn test_offline_store_fails_every_call() {
    let store = store();
    store.set_available(false);

    assert!(matches!(
        store.find_board(BoardFilter::new()).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.insert_event(EventRecord::joined(c(1), BoardId(1), Role::Hunter)).await,
        Err(StoreError::Unavailable(_))
    ));

    store.set_available(true);
    assert!(store.find_board(BoardFilter::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_authenticate_accepts_configured_credentials() {
    let store = MemoryStore::new(StoreConfig {
        credentials: Credentials::new("game", "secret"),
        ..StoreConfig::default()
    });

    store.authenticate(&Credentials::new("game", "secret")).await.unwrap();

    let err = store
        .authenticate(&Credentials::new("game", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AuthenticationFailed(user) if user == "game"));
}
