//! Contract coverage for the in-memory board store.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::{ActionType, BackupKind, BoardDocument, ChangeOrigin};

#[fixture]
fn store() -> Arc<InMemoryBoardStore> {
    Arc::new(InMemoryBoardStore::default())
}

fn write(value: Value, expected: u64, token: &str) -> VersionedWrite {
    VersionedWrite {
        document: BoardDocument::from_value(value).expect("valid document"),
        expected_version: StateVersion::new(expected),
        client_request_id: ClientRequestId::new(token).expect("valid token"),
        origin: ChangeOrigin::Client,
        user_id: None,
    }
}

fn committed_version(outcome: CommitOutcome) -> u64 {
    match outcome {
        CommitOutcome::Committed { version, .. } => version.get(),
        other => panic!("expected a committed write, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn accepted_writes_bump_the_version_by_one(store: Arc<InMemoryBoardStore>) {
    assert_eq!(store.load().await.expect("load"), None);

    for expected in 0..5 {
        let outcome = store
            .commit(write(json!({ "projects": [] }), expected, &format!("req-{expected}")))
            .await
            .expect("commit");
        assert_eq!(committed_version(outcome), expected + 1);
    }

    let loaded = store.load().await.expect("load").expect("document");
    assert_eq!(loaded.version, StateVersion::new(5));
}

#[rstest]
#[tokio::test]
async fn stale_versions_conflict_without_side_effects(store: Arc<InMemoryBoardStore>) {
    store
        .commit(write(json!({ "projects": [{ "id": "p1" }] }), 0, "r1"))
        .await
        .expect("first write");

    let outcome = store
        .commit(write(json!({ "projects": [] }), 0, "r2"))
        .await
        .expect("commit");

    assert_eq!(
        outcome,
        CommitOutcome::Conflict {
            current_version: StateVersion::new(1)
        }
    );
    let entries = EventLedger::list(store.as_ref()).await.expect("ledger");
    assert_eq!(entries.len(), 1);
    let loaded = store.load().await.expect("load").expect("document");
    assert_eq!(loaded.document.projects().len(), 1);
}

#[rstest]
#[tokio::test]
async fn retried_tokens_replay_the_recorded_version(store: Arc<InMemoryBoardStore>) {
    let first = store
        .commit(write(json!({ "projects": [] }), 0, "r1"))
        .await
        .expect("first");
    let retry = store
        .commit(write(json!({ "projects": [] }), 0, "r1"))
        .await
        .expect("retry");

    assert_eq!(committed_version(first), 1);
    assert_eq!(
        retry,
        CommitOutcome::Replayed {
            version: StateVersion::new(1),
            payload_matches: true
        }
    );
    let entries = EventLedger::list(store.as_ref()).await.expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].client_request_id.to_string(), "r1");
}

#[rstest]
#[tokio::test]
async fn reused_tokens_with_new_content_report_a_payload_mismatch(
    store: Arc<InMemoryBoardStore>,
) {
    store
        .commit(write(json!({ "projects": [] }), 0, "r1"))
        .await
        .expect("first");
    let retry = store
        .commit(write(json!({ "projects": [{ "id": "other" }] }), 1, "r1"))
        .await
        .expect("retry");

    assert_eq!(
        retry,
        CommitOutcome::Replayed {
            version: StateVersion::new(1),
            payload_matches: false
        }
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_at_one_version_produce_one_winner(store: Arc<InMemoryBoardStore>) {
    store
        .commit(write(json!({ "projects": [] }), 0, "seed"))
        .await
        .expect("seed");

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .commit(write(json!({ "projects": [{ "id": n }] }), 1, &format!("w{n}")))
                    .await
            })
        })
        .collect();

    let mut committed = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task").expect("commit") {
            CommitOutcome::Committed { version, .. } => {
                assert_eq!(version, StateVersion::new(2));
                committed += 1;
            }
            CommitOutcome::Conflict { current_version } => {
                assert_eq!(current_version, StateVersion::new(2));
                conflicts += 1;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!((committed, conflicts), (1, 7));
}

#[rstest]
#[tokio::test]
async fn writes_record_entity_events_newest_first(store: Arc<InMemoryBoardStore>) {
    store
        .commit(write(json!({ "projects": [{ "id": "p1", "name": "A" }] }), 0, "r1"))
        .await
        .expect("create");
    store
        .commit(write(json!({ "projects": [{ "id": "p1", "name": "B" }] }), 1, "r2"))
        .await
        .expect("update");
    store
        .commit(write(json!({ "projects": [] }), 2, "r3"))
        .await
        .expect("delete");

    let history = store
        .history_for(&EntityId::new("p1").expect("id"))
        .await
        .expect("history");
    let actions: Vec<ActionType> = history.iter().map(|event| event.action_type).collect();
    assert_eq!(
        actions,
        vec![ActionType::Delete, ActionType::Update, ActionType::Create]
    );
    assert_eq!(history[1].snapshot_after, Some(json!({ "id": "p1", "name": "B" })));
    assert_eq!(history[0].snapshot_after, None);

    let found = store
        .find_entity_event(history[1].id)
        .await
        .expect("lookup")
        .expect("event");
    assert_eq!(found, history[1]);
}

#[rstest]
#[tokio::test]
async fn backups_list_newest_first_and_never_touch_the_document(store: Arc<InMemoryBoardStore>) {
    store
        .commit(write(json!({ "projects": [{ "id": "p1" }] }), 0, "r1"))
        .await
        .expect("write");
    let snapshot = store.load().await.expect("load").expect("document");

    for kind in [BackupKind::Startup, BackupKind::Hourly, BackupKind::Manual] {
        store
            .insert(&NewBackup {
                snapshot: snapshot.clone(),
                kind,
                source: "test".to_owned(),
            })
            .await
            .expect("insert");
    }

    let listed = BackupRepository::list(store.as_ref()).await.expect("list");
    let ids: Vec<i64> = listed.iter().map(|backup| backup.id.get()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(store.count().await.expect("count"), 3);
    assert_eq!(
        store.latest().await.expect("latest").map(|backup| backup.kind),
        Some(BackupKind::Manual)
    );
    assert_eq!(store.load().await.expect("load"), Some(snapshot));
}
