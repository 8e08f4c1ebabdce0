//! Integration tests for the Diesel board adapters against embedded PostgreSQL.
//!
//! Each test runs in its own database cloned from a migrated template.

use boardsync::domain::ports::{
    BackupRepository, BoardStateRepository, BoardStateRepositoryError, CommitOutcome,
    EventLedger, VersionedWrite,
};
use boardsync::domain::{
    ActionType, BackupKind, BoardDocument, ChangeOrigin, ClientRequestId, EntityId, NewBackup,
    StateVersion, VersionedDocument,
};
use boardsync::outbound::persistence::{
    DbPool, DieselBackupRepository, DieselBoardStateRepository, DieselEventLedger, PoolConfig,
};
use futures_util::future::join_all;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

mod support;

use support::{
    connect, drop_table, execute_sql, handle_cluster_setup_failure, provision_template_database,
    shared_cluster_handle,
};

struct TestContext {
    runtime: Runtime,
    repository: DieselBoardStateRepository,
    ledger: DieselEventLedger,
    backups: DieselBackupRepository,
    database_url: String,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| err.to_string())?;
    let temp_db = provision_template_database(cluster)?;
    let database_url = temp_db.url().to_string();

    let config = PoolConfig::new(database_url.as_str()).with_max_size(4);
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        repository: DieselBoardStateRepository::new(pool.clone()),
        ledger: DieselEventLedger::new(pool.clone()),
        backups: DieselBackupRepository::new(pool),
        database_url,
        _database: temp_db,
    })
}

#[fixture]
fn store() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn document(value: Value) -> BoardDocument {
    BoardDocument::from_value(value).expect("valid document")
}

fn write(data: Value, expected: u64, token: &str) -> VersionedWrite {
    VersionedWrite {
        document: document(data),
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
fn commits_bump_the_version_and_reads_see_the_document(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: commits_bump_the_version_and_reads_see_the_document skipped");
        return;
    };

    context.runtime.block_on(async {
        assert!(context.repository.load().await.expect("load").is_none());

        let first = context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p1" }] }), 0, "r1"))
            .await
            .expect("first commit");
        assert_eq!(committed_version(first), 1);

        let second = context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p1" }, { "id": "p2" }] }), 1, "r2"))
            .await
            .expect("second commit");
        assert_eq!(committed_version(second), 2);

        let current = context
            .repository
            .load()
            .await
            .expect("load")
            .expect("document stored");
        assert_eq!(current.version, StateVersion::new(2));
        assert_eq!(current.document.projects().len(), 2);

        let entries = context.ledger.list().await.expect("ledger");
        let versions: Vec<u64> = entries.iter().map(|entry| entry.version.get()).collect();
        assert_eq!(versions, vec![1, 2]);
    });
}

#[rstest]
fn stale_writes_report_the_current_version(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: stale_writes_report_the_current_version skipped");
        return;
    };

    context.runtime.block_on(async {
        context
            .repository
            .commit(write(json!({ "projects": [] }), 0, "r1"))
            .await
            .expect("first commit");

        let stale = context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p9" }] }), 0, "r2"))
            .await
            .expect("stale commit");
        assert_eq!(
            stale,
            CommitOutcome::Conflict {
                current_version: StateVersion::new(1)
            }
        );

        let entries = context.ledger.list().await.expect("ledger");
        assert_eq!(entries.len(), 1, "rejected writes leave no ledger entry");
    });
}

#[rstest]
fn retried_tokens_replay_without_a_second_entry(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: retried_tokens_replay_without_a_second_entry skipped");
        return;
    };

    context.runtime.block_on(async {
        let body = json!({ "projects": [{ "id": "p1" }] });
        context
            .repository
            .commit(write(body.clone(), 0, "r1"))
            .await
            .expect("first commit");

        let retry = context
            .repository
            .commit(write(body, 0, "r1"))
            .await
            .expect("retry");
        assert_eq!(
            retry,
            CommitOutcome::Replayed {
                version: StateVersion::new(1),
                payload_matches: true
            }
        );

        let altered = context
            .repository
            .commit(write(json!({ "projects": [] }), 0, "r1"))
            .await
            .expect("altered retry");
        assert_eq!(
            altered,
            CommitOutcome::Replayed {
                version: StateVersion::new(1),
                payload_matches: false
            }
        );

        assert_eq!(context.ledger.list().await.expect("ledger").len(), 1);
    });
}

#[rstest]
fn concurrent_writers_at_one_version_yield_a_single_winner(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!(
            "SKIP-TEST-CLUSTER: concurrent_writers_at_one_version_yield_a_single_winner skipped"
        );
        return;
    };

    let outcomes = context.runtime.block_on(async {
        let attempts = (0..6).map(|n| {
            let repository = context.repository.clone();
            let token = format!("writer-{n}");
            async move {
                repository
                    .commit(write(json!({ "projects": [{ "id": token }] }), 0, &token))
                    .await
            }
        });
        join_all(attempts).await
    });

    let mut committed = 0;
    for outcome in outcomes {
        match outcome.expect("commit should not fail") {
            CommitOutcome::Committed { version, .. } => {
                assert_eq!(version, StateVersion::new(1));
                committed += 1;
            }
            CommitOutcome::Conflict { current_version } => {
                assert_eq!(current_version, StateVersion::new(1));
            }
            other @ CommitOutcome::Replayed { .. } => panic!("unexpected replay: {other:?}"),
        }
    }
    assert_eq!(committed, 1);
}

#[rstest]
fn commits_record_entity_events_newest_first(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: commits_record_entity_events_newest_first skipped");
        return;
    };

    context.runtime.block_on(async {
        context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p1", "name": "A" }] }), 0, "r1"))
            .await
            .expect("create");
        context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p1", "name": "B" }] }), 1, "r2"))
            .await
            .expect("update");
        context
            .repository
            .commit(write(json!({ "projects": [] }), 2, "r3"))
            .await
            .expect("delete");

        let project = EntityId::new("p1").expect("entity id");
        let history = context.ledger.history_for(&project).await.expect("history");
        let actions: Vec<ActionType> = history.iter().map(|event| event.action_type).collect();
        assert_eq!(
            actions,
            vec![ActionType::Delete, ActionType::Update, ActionType::Create]
        );
        assert!(history[0].snapshot_after.is_none());

        let update = context
            .ledger
            .find_entity_event(history[1].id)
            .await
            .expect("lookup")
            .expect("event exists");
        assert_eq!(
            update.snapshot_after,
            Some(json!({ "id": "p1", "name": "B" }))
        );
    });
}

#[rstest]
fn backups_list_newest_first_and_count(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: backups_list_newest_first_and_count skipped");
        return;
    };

    context.runtime.block_on(async {
        assert!(context.backups.latest().await.expect("latest").is_none());

        for (version, kind) in [(1, BackupKind::Startup), (2, BackupKind::Hourly)] {
            context
                .backups
                .insert(&NewBackup {
                    snapshot: VersionedDocument::new(
                        document(json!({ "projects": [] })),
                        StateVersion::new(version),
                    ),
                    kind,
                    source: "integration".to_owned(),
                })
                .await
                .expect("insert backup");
        }

        assert_eq!(context.backups.count().await.expect("count"), 2);
        let listed = context.backups.list().await.expect("list");
        let kinds: Vec<BackupKind> = listed.iter().map(|backup| backup.kind).collect();
        assert_eq!(kinds, vec![BackupKind::Hourly, BackupKind::Startup]);

        let latest = context
            .backups
            .latest()
            .await
            .expect("latest")
            .expect("a backup exists");
        assert_eq!(latest.captured_version(), Some(2));
        let found = context
            .backups
            .find(latest.id)
            .await
            .expect("find")
            .expect("backup exists");
        assert_eq!(found, latest);
    });
}

#[rstest]
fn missing_tables_surface_as_query_errors(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!("SKIP-TEST-CLUSTER: missing_tables_surface_as_query_errors skipped");
        return;
    };

    drop_table(&context.database_url, "board_state").expect("drop board_state");

    let error = context
        .runtime
        .block_on(context.repository.load())
        .expect_err("load should fail without the table");
    assert!(
        matches!(error, BoardStateRepositoryError::Query { .. }),
        "expected a query error, got {error:?}"
    );
}

const REJECT_ENTITY_EVENTS: &str = r"
CREATE FUNCTION reject_entity_events() RETURNS trigger LANGUAGE plpgsql AS $$
BEGIN
    RAISE EXCEPTION 'entity events are read only';
END;
$$;
CREATE TRIGGER reject_entity_events BEFORE INSERT ON entity_events
    FOR EACH ROW EXECUTE FUNCTION reject_entity_events();
";

#[rstest]
fn a_failed_entity_event_insert_rolls_back_the_whole_write(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!(
            "SKIP-TEST-CLUSTER: a_failed_entity_event_insert_rolls_back_the_whole_write skipped"
        );
        return;
    };

    context.runtime.block_on(async {
        context
            .repository
            .commit(write(json!({ "projects": [] }), 0, "r1"))
            .await
            .expect("empty board needs no entity events");
    });

    execute_sql(&context.database_url, REJECT_ENTITY_EVENTS).expect("install trigger");

    context.runtime.block_on(async {
        let error = context
            .repository
            .commit(write(json!({ "projects": [{ "id": "p1" }] }), 1, "r2"))
            .await
            .expect_err("entity event insert fails");
        assert!(
            matches!(error, BoardStateRepositoryError::Query { .. }),
            "expected a query error, got {error:?}"
        );

        let current = context
            .repository
            .load()
            .await
            .expect("load")
            .expect("document stored");
        assert_eq!(current.version, StateVersion::new(1));
        assert!(current.document.projects().is_empty());

        let entries = context.ledger.list().await.expect("ledger");
        let tokens: Vec<String> = entries
            .iter()
            .map(|entry| entry.client_request_id.to_string())
            .collect();
        assert_eq!(tokens, vec!["r1".to_owned()], "no ledger entry survives the rollback");
    });
}

#[rstest]
fn ledger_order_follows_commit_order_not_transaction_start(store: Option<TestContext>) {
    let Some(context) = store else {
        eprintln!(
            "SKIP-TEST-CLUSTER: ledger_order_follows_commit_order_not_transaction_start skipped"
        );
        return;
    };

    let mut client = connect(&context.database_url).expect("connect");
    let mut slow = client.transaction().expect("begin");
    slow.batch_execute("SELECT now()").expect("pin transaction start");
    std::thread::sleep(std::time::Duration::from_millis(20));

    context.runtime.block_on(async {
        context
            .repository
            .commit(write(json!({ "projects": [] }), 0, "fast"))
            .await
            .expect("fast commit");
    });

    slow.batch_execute(
        "INSERT INTO state_events (client_request_id, version, data, payload_hash, origin) \
         VALUES ('slow', 2, '{\"projects\": []}'::jsonb, decode(repeat('00', 32), 'hex'), 'client')",
    )
    .expect("late insert");
    slow.commit().expect("commit slow transaction");

    let entries = context
        .runtime
        .block_on(context.ledger.list())
        .expect("ledger");
    let tokens: Vec<String> = entries
        .iter()
        .map(|entry| entry.client_request_id.to_string())
        .collect();
    assert_eq!(tokens, vec!["fast".to_owned(), "slow".to_owned()]);
}
