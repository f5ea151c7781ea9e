use storeql_data::{BatchWriter, DriverError, DriverErrorKind, ErrorKind, SqlValue};
use storeql_test::fixtures::EntityStub;
use storeql_test::{CallKind, MockExecutor};

#[tokio::test]
async fn test_upsert_updates_first_then_inserts() {
    let db = MockExecutor::new();
    db.expect_exec("UPDATE entities_stub").rows_affected(2);
    db.expect_query("INSERT INTO entities_stub").returning_ids([30, 40]);

    let mut batch = vec![
        EntityStub::new("new-a"),
        EntityStub::persisted(1, "old-a"),
        EntityStub::new("new-b"),
        EntityStub::persisted(2, "old-b"),
    ];
    BatchWriter::new(&db).upsert(&mut batch).await.unwrap();

    assert_eq!(
        batch,
        vec![
            EntityStub::persisted(30, "new-a"),
            EntityStub::persisted(1, "old-a"),
            EntityStub::persisted(40, "new-b"),
            EntityStub::persisted(2, "old-b"),
        ]
    );
    let calls = db.calls();
    assert_eq!(calls[0].kind, CallKind::Exec);
    let updated: Vec<_> = calls[0].source.iter().map(|m| m.get("id").cloned()).collect();
    assert_eq!(updated, vec![Some(SqlValue::UInt(1)), Some(SqlValue::UInt(2))]);
    assert_eq!(calls[1].kind, CallKind::Query);
    db.assert_done();
}

#[tokio::test]
async fn test_upsert_only_persisted_skips_insert() {
    let db = MockExecutor::new();
    db.expect_exec("UPDATE entities_stub").rows_affected(1);

    let mut batch = vec![EntityStub::persisted(9, "x")];
    BatchWriter::new(&db).upsert(&mut batch).await.unwrap();

    assert_eq!(db.calls().len(), 1);
}

#[tokio::test]
async fn test_upsert_only_new_skips_update() {
    let db = MockExecutor::new();
    db.expect_query("INSERT INTO entities_stub").returning_ids([11]);

    let mut batch = vec![EntityStub::new("x")];
    BatchWriter::new(&db).upsert(&mut batch).await.unwrap();

    assert_eq!(batch[0].id, 11);
    assert_eq!(db.calls().len(), 1);
}

#[tokio::test]
async fn test_upsert_empty_batch_fails() {
    let db = MockExecutor::new();
    let mut batch: Vec<EntityStub> = Vec::new();

    let err = BatchWriter::new(&db).upsert(&mut batch).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyBatch);
}

#[tokio::test]
async fn test_upsert_update_failure_aborts_before_insert() {
    let db = MockExecutor::new();
    db.expect_exec("UPDATE entities_stub").rows_affected(0);

    let mut batch = vec![EntityStub::persisted(1, "gone"), EntityStub::new("new")];
    let err = BatchWriter::new(&db).upsert(&mut batch).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
    assert_eq!(err.trail(), vec!["update into db"]);
    assert_eq!(batch[1].id, 0);
    assert_eq!(db.calls().len(), 1);
}

#[tokio::test]
async fn test_upsert_insert_failure_keeps_applied_update() {
    let db = MockExecutor::new();
    db.expect_exec("UPDATE entities_stub").rows_affected(1);
    db.expect_query("INSERT INTO entities_stub")
        .failing(DriverError::new(DriverErrorKind::NotNullViolation, "name is null"));

    let mut batch = vec![EntityStub::persisted(1, "kept"), EntityStub::new("new")];
    let err = BatchWriter::new(&db).upsert(&mut batch).await.unwrap_err();

    assert_eq!(err.trail(), vec!["insert into db", "named query"]);
    assert!(err.is_driver(DriverErrorKind::NotNullViolation));
    assert_eq!(db.calls().len(), 2);
}
