use storeql_data::{BatchWriter, DriverError, DriverErrorKind, ErrorKind};
use storeql_test::fixtures::EntityStub;
use storeql_test::MockExecutor;

#[tokio::test]
async fn test_delete_empty_batch_fails() {
    let db = MockExecutor::new();
    let batch: Vec<EntityStub> = Vec::new();

    let err = BatchWriter::new(&db).delete(&batch).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyBatch);
}

#[tokio::test]
async fn test_delete_unpersisted_entity_fails_before_round_trip() {
    let db = MockExecutor::new();
    let batch = vec![EntityStub::persisted(1, "a"), EntityStub::new("b")];

    let err = BatchWriter::new(&db).delete(&batch).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoIdentifier);
    assert!(err.to_string().contains("#1"));
    assert!(db.calls().is_empty());
    assert_eq!(batch, vec![EntityStub::persisted(1, "a"), EntityStub::new("b")]);
}

#[tokio::test]
async fn test_delete_one_uses_the_same_policy() {
    let db = MockExecutor::new();

    let err = BatchWriter::new(&db)
        .delete_one(&EntityStub::new("never saved"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoIdentifier);
}

#[tokio::test]
async fn test_delete_does_not_verify_affected_rows() {
    let db = MockExecutor::new();
    db.expect_exec("DELETE FROM entities_stub WHERE id=:id").rows_affected(1);

    let batch = vec![EntityStub::persisted(1, "a"), EntityStub::persisted(2, "b")];
    let affected = BatchWriter::new(&db).delete(&batch).await.unwrap();

    assert_eq!(affected, 1);
    assert_eq!(db.calls()[0].source.len(), 2);
}

#[tokio::test]
async fn test_delete_exec_error_is_wrapped() {
    let db = MockExecutor::new();
    db.expect_exec("DELETE FROM entities_stub").failing(DriverError::new(
        DriverErrorKind::ForeignKeyViolation,
        "still referenced",
    ));

    let err = BatchWriter::new(&db)
        .delete_one(&EntityStub::persisted(5, "parent"))
        .await
        .unwrap_err();

    assert_eq!(err.trail(), vec!["named exec"]);
    assert!(err.is_driver(DriverErrorKind::ForeignKeyViolation));
}
