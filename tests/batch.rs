//! Batch queuing, envelope rendering and connection binding.

mod common;

use common::{connect, page_views, session, users};
use cqlguard::test_helpers::{row, MockDriver};
use cqlguard::{
    Batch, BatchType, ColumnDef, ColumnType, Connection, Connections, CqlError, RawResult, Record, TableSchema, Value,
    WriteOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn two_connections(a: &Arc<MockDriver>, b: &Arc<MockDriver>) -> Connections {
    let mut conns = Connections::new();
    conns.register(Connection::new("a", a.clone(), session()).unwrap(), true);
    conns.register(Connection::new("b", b.clone(), session()).unwrap(), false);
    conns
}

fn audit_on_b() -> Arc<TableSchema> {
    TableSchema::builder("app", "audit")
        .column(ColumnDef::new("id", ColumnType::Int).partition_key())
        .connection("b")
        .build()
        .unwrap()
}

fn counting_callback(batch: &mut Batch) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    batch.add_callback(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    calls
}

#[tokio::test]
async fn test_statements_queue_until_execute() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);
    let users = users();

    let mut batch = Batch::new(BatchType::Logged);
    let mut ann = Record::new(&users, vec![("id", Value::Int(1))]).unwrap();
    ann.save(&mut batch, &WriteOptions::new()).await.unwrap();
    let gone = Record::from_row(&users, row(&[("id", Value::Int(2))])).unwrap();
    gone.delete(&mut batch, &WriteOptions::new()).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert!(driver.requests().is_empty());

    batch.execute(&conns).await.unwrap();
    let requests = driver.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].cql,
        "BEGIN BATCH\n  INSERT INTO app.users (\"id\", \"score\") VALUES (:p0, :p1)\n  DELETE FROM app.users WHERE \"id\" = :p2\nAPPLY BATCH;"
    );
    assert_eq!(requests[0].params, vec![Value::Int(1), Value::BigInt(0), Value::Int(2)]);
    assert!(batch.is_empty());
    assert!(batch.is_executed());
}

#[tokio::test]
async fn test_counter_batch_with_timestamp() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    let mut batch = Batch::new(BatchType::Counter).timestamp(77i64);
    let mut views = Record::from_row(&page_views(), row(&[("url", Value::from("/")), ("hits", Value::BigInt(1))])).unwrap();
    views
        .update(&mut batch, &WriteOptions::new(), vec![("hits", Value::BigInt(4))])
        .await
        .unwrap();
    batch.execute(&conns).await.unwrap();

    assert_eq!(
        driver.statements(),
        vec![
            "BEGIN COUNTER BATCH USING TIMESTAMP 77\n  UPDATE app.page_views SET \"hits\" = \"hits\" + :p0 WHERE \"url\" = :p1\nAPPLY BATCH;"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_empty_batch_runs_callbacks_only() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    let mut batch = Batch::new(BatchType::Unlogged);
    let calls = counting_callback(&mut batch);
    batch.execute(&conns).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(driver.requests().is_empty());
}

#[tokio::test]
async fn test_reexecute_only_refires_callbacks() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    let mut batch = Batch::new(BatchType::Logged).warn_multiple_exec(false);
    let calls = counting_callback(&mut batch);
    let mut record = Record::new(&users(), vec![("id", Value::Int(1))]).unwrap();
    record.save(&mut batch, &WriteOptions::new()).await.unwrap();

    batch.execute(&conns).await.unwrap();
    batch.execute(&conns).await.unwrap();

    assert_eq!(driver.requests().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_batch_rejects_second_connection() {
    let a = Arc::new(MockDriver::new());
    let b = Arc::new(MockDriver::new());
    let conns = two_connections(&a, &b);

    let mut batch = Batch::new(BatchType::Logged);
    let mut user = Record::new(&users(), vec![("id", Value::Int(1))]).unwrap();
    user.save(&mut batch, &WriteOptions::new()).await.unwrap();

    let mut entry = Record::new(&audit_on_b(), vec![("id", Value::Int(1))]).unwrap();
    let err = entry.save(&mut batch, &WriteOptions::new()).await.unwrap_err();
    assert!(matches!(err, CqlError::Configuration(ref msg) if msg.starts_with("Batch queries must be executed on the same connection")));
    assert_eq!(batch.len(), 1);

    batch.execute(&conns).await.unwrap();
    assert_eq!(a.requests().len(), 1);
    assert!(b.requests().is_empty());
}

#[tokio::test]
async fn test_per_call_connection_rejected_in_batch() {
    let mut batch = Batch::new(BatchType::Logged);
    let mut user = Record::new(&users(), vec![("id", Value::Int(1))]).unwrap();
    let err = user
        .save(&mut batch, &WriteOptions::new().using("b"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CqlError::Configuration("Cannot specify a connection on model in batch mode.".to_string())
    );
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_explicit_batch_connection_wins() {
    let a = Arc::new(MockDriver::new());
    let b = Arc::new(MockDriver::new());
    let conns = two_connections(&a, &b);

    let mut batch = Batch::new(BatchType::Logged).with_connection("b");
    let mut user = Record::new(&users(), vec![("id", Value::Int(1))]).unwrap();
    user.save(&mut batch, &WriteOptions::new()).await.unwrap();
    let mut entry = Record::new(&audit_on_b(), vec![("id", Value::Int(2))]).unwrap();
    entry.save(&mut batch, &WriteOptions::new()).await.unwrap();

    batch.execute(&conns).await.unwrap();
    assert!(a.requests().is_empty());
    assert_eq!(b.requests().len(), 1);
}

#[tokio::test]
async fn test_rejected_conditional_batch_keeps_queue() {
    let driver = Arc::new(MockDriver::new());
    let existing = row(&[("[applied]", Value::Boolean(false)), ("id", Value::Int(1))]);
    driver.push_result(Ok(RawResult::applied(false, Some(existing))));
    let conns = connect(&driver);

    let mut batch = Batch::new(BatchType::Logged);
    let calls = counting_callback(&mut batch);
    let mut record = Record::new(&users(), vec![("id", Value::Int(1))]).unwrap();
    record
        .save(&mut batch, &WriteOptions::new().if_not_exists())
        .await
        .unwrap();

    let err = batch.execute(&conns).await.unwrap_err();
    assert!(matches!(err, CqlError::ConditionalNotApplied { existing: Some(_) }));
    assert_eq!(batch.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
