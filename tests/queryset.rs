//! QuerySet reads, paging and blind updates.

mod common;

use common::{connect, profiles, users};
use cqlguard::test_helpers::{row, MockDriver};
use cqlguard::{CqlError, Row, Value};
use std::sync::Arc;

fn numbered(n: i32) -> Vec<Row> {
    (0..n)
        .map(|i| row(&[("id", Value::Int(i)), ("name", Value::Text(format!("user{i}")))]))
        .collect()
}

#[tokio::test]
async fn test_get_distinguishes_none_one_and_many() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);
    let users = users();

    let err = users.get(&conns, vec![("id", Value::Int(1))]).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err, CqlError::DoesNotExist("users matching query does not exist".to_string()));

    driver.push_rows(numbered(2));
    let err = users.get(&conns, vec![("name", Value::from("x"))]).await.unwrap_err();
    assert!(err.is_multiple());

    driver.push_rows(numbered(1));
    let record = users.get(&conns, vec![("id", Value::Int(0))]).await.unwrap();
    assert_eq!(record.try_get::<String>("name").unwrap(), "user0");
    assert!(record.is_persisted());

    assert!(driver.statements().iter().all(|cql| !cql.contains("COUNT")));
    assert_eq!(
        driver.statements()[0],
        "SELECT * FROM app.users WHERE \"id\" = :p0"
    );
}

#[tokio::test]
async fn test_iterate_yields_one_page_per_fetch() {
    let driver = Arc::new(MockDriver::paged(numbered(101)));
    let conns = connect(&driver);

    let mut pages = users().iterate(&conns, 10, &[], None).unwrap();
    let mut sizes = Vec::new();
    while let Some(page) = pages.next_page().await {
        sizes.push(page.unwrap().len());
    }

    assert_eq!(sizes.len(), 11);
    assert_eq!(sizes.last(), Some(&1));
    assert_eq!(pages.pages_fetched(), 11);
    assert_eq!(driver.requests().len(), 11);
    assert!(driver.requests()[0].paging_state.is_none());
    assert!(driver.requests()[1].paging_state.is_some());
    assert!(pages.next_page().await.is_none());
}

#[tokio::test]
async fn test_iterate_with_limit_and_projection() {
    let driver = Arc::new(MockDriver::paged(numbered(101)));
    let conns = connect(&driver);

    let mut pages = users().iterate(&conns, 10, &["name"], Some(80)).unwrap();
    let mut total = 0;
    while let Some(page) = pages.next_page().await {
        total += page.unwrap().len();
    }

    assert_eq!(total, 80);
    assert_eq!(pages.pages_fetched(), 8);
    assert_eq!(driver.statements()[0], "SELECT \"name\" FROM app.users LIMIT 80");
}

#[tokio::test]
async fn test_empty_cursor_ends_iteration() {
    let driver = Arc::new(MockDriver::with_handler(|_: &cqlguard::Request| {
        Ok(cqlguard::RawResult {
            rows: numbered(3),
            paging_state: Some(Vec::new()),
            applied: None,
        })
    }));
    let conns = connect(&driver);

    let mut pages = users().iterate(&conns, 10, &[], None).unwrap();
    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 3);
    assert!(pages.next_page().await.is_none());
    assert_eq!(driver.requests().len(), 1);
}

#[tokio::test]
async fn test_all_materializes_every_page() {
    let driver = Arc::new(MockDriver::paged(numbered(25)));
    let conns = connect(&driver);

    let qs = users().objects().fetch_size(10).all(&conns).await.unwrap();
    assert!(qs.is_materialized());
    assert_eq!(qs.len(), 25);
    assert_eq!(qs.first().and_then(|r| r.get("id")), Some(&Value::Int(0)));
    assert_eq!(driver.requests().len(), 3);

    // a materialized queryset answers from its cache
    let qs = qs.all(&conns).await.unwrap();
    assert_eq!(qs.nth(24).and_then(|r| r.get("id")), Some(&Value::Int(24)));
    assert_eq!(driver.requests().len(), 3);
}

#[tokio::test]
async fn test_default_fetch_size_comes_from_config() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    users().all(&conns).await.unwrap();
    assert_eq!(driver.requests()[0].fetch_size, Some(5000));
}

#[tokio::test]
async fn test_create_uses_queryset_options() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    let record = users()
        .objects()
        .ttl(30)
        .create(&conns, vec![("id", Value::Int(3))])
        .await
        .unwrap();

    assert!(record.is_persisted());
    assert_eq!(
        driver.statements(),
        vec!["INSERT INTO app.users (\"id\", \"score\") VALUES (:p0, :p1) USING TTL 30".to_string()]
    );
}

#[tokio::test]
async fn test_create_rejects_unknown_columns_before_io() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    let err = users()
        .create(&conns, vec![("id", Value::Int(3)), ("email", Value::from("x"))])
        .await
        .unwrap_err();
    assert!(matches!(err, CqlError::Validation(_)));
    assert!(driver.requests().is_empty());
}

#[tokio::test]
async fn test_update_with_collection_operations_and_nulls() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);

    profiles()
        .objects()
        .filter("id", 1)
        .unwrap()
        .update(
            &conns,
            vec![
                ("tags__add", Value::Set(vec![Value::from("rust")])),
                ("history__prepend", Value::List(vec![Value::Int(1)])),
                ("prefs__remove", Value::Set(vec![Value::from("theme")])),
                ("bio", Value::Null),
            ],
        )
        .await
        .unwrap();

    let requests = driver.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].cql,
        "UPDATE app.profiles SET \"tags\" = \"tags\" + :p0, \"history\" = :p1 + \"history\", \"prefs\" = \"prefs\" - :p2 WHERE \"id\" = :p3"
    );
    assert_eq!(requests[0].params[3], Value::Int(1));
    assert_eq!(requests[1].cql, "DELETE \"bio\" FROM app.profiles WHERE \"id\" = :p0");
}

#[tokio::test]
async fn test_update_validates_every_name_before_io() {
    let driver = Arc::new(MockDriver::new());
    let conns = connect(&driver);
    let qs = profiles().objects().filter("id", 1).unwrap();

    let err = qs
        .update(&conns, vec![("bio", Value::from("hi")), ("id", Value::Int(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, CqlError::Validation(_)));

    let err = qs
        .update(&conns, vec![("prefs__remove", Value::from("theme"))])
        .await
        .unwrap_err();
    assert!(matches!(err, CqlError::Validation(ref msg) if msg.contains("A set is required")));

    let err = qs
        .update(&conns, vec![("nope", Value::Int(1))])
        .await
        .unwrap_err();
    assert!(matches!(err, CqlError::Validation(_)));

    assert!(driver.requests().is_empty());
}

#[tokio::test]
async fn test_update_if_exists_is_checked() {
    let driver = Arc::new(MockDriver::new());
    driver.push_result(Ok(cqlguard::RawResult::applied(false, None)));
    let conns = connect(&driver);

    let err = users()
        .objects()
        .filter("id", 9)
        .unwrap()
        .if_exists()
        .update(&conns, vec![("name", Value::from("z"))])
        .await
        .unwrap_err();

    assert_eq!(err, CqlError::ConditionalNotApplied { existing: None });
    assert_eq!(
        driver.statements(),
        vec!["UPDATE app.users SET \"name\" = :p0 WHERE \"id\" = :p1 IF EXISTS".to_string()]
    );
}
