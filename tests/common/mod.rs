//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use cqlguard::test_helpers::MockDriver;
use cqlguard::{ColumnDef, ColumnType, Connection, Connections, SessionConfig, TableSchema, Value};
use std::sync::Arc;

pub fn session() -> SessionConfig {
    SessionConfig {
        worker_threads: 2,
        ..SessionConfig::default()
    }
}

/// Registry with `driver` as the default connection named "default"
pub fn connect(driver: &Arc<MockDriver>) -> Connections {
    let connection = Connection::new("default", driver.clone(), session()).expect("start connection");
    Connections::single(connection)
}

pub fn users() -> Arc<TableSchema> {
    TableSchema::builder("app", "users")
        .column(ColumnDef::new("id", ColumnType::Int).partition_key())
        .column(ColumnDef::new("name", ColumnType::Text))
        .column(ColumnDef::new("age", ColumnType::Int))
        .column(ColumnDef::new("score", ColumnType::BigInt).default_value(Value::BigInt(0)))
        .build()
        .expect("users schema")
}

pub fn events() -> Arc<TableSchema> {
    TableSchema::builder("app", "events")
        .column(ColumnDef::new("day", ColumnType::Text).partition_key())
        .column(ColumnDef::new("seq", ColumnType::Int).clustering_key())
        .column(ColumnDef::new("owner", ColumnType::Text).static_column())
        .column(ColumnDef::new("note", ColumnType::Text))
        .build()
        .expect("events schema")
}

pub fn page_views() -> Arc<TableSchema> {
    TableSchema::builder("app", "page_views")
        .column(ColumnDef::new("url", ColumnType::Text).partition_key())
        .column(ColumnDef::new("hits", ColumnType::Counter))
        .build()
        .expect("page_views schema")
}

pub fn profiles() -> Arc<TableSchema> {
    TableSchema::builder("app", "profiles")
        .column(ColumnDef::new("id", ColumnType::Int).partition_key())
        .column(ColumnDef::new("tags", ColumnType::set(ColumnType::Text)))
        .column(ColumnDef::new("history", ColumnType::list(ColumnType::Int)))
        .column(ColumnDef::new("prefs", ColumnType::map(ColumnType::Text, ColumnType::Text)))
        .column(ColumnDef::new("bio", ColumnType::Text))
        .build()
        .expect("profiles schema")
}
