//! Value and error conversion between slimorm and rusqlite.

use rusqlite::ffi;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use slimorm_core::{ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Value};

/// Bind form of a value.
///
/// SQLite has no boolean, date or uuid storage class; those are written as
/// integers and text in the same formats the literal renderer uses.
pub fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::TinyInt(v) => SqliteValue::Integer(i64::from(*v)),
        Value::SmallInt(v) => SqliteValue::Integer(i64::from(*v)),
        Value::Int(v) => SqliteValue::Integer(i64::from(*v)),
        Value::BigInt(v) => SqliteValue::Integer(*v),
        Value::Float(v) => SqliteValue::Real(f64::from(*v)),
        Value::Double(v) => SqliteValue::Real(*v),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        other => other
            .to_text()
            .map_or(SqliteValue::Null, SqliteValue::Text),
    }
}

pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

/// Map a rusqlite failure onto the query error taxonomy.
pub fn query_error(err: rusqlite::Error, sql: &str) -> Error {
    let message = err.to_string();
    let kind = match err.sqlite_error_code() {
        Some(ffi::ErrorCode::ConstraintViolation) => QueryErrorKind::Constraint,
        Some(
            ffi::ErrorCode::DatabaseBusy
            | ffi::ErrorCode::DatabaseLocked
            | ffi::ErrorCode::OperationInterrupted,
        ) => QueryErrorKind::Timeout,
        _ if message.contains("syntax error") => QueryErrorKind::Syntax,
        _ => match &err {
            rusqlite::Error::InvalidParameterName(_) | rusqlite::Error::InvalidParameterCount(..) => {
                QueryErrorKind::Syntax
            }
            _ => QueryErrorKind::Database,
        },
    };
    let mut q = QueryError::new(kind, message).with_sql(sql);
    if let Some(failure) = err.sqlite_error() {
        q = q.with_code(failure.extended_code.to_string());
    }
    q.with_source(err).into()
}

pub fn connect_error(err: rusqlite::Error, what: &str) -> Error {
    ConnectionError::new(ConnectionErrorKind::Connect, format!("{what}: {err}"))
        .with_source(err)
        .into()
}
