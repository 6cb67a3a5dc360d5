//! Error types for slimorm.

use std::fmt;

use thiserror::Error;

/// The result type used throughout slimorm.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all slimorm operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No dialect provider is active, or another setup problem was detected
    /// before any SQL was rendered.
    #[error("configuration error: {0}")]
    Config(String),

    /// A host type has no quoting, column-definition, or binding strategy.
    #[error("type not supported in {context}: {type_name}")]
    UnsupportedType {
        /// Full Rust path of the offending type.
        type_name: String,
        /// Which rendering path rejected it.
        context: &'static str,
    },

    /// The requested statement cannot be built (for example an UPDATE with
    /// nothing to SET).
    #[error("{message}: {sql}")]
    MalformedOperation {
        /// What went wrong.
        message: String,
        /// The SQL that was being built when the problem was detected.
        sql: String,
    },

    /// An optional dialect capability that this provider does not offer.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A value could not be converted into the requested host type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A lookup by primary key found no row.
    #[error("{model} with id {id} not found")]
    NotFound {
        /// Model name of the lookup target.
        model: String,
        /// Rendered id value.
        id: String,
    },

    /// Connection lifecycle failure reported by the driver.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement execution failure reported by the driver.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Anything else.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Build an unsupported-type error for `type_name`.
    pub fn unsupported_type(type_name: impl Into<String>, context: &'static str) -> Self {
        Error::UnsupportedType {
            type_name: type_name.into(),
            context,
        }
    }

    /// Build a malformed-operation error carrying the attempted SQL.
    pub fn malformed(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Error::MalformedOperation {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// The SQL associated with this error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::MalformedOperation { sql, .. } => Some(sql),
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Driver-reported error code (SQLSTATE or extended result code).
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.code.as_deref(),
            _ => None,
        }
    }

    /// Whether the driver reported that a schema object already exists.
    ///
    /// Dialects refine this with their own codes; this helper only looks at
    /// the message text.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::Query(q) => q.message.to_ascii_lowercase().contains("already exists"),
            _ => false,
        }
    }
}

// ============================================================================
// Conversion errors
// ============================================================================

/// A value could not be converted into a host type.
#[derive(Debug, Error)]
#[error("cannot convert {from} to {to}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct ConversionError {
    /// Type name of the source value.
    pub from: &'static str,
    /// Target host type.
    pub to: &'static str,
    /// Additional context, such as a parse failure.
    pub detail: Option<String>,
}

impl ConversionError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// Driver errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the connection.
    Connect,
    /// The connection string could not be understood.
    InvalidConnectionString,
    /// An operation required an open connection.
    NotOpen,
    /// Failure while closing.
    Disconnect,
}

#[derive(Debug, Error)]
#[error("connection error ({kind:?}): {message}")]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// SQL syntax error.
    Syntax,
    /// Constraint violation (unique, foreign key, not null, check).
    Constraint,
    /// Generic database failure.
    Database,
    /// The command timed out.
    Timeout,
    /// Transaction misuse (commit without begin and similar).
    Transaction,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryErrorKind::Syntax => "syntax",
            QueryErrorKind::Constraint => "constraint",
            QueryErrorKind::Database => "database",
            QueryErrorKind::Timeout => "timeout",
            QueryErrorKind::Transaction => "transaction",
        };
        f.write_str(s)
    }
}

/// A driver-reported statement failure, passed through as-is.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// SQLSTATE or driver-specific error code.
    pub code: Option<String>,
    /// The statement that failed.
    pub sql: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            sql: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_carries_sql() {
        let err = Error::malformed("no fields to update", "UPDATE \"Post\" SET  WHERE \"Id\"=1");
        assert_eq!(err.sql(), Some("UPDATE \"Post\" SET  WHERE \"Id\"=1"));
        assert!(err.to_string().starts_with("no fields to update: UPDATE"));
    }

    #[test]
    fn test_unsupported_type_message_names_type() {
        let err = Error::unsupported_type("my_app::Geometry", "column definition");
        assert_eq!(
            err.to_string(),
            "type not supported in column definition: my_app::Geometry"
        );
    }

    #[test]
    fn test_already_exists_detection_from_message() {
        let err: Error = QueryError::new(QueryErrorKind::Database, "table \"Post\" already exists")
            .with_sql("CREATE TABLE \"Post\" (...)")
            .into();
        assert!(err.is_already_exists());
        assert_eq!(err.sql(), Some("CREATE TABLE \"Post\" (...)"));

        let other: Error = QueryError::new(QueryErrorKind::Syntax, "near \"CREAT\"").into();
        assert!(!other.is_already_exists());
    }

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError::new("TEXT", "i32").with_detail("invalid digit");
        assert_eq!(err.to_string(), "cannot convert TEXT to i32: invalid digit");
        assert_eq!(ConversionError::new("BLOB", "bool").to_string(), "cannot convert BLOB to bool");
    }
}
