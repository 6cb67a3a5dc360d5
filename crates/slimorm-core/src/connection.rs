//! Driver capability interface.
//!
//! A driver crate implements [`DbDriver`] and [`DbConnection`]; everything
//! above this layer (dialects, the connection wrapper, the extension API)
//! talks to the database only through these traits. The interface is
//! synchronous: every call blocks until the driver returns.

use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::row::ResultSet;
use crate::types::DbType;
use crate::value::Value;

/// Lifecycle state of a physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    /// The connection failed and must be closed.
    Broken,
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A bound command parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Placeholder name including the dialect prefix (`@Title`), or empty
    /// for positional parameters.
    pub name: String,
    pub value: Value,
    pub db_type: Option<DbType>,
    pub direction: ParameterDirection,
}

impl Parameter {
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            db_type: None,
            direction: ParameterDirection::Input,
        }
    }

    pub fn positional(value: impl Into<Value>) -> Self {
        Self::named(String::new(), value)
    }

    pub fn db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    pub fn direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn is_positional(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
}

/// Identifies a transaction open on a particular connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    pub id: u64,
    pub connection_id: u64,
    /// 0 for the outermost transaction, >0 for savepoint scopes.
    pub depth: usize,
    pub isolation: Option<IsolationLevel>,
}

impl TransactionHandle {
    /// Savepoint name used for nested scopes.
    pub fn savepoint_name(&self) -> String {
        format!("slimorm_sp_{}", self.id)
    }
}

/// A command ready for execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbCommand {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub command_type: CommandType,
    pub timeout: Option<Duration>,
    pub transaction: Option<TransactionHandle>,
}

impl DbCommand {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = command_type;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transaction(mut self, transaction: Option<TransactionHandle>) -> Self {
        self.transaction = transaction;
        self
    }
}

impl fmt::Display for DbCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A physical database connection.
pub trait DbConnection: Send {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn state(&self) -> ConnectionState;

    fn begin_transaction(&mut self, isolation: Option<IsolationLevel>) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_non_query(&DbCommand::new(format!("SAVEPOINT {name}")))
            .map(|_| ())
    }

    fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_non_query(&DbCommand::new(format!("RELEASE SAVEPOINT {name}")))
            .map(|_| ())
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_non_query(&DbCommand::new(format!("ROLLBACK TO SAVEPOINT {name}")))
            .map(|_| ())
    }

    /// Execute a statement, returning the number of affected rows.
    fn execute_non_query(&mut self, command: &DbCommand) -> Result<u64>;

    /// Execute a query, returning the complete result set.
    fn execute_reader(&mut self, command: &DbCommand) -> Result<ResultSet>;

    /// First column of the first row, or NULL when there are no rows.
    fn execute_scalar(&mut self, command: &DbCommand) -> Result<Value> {
        let rows = self.execute_reader(command)?;
        Ok(rows
            .rows()
            .first()
            .and_then(|row| row.get(0).cloned())
            .unwrap_or(Value::Null))
    }
}

impl fmt::Debug for dyn DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Creates physical connections from connection strings.
pub trait DbDriver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a connection. It is returned unopened.
    fn connect(&self, connection_string: &str) -> Result<Box<dyn DbConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = DbCommand::new("SELECT 1")
            .parameters(vec![Parameter::named("@Id", 1_i64)])
            .timeout(Some(Duration::from_secs(5)));
        assert_eq!(cmd.sql, "SELECT 1");
        assert_eq!(cmd.parameters[0].name, "@Id");
        assert_eq!(cmd.parameters[0].value, Value::BigInt(1));
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cmd.command_type, CommandType::Text);
        assert!(cmd.transaction.is_none());
    }

    #[test]
    fn test_positional_parameter() {
        let p = Parameter::positional("x").db_type(DbType::String);
        assert!(p.is_positional());
        assert_eq!(p.db_type, Some(DbType::String));
        assert_eq!(p.direction, ParameterDirection::Input);
    }

    #[test]
    fn test_isolation_sql() {
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_savepoint_name() {
        let handle = TransactionHandle {
            id: 7,
            connection_id: 1,
            depth: 1,
            isolation: None,
        };
        assert_eq!(handle.savepoint_name(), "slimorm_sp_7");
    }

    #[test]
    fn test_handles_with_isolation_are_hashable() {
        use std::collections::HashSet;

        let handle = |id, isolation| TransactionHandle {
            id,
            connection_id: 1,
            depth: 0,
            isolation,
        };
        let set: HashSet<TransactionHandle> = [
            handle(1, Some(IsolationLevel::Serializable)),
            handle(1, Some(IsolationLevel::Serializable)),
            handle(1, Some(IsolationLevel::ReadUncommitted)),
            handle(2, None),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }
}
