//! rusqlite-backed driver connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rusqlite::{Connection, Statement};
use slimorm_core::{
    CommandType, ConnectionError, ConnectionErrorKind, ConnectionState, DbCommand, DbConnection,
    DbDriver, Error, IsolationLevel, QueryError, QueryErrorKind, ResultSet, Result,
};

use crate::config::{DatabasePath, SqliteConfig};
use crate::convert::{connect_error, from_sqlite, query_error, to_sqlite};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Creates [`SqliteConnection`]s from connection strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl DbDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, connection_string: &str) -> Result<Box<dyn DbConnection>> {
        let config = SqliteConfig::from_url(connection_string)?;
        Ok(Box::new(SqliteConnection::new(config)))
    }
}

/// A single SQLite database handle.
///
/// Results are read into a [`ResultSet`] before the statement is finalized.
/// The command timeout is applied as SQLite's busy timeout, so it bounds how
/// long a statement waits on a locked database.
pub struct SqliteConnection {
    id: u64,
    config: SqliteConfig,
    conn: Option<Connection>,
    broken: bool,
    applied_timeout: Option<Duration>,
    in_transaction: bool,
}

impl SqliteConnection {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            conn: None,
            broken: false,
            applied_timeout: None,
            in_transaction: false,
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Rowid of the most recent successful insert on this connection.
    pub fn last_insert_rowid(&self) -> Option<i64> {
        self.conn.as_ref().map(Connection::last_insert_rowid)
    }

    fn handle(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            ConnectionError::new(ConnectionErrorKind::NotOpen, "sqlite connection is not open")
                .into()
        })
    }

    fn prepare_command(&mut self, command: &DbCommand) -> Result<()> {
        if command.command_type == CommandType::StoredProcedure {
            return Err(Error::NotImplemented(
                "sqlite has no stored procedures".to_string(),
            ));
        }
        let timeout = command.timeout.or(self.config.busy_timeout);
        if timeout != self.applied_timeout {
            if let Some(t) = timeout {
                self.handle()?
                    .busy_timeout(t)
                    .map_err(|e| query_error(e, "PRAGMA busy_timeout"))?;
            }
            self.applied_timeout = timeout;
        }
        tracing::debug!(
            connection = self.id,
            sql = %command.sql,
            params = command.parameters.len(),
            "Executing command"
        );
        Ok(())
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        tracing::trace!(connection = self.id, sql, "Executing batch");
        self.handle()?
            .execute_batch(sql)
            .map_err(|e| query_error(e, sql))
    }
}

/// Bind every parameter of `command` onto `stmt`.
///
/// Named parameters are matched by name, trying the common prefixes when the
/// name has none; positional ones fill `?` slots in order.
fn bind_parameters(stmt: &mut Statement<'_>, command: &DbCommand) -> rusqlite::Result<()> {
    let mut next_positional = 1;
    for param in &command.parameters {
        let value = to_sqlite(&param.value);
        if param.is_positional() {
            stmt.raw_bind_parameter(next_positional, value)?;
            next_positional += 1;
            continue;
        }
        let index = if param.name.starts_with(['@', ':', '$']) {
            stmt.parameter_index(&param.name)?
        } else {
            ["@", ":", "$"]
                .iter()
                .map(|prefix| stmt.parameter_index(&format!("{prefix}{}", param.name)))
                .find_map(|r| r.transpose())
                .transpose()?
        };
        match index {
            Some(i) => stmt.raw_bind_parameter(i, value)?,
            None => tracing::trace!(name = %param.name, "Parameter not referenced by statement"),
        }
    }
    Ok(())
}

impl DbConnection for SqliteConnection {
    fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = match &self.config.path {
            DatabasePath::Memory => Connection::open_in_memory(),
            DatabasePath::File(path) => Connection::open(path),
        }
        .map_err(|e| connect_error(e, "failed to open sqlite database"))?;

        conn.execute_batch(&self.config.init_sql())
            .map_err(|e| connect_error(e, "failed to initialize sqlite database"))?;
        if let Some(timeout) = self.config.busy_timeout {
            conn.busy_timeout(timeout)
                .map_err(|e| connect_error(e, "failed to set busy timeout"))?;
        }

        tracing::info!(connection = self.id, path = ?self.config.path, "Opened SQLite connection");
        self.applied_timeout = self.config.busy_timeout;
        self.conn = Some(conn);
        self.broken = false;
        self.in_transaction = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.in_transaction = false;
        conn.close().map_err(|(conn, e)| {
            self.conn = Some(conn);
            self.broken = true;
            Error::from(
                ConnectionError::new(ConnectionErrorKind::Disconnect, e.to_string()).with_source(e),
            )
        })?;
        tracing::info!(connection = self.id, "Closed SQLite connection");
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        match (&self.conn, self.broken) {
            (_, true) => ConnectionState::Broken,
            (Some(_), false) => ConnectionState::Open,
            (None, false) => ConnectionState::Closed,
        }
    }

    fn begin_transaction(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        if self.in_transaction {
            return Err(QueryError::new(
                QueryErrorKind::Transaction,
                "a transaction is already active on this connection",
            )
            .into());
        }
        // SQLite transactions are always serializable; the isolation level
        // only decides whether the write lock is taken up front.
        let sql = match isolation {
            Some(IsolationLevel::Serializable | IsolationLevel::RepeatableRead) => "BEGIN IMMEDIATE",
            _ => "BEGIN DEFERRED",
        };
        self.batch(sql)?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(QueryError::new(QueryErrorKind::Transaction, "no active transaction").into());
        }
        self.batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(QueryError::new(QueryErrorKind::Transaction, "no active transaction").into());
        }
        let result = self.batch("ROLLBACK");
        self.in_transaction = false;
        result
    }

    fn execute_non_query(&mut self, command: &DbCommand) -> Result<u64> {
        self.prepare_command(command)?;
        let conn = self.handle()?;
        let mut stmt = conn
            .prepare(&command.sql)
            .map_err(|e| query_error(e, &command.sql))?;
        bind_parameters(&mut stmt, command).map_err(|e| query_error(e, &command.sql))?;
        let affected = stmt
            .raw_execute()
            .map_err(|e| query_error(e, &command.sql))?;
        Ok(affected as u64)
    }

    fn execute_reader(&mut self, command: &DbCommand) -> Result<ResultSet> {
        self.prepare_command(command)?;
        let conn = self.handle()?;
        let mut stmt = conn
            .prepare(&command.sql)
            .map_err(|e| query_error(e, &command.sql))?;
        bind_parameters(&mut stmt, command).map_err(|e| query_error(e, &command.sql))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next().map_err(|e| query_error(e, &command.sql))? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value = row
                    .get_ref(i)
                    .map(from_sqlite)
                    .map_err(|e| query_error(e, &command.sql))?;
                values.push(value);
            }
            rows.push(values);
        }
        tracing::trace!(connection = self.id, rows = rows.len(), "Read result set");
        Ok(ResultSet::new(columns, rows))
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("id", &self.id)
            .field("path", &self.config.path)
            .field("state", &self.state())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}
