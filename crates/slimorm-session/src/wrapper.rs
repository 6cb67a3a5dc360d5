//! Connection wrapper and factory.
//!
//! [`OrmConnection`] decorates a driver connection. It forwards every call
//! while stamping the effective timeout and the open transaction onto each
//! command, runs the connection filter once after the first successful
//! open, and runs the dispose hook before the driver connection is closed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use slimorm_core::{
    ConnectionError, ConnectionErrorKind, ConnectionState, DbCommand, DbConnection, DbDriver,
    IsolationLevel, ResultSet, Result, TransactionHandle, Value,
};
use slimorm_dialect::DialectProvider;

use crate::ambient;

/// Command timeout used when neither the thread nor the connection sets one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Replaces the driver connection right after it is first opened, e.g. with
/// an instrumented decorator.
pub type ConnectionFilter = Arc<dyn Fn(Box<dyn DbConnection>) -> Box<dyn DbConnection> + Send + Sync>;

/// Called with the driver connection just before it is closed.
pub type DisposeHook = Arc<dyn Fn(&mut dyn DbConnection) + Send + Sync>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_transaction_id() -> u64 {
    NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Factory
// ============================================================================

/// Creates [`OrmConnection`]s for one connection string.
#[derive(Clone)]
pub struct OrmConnectionFactory {
    connection_string: String,
    driver: Arc<dyn DbDriver>,
    dialect: Option<Arc<dyn DialectProvider>>,
    command_timeout: Option<Duration>,
    connection_filter: Option<ConnectionFilter>,
    on_dispose: Option<DisposeHook>,
    auto_dispose_connection: bool,
}

impl OrmConnectionFactory {
    pub fn new(connection_string: impl Into<String>, driver: Arc<dyn DbDriver>) -> Self {
        Self {
            connection_string: connection_string.into(),
            driver,
            dialect: None,
            command_timeout: None,
            connection_filter: None,
            on_dispose: None,
            auto_dispose_connection: true,
        }
    }

    /// Dialect for connections from this factory. Without one they use the
    /// ambient dialect.
    pub fn dialect(mut self, dialect: Arc<dyn DialectProvider>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn connection_filter(
        mut self,
        filter: impl Fn(Box<dyn DbConnection>) -> Box<dyn DbConnection> + Send + Sync + 'static,
    ) -> Self {
        self.connection_filter = Some(Arc::new(filter));
        self
    }

    pub fn on_dispose(mut self, hook: impl Fn(&mut dyn DbConnection) + Send + Sync + 'static) -> Self {
        self.on_dispose = Some(Arc::new(hook));
        self
    }

    /// When `false`, closing a wrapper runs the dispose hook but leaves the
    /// driver connection open for its external owner.
    pub fn auto_dispose_connection(mut self, auto_dispose: bool) -> Self {
        self.auto_dispose_connection = auto_dispose;
        self
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Create a wrapper around a new, unopened driver connection.
    pub fn create_db_connection(&self) -> Result<OrmConnection> {
        let inner = self.driver.connect(&self.connection_string)?;
        let mut conn = OrmConnection::new(inner);
        conn.dialect.clone_from(&self.dialect);
        conn.command_timeout = self.command_timeout;
        conn.connection_filter.clone_from(&self.connection_filter);
        conn.on_dispose.clone_from(&self.on_dispose);
        conn.auto_dispose_connection = self.auto_dispose_connection;
        Ok(conn)
    }

    /// Create and open a connection.
    pub fn open_db_connection(&self) -> Result<OrmConnection> {
        let mut conn = self.create_db_connection()?;
        conn.open()?;
        Ok(conn)
    }
}

impl fmt::Debug for OrmConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrmConnectionFactory")
            .field("driver", &self.driver.name())
            .field("dialect", &self.dialect.as_ref().map(|d| d.name()))
            .field("command_timeout", &self.command_timeout)
            .field("auto_dispose_connection", &self.auto_dispose_connection)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Wrapper
// ============================================================================

/// A driver connection with timeouts, transaction tracking and hooks.
///
/// `OrmConnection` implements [`DbConnection`] itself, so it can be passed
/// anywhere a raw connection is accepted; commands executed through it get
/// the effective timeout and the open transaction attached. The extension
/// API (`select`, `insert`, `create_table`, ...) lives in [`crate::ext`].
pub struct OrmConnection {
    id: u64,
    pub(crate) inner: Box<dyn DbConnection>,
    pub(crate) dialect: Option<Arc<dyn DialectProvider>>,
    command_timeout: Option<Duration>,
    connection_filter: Option<ConnectionFilter>,
    on_dispose: Option<DisposeHook>,
    auto_dispose_connection: bool,
    filtered: bool,
    disposed: bool,
    pub(crate) transaction: Option<TransactionHandle>,
}

impl OrmConnection {
    /// Wrap an existing driver connection, open or not.
    pub fn new(inner: Box<dyn DbConnection>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            inner,
            dialect: None,
            command_timeout: None,
            connection_filter: None,
            on_dispose: None,
            auto_dispose_connection: true,
            filtered: false,
            disposed: false,
            transaction: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Arc<dyn DialectProvider>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn with_auto_dispose(mut self, auto_dispose: bool) -> Self {
        self.auto_dispose_connection = auto_dispose;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The thread override, else this connection's dialect, else the global one.
    pub fn dialect(&self) -> Result<Arc<dyn DialectProvider>> {
        if let Some(dialect) = ambient::thread_dialect() {
            return Ok(dialect);
        }
        match &self.dialect {
            Some(dialect) => Ok(Arc::clone(dialect)),
            None => ambient::current_dialect(),
        }
    }

    pub fn set_command_timeout(&mut self, timeout: Option<Duration>) {
        self.command_timeout = timeout;
    }

    /// Thread override, else this connection's timeout, else
    /// [`DEFAULT_COMMAND_TIMEOUT`].
    pub fn command_timeout(&self) -> Duration {
        ambient::command_timeout_override()
            .or(self.command_timeout)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
    }

    /// The transaction open on this connection, if any.
    pub fn current_transaction(&self) -> Option<TransactionHandle> {
        self.transaction
    }

    /// A text command with the effective timeout and open transaction attached.
    pub fn create_command(&self, sql: impl Into<String>) -> DbCommand {
        self.prepare(DbCommand::new(sql))
    }

    /// Fill in the timeout and transaction on a command built elsewhere.
    /// Values already present on the command are kept.
    pub fn prepare(&self, mut command: DbCommand) -> DbCommand {
        if command.timeout.is_none() {
            command.timeout = Some(self.command_timeout());
        }
        if command.transaction.is_none() {
            command.transaction = self.transaction;
        }
        command
    }

    /// The wrapped driver connection.
    pub fn inner(&self) -> &dyn DbConnection {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> &mut dyn DbConnection {
        self.inner.as_mut()
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        if let Some(hook) = &self.on_dispose {
            hook(self.inner.as_mut());
        }
        if !self.auto_dispose_connection {
            tracing::debug!(connection = self.id, "Leaving externally owned connection open");
            return Ok(());
        }
        self.transaction = None;
        tracing::debug!(connection = self.id, "Closing connection");
        self.inner.close()
    }
}

impl DbConnection for OrmConnection {
    /// Open the driver connection. Opening an open wrapper does nothing.
    fn open(&mut self) -> Result<()> {
        if self.inner.state() == ConnectionState::Open {
            tracing::trace!(connection = self.id, "Connection already open");
            return Ok(());
        }
        self.inner.open()?;
        self.disposed = false;
        if !self.filtered {
            self.filtered = true;
            if let Some(filter) = &self.connection_filter {
                let inner = std::mem::replace(&mut self.inner, Box::new(Detached));
                self.inner = filter(inner);
                tracing::debug!(connection = self.id, "Connection filter applied");
            }
        }
        tracing::debug!(connection = self.id, "Connection opened");
        Ok(())
    }

    /// Run the dispose hook, then close the driver connection unless it is
    /// externally owned.
    fn close(&mut self) -> Result<()> {
        self.dispose()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Begin a driver transaction without touching the ambient slot. Prefer
    /// [`OrmConnection::transaction`] for scoped use.
    fn begin_transaction(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        self.inner.begin_transaction(isolation)?;
        self.transaction = Some(TransactionHandle {
            id: next_transaction_id(),
            connection_id: self.id,
            depth: 0,
            isolation,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()?;
        self.transaction = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let result = self.inner.rollback();
        self.transaction = None;
        result
    }

    fn savepoint(&mut self, name: &str) -> Result<()> {
        self.inner.savepoint(name)
    }

    fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.inner.release_savepoint(name)
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.inner.rollback_to_savepoint(name)
    }

    fn execute_non_query(&mut self, command: &DbCommand) -> Result<u64> {
        let command = self.prepare(command.clone());
        tracing::trace!(connection = self.id, sql = %command.sql, timeout = ?command.timeout, "Execute");
        self.inner.execute_non_query(&command)
    }

    fn execute_reader(&mut self, command: &DbCommand) -> Result<ResultSet> {
        let command = self.prepare(command.clone());
        tracing::trace!(connection = self.id, sql = %command.sql, timeout = ?command.timeout, "Query");
        self.inner.execute_reader(&command)
    }

    fn execute_scalar(&mut self, command: &DbCommand) -> Result<Value> {
        let command = self.prepare(command.clone());
        tracing::trace!(connection = self.id, sql = %command.sql, timeout = ?command.timeout, "Scalar");
        self.inner.execute_scalar(&command)
    }
}

impl Drop for OrmConnection {
    fn drop(&mut self) {
        if self.inner.state() == ConnectionState::Closed {
            return;
        }
        if let Err(e) = self.dispose() {
            tracing::warn!(connection = self.id, error = %e, "Failed to close connection on drop");
        }
    }
}

impl fmt::Debug for OrmConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrmConnection")
            .field("id", &self.id)
            .field("state", &self.inner.state())
            .field("dialect", &self.dialect.as_ref().map(|d| d.name()))
            .field("command_timeout", &self.command_timeout)
            .field("transaction", &self.transaction)
            .field("auto_dispose_connection", &self.auto_dispose_connection)
            .finish_non_exhaustive()
    }
}

/// Stand-in held only while the connection filter runs.
struct Detached;

impl Detached {
    fn error() -> slimorm_core::Error {
        ConnectionError::new(ConnectionErrorKind::NotOpen, "connection is being replaced").into()
    }
}

impl DbConnection for Detached {
    fn open(&mut self) -> Result<()> {
        Err(Self::error())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::Closed
    }

    fn begin_transaction(&mut self, _isolation: Option<IsolationLevel>) -> Result<()> {
        Err(Self::error())
    }

    fn commit(&mut self) -> Result<()> {
        Err(Self::error())
    }

    fn rollback(&mut self) -> Result<()> {
        Err(Self::error())
    }

    fn execute_non_query(&mut self, _command: &DbCommand) -> Result<u64> {
        Err(Self::error())
    }

    fn execute_reader(&mut self, _command: &DbCommand) -> Result<ResultSet> {
        Err(Self::error())
    }
}
