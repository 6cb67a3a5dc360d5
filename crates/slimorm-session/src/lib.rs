//! Connections, transactions and the model-level API for slimorm.
//!
//! `slimorm-session` is the layer applications talk to:
//!
//! - [`OrmConnectionFactory`] opens [`OrmConnection`]s from a driver and a
//!   connection string, wiring in the dialect, command timeout, connection
//!   filter and dispose hook.
//! - [`OrmConnection`] wraps a driver connection. Every command it runs picks
//!   up the effective timeout and the open transaction, and it carries the
//!   typed CRUD, DDL and raw-SQL operations (`select`, `insert`, `save`,
//!   `create_table`, `query`, ...).
//! - [`OrmTransaction`] is a scoped transaction; nested scopes use savepoints.
//! - [`ambient`] holds the process-wide dialect and the per-thread overrides.
//!
//! ```no_run
//! use std::sync::Arc;
//! use slimorm_session::OrmConnectionFactory;
//! use slimorm_sqlite::{SqliteDialect, SqliteDriver};
//!
//! let factory = OrmConnectionFactory::new("sqlite::memory:", Arc::new(SqliteDriver))
//!     .dialect(Arc::new(SqliteDialect::new()));
//! let mut conn = factory.open_db_connection()?;
//! let tx = conn.transaction()?;
//! tx.commit()?;
//! # Ok::<(), slimorm_core::Error>(())
//! ```

pub mod ambient;
pub mod ext;
pub mod transaction;
pub mod wrapper;

pub use transaction::OrmTransaction;
pub use wrapper::{
    ConnectionFilter, DEFAULT_COMMAND_TIMEOUT, DisposeHook, OrmConnection, OrmConnectionFactory,
};
