//! SQLite support for slimorm.
//!
//! - [`SqliteDialect`]: SQL generation for SQLite.
//! - [`SqliteDriver`] / [`SqliteConnection`]: a synchronous driver on top of
//!   `rusqlite`, with the SQLite library bundled.
//! - [`SqliteConfig`]: connection string parsing and open-time pragmas.
//!
//! ```no_run
//! use slimorm_core::{DbCommand, DbConnection, DbDriver};
//! use slimorm_sqlite::SqliteDriver;
//!
//! let mut conn = SqliteDriver.connect("sqlite::memory:")?;
//! conn.open()?;
//! conn.execute_non_query(&DbCommand::new("CREATE TABLE t (x INTEGER)"))?;
//! # Ok::<(), slimorm_core::Error>(())
//! ```

pub mod config;
pub mod connection;
pub mod convert;
pub mod dialect;

pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use connection::{SqliteConnection, SqliteDriver};
pub use dialect::SqliteDialect;
