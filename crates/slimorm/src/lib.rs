//! slimorm: a thin, dialect-driven object-relational mapper.
//!
//! Models are plain structs deriving [`Model`]. Their metadata is computed
//! once and cached; a [`DialectProvider`] turns it into SQL; an
//! [`OrmConnection`] runs that SQL and maps rows back to models.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use slimorm::prelude::*;
//!
//! #[derive(Debug, Default, Model)]
//! struct Hero {
//!     #[orm(primary_key, auto_increment)]
//!     id: i64,
//!     #[orm(length = 100)]
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let factory = OrmConnectionFactory::new("sqlite::memory:", Arc::new(SqliteDriver))
//!     .dialect(Arc::new(SqliteDialect::new()));
//! let mut conn = factory.open_db_connection()?;
//! conn.create_table::<Hero>(false)?;
//!
//! let mut hero = Hero { name: "Deadpond".into(), ..Hero::default() };
//! conn.save(&mut hero)?;
//! let found: Vec<Hero> = conn.select_where("name = {0}", &["Deadpond".into()])?;
//! # Ok::<(), slimorm::Error>(())
//! ```
//!
//! The derive expands to paths under `slimorm_core`, so crates deriving
//! `Model` also depend on `slimorm-core` directly.
//!
//! # Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `slimorm-core` | `Model`, metadata cache, `Value`, naming strategies, materializer, driver traits |
//! | `slimorm-macros` | `#[derive(Model)]` |
//! | `slimorm-dialect` | `DialectProvider`, type map, SQL builders, ANSI dialect |
//! | `slimorm-session` | connection wrapper, transactions, ambient overrides, CRUD/DDL API |
//! | `slimorm-sqlite` | SQLite driver and dialect (feature `sqlite`, on by default) |
//! | `slimorm-postgres` | PostgreSQL dialect (feature `postgres`) |

pub use slimorm_dialect as dialect;
pub use slimorm_session as session;

pub use slimorm_core::{
    ConnectionState, DbCommand, DbConnection, DbDriver, Error, FieldDefinition, IsolationLevel,
    Model, ModelDefinition, NamingStrategy, Result, ResultSet, Row, SqlField, TransactionHandle,
    Value, model_definition, model_metadata,
};
pub use slimorm_dialect::{AnsiDialect, DialectProvider};
pub use slimorm_macros::Model;
pub use slimorm_session::{OrmConnection, OrmConnectionFactory, OrmTransaction, ambient};

#[cfg(feature = "postgres")]
pub use slimorm_postgres::{self as postgres, PostgresDialect};
#[cfg(feature = "sqlite")]
pub use slimorm_sqlite::{self as sqlite, SqliteDialect, SqliteDriver};

/// Everything needed to declare models and run queries.
pub mod prelude {
    pub use slimorm_core::{
        DbConnection, Error, IsolationLevel, LowercaseUnderscoreNaming, Model, NamingStrategy,
        PassThroughNaming, Result, Value,
    };
    pub use slimorm_dialect::DialectProvider;
    pub use slimorm_macros::Model;
    pub use slimorm_session::{OrmConnection, OrmConnectionFactory, OrmTransaction, ambient};

    #[cfg(feature = "postgres")]
    pub use slimorm_postgres::PostgresDialect;
    #[cfg(feature = "sqlite")]
    pub use slimorm_sqlite::{SqliteDialect, SqliteDriver};
}
