//! Core types and traits for slimorm.
//!
//! `slimorm-core` is the **foundation layer** of the workspace. It defines the
//! data types and traits that every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Model`] is implemented by user types (usually through
//!   `#[derive(Model)]`), [`DbDriver`] and [`DbConnection`] by database drivers.
//! - **Metadata**: [`ModelDefinition`] and [`FieldDefinition`] describe how a type
//!   maps to a table. They are computed once per type and cached.
//! - **Data model**: [`Value`], [`Row`] and [`ResultSet`] carry values in and out of
//!   drivers; [`HostType`] and [`DbType`] tag them for dialect type maps.
//! - **Materialization**: [`Materializer`] turns result rows back into models.
//!
//! # Who Uses This Crate
//!
//! - `slimorm-macros` generates `Model` implementations defined here.
//! - `slimorm-dialect` renders SQL from `ModelDefinition` metadata.
//! - `slimorm-session` drives `DbConnection`s and materializes results.
//! - Driver crates (`slimorm-sqlite`) implement `DbDriver`/`DbConnection`.

pub mod connection;
pub mod error;
pub mod field;
pub mod materialize;
pub mod model;
pub mod naming;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{
    CommandType, ConnectionState, DbCommand, DbConnection, DbDriver, IsolationLevel, Parameter,
    ParameterDirection, TransactionHandle,
};
pub use error::{
    ConnectionError, ConnectionErrorKind, ConversionError, Error, QueryError, QueryErrorKind,
    Result,
};
pub use field::{FieldDefinition, ForeignKeyDefinition, ReferentialAction};
pub use materialize::{IndexCache, Materializer, try_guess_column_index};
pub use model::{
    CompositeIndex, FieldAccessor, FieldValues, Instance, Model, ModelDefinition, ModelMetadata,
    cached_model_count, model_definition, model_metadata,
};
pub use naming::{
    LowercaseUnderscoreNaming, NamingStrategy, PassThroughNaming, PrefixTableNaming,
    UpperCaseNaming,
};
pub use row::{DataReader, ResultSet, Row};
pub use types::{DbType, FieldType, HostType, SqlField};
pub use value::Value;
