//! Procedural macros for slimorm.
//!
//! `#[derive(Model)]` emits a `slimorm_core::Model` implementation: the table
//! name, one `FieldDefinition` per field, the getter/setter accessor table and
//! any composite indexes. Nothing else is generated; all SQL is rendered at
//! runtime by the dialect from this metadata.
//!
//! Generated code refers to `::slimorm_core`, so crates using the derive must
//! depend on `slimorm-core` directly (the `slimorm` facade re-exports it).
//!
//! # Attributes
//!
//! Struct level, `#[orm(...)]`:
//!
//! - `table = "Name"`: table name before the naming strategy (defaults to the struct name)
//! - `index(fields(a, b), unique, name = "ix")`: composite index, repeatable
//!
//! Field level, `#[orm(...)]`:
//!
//! - `primary_key`, `auto_increment`, `ignore`, `computed`, `nullable`
//! - `alias = "Column"`
//! - `length = 200`, `scale = 2`
//! - `default = "0"` (SQL expression)
//! - `index`, `unique`
//! - `sequence = "seq_name"`
//! - `json`: store through the JSON text form (`Serialize + DeserializeOwned + Default`)
//! - `references = OtherModel`, `on_delete = "cascade"`, `on_update = "..."`, `fk_name = "..."`
//!
//! ```ignore
//! #[derive(Debug, Default, Model)]
//! #[orm(table = "Post", index(fields(author_id, views)))]
//! struct Post {
//!     #[orm(alias = "Id", auto_increment)]
//!     id: i64,
//!     #[orm(alias = "Title", length = 200, index)]
//!     title: String,
//!     #[orm(alias = "AuthorId", references = Author, on_delete = "cascade")]
//!     author_id: i64,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod model_derive;

/// Derive `slimorm_core::Model`.
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match model_derive::parse_model(&input) {
        Ok(def) => model_derive::generate_model_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
