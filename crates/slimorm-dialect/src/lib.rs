//! SQL generation for slimorm.
//!
//! `slimorm-dialect` turns [`ModelDefinition`](slimorm_core::ModelDefinition)
//! metadata into SQL text. It never talks to a database itself, apart from the
//! existence checks which run through a borrowed
//! [`DbConnection`](slimorm_core::DbConnection).
//!
//! # Layout
//!
//! - [`DialectProvider`]: the object-safe capability trait. Its default methods
//!   render ANSI SQL through the free functions below.
//! - [`quote`]: identifier and literal quoting, parameter creation.
//! - [`sniff`]: full-statement detection and `{0}` literal substitution.
//! - [`dml`]: SELECT, COUNT, INSERT, UPDATE and DELETE builders.
//! - [`ddl`]: CREATE/ALTER/DROP builders and the single column-definition routine.
//! - [`DialectSettings`] and [`TypeMap`]: per-provider configuration.
//!
//! Concrete providers live in the driver crates (`slimorm-sqlite`,
//! `slimorm-postgres`); [`AnsiDialect`] uses the defaults unchanged.

pub mod ansi;
pub mod ddl;
pub mod dml;
pub mod provider;
pub mod quote;
pub mod settings;
pub mod sniff;
pub mod type_map;

pub use ansi::AnsiDialect;
pub use provider::DialectProvider;
pub use settings::{DEFAULT_PARAM_PREFIX, DEFAULT_STRING_LENGTH, DialectSettings, StringColumnTemplate};
pub use sniff::{is_full_delete_statement, is_full_select_statement};
pub use type_map::{Resolved, TypeMap, TypeMapBuilder, TypeMapping, base_type_map};

#[cfg(test)]
pub(crate) mod test_models {
    //! Hand-written models shared by the rendering tests.

    use std::sync::Arc;

    use slimorm_core::{
        CompositeIndex, FieldAccessor, FieldDefinition, FieldType, ForeignKeyDefinition, HostType,
        Model, ModelDefinition, ReferentialAction, SqlField, Value, model_definition,
    };

    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Author {
        pub id: i64,
        pub name: String,
    }

    impl Model for Author {
        const MODEL_NAME: &'static str = "Author";

        fn fields() -> Vec<FieldDefinition> {
            vec![
                FieldDefinition::new("id", i64::field_type())
                    .alias("Id")
                    .auto_increment(true),
                FieldDefinition::new("name", String::field_type())
                    .alias("Name")
                    .length(100),
            ]
        }

        fn accessors() -> Vec<FieldAccessor<Self>> {
            vec![
                FieldAccessor::<Self>::new(
                    |m| m.id.to_value(),
                    |m, v| {
                        m.id = i64::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.name.to_value(),
                    |m, v| {
                        m.name = String::from_value(v)?;
                        Ok(())
                    },
                ),
            ]
        }
    }

    fn author_definition() -> Arc<ModelDefinition> {
        model_definition::<Author>()
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Post {
        pub id: i64,
        pub title: String,
        pub views: i32,
        pub author_id: i64,
        pub slug: Option<String>,
        pub rating: Option<f64>,
        pub draft: bool,
    }

    impl Model for Post {
        const MODEL_NAME: &'static str = "Post";

        fn fields() -> Vec<FieldDefinition> {
            vec![
                FieldDefinition::new("id", i64::field_type())
                    .alias("Id")
                    .auto_increment(true),
                FieldDefinition::new("title", String::field_type())
                    .alias("Title")
                    .length(200)
                    .indexed(true),
                FieldDefinition::new("views", i32::field_type())
                    .alias("Views")
                    .default_value("0"),
                FieldDefinition::new("author_id", i64::field_type())
                    .alias("AuthorId")
                    .foreign_key(
                        ForeignKeyDefinition::new(author_definition)
                            .on_delete(ReferentialAction::Cascade),
                    ),
                FieldDefinition::new("slug", <Option<String>>::field_type())
                    .alias("Slug")
                    .nullable(true)
                    .unique(true),
                FieldDefinition::new("rating", <Option<f64>>::field_type())
                    .alias("Rating")
                    .nullable(true),
                FieldDefinition::new("draft", bool::field_type())
                    .alias("Draft")
                    .ignore(true),
            ]
        }

        fn accessors() -> Vec<FieldAccessor<Self>> {
            vec![
                FieldAccessor::<Self>::new(
                    |m| m.id.to_value(),
                    |m, v| {
                        m.id = i64::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.title.to_value(),
                    |m, v| {
                        m.title = String::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.views.to_value(),
                    |m, v| {
                        m.views = i32::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.author_id.to_value(),
                    |m, v| {
                        m.author_id = i64::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.slug.to_value(),
                    |m, v| {
                        m.slug = <Option<String>>::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.rating.to_value(),
                    |m, v| {
                        m.rating = <Option<f64>>::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.draft.to_value(),
                    |m, v| {
                        m.draft = bool::from_value(v)?;
                        Ok(())
                    },
                ),
            ]
        }

        fn composite_indexes() -> Vec<CompositeIndex> {
            vec![CompositeIndex::new(["author_id", "views"])]
        }
    }

    /// A model whose single non-key field has no SQL representation.
    #[derive(Debug, Default)]
    pub struct Shape {
        pub id: i32,
        pub outline: Vec<(i32, i32)>,
    }

    impl Model for Shape {
        const MODEL_NAME: &'static str = "Shape";

        fn fields() -> Vec<FieldDefinition> {
            vec![
                FieldDefinition::new("id", i32::field_type()),
                FieldDefinition::new(
                    "outline",
                    FieldType::new(HostType::Custom, "alloc::vec::Vec<(i32, i32)>"),
                ),
            ]
        }

        fn accessors() -> Vec<FieldAccessor<Self>> {
            vec![
                FieldAccessor::<Self>::new(
                    |m| m.id.to_value(),
                    |m, v| {
                        m.id = i32::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |_| Value::Null,
                    |_, _| Ok(()),
                ),
            ]
        }
    }
}
