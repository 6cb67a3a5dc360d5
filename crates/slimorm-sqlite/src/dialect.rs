//! SQLite flavor of SQL generation.

use slimorm_core::{
    DbCommand, DbConnection, DbType, Error, FieldDefinition, HostType, ModelDefinition, Parameter,
    Result,
};
use slimorm_dialect::{DialectProvider, DialectSettings, TypeMap, base_type_map, ddl};

/// SQLite dialect.
///
/// Integers of every width share the `INTEGER` storage class, so an
/// auto-increment key always renders as `INTEGER PRIMARY KEY AUTOINCREMENT`
/// regardless of the host type. SQLite cannot alter a column in place or add
/// a foreign key to an existing table; those builders fail with
/// [`Error::NotImplemented`].
#[derive(Debug)]
pub struct SqliteDialect {
    settings: DialectSettings,
    type_map: TypeMap,
}

impl SqliteDialect {
    pub fn new() -> Self {
        let type_map = base_type_map()
            .map(HostType::Bool, DbType::Boolean, "INTEGER")
            .map(HostType::I8, DbType::Byte, "INTEGER")
            .map(HostType::I16, DbType::Int16, "INTEGER")
            .map(HostType::I32, DbType::Int32, "INTEGER")
            .map(HostType::I64, DbType::Int64, "INTEGER")
            .map(HostType::U8, DbType::Byte, "INTEGER")
            .map(HostType::U16, DbType::UInt16, "INTEGER")
            .map(HostType::U32, DbType::UInt32, "INTEGER")
            .map(HostType::U64, DbType::UInt64, "INTEGER")
            .map(HostType::F32, DbType::Single, "REAL")
            .map(HostType::F64, DbType::Double, "REAL")
            .map(HostType::Decimal, DbType::Decimal, "NUMERIC")
            .map(HostType::DateTime, DbType::DateTime, "DATETIME")
            .build();
        Self {
            settings: DialectSettings::default(),
            type_map,
        }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectProvider for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn column_type(&self, field: &FieldDefinition) -> Result<String> {
        if field.is_primary_key && field.auto_increment {
            return Ok("INTEGER".to_string());
        }
        ddl::column_type(self, field)
    }

    fn select_identity_sql(&self) -> Option<&'static str> {
        Some("SELECT last_insert_rowid()")
    }

    fn to_alter_column_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        Err(Error::NotImplemented(format!(
            "sqlite cannot alter column {}.{} in place",
            def.model_name, field.field_name
        )))
    }

    fn to_add_foreign_key_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        Err(Error::NotImplemented(format!(
            "sqlite cannot add foreign key on {}.{} to an existing table",
            def.model_name, field.field_name
        )))
    }

    fn does_table_exist(&self, conn: &mut dyn DbConnection, table_name: &str) -> Result<bool> {
        let cmd = DbCommand::new(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = @name",
        )
        .parameters(vec![Parameter::named("@name", table_name)]);
        let count = conn.execute_scalar(&cmd)?;
        Ok(count.as_i64().is_some_and(|n| n > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slimorm_core::{FieldAccessor, Model, SqlField, model_definition};

    #[derive(Debug, Default)]
    struct Note {
        id: i32,
        body: String,
        score: f64,
    }

    impl Model for Note {
        const MODEL_NAME: &'static str = "Note";

        fn fields() -> Vec<FieldDefinition> {
            vec![
                FieldDefinition::new("id", i32::field_type())
                    .alias("Id")
                    .auto_increment(true),
                FieldDefinition::new("body", String::field_type()).alias("Body"),
                FieldDefinition::new("score", f64::field_type()).alias("Score"),
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
                    |m| m.body.to_value(),
                    |m, v| {
                        m.body = String::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.score.to_value(),
                    |m, v| {
                        m.score = f64::from_value(v)?;
                        Ok(())
                    },
                ),
            ]
        }
    }

    #[test]
    fn test_create_table() {
        let d = SqliteDialect::new();
        let def = model_definition::<Note>();
        assert_eq!(
            d.to_create_table_statement(&def).unwrap(),
            "CREATE TABLE \"Note\" \n(\n  \
             \"Id\" INTEGER PRIMARY KEY AUTOINCREMENT, \n  \
             \"Body\" VARCHAR(8000) NOT NULL, \n  \
             \"Score\" REAL NOT NULL\n)"
        );
    }

    #[test]
    fn test_identity_and_unsupported_alters() {
        let d = SqliteDialect::new();
        assert_eq!(d.last_insert_id_sql().unwrap(), "SELECT last_insert_rowid()");

        let def = model_definition::<Note>();
        let body = def.field("body").unwrap();
        assert!(matches!(
            d.to_alter_column_statement(&def, body),
            Err(Error::NotImplemented(_))
        ));
        assert!(matches!(
            d.to_add_foreign_key_statement(&def, body),
            Err(Error::NotImplemented(_))
        ));
        assert_eq!(
            d.to_change_column_name_statement(&def, body, "Text").unwrap(),
            "ALTER TABLE \"Note\" RENAME COLUMN \"Text\" TO \"Body\""
        );
    }

    #[test]
    fn test_procedures_not_supported() {
        let d = SqliteDialect::new();
        let def = model_definition::<Note>();
        let meta = slimorm_core::model_metadata::<Note>();
        let note = Note::default();
        assert!(matches!(
            d.to_execute_procedure_statement(&def, &meta.instance(&note)),
            Err(Error::NotImplemented(_))
        ));
    }
}
