//! PostgreSQL dialect for slimorm.
//!
//! This crate only renders SQL; pair it with any [`DbDriver`] that speaks
//! PostgreSQL. It provides:
//!
//! - `SERIAL` / `BIGSERIAL` auto-increment keys and `LASTVAL()` identity retrieval
//! - Native `BOOLEAN`, `UUID`, `BYTEA` and `JSONB` column types
//! - Sequence creation for fields backed by a named sequence
//! - Catalog lookups for table and sequence existence
//! - Stored procedure calls as `SELECT * FROM "proc"(...)`
//!
//! [`DbDriver`]: slimorm_core::DbDriver

use std::fmt::Write;

use slimorm_core::{
    DbCommand, DbConnection, DbType, Error, FieldDefinition, FieldValues, HostType,
    ModelDefinition, Parameter, Result,
};
use slimorm_dialect::{
    DialectProvider, DialectSettings, StringColumnTemplate, TypeMap, base_type_map, ddl,
};

/// SQLSTATE codes reporting that a created object already exists.
const ALREADY_EXISTS_CODES: &[&str] = &["42P07", "42P06", "42710"];

#[derive(Debug)]
pub struct PostgresDialect {
    settings: DialectSettings,
    type_map: TypeMap,
}

impl PostgresDialect {
    pub fn new() -> Self {
        let type_map = base_type_map()
            .map(HostType::Bool, DbType::Boolean, "BOOLEAN")
            .map(HostType::Bytes, DbType::Binary, "BYTEA")
            .map(HostType::Uuid, DbType::Guid, "UUID")
            .map(HostType::Json, DbType::String, "JSONB")
            .map(HostType::Decimal, DbType::Decimal, "NUMERIC(38,6)")
            .build();
        Self {
            // no separate national character type
            settings: DialectSettings::new(StringColumnTemplate::new("VARCHAR({})", "VARCHAR({})")),
            type_map,
        }
    }

    fn count_catalog(&self, conn: &mut dyn DbConnection, name: &str, relkind: &str) -> Result<bool> {
        let cmd = DbCommand::new(format!(
            "SELECT COUNT(*) FROM pg_class WHERE relname = {} AND relkind = '{relkind}'",
            self.param_name("name")
        ))
        .parameters(vec![Parameter::named(self.param_name("name"), name)]);
        let count = conn.execute_scalar(&cmd)?;
        let found = count.as_i64().is_some_and(|n| n > 0);
        tracing::debug!(name, relkind, found, "Checked pg_class");
        Ok(found)
    }

    fn sequence_default(&self, sequence: &str) -> String {
        format!(
            "nextval('{}')",
            self.quote_identifier(sequence).replace('\'', "''")
        )
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectProvider for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len() * 2 + 12);
        out.push_str("'\\x");
        for b in bytes {
            let _ = write!(out, "{b:02x}");
        }
        out.push_str("'::bytea");
        out
    }

    /// Serial types carry the auto-increment themselves.
    fn auto_increment_definition(&self) -> &'static str {
        ""
    }

    fn column_type(&self, field: &FieldDefinition) -> Result<String> {
        if field.is_primary_key && field.auto_increment {
            let wide = matches!(
                field.field_type.host,
                HostType::I64 | HostType::U32 | HostType::U64
            );
            return Ok(if wide { "BIGSERIAL" } else { "SERIAL" }.to_string());
        }
        ddl::column_type(self, field)
    }

    fn column_definition(&self, field: &FieldDefinition) -> Result<String> {
        let mut sql = ddl::column_definition(self, field)?;
        if let (Some(sequence), None) = (field.sequence, field.default_value) {
            let _ = write!(sql, " DEFAULT {}", self.sequence_default(sequence));
        }
        Ok(sql)
    }

    fn limit_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        match (limit, offset) {
            (None, Some(o)) => format!("OFFSET {o}"),
            _ => slimorm_dialect::dml::limit_clause(limit, offset),
        }
    }

    fn select_identity_sql(&self) -> Option<&'static str> {
        Some("SELECT LASTVAL()")
    }

    fn to_execute_procedure_statement(&self, def: &ModelDefinition, obj: &dyn FieldValues) -> Result<String> {
        let args = def
            .field_definitions
            .iter()
            .map(|f| self.quoted_field_value(f, &obj.value_of(f)))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "SELECT * FROM {}({})",
            self.quoted_table_name(def),
            args.join(", ")
        ))
    }

    fn to_create_sequence_statements(&self, def: &ModelDefinition) -> Result<Vec<String>> {
        Ok(def
            .field_definitions
            .iter()
            .filter_map(|f| f.sequence)
            .map(|seq| format!("CREATE SEQUENCE {}", self.quote_identifier(seq)))
            .collect())
    }

    /// PostgreSQL alters type, nullability and default in separate
    /// actions. Serial keys keep their sequence default.
    fn to_alter_column_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        let column = self.quoted_column_name(field.field_name);
        let serial = field.is_primary_key && field.auto_increment;
        let mut actions = vec![format!(
            "ALTER COLUMN {column} TYPE {}",
            ddl::column_type(self, field)?
        )];
        if field.is_nullable && !field.is_primary_key {
            actions.push(format!("ALTER COLUMN {column} DROP NOT NULL"));
        } else {
            actions.push(format!("ALTER COLUMN {column} SET NOT NULL"));
        }
        match (field.default_value, field.sequence) {
            (Some(default), _) => actions.push(format!("ALTER COLUMN {column} SET DEFAULT {default}")),
            (None, Some(sequence)) => actions.push(format!(
                "ALTER COLUMN {column} SET DEFAULT {}",
                self.sequence_default(sequence)
            )),
            (None, None) if !serial => actions.push(format!("ALTER COLUMN {column} DROP DEFAULT")),
            (None, None) => {}
        }
        Ok(format!(
            "ALTER TABLE {} {}",
            self.quoted_table_name(def),
            actions.join(", ")
        ))
    }

    fn does_table_exist(&self, conn: &mut dyn DbConnection, table_name: &str) -> Result<bool> {
        self.count_catalog(conn, table_name, "r")
    }

    fn does_sequence_exist(&self, conn: &mut dyn DbConnection, sequence_name: &str) -> Result<bool> {
        self.count_catalog(conn, sequence_name, "S")
    }

    fn is_already_exists_error(&self, err: &Error) -> bool {
        if let Some(code) = err.code().filter(|code| ALREADY_EXISTS_CODES.contains(code)) {
            tracing::debug!(code, "Object already exists");
            return true;
        }
        err.is_already_exists()
    }
}
