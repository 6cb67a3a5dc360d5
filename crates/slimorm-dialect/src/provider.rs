//! The dialect capability trait.

use std::fmt;

use slimorm_core::{
    DbCommand, DbConnection, Error, FieldDefinition, FieldValues, ModelDefinition, Parameter,
    Result, Value,
};

use crate::settings::DialectSettings;
use crate::type_map::TypeMap;
use crate::{ddl, dml, quote, sniff};

/// Everything that differs between SQL dialects.
///
/// A provider only has to supply its name, settings and type map. Every
/// other method has an ANSI-flavored default built from the free functions in
/// [`quote`], [`sniff`], [`dml`] and [`ddl`]; a dialect overrides the points
/// where it deviates (quote character, auto-increment keyword, identity
/// retrieval, existence checks and so on).
///
/// The trait is object safe. Sessions hold an `Arc<dyn DialectProvider>`.
pub trait DialectProvider: fmt::Debug + Send + Sync {
    /// Short identifier, e.g. `"sqlite"`.
    fn name(&self) -> &'static str;

    fn settings(&self) -> &DialectSettings;

    fn type_map(&self) -> &TypeMap;

    // ========================================================================
    // Quoting
    // ========================================================================

    fn quote_identifier(&self, name: &str) -> String {
        quote::quote_identifier(name, '"')
    }

    /// Table name after the naming strategy, quoted.
    fn quoted_table_name(&self, def: &ModelDefinition) -> String {
        let table = self.settings().naming_strategy().table_name(def.model_name);
        self.quote_identifier(&table)
    }

    /// Column name after the naming strategy, quoted.
    fn quoted_column_name(&self, field_name: &str) -> String {
        let column = self.settings().naming_strategy().column_name(field_name);
        self.quote_identifier(&column)
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        quote::hex_literal(bytes)
    }

    fn quoted_value(&self, value: &Value) -> Result<String> {
        quote::quoted_value(self, value)
    }

    fn quoted_field_value(&self, field: &FieldDefinition, value: &Value) -> Result<String> {
        quote::quoted_field_value(self, field, value)
    }

    /// Placeholder for a named parameter, e.g. `@Title`.
    fn param_name(&self, name: &str) -> String {
        format!(
            "{}{}",
            self.settings().param_prefix(),
            quote::param_safe_name(name)
        )
    }

    fn create_parameter(&self, field: &FieldDefinition, value: Value) -> Result<Parameter> {
        quote::create_parameter(self, field, value)
    }

    /// Substitute `{0}`-style placeholders with quoted literals.
    fn sql_fmt(&self, sql: &str, params: &[Value]) -> Result<String> {
        sniff::sql_fmt(self, sql, params)
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Keyword following `PRIMARY KEY` for auto-increment keys.
    fn auto_increment_definition(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn column_type(&self, field: &FieldDefinition) -> Result<String> {
        ddl::column_type(self, field)
    }

    fn column_definition(&self, field: &FieldDefinition) -> Result<String> {
        ddl::column_definition(self, field)
    }

    // ========================================================================
    // DML
    // ========================================================================

    fn select_columns(&self, def: &ModelDefinition) -> String {
        dml::select_columns(self, def)
    }

    fn limit_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        dml::limit_clause(limit, offset)
    }

    fn to_select_statement(&self, def: &ModelDefinition, filter: &str, params: &[Value]) -> Result<String> {
        dml::to_select_statement(self, def, filter, params)
    }

    fn to_select_by_id_statement(&self, def: &ModelDefinition, id: &Value) -> Result<String> {
        dml::to_select_by_id_statement(self, def, id)
    }

    fn to_select_by_ids_statement(&self, def: &ModelDefinition, ids: &[Value]) -> Result<String> {
        dml::to_select_by_ids_statement(self, def, ids)
    }

    fn to_select_param_command(
        &self,
        def: &ModelDefinition,
        filter: &str,
        params: &[(&str, Value)],
    ) -> Result<DbCommand> {
        dml::to_select_param_command(self, def, filter, params)
    }

    fn to_select_by_example_command(
        &self,
        def: &ModelDefinition,
        example: &[(&str, Value)],
    ) -> Result<DbCommand> {
        dml::to_select_by_example_command(self, def, example)
    }

    fn to_count_statement(&self, def: &ModelDefinition, filter: &str, params: &[Value]) -> Result<String> {
        dml::to_count_statement(self, def, filter, params)
    }

    fn to_exists_statement(&self, def: &ModelDefinition, filter: &str, params: &[Value]) -> Result<String> {
        dml::to_exists_statement(self, def, filter, params)
    }

    fn to_insert_row_statement(
        &self,
        def: &ModelDefinition,
        obj: &dyn FieldValues,
        only: Option<&[&str]>,
    ) -> Result<String> {
        dml::to_insert_row_statement(self, def, obj, only)
    }

    fn to_insert_row_command(
        &self,
        def: &ModelDefinition,
        obj: &dyn FieldValues,
        only: Option<&[&str]>,
    ) -> Result<DbCommand> {
        dml::to_insert_row_command(self, def, obj, only)
    }

    fn to_update_row_statement(
        &self,
        def: &ModelDefinition,
        obj: &dyn FieldValues,
        only: Option<&[&str]>,
    ) -> Result<String> {
        dml::to_update_row_statement(self, def, obj, only)
    }

    fn to_update_row_command(
        &self,
        def: &ModelDefinition,
        obj: &dyn FieldValues,
        only: Option<&[&str]>,
    ) -> Result<DbCommand> {
        dml::to_update_row_command(self, def, obj, only)
    }

    fn to_delete_statement(&self, def: &ModelDefinition, filter: &str, params: &[Value]) -> Result<String> {
        dml::to_delete_statement(self, def, filter, params)
    }

    fn to_delete_row_statement(&self, def: &ModelDefinition, obj: &dyn FieldValues) -> Result<String> {
        dml::to_delete_row_statement(self, def, obj)
    }

    fn to_delete_row_command(&self, def: &ModelDefinition, obj: &dyn FieldValues) -> Result<DbCommand> {
        dml::to_delete_row_command(self, def, obj)
    }

    fn to_delete_by_ids_statement(&self, def: &ModelDefinition, ids: &[Value]) -> Result<String> {
        dml::to_delete_by_ids_statement(self, def, ids)
    }

    /// Statement returning the identity generated by the last insert, if the
    /// dialect has one.
    fn select_identity_sql(&self) -> Option<&'static str> {
        None
    }

    fn last_insert_id_sql(&self) -> Result<String> {
        dml::last_insert_id_sql(self)
    }

    /// Call the stored procedure named by `def`, passing every persisted
    /// field of `obj` as an argument.
    fn to_execute_procedure_statement(&self, def: &ModelDefinition, obj: &dyn FieldValues) -> Result<String> {
        let _ = obj;
        Err(Error::NotImplemented(format!(
            "{} cannot execute stored procedure {}",
            self.name(),
            def.model_name
        )))
    }

    // ========================================================================
    // DDL
    // ========================================================================

    fn to_create_table_statement(&self, def: &ModelDefinition) -> Result<String> {
        ddl::to_create_table_statement(self, def)
    }

    fn to_create_index_statements(&self, def: &ModelDefinition) -> Result<Vec<String>> {
        ddl::to_create_index_statements(self, def)
    }

    /// Statements creating the sequences `def` relies on. Empty for
    /// dialects without sequences.
    fn to_create_sequence_statements(&self, def: &ModelDefinition) -> Result<Vec<String>> {
        let _ = def;
        Ok(Vec::new())
    }

    fn to_drop_table_statement(&self, def: &ModelDefinition) -> String {
        ddl::to_drop_table_statement(self, def)
    }

    fn to_add_column_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        ddl::to_add_column_statement(self, def, field)
    }

    fn to_alter_column_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        ddl::to_alter_column_statement(self, def, field)
    }

    fn to_change_column_name_statement(
        &self,
        def: &ModelDefinition,
        field: &FieldDefinition,
        old_column_name: &str,
    ) -> Result<String> {
        ddl::to_change_column_name_statement(self, def, field, old_column_name)
    }

    fn to_add_foreign_key_statement(&self, def: &ModelDefinition, field: &FieldDefinition) -> Result<String> {
        ddl::to_add_foreign_key_statement(self, def, field)
    }

    fn to_create_index_statement(
        &self,
        def: &ModelDefinition,
        field_names: &[&str],
        unique: bool,
        name: Option<&str>,
    ) -> Result<String> {
        ddl::to_create_index_statement(self, def, field_names, unique, name)
    }

    fn to_drop_index_statement(&self, def: &ModelDefinition, index_name: &str) -> String {
        let _ = def;
        ddl::to_drop_index_statement(self, index_name)
    }

    // ========================================================================
    // Existence checks
    // ========================================================================

    /// Whether `table_name` (already passed through the naming strategy)
    /// exists. Dialects without a catalog lookup report `false`.
    fn does_table_exist(&self, conn: &mut dyn DbConnection, table_name: &str) -> Result<bool> {
        let _ = (conn, table_name);
        Ok(false)
    }

    /// Whether a sequence exists. Dialects without sequences report `true`
    /// so callers never try to create one.
    fn does_sequence_exist(&self, conn: &mut dyn DbConnection, sequence_name: &str) -> Result<bool> {
        let _ = (conn, sequence_name);
        Ok(true)
    }

    /// Whether `err` reports that an object being created already exists.
    fn is_already_exists_error(&self, err: &Error) -> bool {
        err.is_already_exists()
    }
}
