//! CRUD, DDL and raw-SQL operations on [`OrmConnection`].
//!
//! Each operation resolves the model's cached metadata, asks the active
//! dialect for a statement or command, runs it through the wrapper (which
//! attaches timeout and transaction), and materializes any rows.
//!
//! Filters come in two flavors:
//!
//! - `{0}`-style filters (`select_where`, `count`, `exists`, `delete_where`,
//!   `scalar`, `column`): values are rendered inline as quoted literals.
//! - Named filters (`select_param`, `query`, `query_rows`,
//!   `execute_sql_params`): `@name` placeholders bound as parameters.

use slimorm_core::{
    DbCommand, DbConnection, Error, Model, ModelDefinition, Materializer, Parameter, ResultSet,
    Result, SqlField, Value, model_definition, model_metadata,
};
use slimorm_dialect::DialectProvider;
use slimorm_dialect::dml::named_param;
use slimorm_dialect::quote::create_value_parameter;

use crate::wrapper::OrmConnection;

fn named_parameters(dialect: &dyn DialectProvider, params: &[(&str, Value)]) -> Vec<Parameter> {
    params
        .iter()
        .map(|(name, value)| create_value_parameter(named_param(dialect, name), value.clone()))
        .collect()
}

fn unknown_field(def: &ModelDefinition, name: &str) -> Error {
    Error::malformed(format!("{} has no field {name}", def.model_name), "")
}

fn id_text(id: &Value) -> String {
    id.to_text().unwrap_or_else(|| "NULL".to_string())
}

impl OrmConnection {
    // ========================================================================
    // Plumbing
    // ========================================================================

    fn run(&mut self, command: DbCommand) -> Result<u64> {
        tracing::debug!(sql = %command.sql, params = command.parameters.len(), "Executing");
        self.execute_non_query(&command)
    }

    fn fetch(&mut self, command: DbCommand) -> Result<ResultSet> {
        tracing::debug!(sql = %command.sql, params = command.parameters.len(), "Querying");
        self.execute_reader(&command)
    }

    fn fetch_models<M: Model>(&mut self, dialect: &dyn DialectProvider, command: DbCommand) -> Result<Vec<M>> {
        let mut rows = self.fetch(command)?;
        let naming = dialect.settings().naming_strategy();
        Materializer::<M>::new(naming.as_ref()).read_all(&mut rows)
    }

    fn fetch_first<M: Model>(&mut self, dialect: &dyn DialectProvider, command: DbCommand) -> Result<Option<M>> {
        let mut rows = self.fetch(command)?;
        let naming = dialect.settings().naming_strategy();
        Materializer::<M>::new(naming.as_ref()).read_first(&mut rows)
    }

    /// Run a DDL statement, treating "already exists" failures as success.
    fn run_ddl(&mut self, dialect: &dyn DialectProvider, sql: String) -> Result<()> {
        match self.run(DbCommand::new(sql)) {
            Ok(_) => Ok(()),
            Err(e) if dialect.is_already_exists_error(&e) => {
                tracing::debug!(error = %e, "Object already exists, skipping");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every row of `M`'s table.
    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn select<M: Model>(&mut self) -> Result<Vec<M>> {
        self.select_where("", &[])
    }

    /// Rows matching a `{0}`-style filter, or a complete `SELECT` statement.
    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn select_where<M: Model>(&mut self, filter: &str, params: &[Value]) -> Result<Vec<M>> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_select_statement(&def, filter, params)?;
        self.fetch_models(dialect.as_ref(), DbCommand::new(sql))
    }

    /// Rows matching a filter with named placeholders.
    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn select_param<M: Model>(&mut self, filter: &str, params: &[(&str, Value)]) -> Result<Vec<M>> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let command = dialect.to_select_param_command(&def, filter, params)?;
        self.fetch_models(dialect.as_ref(), command)
    }

    /// Rows equal to every `(field, value)` pair; NULL values match `IS NULL`.
    #[tracing::instrument(level = "debug", skip(self, example), fields(model = M::MODEL_NAME))]
    pub fn select_by_example<M: Model>(&mut self, example: &[(&str, Value)]) -> Result<Vec<M>> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let command = dialect.to_select_by_example_command(&def, example)?;
        self.fetch_models(dialect.as_ref(), command)
    }

    /// Rows whose `field` equals `value`.
    pub fn where_eq<M: Model>(&mut self, field: &str, value: impl Into<Value>) -> Result<Vec<M>> {
        self.select_by_example(&[(field, value.into())])
    }

    /// The first row matching a `{0}`-style filter.
    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn single<M: Model>(&mut self, filter: &str, params: &[Value]) -> Result<Option<M>> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_select_statement(&def, filter, params)?;
        self.fetch_first(dialect.as_ref(), DbCommand::new(sql))
    }

    /// The row with primary key `id`, or [`Error::NotFound`].
    pub fn get_by_id<M: Model>(&mut self, id: impl Into<Value>) -> Result<M> {
        let id = id.into();
        self.get_by_id_or_default::<M>(id.clone())?
            .ok_or_else(|| Error::NotFound {
                model: M::MODEL_NAME.to_string(),
                id: id_text(&id),
            })
    }

    /// The row with primary key `id`, if present.
    #[tracing::instrument(level = "debug", skip(self, id), fields(model = M::MODEL_NAME))]
    pub fn get_by_id_or_default<M: Model>(&mut self, id: impl Into<Value>) -> Result<Option<M>> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_select_by_id_statement(&def, &id.into())?;
        self.fetch_first(dialect.as_ref(), DbCommand::new(sql))
    }

    /// Rows whose primary key is in `ids`. No ids, no rows.
    #[tracing::instrument(level = "debug", skip(self, ids), fields(model = M::MODEL_NAME, ids = ids.len()))]
    pub fn get_by_ids<M: Model>(&mut self, ids: &[Value]) -> Result<Vec<M>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_select_by_ids_statement(&def, ids)?;
        self.fetch_models(dialect.as_ref(), DbCommand::new(sql))
    }

    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn exists<M: Model>(&mut self, filter: &str, params: &[Value]) -> Result<bool> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_exists_statement(&def, filter, params)?;
        Ok(!self.fetch(DbCommand::new(sql))?.is_empty())
    }

    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn count<M: Model>(&mut self, filter: &str, params: &[Value]) -> Result<i64> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_count_statement(&def, filter, params)?;
        tracing::debug!(sql = %sql, "Counting");
        let value = self.execute_scalar(&DbCommand::new(sql))?;
        i64::from_value(value)
    }

    /// First column of the first row of a `{0}`-style statement.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn scalar<T: SqlField>(&mut self, sql: &str, params: &[Value]) -> Result<T> {
        let dialect = self.dialect()?;
        let sql = dialect.sql_fmt(sql, params)?;
        tracing::debug!(sql = %sql, "Scalar");
        let value = self.execute_scalar(&DbCommand::new(sql))?;
        T::from_value(value)
    }

    /// First column of every row of a `{0}`-style statement.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn column<T: SqlField>(&mut self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        let dialect = self.dialect()?;
        let sql = dialect.sql_fmt(sql, params)?;
        self.fetch(DbCommand::new(sql))?
            .into_rows()
            .into_iter()
            .map(|row| T::from_value(row.into_values().into_iter().next().unwrap_or_default()))
            .collect()
    }

    /// Raw SQL with named parameters, materialized as `M`.
    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn query<M: Model>(&mut self, sql: &str, params: &[(&str, Value)]) -> Result<Vec<M>> {
        let dialect = self.dialect()?;
        let command = DbCommand::new(sql).parameters(named_parameters(dialect.as_ref(), params));
        self.fetch_models(dialect.as_ref(), command)
    }

    /// Raw SQL with named parameters, returned as rows.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn query_rows(&mut self, sql: &str, params: &[(&str, Value)]) -> Result<ResultSet> {
        let dialect = self.dialect()?;
        let command = DbCommand::new(sql).parameters(named_parameters(dialect.as_ref(), params));
        self.fetch(command)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert with values rendered inline.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn insert<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let sql = dialect.to_insert_row_statement(&meta.definition, &meta.instance(obj), None)?;
        self.run(DbCommand::new(sql))
    }

    /// Insert with bound parameters.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn insert_param<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let command = dialect.to_insert_row_command(&meta.definition, &meta.instance(obj), None)?;
        self.run(command)
    }

    /// Insert only the listed fields.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn insert_only<M: Model>(&mut self, obj: &M, fields: &[&str]) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let command =
            dialect.to_insert_row_command(&meta.definition, &meta.instance(obj), Some(fields))?;
        self.run(command)
    }

    /// Insert every object in one transaction.
    #[tracing::instrument(level = "debug", skip(self, objs), fields(model = M::MODEL_NAME, rows = objs.len()))]
    pub fn insert_all<M: Model>(&mut self, objs: &[M]) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let mut tx = self.transaction()?;
        let mut affected = 0;
        for obj in objs {
            let command = dialect.to_insert_row_command(&meta.definition, &meta.instance(obj), None)?;
            affected += tx.run(command)?;
        }
        tx.commit()?;
        Ok(affected)
    }

    /// Identity generated by the last insert on this connection.
    pub fn last_insert_id(&mut self) -> Result<i64> {
        let dialect = self.dialect()?;
        let sql = dialect.last_insert_id_sql()?;
        let value = self.execute_scalar(&DbCommand::new(sql))?;
        i64::from_value(value)
    }

    /// Update by primary key with values rendered inline.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn update<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let sql = dialect.to_update_row_statement(&meta.definition, &meta.instance(obj), None)?;
        self.run(DbCommand::new(sql))
    }

    /// Update by primary key with bound parameters.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn update_param<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let command = dialect.to_update_row_command(&meta.definition, &meta.instance(obj), None)?;
        self.run(command)
    }

    /// Update only the listed fields. Fails if none of them can be set.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn update_only<M: Model>(&mut self, obj: &M, fields: &[&str]) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let command =
            dialect.to_update_row_command(&meta.definition, &meta.instance(obj), Some(fields))?;
        self.run(command)
    }

    /// Update every object in one transaction.
    #[tracing::instrument(level = "debug", skip(self, objs), fields(model = M::MODEL_NAME, rows = objs.len()))]
    pub fn update_all<M: Model>(&mut self, objs: &[M]) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let mut tx = self.transaction()?;
        let mut affected = 0;
        for obj in objs {
            let command = dialect.to_update_row_command(&meta.definition, &meta.instance(obj), None)?;
            affected += tx.run(command)?;
        }
        tx.commit()?;
        Ok(affected)
    }

    /// Insert `obj` if its primary key is unset or not present in the table,
    /// otherwise update it. Returns `true` when a row was inserted.
    ///
    /// After inserting a model with an auto-increment key, the generated id
    /// is written back into `obj` when the dialect can retrieve it.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn save<M: Model>(&mut self, obj: &mut M) -> Result<bool> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let def = &meta.definition;
        let pk = def.require_primary_key("")?;
        let id = meta.get_value(obj, pk);
        let unset = id.is_null() || (pk.auto_increment && id.as_i64() == Some(0));

        if !unset {
            let sql = dialect.to_select_by_id_statement(def, &id)?;
            if !self.fetch(DbCommand::new(sql))?.is_empty() {
                self.update(obj)?;
                return Ok(false);
            }
        }

        self.insert(obj)?;
        if pk.auto_increment {
            match self.last_insert_id() {
                Ok(new_id) => meta.set_value(obj, pk, Value::BigInt(new_id))?,
                Err(Error::NotImplemented(reason)) => {
                    tracing::debug!(%reason, "Generated id not written back");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Delete by primary key with the key rendered inline.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn delete<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let sql = dialect.to_delete_row_statement(&meta.definition, &meta.instance(obj))?;
        self.run(DbCommand::new(sql))
    }

    /// Delete by primary key with the key bound as a parameter.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn delete_param<M: Model>(&mut self, obj: &M) -> Result<u64> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let command = dialect.to_delete_row_command(&meta.definition, &meta.instance(obj))?;
        self.run(command)
    }

    pub fn delete_by_id<M: Model>(&mut self, id: impl Into<Value>) -> Result<u64> {
        self.delete_by_ids::<M>(&[id.into()])
    }

    /// Delete every row whose primary key is in `ids`. No ids, no rows.
    #[tracing::instrument(level = "debug", skip(self, ids), fields(model = M::MODEL_NAME, ids = ids.len()))]
    pub fn delete_by_ids<M: Model>(&mut self, ids: &[Value]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_delete_by_ids_statement(&def, ids)?;
        self.run(DbCommand::new(sql))
    }

    /// Delete rows matching a `{0}`-style filter, or run a complete `DELETE`.
    #[tracing::instrument(level = "debug", skip(self, params), fields(model = M::MODEL_NAME))]
    pub fn delete_where<M: Model>(&mut self, filter: &str, params: &[Value]) -> Result<u64> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_delete_statement(&def, filter, params)?;
        self.run(DbCommand::new(sql))
    }

    pub fn delete_all<M: Model>(&mut self) -> Result<u64> {
        self.delete_where::<M>("", &[])
    }

    // ========================================================================
    // DDL
    // ========================================================================

    /// Create `M`'s table with its sequences and indexes.
    ///
    /// With `overwrite`, an existing table is dropped first. Objects that
    /// already exist are left alone.
    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn create_table<M: Model>(&mut self, overwrite: bool) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();

        if overwrite && self.table_exists::<M>()? {
            self.drop_table::<M>()?;
        }

        let sequences = def.field_definitions.iter().filter_map(|f| f.sequence);
        for (name, sql) in sequences.zip(dialect.to_create_sequence_statements(&def)?) {
            if dialect.does_sequence_exist(self, name)? {
                tracing::trace!(sequence = name, "Sequence exists");
                continue;
            }
            self.run_ddl(dialect.as_ref(), sql)?;
        }

        self.run_ddl(dialect.as_ref(), dialect.to_create_table_statement(&def)?)?;
        for sql in dialect.to_create_index_statements(&def)? {
            self.run_ddl(dialect.as_ref(), sql)?;
        }
        tracing::info!(model = M::MODEL_NAME, "Table created");
        Ok(())
    }

    /// Create the table unless the dialect reports it exists. Returns `true`
    /// when it was created.
    pub fn create_table_if_not_exists<M: Model>(&mut self) -> Result<bool> {
        if self.table_exists::<M>()? {
            return Ok(false);
        }
        self.create_table::<M>(false)?;
        Ok(true)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn drop_table<M: Model>(&mut self) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        self.run(DbCommand::new(dialect.to_drop_table_statement(&def)))
            .map(|_| ())
    }

    /// Whether `M`'s table exists, according to the dialect's catalog lookup.
    pub fn table_exists<M: Model>(&mut self) -> Result<bool> {
        let dialect = self.dialect()?;
        let table = dialect.settings().naming_strategy().table_name(M::MODEL_NAME);
        dialect.does_table_exist(self, &table)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn add_column<M: Model>(&mut self, field: &str) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let field = def.find_field(field).ok_or_else(|| unknown_field(&def, field))?;
        let sql = dialect.to_add_column_statement(&def, field)?;
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn alter_column<M: Model>(&mut self, field: &str) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let field = def.find_field(field).ok_or_else(|| unknown_field(&def, field))?;
        let sql = dialect.to_alter_column_statement(&def, field)?;
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    /// Rename the column `old_column_name` to `field`'s current column name.
    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn change_column_name<M: Model>(&mut self, field: &str, old_column_name: &str) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let field = def.find_field(field).ok_or_else(|| unknown_field(&def, field))?;
        let sql = dialect.to_change_column_name_statement(&def, field, old_column_name)?;
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn add_foreign_key<M: Model>(&mut self, field: &str) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let field = def.find_field(field).ok_or_else(|| unknown_field(&def, field))?;
        let sql = dialect.to_add_foreign_key_statement(&def, field)?;
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn create_index<M: Model>(&mut self, fields: &[&str], unique: bool, name: Option<&str>) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_create_index_statement(&def, fields, unique, name)?;
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(model = M::MODEL_NAME))]
    pub fn drop_index<M: Model>(&mut self, name: &str) -> Result<()> {
        let dialect = self.dialect()?;
        let def = model_definition::<M>();
        let sql = dialect.to_drop_index_statement(&def, name);
        self.run(DbCommand::new(sql)).map(|_| ())
    }

    // ========================================================================
    // Raw
    // ========================================================================

    /// Execute raw SQL with positionally bound parameters.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn execute_sql(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let parameters = params.iter().cloned().map(Parameter::positional).collect();
        self.run(DbCommand::new(sql).parameters(parameters))
    }

    /// Execute raw SQL with named parameters.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub fn execute_sql_params(&mut self, sql: &str, params: &[(&str, Value)]) -> Result<u64> {
        let dialect = self.dialect()?;
        let parameters = named_parameters(dialect.as_ref(), params);
        self.run(DbCommand::new(sql).parameters(parameters))
    }

    /// Call the stored procedure named by `M`, passing `obj`'s fields.
    #[tracing::instrument(level = "debug", skip(self, obj), fields(model = M::MODEL_NAME))]
    pub fn exec_procedure<M: Model>(&mut self, obj: &M) -> Result<ResultSet> {
        let dialect = self.dialect()?;
        let meta = model_metadata::<M>();
        let sql = dialect.to_execute_procedure_statement(&meta.definition, &meta.instance(obj))?;
        self.fetch(DbCommand::new(sql))
    }
}
