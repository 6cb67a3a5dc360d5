//! CREATE / ALTER / DROP generation shared by all dialects.
//!
//! Column phrases come from a single place, [`column_definition`], which the
//! create-table, add-column and alter-column builders all call.

use slimorm_core::{Error, FieldDefinition, HostType, ModelDefinition, Result};

use crate::provider::DialectProvider;
use crate::type_map::Resolved;

/// Type phrase for `field`, e.g. `VARCHAR(100)` or `INTEGER`.
pub fn column_type<D: DialectProvider + ?Sized>(dialect: &D, field: &FieldDefinition) -> Result<String> {
    let settings = dialect.settings();
    match field.field_type.host {
        HostType::String => {
            return Ok(field.field_length.map_or_else(
                || settings.string_column_definition(),
                |len| settings.string_column_definition_for(len),
            ));
        }
        HostType::Decimal => {
            if let Some(precision) = field.field_length {
                return Ok(format!(
                    "DECIMAL({},{})",
                    precision,
                    field.scale.unwrap_or(0)
                ));
            }
        }
        _ => {}
    }
    match dialect
        .type_map()
        .resolve(&field.field_type, "column definition")?
    {
        Resolved::Mapped(mapping) => Ok(mapping.column_definition.clone()),
        Resolved::AsString => Ok(field.field_length.map_or_else(
            || settings.string_column_definition(),
            |len| settings.string_column_definition_for(len),
        )),
    }
}

/// Full column phrase: quoted name, type, key/nullability, default.
pub fn column_definition<D: DialectProvider + ?Sized>(
    dialect: &D,
    field: &FieldDefinition,
) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        dialect.quoted_column_name(field.field_name),
        dialect.column_type(field)?
    );
    if field.is_primary_key {
        sql.push_str(" PRIMARY KEY");
        if field.auto_increment {
            let keyword = dialect.auto_increment_definition();
            if !keyword.is_empty() {
                sql.push(' ');
                sql.push_str(keyword);
            }
        }
    } else if field.is_nullable {
        sql.push_str(" NULL");
    } else {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = field.default_value {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    Ok(sql)
}

/// Table name after the naming strategy, unquoted.
fn physical_table_name<D: DialectProvider + ?Sized>(dialect: &D, def: &ModelDefinition) -> String {
    dialect.settings().naming_strategy().table_name(def.model_name)
}

/// Constraint name for a foreign key on `field`: the explicit name, or
/// `FK_<table>_<referenced table>_<column>`.
pub fn foreign_key_name<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    ref_def: &ModelDefinition,
    field: &FieldDefinition,
) -> String {
    if let Some(name) = field.foreign_key.and_then(|fk| fk.foreign_key_name) {
        return name.to_string();
    }
    let naming = dialect.settings().naming_strategy();
    format!(
        "FK_{}_{}_{}",
        naming.table_name(def.model_name),
        naming.table_name(ref_def.model_name),
        naming.column_name(field.field_name)
    )
}

/// `CONSTRAINT ... FOREIGN KEY (...) REFERENCES ... [ON DELETE ..] [ON UPDATE ..]`.
pub fn foreign_key_clause<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field: &FieldDefinition,
) -> Result<String> {
    let Some(fk) = field.foreign_key else {
        return Err(Error::malformed(
            format!("{}.{} has no foreign key", def.model_name, field.name),
            dialect.quoted_table_name(def),
        ));
    };
    let ref_def = fk.referenced();
    let ref_pk = ref_def.require_primary_key(&dialect.quoted_table_name(&ref_def))?;
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        dialect.quote_identifier(&foreign_key_name(dialect, def, &ref_def, field)),
        dialect.quoted_column_name(field.field_name),
        dialect.quoted_table_name(&ref_def),
        dialect.quoted_column_name(ref_pk.field_name)
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    Ok(sql)
}

pub fn to_create_table_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
) -> Result<String> {
    let mut parts = def
        .field_definitions
        .iter()
        .map(|f| dialect.column_definition(f))
        .collect::<Result<Vec<_>>>()?;
    for field in def.foreign_key_fields() {
        parts.push(foreign_key_clause(dialect, def, field)?);
    }
    let sql = format!(
        "CREATE TABLE {} \n(\n  {}\n)",
        dialect.quoted_table_name(def),
        parts.join(", \n  ")
    );
    tracing::trace!(dialect = dialect.name(), sql = %sql, "Generated CREATE TABLE");
    Ok(sql)
}

pub fn to_drop_table_statement<D: DialectProvider + ?Sized>(dialect: &D, def: &ModelDefinition) -> String {
    format!("DROP TABLE {}", dialect.quoted_table_name(def))
}

/// `<u?>idx_<table>_<field>`, lower-cased.
pub fn index_name(unique: bool, table: &str, field: &str) -> String {
    format!("{}idx_{}_{}", if unique { "u" } else { "" }, table, field).to_lowercase()
}

fn index_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    name: &str,
    columns: &[String],
    unique: bool,
) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        dialect.quote_identifier(name),
        dialect.quoted_table_name(def),
        columns.join(", ")
    )
}

/// Index over the named fields (member or column names).
///
/// Without an explicit name one is derived from the table and field names.
pub fn to_create_index_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field_names: &[&str],
    unique: bool,
    name: Option<&str>,
) -> Result<String> {
    let naming = dialect.settings().naming_strategy();
    let mut columns = Vec::with_capacity(field_names.len());
    let mut raw_columns = Vec::with_capacity(field_names.len());
    for field_name in field_names {
        let field = def.find_field(field_name).ok_or_else(|| {
            Error::malformed(
                format!("{} has no field {field_name}", def.model_name),
                format!("CREATE INDEX ON {}", dialect.quoted_table_name(def)),
            )
        })?;
        columns.push(dialect.quoted_column_name(field.field_name));
        raw_columns.push(naming.column_name(field.field_name));
    }
    if columns.is_empty() {
        return Err(Error::malformed(
            "index has no fields",
            format!("CREATE INDEX ON {}", dialect.quoted_table_name(def)),
        ));
    }
    let name = name.map_or_else(
        || index_name(unique, &physical_table_name(dialect, def), &raw_columns.join("_")),
        str::to_string,
    );
    Ok(index_statement(dialect, def, &name, &columns, unique))
}

/// One statement per indexed field plus one per composite index.
pub fn to_create_index_statements<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
) -> Result<Vec<String>> {
    let mut stmts = Vec::new();
    for field in def.indexed_fields() {
        stmts.push(to_create_index_statement(
            dialect,
            def,
            &[field.name],
            field.is_unique,
            None,
        )?);
    }
    for index in &def.composite_indexes {
        stmts.push(to_create_index_statement(
            dialect,
            def,
            &index.field_names,
            index.unique,
            index.name,
        )?);
    }
    Ok(stmts)
}

pub fn to_drop_index_statement<D: DialectProvider + ?Sized>(dialect: &D, index_name: &str) -> String {
    format!("DROP INDEX {}", dialect.quote_identifier(index_name))
}

pub fn to_add_column_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field: &FieldDefinition,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        dialect.quoted_table_name(def),
        dialect.column_definition(field)?
    ))
}

pub fn to_alter_column_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field: &FieldDefinition,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} MODIFY COLUMN {}",
        dialect.quoted_table_name(def),
        dialect.column_definition(field)?
    ))
}

pub fn to_change_column_name_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field: &FieldDefinition,
    old_column_name: &str,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        dialect.quoted_table_name(def),
        dialect.quoted_column_name(old_column_name),
        dialect.quoted_column_name(field.field_name)
    ))
}

pub fn to_add_foreign_key_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    field: &FieldDefinition,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {}",
        dialect.quoted_table_name(def),
        foreign_key_clause(dialect, def, field)?
    ))
}
