//! SELECT / INSERT / UPDATE / DELETE generation shared by all dialects.
//!
//! Every builder exists in a literal form, with values inlined through the
//! dialect's quoting rules, and a parameterized form returning a
//! [`DbCommand`] with one bound parameter per value.

use std::collections::HashSet;

use slimorm_core::{
    DbCommand, Error, FieldDefinition, FieldValues, ModelDefinition, Parameter, Result, Value,
};

use crate::provider::DialectProvider;
use crate::quote::{create_value_parameter, param_safe_name};
use crate::sniff::{
    append_filter, contains_keyword, is_full_delete_statement, is_full_select_statement, sql_fmt,
};

/// Comma-separated quoted column list of the persisted fields.
pub fn select_columns<D: DialectProvider + ?Sized>(dialect: &D, def: &ModelDefinition) -> String {
    def.field_definitions
        .iter()
        .map(|f| dialect.quoted_column_name(f.field_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_prefix<D: DialectProvider + ?Sized>(dialect: &D, def: &ModelDefinition) -> String {
    format!(
        "SELECT {} FROM {}",
        dialect.select_columns(def),
        dialect.quoted_table_name(def)
    )
}

/// Whether `field` is named by `names`, by member or column name.
fn is_listed(field: &FieldDefinition, names: &[&str]) -> bool {
    names
        .iter()
        .any(|n| field.name.eq_ignore_ascii_case(n) || field.field_name.eq_ignore_ascii_case(n))
}

fn pk_condition<D: DialectProvider + ?Sized>(
    dialect: &D,
    pk: &FieldDefinition,
    value: &Value,
) -> Result<String> {
    Ok(format!(
        "{} = {}",
        dialect.quoted_column_name(pk.field_name),
        dialect.quoted_field_value(pk, value)?
    ))
}

/// Placeholder for a caller-supplied parameter name; names already carrying
/// the prefix are kept as given.
pub fn named_param<D: DialectProvider + ?Sized>(dialect: &D, name: &str) -> String {
    let prefix = dialect.settings().param_prefix();
    if name.starts_with(prefix.as_str()) {
        name.to_string()
    } else {
        format!("{}{}", prefix, param_safe_name(name))
    }
}

/// Placeholder names handed out within one command.
///
/// Two columns can sanitize to the same placeholder (`Unit Price` and
/// `UnitPrice` both give `@UnitPrice`); later ones get a numeric suffix.
#[derive(Default)]
struct Placeholders {
    taken: HashSet<String>,
}

impl Placeholders {
    fn claim(&mut self, mut param: Parameter) -> Parameter {
        if self.taken.insert(param.name.to_ascii_lowercase()) {
            return param;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{n}", param.name);
            if self.taken.insert(candidate.to_ascii_lowercase()) {
                param.name = candidate;
                return param;
            }
            n += 1;
        }
    }
}

// ============================================================================
// SELECT / COUNT / EXISTS
// ============================================================================

/// `SELECT <columns> FROM <table>` plus an optional filter; complete
/// statements pass through with literal parameter substitution only.
pub fn to_select_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    filter: &str,
    params: &[Value],
) -> Result<String> {
    if is_full_select_statement(filter) {
        return sql_fmt(dialect, filter, params);
    }
    let mut sql = select_prefix(dialect, def);
    append_filter(&mut sql, &sql_fmt(dialect, filter, params)?);
    Ok(sql)
}

pub fn to_select_by_id_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    id: &Value,
) -> Result<String> {
    let mut sql = select_prefix(dialect, def);
    let pk = def.require_primary_key(&sql)?;
    sql.push_str(" WHERE ");
    sql.push_str(&pk_condition(dialect, pk, id)?);
    Ok(sql)
}

pub fn to_select_by_ids_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    ids: &[Value],
) -> Result<String> {
    let mut sql = select_prefix(dialect, def);
    let pk = def.require_primary_key(&sql)?;
    if ids.is_empty() {
        return Err(Error::malformed("no ids given", sql));
    }
    let list = ids
        .iter()
        .map(|id| dialect.quoted_field_value(pk, id))
        .collect::<Result<Vec<_>>>()?;
    sql.push_str(&format!(
        " WHERE {} IN ({})",
        dialect.quoted_column_name(pk.field_name),
        list.join(", ")
    ));
    Ok(sql)
}

/// Select with named placeholders in the filter, bound from `params`.
pub fn to_select_param_command<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    filter: &str,
    params: &[(&str, Value)],
) -> Result<DbCommand> {
    let sql = if is_full_select_statement(filter) {
        filter.to_string()
    } else {
        let mut sql = select_prefix(dialect, def);
        append_filter(&mut sql, filter);
        sql
    };
    let parameters = params
        .iter()
        .map(|(name, value)| create_value_parameter(named_param(dialect, name), value.clone()))
        .collect();
    Ok(DbCommand::new(sql).parameters(parameters))
}

/// Query-by-example: every `(field, value)` pair becomes an equality test,
/// NULL values become `IS NULL`.
pub fn to_select_by_example_command<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    example: &[(&str, Value)],
) -> Result<DbCommand> {
    let mut sql = select_prefix(dialect, def);
    let mut conditions = Vec::with_capacity(example.len());
    let mut parameters = Vec::with_capacity(example.len());
    let mut names = Placeholders::default();
    for (name, value) in example {
        let field = def.find_field(name).ok_or_else(|| {
            Error::malformed(format!("{} has no field {name}", def.model_name), sql.clone())
        })?;
        let column = dialect.quoted_column_name(field.field_name);
        if value.is_null() {
            conditions.push(format!("{column} IS NULL"));
        } else {
            let param = names.claim(dialect.create_parameter(field, value.clone())?);
            conditions.push(format!("{column} = {}", param.name));
            parameters.push(param);
        }
    }
    append_filter(&mut sql, &conditions.join(" AND "));
    Ok(DbCommand::new(sql).parameters(parameters))
}

pub fn to_count_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    filter: &str,
    params: &[Value],
) -> Result<String> {
    if is_full_select_statement(filter) {
        return sql_fmt(dialect, filter, params);
    }
    let mut sql = format!("SELECT COUNT(*) FROM {}", dialect.quoted_table_name(def));
    append_filter(&mut sql, &sql_fmt(dialect, filter, params)?);
    Ok(sql)
}

pub fn to_exists_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    filter: &str,
    params: &[Value],
) -> Result<String> {
    if is_full_select_statement(filter) {
        return sql_fmt(dialect, filter, params);
    }
    let filter = sql_fmt(dialect, filter, params)?;
    let mut sql = format!("SELECT 1 FROM {}", dialect.quoted_table_name(def));
    append_filter(&mut sql, &filter);
    // A filter that already limits its rows keeps its own clause.
    if !contains_keyword(&filter, "LIMIT") && !contains_keyword(&filter, "FETCH") {
        sql.push(' ');
        sql.push_str(&dialect.limit_clause(Some(1), None));
    }
    Ok(sql)
}

// ============================================================================
// INSERT
// ============================================================================

fn insert_fields<'a>(
    def: &'a ModelDefinition,
    only: Option<&'a [&'a str]>,
) -> impl Iterator<Item = &'a FieldDefinition> {
    def.field_definitions
        .iter()
        .filter(move |f| f.should_insert() && only.is_none_or(|names| is_listed(f, names)))
}

fn insert_sql(table: &str, columns: &[String], values: &[String]) -> String {
    if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    }
}

pub fn to_insert_row_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
    only: Option<&[&str]>,
) -> Result<String> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for field in insert_fields(def, only) {
        columns.push(dialect.quoted_column_name(field.field_name));
        values.push(dialect.quoted_field_value(field, &obj.value_of(field))?);
    }
    Ok(insert_sql(&dialect.quoted_table_name(def), &columns, &values))
}

pub fn to_insert_row_command<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
    only: Option<&[&str]>,
) -> Result<DbCommand> {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut parameters = Vec::new();
    let mut names = Placeholders::default();
    for field in insert_fields(def, only) {
        let param = names.claim(dialect.create_parameter(field, obj.value_of(field))?);
        columns.push(dialect.quoted_column_name(field.field_name));
        placeholders.push(param.name.clone());
        parameters.push(param);
    }
    let sql = insert_sql(&dialect.quoted_table_name(def), &columns, &placeholders);
    Ok(DbCommand::new(sql).parameters(parameters))
}

// ============================================================================
// UPDATE
// ============================================================================

fn update_fields<'a>(
    def: &'a ModelDefinition,
    only: Option<&'a [&'a str]>,
) -> impl Iterator<Item = &'a FieldDefinition> {
    def.field_definitions
        .iter()
        .filter(move |f| f.should_update() && only.is_none_or(|names| is_listed(f, names)))
}

/// `UPDATE <table> SET ... WHERE <pk> = <value>`.
///
/// Without an allow-list every updatable field is set. An empty SET list is
/// an error carrying the statement that would have run.
pub fn to_update_row_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
    only: Option<&[&str]>,
) -> Result<String> {
    let table = dialect.quoted_table_name(def);
    let pk = def.require_primary_key(&format!("UPDATE {table}"))?;
    let mut assignments = Vec::new();
    for field in update_fields(def, only) {
        assignments.push(format!(
            "{} = {}",
            dialect.quoted_column_name(field.field_name),
            dialect.quoted_field_value(field, &obj.value_of(field))?
        ));
    }
    let sql = format!(
        "UPDATE {table} SET {} WHERE {}",
        assignments.join(", "),
        pk_condition(dialect, pk, &obj.value_of(pk))?
    );
    if assignments.is_empty() {
        return Err(Error::malformed("no fields to update", sql));
    }
    Ok(sql)
}

pub fn to_update_row_command<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
    only: Option<&[&str]>,
) -> Result<DbCommand> {
    let table = dialect.quoted_table_name(def);
    let pk = def.require_primary_key(&format!("UPDATE {table}"))?;
    let mut assignments = Vec::new();
    let mut parameters = Vec::new();
    let mut names = Placeholders::default();
    for field in update_fields(def, only) {
        let param = names.claim(dialect.create_parameter(field, obj.value_of(field))?);
        assignments.push(format!(
            "{} = {}",
            dialect.quoted_column_name(field.field_name),
            param.name
        ));
        parameters.push(param);
    }
    let pk_param = names.claim(dialect.create_parameter(pk, obj.value_of(pk))?);
    let sql = format!(
        "UPDATE {table} SET {} WHERE {} = {}",
        assignments.join(", "),
        dialect.quoted_column_name(pk.field_name),
        pk_param.name
    );
    if assignments.is_empty() {
        return Err(Error::malformed("no fields to update", sql));
    }
    parameters.push(pk_param);
    Ok(DbCommand::new(sql).parameters(parameters))
}

// ============================================================================
// DELETE
// ============================================================================

pub fn to_delete_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    filter: &str,
    params: &[Value],
) -> Result<String> {
    if is_full_delete_statement(filter) {
        return sql_fmt(dialect, filter, params);
    }
    let mut sql = format!("DELETE FROM {}", dialect.quoted_table_name(def));
    append_filter(&mut sql, &sql_fmt(dialect, filter, params)?);
    Ok(sql)
}

/// Delete one row, matched on the primary key only.
pub fn to_delete_row_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
) -> Result<String> {
    let sql = format!("DELETE FROM {}", dialect.quoted_table_name(def));
    let pk = def.require_primary_key(&sql)?;
    Ok(format!(
        "{sql} WHERE {}",
        pk_condition(dialect, pk, &obj.value_of(pk))?
    ))
}

pub fn to_delete_row_command<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    obj: &dyn FieldValues,
) -> Result<DbCommand> {
    let sql = format!("DELETE FROM {}", dialect.quoted_table_name(def));
    let pk = def.require_primary_key(&sql)?;
    let param = dialect.create_parameter(pk, obj.value_of(pk))?;
    let sql = format!(
        "{sql} WHERE {} = {}",
        dialect.quoted_column_name(pk.field_name),
        param.name
    );
    Ok(DbCommand::new(sql).parameters(vec![param]))
}

pub fn to_delete_by_ids_statement<D: DialectProvider + ?Sized>(
    dialect: &D,
    def: &ModelDefinition,
    ids: &[Value],
) -> Result<String> {
    let sql = format!("DELETE FROM {}", dialect.quoted_table_name(def));
    let pk = def.require_primary_key(&sql)?;
    if ids.is_empty() {
        return Err(Error::malformed("no ids given", sql));
    }
    let list = ids
        .iter()
        .map(|id| dialect.quoted_field_value(pk, id))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "{sql} WHERE {} IN ({})",
        dialect.quoted_column_name(pk.field_name),
        list.join(", ")
    ))
}

// ============================================================================
// Misc
// ============================================================================

pub fn limit_clause(limit: Option<usize>, offset: Option<usize>) -> String {
    match (limit, offset) {
        (Some(l), Some(o)) => format!("LIMIT {l} OFFSET {o}"),
        (Some(l), None) => format!("LIMIT {l}"),
        (None, Some(o)) => format!("LIMIT -1 OFFSET {o}"),
        (None, None) => String::new(),
    }
}

/// `SELECT ...` statement retrieving the identity generated by the last insert.
pub fn last_insert_id_sql<D: DialectProvider + ?Sized>(dialect: &D) -> Result<String> {
    dialect.select_identity_sql().map(str::to_string).ok_or_else(|| {
        Error::NotImplemented(format!(
            "{} does not support retrieving the last insert id",
            dialect.name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnsiDialect;
    use crate::test_models::Post;
    use pretty_assertions::assert_eq;
    use slimorm_core::{LowercaseUnderscoreNaming, model_definition, model_metadata};
    use std::sync::Arc;

    const POST_COLUMNS: &str = "\"Id\", \"Title\", \"Views\", \"AuthorId\", \"Slug\", \"Rating\"";

    fn sample() -> Post {
        Post {
            id: 5,
            title: "Hello".into(),
            views: 3,
            author_id: 1,
            slug: None,
            rating: Some(4.5),
            draft: true,
        }
    }

    #[test]
    fn test_select_with_filter() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        let sql = d
            .to_select_statement(&def, "Views > {0}", &[Value::Int(10)])
            .unwrap();
        assert_eq!(
            sql,
            format!("SELECT {POST_COLUMNS} FROM \"Post\" WHERE Views > 10")
        );
    }

    #[test]
    fn test_select_without_filter_and_with_order() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        assert_eq!(
            d.to_select_statement(&def, "", &[]).unwrap(),
            format!("SELECT {POST_COLUMNS} FROM \"Post\"")
        );
        assert_eq!(
            d.to_select_statement(&def, "ORDER BY Views DESC", &[]).unwrap(),
            format!("SELECT {POST_COLUMNS} FROM \"Post\" ORDER BY Views DESC")
        );
    }

    #[test]
    fn test_full_select_passes_through() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        let sql = d
            .to_select_statement(
                &def,
                "  select Title from Post where Title = {0}",
                &[Value::Text("O'Brien".into())],
            )
            .unwrap();
        assert_eq!(sql, "  select Title from Post where Title = 'O''Brien'");
        assert!(!sql.contains("SELECT \"Id\""));
    }

    #[test]
    fn test_select_by_ids() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        assert_eq!(
            d.to_select_by_id_statement(&def, &Value::BigInt(2)).unwrap(),
            format!("SELECT {POST_COLUMNS} FROM \"Post\" WHERE \"Id\" = 2")
        );
        assert_eq!(
            d.to_select_by_ids_statement(&def, &[Value::BigInt(1), Value::BigInt(2)])
                .unwrap(),
            format!("SELECT {POST_COLUMNS} FROM \"Post\" WHERE \"Id\" IN (1, 2)")
        );
        assert!(matches!(
            d.to_select_by_ids_statement(&def, &[]),
            Err(Error::MalformedOperation { .. })
        ));
    }

    #[test]
    fn test_select_param_and_example() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();

        let cmd = d
            .to_select_param_command(&def, "Views > @min", &[("min", Value::Int(3))])
            .unwrap();
        assert_eq!(
            cmd.sql,
            format!("SELECT {POST_COLUMNS} FROM \"Post\" WHERE Views > @min")
        );
        assert_eq!(cmd.parameters.len(), 1);
        assert_eq!(cmd.parameters[0].name, "@min");

        let cmd = d
            .to_select_by_example_command(
                &def,
                &[("title", Value::Text("a".into())), ("Slug", Value::Null)],
            )
            .unwrap();
        assert_eq!(
            cmd.sql,
            format!("SELECT {POST_COLUMNS} FROM \"Post\" WHERE \"Title\" = @Title AND \"Slug\" IS NULL")
        );
        assert_eq!(cmd.parameters.len(), 1);

        assert!(d
            .to_select_by_example_command(&def, &[("nope", Value::Int(1))])
            .is_err());
    }

    #[test]
    fn test_count_and_exists() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        assert_eq!(
            d.to_count_statement(&def, "Views > {0}", &[Value::Int(1)]).unwrap(),
            "SELECT COUNT(*) FROM \"Post\" WHERE Views > 1"
        );
        assert_eq!(
            d.to_exists_statement(&def, "Views > 1", &[]).unwrap(),
            "SELECT 1 FROM \"Post\" WHERE Views > 1 LIMIT 1"
        );
        assert_eq!(
            d.to_count_statement(&def, "SELECT COUNT(*) FROM Post", &[]).unwrap(),
            "SELECT COUNT(*) FROM Post"
        );
    }

    #[test]
    fn test_exists_keeps_filter_limit() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        assert_eq!(
            d.to_exists_statement(&def, "Views > 1 LIMIT 5", &[]).unwrap(),
            "SELECT 1 FROM \"Post\" WHERE Views > 1 LIMIT 5"
        );
        assert_eq!(
            d.to_exists_statement(&def, "limit 3", &[]).unwrap(),
            "SELECT 1 FROM \"Post\" limit 3"
        );
        assert_eq!(
            d.to_exists_statement(&def, "Title = {0}", &[Value::Text("LIMIT 9".into())])
                .unwrap(),
            "SELECT 1 FROM \"Post\" WHERE Title = 'LIMIT 9' LIMIT 1"
        );
    }

    #[test]
    fn test_colliding_placeholders_get_distinct_names() {
        use slimorm_core::{FieldDefinition, SqlField};
        use std::collections::HashMap;

        let d = AnsiDialect::new();
        let def = ModelDefinition::new(
            "Invoice",
            vec![
                FieldDefinition::new("id", i64::field_type()).alias("Id"),
                FieldDefinition::new("unit_price", f64::field_type()).alias("Unit Price"),
                FieldDefinition::new("list_price", f64::field_type()).alias("UnitPrice"),
            ],
            Vec::new(),
        );
        let values: HashMap<&str, Value> = [
            ("id", Value::BigInt(1)),
            ("unit_price", Value::Double(2.5)),
            ("list_price", Value::Double(3.0)),
        ]
        .into_iter()
        .collect();

        let cmd = d.to_insert_row_command(&def, &values, None).unwrap();
        let names: Vec<&str> = cmd.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@Id", "@UnitPrice", "@UnitPrice_2"]);
        assert!(cmd.sql.ends_with("VALUES (@Id, @UnitPrice, @UnitPrice_2)"));

        let cmd = d.to_update_row_command(&def, &values, None).unwrap();
        assert_eq!(
            cmd.sql,
            "UPDATE \"Invoice\" SET \"Unit Price\" = @UnitPrice, \"UnitPrice\" = @UnitPrice_2 WHERE \"Id\" = @Id"
        );
        assert_eq!(cmd.parameters[1].value, Value::Double(3.0));
    }

    #[test]
    fn test_insert_excludes_auto_increment_and_ignored() {
        let d = AnsiDialect::new();
        let meta = model_metadata::<Post>();
        let post = sample();
        let obj = meta.instance(&post);

        let sql = d
            .to_insert_row_statement(&meta.definition, &obj, None)
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"Post\" (\"Title\", \"Views\", \"AuthorId\", \"Slug\", \"Rating\") \
             VALUES ('Hello', 3, 1, NULL, 4.5)"
        );
        assert!(!sql.contains("\"Id\""));
        assert!(!sql.contains("Draft"));

        let cmd = d.to_insert_row_command(&meta.definition, &obj, None).unwrap();
        assert_eq!(
            cmd.sql,
            "INSERT INTO \"Post\" (\"Title\", \"Views\", \"AuthorId\", \"Slug\", \"Rating\") \
             VALUES (@Title, @Views, @AuthorId, @Slug, @Rating)"
        );
        assert_eq!(cmd.parameters.len(), 5);
        assert_eq!(cmd.parameters[0].value, Value::Text("Hello".into()));
        assert_eq!(cmd.parameters[3].value, Value::Null);
    }

    #[test]
    fn test_insert_only_fields() {
        let d = AnsiDialect::new();
        let meta = model_metadata::<Post>();
        let post = sample();
        let sql = d
            .to_insert_row_statement(&meta.definition, &meta.instance(&post), Some(&["title", "Views"][..]))
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"Post\" (\"Title\", \"Views\") VALUES ('Hello', 3)"
        );
    }

    #[test]
    fn test_update_row() {
        let d = AnsiDialect::new();
        let meta = model_metadata::<Post>();
        let post = sample();
        let obj = meta.instance(&post);

        assert_eq!(
            d.to_update_row_statement(&meta.definition, &obj, None).unwrap(),
            "UPDATE \"Post\" SET \"Title\" = 'Hello', \"Views\" = 3, \"AuthorId\" = 1, \
             \"Slug\" = NULL, \"Rating\" = 4.5 WHERE \"Id\" = 5"
        );
        assert_eq!(
            d.to_update_row_statement(&meta.definition, &obj, Some(&["views"][..]))
                .unwrap(),
            "UPDATE \"Post\" SET \"Views\" = 3 WHERE \"Id\" = 5"
        );

        let cmd = d
            .to_update_row_command(&meta.definition, &obj, Some(&["Title"][..]))
            .unwrap();
        assert_eq!(cmd.sql, "UPDATE \"Post\" SET \"Title\" = @Title WHERE \"Id\" = @Id");
        assert_eq!(cmd.parameters.len(), 2);
        assert_eq!(cmd.parameters[1].value, Value::BigInt(5));
    }

    #[test]
    fn test_update_with_no_valid_fields_is_malformed() {
        let d = AnsiDialect::new();
        let meta = model_metadata::<Post>();
        let post = sample();
        let obj = meta.instance(&post);

        let err = d
            .to_update_row_statement(&meta.definition, &obj, Some(&["Nope"][..]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedOperation { .. }));
        assert!(err.sql().is_some_and(|sql| sql.starts_with("UPDATE \"Post\" SET")));

        // the key is never part of the SET list
        let err = d
            .to_update_row_command(&meta.definition, &obj, Some(&["id"][..]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedOperation { .. }));
    }

    #[test]
    fn test_delete() {
        let d = AnsiDialect::new();
        let meta = model_metadata::<Post>();
        let post = sample();
        let obj = meta.instance(&post);
        let def = &meta.definition;

        assert_eq!(
            d.to_delete_row_statement(def, &obj).unwrap(),
            "DELETE FROM \"Post\" WHERE \"Id\" = 5"
        );
        let cmd = d.to_delete_row_command(def, &obj).unwrap();
        assert_eq!(cmd.sql, "DELETE FROM \"Post\" WHERE \"Id\" = @Id");
        assert_eq!(
            d.to_delete_statement(def, "Views = {0}", &[Value::Int(0)]).unwrap(),
            "DELETE FROM \"Post\" WHERE Views = 0"
        );
        assert_eq!(
            d.to_delete_statement(def, "delete from Post", &[]).unwrap(),
            "delete from Post"
        );
        assert_eq!(
            d.to_delete_by_ids_statement(def, &[Value::BigInt(7)]).unwrap(),
            "DELETE FROM \"Post\" WHERE \"Id\" IN (7)"
        );
    }

    #[test]
    fn test_naming_strategy_applies_to_statements() {
        let d = AnsiDialect::new();
        d.settings()
            .set_naming_strategy(Arc::new(LowercaseUnderscoreNaming));
        let def = model_definition::<Post>();
        assert_eq!(
            d.to_select_by_id_statement(&def, &Value::BigInt(1)).unwrap(),
            "SELECT \"id\", \"title\", \"views\", \"author_id\", \"slug\", \"rating\" \
             FROM \"post\" WHERE \"id\" = 1"
        );
    }

    #[test]
    fn test_limit_clause() {
        assert_eq!(limit_clause(Some(10), None), "LIMIT 10");
        assert_eq!(limit_clause(Some(10), Some(20)), "LIMIT 10 OFFSET 20");
        assert_eq!(limit_clause(None, None), "");
    }

    #[test]
    fn test_last_insert_id_not_supported() {
        let d = AnsiDialect::new();
        assert!(matches!(d.last_insert_id_sql(), Err(Error::NotImplemented(_))));
    }
}
