//! Identifier and literal quoting.

use std::fmt::Write as _;

use slimorm_core::{DbType, Error, FieldDefinition, HostType, Parameter, Result, Value};

use crate::provider::DialectProvider;
use crate::type_map::Resolved;

/// Wrap `name` in `quote`, doubling embedded quote characters.
///
/// A name that is already wrapped is returned unchanged, so quoting the same
/// identifier twice while building one statement is harmless.
pub fn quote_identifier(name: &str, quote: char) -> String {
    let already_quoted = name.len() >= 2 && name.starts_with(quote) && name.ends_with(quote);
    if already_quoted {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Single-quote a string literal, doubling embedded single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `X'0A1B'` hex blob literal.
pub fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out.push('\'');
    out
}

fn float_literal(v: f64) -> String {
    if !v.is_finite() {
        return quote_string(&v.to_string());
    }
    let text = v.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

/// Render a value as a SQL literal.
///
/// Numbers and booleans are emitted unquoted (Rust's float and integer
/// formatting does not depend on locale); everything else is quoted.
pub fn quoted_value<D: DialectProvider + ?Sized>(dialect: &D, value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => dialect.bool_literal(*b).to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Float(v) => float_literal(f64::from(*v)),
        Value::Double(v) => float_literal(*v),
        Value::Decimal(d) => d.to_string(),
        Value::Bytes(b) => dialect.bytes_literal(b),
        Value::Text(s) => quote_string(s),
        other => quote_string(&other.to_text().unwrap_or_default()),
    })
}

/// Render a value destined for `field` as a SQL literal.
///
/// Fields whose host type has no SQL representation are rejected even when
/// the value itself could be rendered.
pub fn quoted_field_value<D: DialectProvider + ?Sized>(
    dialect: &D,
    field: &FieldDefinition,
    value: &Value,
) -> Result<String> {
    if field.field_type.host == HostType::Custom {
        return Err(Error::unsupported_type(
            field.field_type.type_name,
            "value quoting",
        ));
    }
    dialect.quoted_value(value)
}

/// Strip characters that cannot appear in a parameter placeholder.
///
/// Distinct names may map to the same placeholder; command builders
/// disambiguate those. A name with nothing left becomes `p`.
pub fn param_safe_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if safe.is_empty() { "p".to_string() } else { safe }
}

/// Bound parameter for `field`, typed through the dialect's type map.
///
/// Types without a direct mapping are bound as strings.
pub fn create_parameter<D: DialectProvider + ?Sized>(
    dialect: &D,
    field: &FieldDefinition,
    value: Value,
) -> Result<Parameter> {
    let resolved = dialect
        .type_map()
        .resolve(&field.field_type, "parameter binding")?;
    let value = match resolved {
        Resolved::Mapped(_) => value,
        Resolved::AsString => value.to_text().map_or(Value::Null, Value::Text),
    };
    Ok(Parameter::named(dialect.param_name(field.field_name), value).db_type(resolved.db_type()))
}

/// Bound parameter for a bare value, typed from the value itself.
pub fn create_value_parameter(name: String, value: Value) -> Parameter {
    let db_type = match &value {
        Value::Null | Value::Text(_) | Value::Json(_) => DbType::String,
        Value::Bool(_) => DbType::Boolean,
        Value::TinyInt(_) => DbType::Byte,
        Value::SmallInt(_) => DbType::Int16,
        Value::Int(_) => DbType::Int32,
        Value::BigInt(_) => DbType::Int64,
        Value::Float(_) => DbType::Single,
        Value::Double(_) => DbType::Double,
        Value::Decimal(_) => DbType::Decimal,
        Value::Bytes(_) => DbType::Binary,
        Value::Uuid(_) => DbType::Guid,
        Value::Date(_) => DbType::Date,
        Value::Time(_) => DbType::Time,
        Value::Timestamp(_) => DbType::DateTime,
    };
    Parameter::named(name, value).db_type(db_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnsiDialect;
    use crate::test_models::{Post, Shape};
    use slimorm_core::model_definition;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Post", '"'), "\"Post\"");
        assert_eq!(quote_identifier("we\"ird", '"'), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("Post", '`'), "`Post`");
    }

    #[test]
    fn test_quote_identifier_is_idempotent() {
        let once = quote_identifier("Post", '"');
        assert_eq!(quote_identifier(&once, '"'), once);
    }

    #[test]
    fn test_quote_string_round_trip() {
        for s in ["O'Brien", "''", "a'b'c'", "plain", "'"] {
            let quoted = quote_string(s);
            assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
            let inner = &quoted[1..quoted.len() - 1];
            assert_eq!(inner.replace("''", "'"), s);
            // every quote inside the literal is doubled
            assert_eq!(inner.matches('\'').count(), s.matches('\'').count() * 2);
        }
    }

    #[test]
    fn test_hex_literal() {
        assert_eq!(hex_literal(&[0x0a, 0xff]), "X'0AFF'");
        assert_eq!(hex_literal(&[]), "X''");
    }

    #[test]
    fn test_param_safe_name() {
        assert_eq!(param_safe_name("Unit Price%"), "UnitPrice");
        assert_eq!(param_safe_name("customer_id"), "customer_id");
        assert_eq!(param_safe_name("%%"), "p");
    }

    #[test]
    fn test_quoted_values() {
        let d = AnsiDialect::new();
        assert_eq!(d.quoted_value(&Value::Null).unwrap(), "NULL");
        assert_eq!(d.quoted_value(&Value::Bool(true)).unwrap(), "1");
        assert_eq!(d.quoted_value(&Value::Bool(false)).unwrap(), "0");
        assert_eq!(d.quoted_value(&Value::Int(-42)).unwrap(), "-42");
        assert_eq!(d.quoted_value(&Value::Double(1.0)).unwrap(), "1.0");
        assert_eq!(d.quoted_value(&Value::Double(0.25)).unwrap(), "0.25");
        assert_eq!(d.quoted_value(&Value::Float(2.5)).unwrap(), "2.5");
        assert_eq!(d.quoted_value(&Value::Double(f64::NAN)).unwrap(), "'NaN'");
        assert_eq!(
            d.quoted_value(&Value::Text("O'Brien".into())).unwrap(),
            "'O''Brien'"
        );
        assert_eq!(d.quoted_value(&Value::Bytes(vec![1, 2])).unwrap(), "X'0102'");
    }

    #[test]
    fn test_quoted_field_value_rejects_custom_types() {
        let d = AnsiDialect::new();
        let def = model_definition::<Shape>();
        let outline = def.field("outline").unwrap();
        let err = d.quoted_field_value(outline, &Value::Null).unwrap_err();
        match err {
            Error::UnsupportedType { type_name, .. } => {
                assert_eq!(type_name, "alloc::vec::Vec<(i32, i32)>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_create_parameter_uses_type_map() {
        let d = AnsiDialect::new();
        let def = model_definition::<Post>();
        let title = def.field("title").unwrap();
        let p = d.create_parameter(title, Value::Text("x".into())).unwrap();
        assert_eq!(p.name, "@Title");
        assert_eq!(p.db_type, Some(DbType::String));

        d.settings().set_param_prefix(":");
        let views = def.field("views").unwrap();
        let p = d.create_parameter(views, Value::Int(3)).unwrap();
        assert_eq!(p.name, ":Views");
        assert_eq!(p.db_type, Some(DbType::Int32));
    }

    #[test]
    fn test_value_parameter_types() {
        let p = create_value_parameter("@n".into(), Value::Int(1));
        assert_eq!(p.db_type, Some(DbType::Int32));
        let p = create_value_parameter("@s".into(), Value::Null);
        assert_eq!(p.db_type, Some(DbType::String));
    }
}
