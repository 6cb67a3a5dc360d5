//! Host type to database type mapping.

use std::collections::HashMap;

use slimorm_core::{DbType, Error, FieldType, HostType, Result};

/// How one host type is stored and bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    pub db_type: DbType,
    /// Column type phrase, e.g. `INTEGER` or `DECIMAL(18,2)`.
    pub column_definition: String,
}

/// A dialect's host type table, built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    entries: HashMap<HostType, TypeMapping>,
}

impl TypeMap {
    pub fn builder() -> TypeMapBuilder {
        TypeMapBuilder::default()
    }

    pub fn get(&self, host: HostType) -> Option<&TypeMapping> {
        self.entries.get(&host)
    }

    pub fn contains(&self, host: HostType) -> bool {
        self.entries.contains_key(&host)
    }

    /// Mapping for `field_type`, or the string fallback when the type has a
    /// string form. Types without one are rejected.
    pub fn resolve(&self, field_type: &FieldType, context: &'static str) -> Result<Resolved<'_>> {
        if let Some(mapping) = self.entries.get(&field_type.host) {
            return Ok(Resolved::Mapped(mapping));
        }
        if field_type.host.is_string_serializable() {
            tracing::trace!(
                type_name = field_type.type_name,
                "No type mapping, using string representation"
            );
            return Ok(Resolved::AsString);
        }
        Err(Error::unsupported_type(field_type.type_name, context))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`TypeMap::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    Mapped(&'a TypeMapping),
    /// Store and bind through the value's text form.
    AsString,
}

impl Resolved<'_> {
    pub fn db_type(&self) -> DbType {
        match self {
            Resolved::Mapped(m) => m.db_type,
            Resolved::AsString => DbType::String,
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeMapBuilder {
    entries: HashMap<HostType, TypeMapping>,
}

impl TypeMapBuilder {
    pub fn map(mut self, host: HostType, db_type: DbType, column_definition: &str) -> Self {
        self.entries.insert(
            host,
            TypeMapping {
                db_type,
                column_definition: column_definition.to_string(),
            },
        );
        self
    }

    pub fn build(self) -> TypeMap {
        TypeMap {
            entries: self.entries,
        }
    }
}

/// The ANSI-flavored base table most dialects start from.
///
/// Strings are rendered from the dialect settings instead of this table, but
/// keep an entry so their parameter type is known.
pub fn base_type_map() -> TypeMapBuilder {
    TypeMap::builder()
        .map(HostType::Bool, DbType::Boolean, "BOOL")
        .map(HostType::I8, DbType::Byte, "SMALLINT")
        .map(HostType::I16, DbType::Int16, "SMALLINT")
        .map(HostType::I32, DbType::Int32, "INTEGER")
        .map(HostType::I64, DbType::Int64, "BIGINT")
        .map(HostType::U8, DbType::Byte, "SMALLINT")
        .map(HostType::U16, DbType::UInt16, "INTEGER")
        .map(HostType::U32, DbType::UInt32, "BIGINT")
        .map(HostType::U64, DbType::UInt64, "NUMERIC(20)")
        .map(HostType::F32, DbType::Single, "REAL")
        .map(HostType::F64, DbType::Double, "DOUBLE PRECISION")
        .map(HostType::Decimal, DbType::Decimal, "DECIMAL(38,6)")
        .map(HostType::String, DbType::String, "VARCHAR(8000)")
        .map(HostType::Char, DbType::StringFixedLength, "CHAR(1)")
        .map(HostType::Bytes, DbType::Binary, "BLOB")
        .map(HostType::Uuid, DbType::Guid, "CHAR(36)")
        .map(HostType::Date, DbType::Date, "DATE")
        .map(HostType::Time, DbType::Time, "TIME")
        .map(HostType::DateTime, DbType::DateTime, "TIMESTAMP")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mapped() {
        let map = base_type_map().build();
        let ft = FieldType::new(HostType::I32, "i32");
        match map.resolve(&ft, "column definition").unwrap() {
            Resolved::Mapped(m) => assert_eq!(m.column_definition, "INTEGER"),
            Resolved::AsString => panic!("expected mapping"),
        }
    }

    #[test]
    fn test_resolve_falls_back_to_string() {
        let map = base_type_map().build();
        let ft = FieldType::new(HostType::Json, "serde_json::value::Value");
        let resolved = map.resolve(&ft, "column definition").unwrap();
        assert_eq!(resolved, Resolved::AsString);
        assert_eq!(resolved.db_type(), DbType::String);
    }

    #[test]
    fn test_resolve_custom_is_unsupported() {
        let map = base_type_map().build();
        let ft = FieldType::new(HostType::Custom, "my_app::Geometry");
        let err = map.resolve(&ft, "column definition").unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { ref type_name, .. } if type_name == "my_app::Geometry"));
    }

    #[test]
    fn test_builder_overrides_entry() {
        let map = base_type_map()
            .map(HostType::Bool, DbType::Boolean, "INTEGER")
            .build();
        assert_eq!(map.get(HostType::Bool).unwrap().column_definition, "INTEGER");
        assert!(map.contains(HostType::Uuid));
        assert!(!map.contains(HostType::Json));
    }
}
