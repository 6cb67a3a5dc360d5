//! Field and column definitions.

use std::fmt;
use std::sync::Arc;

use crate::model::ModelDefinition;
use crate::types::FieldType;

/// Referential action for foreign key constraints (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    /// Raise an error if any references exist.
    #[default]
    NoAction,
    /// Same as NO ACTION, checked immediately.
    Restrict,
    /// Delete/update referencing rows.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their default values.
    SetDefault,
}

impl ReferentialAction {
    /// Get the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse a referential action (case-insensitive, spaces or underscores).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NO ACTION" | "NOACTION" | "NO_ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" | "SETNULL" | "SET_NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" | "SETDEFAULT" | "SET_DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key from one field to the primary key of another model.
///
/// The referenced model is resolved lazily through the metadata cache, so
/// self-references and cycles between models are fine.
#[derive(Clone, Copy)]
pub struct ForeignKeyDefinition {
    pub references: fn() -> Arc<ModelDefinition>,
    /// Explicit constraint name.
    pub foreign_key_name: Option<&'static str>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyDefinition {
    pub const fn new(references: fn() -> Arc<ModelDefinition>) -> Self {
        Self {
            references,
            foreign_key_name: None,
            on_delete: None,
            on_update: None,
        }
    }

    pub const fn name(mut self, name: &'static str) -> Self {
        self.foreign_key_name = Some(name);
        self
    }

    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// The referenced model definition.
    pub fn referenced(&self) -> Arc<ModelDefinition> {
        (self.references)()
    }
}

impl fmt::Debug for ForeignKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKeyDefinition")
            .field("foreign_key_name", &self.foreign_key_name)
            .field("on_delete", &self.on_delete)
            .field("on_update", &self.on_update)
            .finish_non_exhaustive()
    }
}

/// Metadata about one mapped field/column.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Rust member name
    pub name: &'static str,
    /// Database column name (alias, or the member name)
    pub field_name: &'static str,
    pub field_type: FieldType,
    pub is_primary_key: bool,
    pub auto_increment: bool,
    pub is_nullable: bool,
    /// Computed by the database; never written.
    pub is_computed: bool,
    /// Excluded from writes and DDL, still materialized when present.
    pub ignore: bool,
    /// Declared length for strings, or precision for decimals
    pub field_length: Option<u32>,
    /// Scale for decimals
    pub scale: Option<u32>,
    /// Default value expression (SQL)
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<ForeignKeyDefinition>,
    pub is_indexed: bool,
    pub is_unique: bool,
    /// Named sequence backing this column, for dialects with sequences
    pub sequence: Option<&'static str>,
    /// Position in the model's accessor table
    pub index: usize,
}

impl FieldDefinition {
    /// Create a new field definition with defaults.
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_name: name,
            field_type,
            is_primary_key: false,
            auto_increment: false,
            is_nullable: false,
            is_computed: false,
            ignore: false,
            field_length: None,
            scale: None,
            default_value: None,
            foreign_key: None,
            is_indexed: false,
            is_unique: false,
            sequence: None,
            index: 0,
        }
    }

    /// Set the database column name.
    pub const fn alias(mut self, field_name: &'static str) -> Self {
        self.field_name = field_name;
        self
    }

    pub const fn primary_key(mut self, value: bool) -> Self {
        self.is_primary_key = value;
        self
    }

    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    pub const fn nullable(mut self, value: bool) -> Self {
        self.is_nullable = value;
        self
    }

    pub const fn computed(mut self, value: bool) -> Self {
        self.is_computed = value;
        self
    }

    pub const fn ignore(mut self, value: bool) -> Self {
        self.ignore = value;
        self
    }

    pub const fn length(mut self, value: u32) -> Self {
        self.field_length = Some(value);
        self
    }

    pub const fn length_opt(mut self, value: Option<u32>) -> Self {
        self.field_length = value;
        self
    }

    pub const fn scale(mut self, value: u32) -> Self {
        self.scale = Some(value);
        self
    }

    pub const fn scale_opt(mut self, value: Option<u32>) -> Self {
        self.scale = value;
        self
    }

    pub const fn default_value(mut self, expr: &'static str) -> Self {
        self.default_value = Some(expr);
        self
    }

    pub const fn default_value_opt(mut self, expr: Option<&'static str>) -> Self {
        self.default_value = expr;
        self
    }

    pub const fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.foreign_key = Some(fk);
        self
    }

    pub const fn indexed(mut self, value: bool) -> Self {
        self.is_indexed = value;
        self
    }

    /// Mark as unique. A unique field is also indexed.
    pub const fn unique(mut self, value: bool) -> Self {
        self.is_unique = value;
        if value {
            self.is_indexed = true;
        }
        self
    }

    pub const fn sequence(mut self, name: &'static str) -> Self {
        self.sequence = Some(name);
        self
    }

    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Whether the field belongs in an INSERT column list.
    pub const fn should_insert(&self) -> bool {
        !self.auto_increment && !self.is_computed && !self.ignore
    }

    /// Whether the field belongs in an UPDATE SET list.
    pub const fn should_update(&self) -> bool {
        !self.is_primary_key && !self.auto_increment && !self.is_computed && !self.ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostType;

    fn int_field(name: &'static str) -> FieldDefinition {
        FieldDefinition::new(name, FieldType::new(HostType::I64, "i64"))
    }

    #[test]
    fn test_referential_action_as_sql() {
        assert_eq!(ReferentialAction::NoAction.as_sql(), "NO ACTION");
        assert_eq!(ReferentialAction::Restrict.as_sql(), "RESTRICT");
        assert_eq!(ReferentialAction::Cascade.as_sql(), "CASCADE");
        assert_eq!(ReferentialAction::SetNull.as_sql(), "SET NULL");
        assert_eq!(ReferentialAction::SetDefault.as_sql(), "SET DEFAULT");
    }

    #[test]
    fn test_referential_action_parse() {
        assert_eq!(ReferentialAction::parse("cascade"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::parse("set null"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::parse("SET_DEFAULT"), Some(ReferentialAction::SetDefault));
        assert_eq!(ReferentialAction::parse("noaction"), Some(ReferentialAction::NoAction));
        assert_eq!(ReferentialAction::parse("invalid"), None);
    }

    #[test]
    fn test_field_definition_defaults() {
        let field = int_field("id");
        assert_eq!(field.field_name, "id");
        assert!(!field.is_primary_key);
        assert!(!field.is_nullable);
        assert!(field.should_insert());
        assert!(field.should_update());
    }

    #[test]
    fn test_auto_increment_is_never_written() {
        let field = int_field("id").primary_key(true).auto_increment(true);
        assert!(!field.should_insert());
        assert!(!field.should_update());
    }

    #[test]
    fn test_computed_is_never_written() {
        let field = int_field("total").computed(true);
        assert!(!field.should_insert());
        assert!(!field.should_update());
    }

    #[test]
    fn test_unique_implies_indexed() {
        let field = int_field("code").unique(true);
        assert!(field.is_unique);
        assert!(field.is_indexed);
    }

    #[test]
    fn test_alias_and_opt_setters() {
        let field = int_field("customer_id")
            .alias("CustomerId")
            .length_opt(Some(10))
            .scale_opt(None)
            .default_value_opt(Some("0"));
        assert_eq!(field.name, "customer_id");
        assert_eq!(field.field_name, "CustomerId");
        assert_eq!(field.field_length, Some(10));
        assert_eq!(field.scale, None);
        assert_eq!(field.default_value, Some("0"));
    }
}
