//! Model trait, model definitions, and the process-wide metadata cache.
//!
//! A [`ModelDefinition`] is computed once per Rust type, the first time the
//! type is used, and shared for the lifetime of the process. Alongside it the
//! cache keeps the type's accessor table: one getter/setter pair per field,
//! indexed by [`FieldDefinition::index`], so materialization and statement
//! generation never re-derive anything per row.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::field::FieldDefinition;
use crate::value::Value;

/// Trait for types that map to a database table.
///
/// Usually implemented by `#[derive(Model)]`; a manual implementation only
/// needs to keep `fields()` and `accessors()` in the same order.
pub trait Model: Default + Send + Sync + Sized + 'static {
    /// Table name before the naming strategy is applied.
    const MODEL_NAME: &'static str;

    /// Field metadata in declaration order, ignored fields included.
    fn fields() -> Vec<FieldDefinition>;

    /// Getter/setter pairs, one per entry of `fields()`.
    fn accessors() -> Vec<FieldAccessor<Self>>;

    /// Multi-column indexes.
    fn composite_indexes() -> Vec<CompositeIndex> {
        Vec::new()
    }
}

/// Compiled getter/setter pair for one field of `M`.
pub struct FieldAccessor<M> {
    pub get: fn(&M) -> Value,
    pub set: fn(&mut M, Value) -> Result<()>,
}

impl<M> FieldAccessor<M> {
    pub const fn new(get: fn(&M) -> Value, set: fn(&mut M, Value) -> Result<()>) -> Self {
        Self { get, set }
    }
}

impl<M> Clone for FieldAccessor<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for FieldAccessor<M> {}

impl<M> fmt::Debug for FieldAccessor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldAccessor")
    }
}

/// A named multi-column index declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeIndex {
    /// Host names of the indexed fields, in index order.
    pub field_names: Vec<&'static str>,
    pub unique: bool,
    pub name: Option<&'static str>,
}

impl CompositeIndex {
    pub fn new(field_names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            field_names: field_names.into_iter().collect(),
            unique: false,
            name: None,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
}

// ============================================================================
// ModelDefinition
// ============================================================================

/// Cached metadata describing how a type maps to a table.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    /// Table name before the naming strategy is applied.
    pub model_name: &'static str,
    /// Persisted fields in declaration order (ignored fields excluded).
    pub field_definitions: Vec<FieldDefinition>,
    /// Every field, ignored ones included.
    pub all_field_definitions: Vec<FieldDefinition>,
    pub composite_indexes: Vec<CompositeIndex>,
    primary_key: Option<usize>,
}

impl ModelDefinition {
    /// Build a definition from raw field metadata.
    ///
    /// Field indexes are assigned from declaration order. The primary key is
    /// the first field flagged as such; failing that, the first field named
    /// `id` (host or column name, any case); failing that, the first field.
    /// The chosen field is flagged as primary key in the stored metadata.
    pub fn new(
        model_name: &'static str,
        fields: Vec<FieldDefinition>,
        composite_indexes: Vec<CompositeIndex>,
    ) -> Self {
        let mut all: Vec<FieldDefinition> = fields
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.with_index(i))
            .collect();

        let primary_key = all
            .iter()
            .position(|f| f.is_primary_key && !f.ignore)
            .or_else(|| {
                all.iter().position(|f| {
                    !f.ignore
                        && (f.name.eq_ignore_ascii_case("id")
                            || f.field_name.eq_ignore_ascii_case("id"))
                })
            })
            .or_else(|| all.iter().position(|f| !f.ignore));

        if let Some(pk) = primary_key {
            for (i, field) in all.iter_mut().enumerate() {
                field.is_primary_key = i == pk;
            }
            tracing::trace!(
                model = model_name,
                primary_key = all[pk].name,
                "Resolved primary key"
            );
        }

        let field_definitions = all.iter().filter(|f| !f.ignore).cloned().collect();

        Self {
            model_name,
            field_definitions,
            all_field_definitions: all,
            composite_indexes,
            primary_key,
        }
    }

    /// The designated primary key field, if the model has any fields.
    pub fn primary_key(&self) -> Option<&FieldDefinition> {
        self.primary_key.map(|i| &self.all_field_definitions[i])
    }

    /// The primary key, or a malformed-operation error naming the model.
    pub fn require_primary_key(&self, sql: &str) -> Result<&FieldDefinition> {
        self.primary_key().ok_or_else(|| {
            Error::malformed(format!("{} has no primary key", self.model_name), sql)
        })
    }

    /// Look up a field by its Rust member name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.all_field_definitions.iter().find(|f| f.name == name)
    }

    /// Look up a field by member name or column name, ignoring case.
    pub fn find_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field(name).or_else(|| {
            self.all_field_definitions.iter().find(|f| {
                f.name.eq_ignore_ascii_case(name) || f.field_name.eq_ignore_ascii_case(name)
            })
        })
    }

    /// Fields that carry a single-column index or unique flag.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.field_definitions
            .iter()
            .filter(|f| (f.is_indexed || f.is_unique) && !f.is_primary_key)
    }

    /// Fields with a foreign key.
    pub fn foreign_key_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.field_definitions
            .iter()
            .filter(|f| f.foreign_key.is_some())
    }
}

// ============================================================================
// Accessor table and instance views
// ============================================================================

/// Definition plus compiled accessor table for `M`.
pub struct ModelMetadata<M> {
    pub definition: Arc<ModelDefinition>,
    accessors: Vec<FieldAccessor<M>>,
}

impl<M: Model> ModelMetadata<M> {
    fn build() -> Self {
        let definition = ModelDefinition::new(M::MODEL_NAME, M::fields(), M::composite_indexes());
        let accessors = M::accessors();
        if accessors.len() != definition.all_field_definitions.len() {
            tracing::warn!(
                model = M::MODEL_NAME,
                fields = definition.all_field_definitions.len(),
                accessors = accessors.len(),
                "Accessor table does not match field list"
            );
        }
        tracing::debug!(
            model = M::MODEL_NAME,
            fields = definition.all_field_definitions.len(),
            "Built model metadata"
        );
        Self {
            definition: Arc::new(definition),
            accessors,
        }
    }

    /// Read a field from `obj`.
    pub fn get_value(&self, obj: &M, field: &FieldDefinition) -> Value {
        self.accessors
            .get(field.index)
            .map_or(Value::Null, |a| (a.get)(obj))
    }

    /// Write a field on `obj`.
    pub fn set_value(&self, obj: &mut M, field: &FieldDefinition, value: Value) -> Result<()> {
        let accessor = self.accessors.get(field.index).ok_or_else(|| {
            Error::Custom(format!(
                "{} has no accessor for field {}",
                M::MODEL_NAME,
                field.name
            ))
        })?;
        (accessor.set)(obj, value)
    }

    /// A [`FieldValues`] view of `obj`.
    pub fn instance<'a>(&'a self, obj: &'a M) -> Instance<'a, M> {
        Instance { meta: self, obj }
    }

    /// Value of the primary key of `obj`.
    pub fn primary_key_value(&self, obj: &M) -> Option<Value> {
        self.definition
            .primary_key()
            .map(|pk| self.get_value(obj, pk))
    }
}

impl<M> fmt::Debug for ModelMetadata<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMetadata")
            .field("definition", &self.definition)
            .field("accessors", &self.accessors.len())
            .finish()
    }
}

/// Read access to field values of one object, independent of its type.
pub trait FieldValues {
    fn value_of(&self, field: &FieldDefinition) -> Value;
}

/// A model instance paired with its accessor table.
pub struct Instance<'a, M> {
    meta: &'a ModelMetadata<M>,
    obj: &'a M,
}

impl<M: Model> FieldValues for Instance<'_, M> {
    fn value_of(&self, field: &FieldDefinition) -> Value {
        self.meta.get_value(self.obj, field)
    }
}

/// Values keyed by member name, falling back to column name.
impl FieldValues for HashMap<String, Value> {
    fn value_of(&self, field: &FieldDefinition) -> Value {
        self.get(field.name)
            .or_else(|| self.get(field.field_name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

impl FieldValues for HashMap<&str, Value> {
    fn value_of(&self, field: &FieldDefinition) -> Value {
        self.get(field.name)
            .or_else(|| self.get(field.field_name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

// ============================================================================
// Cache
// ============================================================================

type CacheMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static METADATA_CACHE: LazyLock<RwLock<CacheMap>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolve (and memoize) the metadata for `M`.
pub fn model_metadata<M: Model>() -> Arc<ModelMetadata<M>> {
    let key = TypeId::of::<M>();
    if let Some(entry) = METADATA_CACHE.read().get(&key) {
        if let Ok(meta) = Arc::clone(entry).downcast::<ModelMetadata<M>>() {
            return meta;
        }
    }

    // Built outside the lock; under a race the first insert wins and the
    // duplicate is dropped.
    let built = Arc::new(ModelMetadata::<M>::build());
    let mut cache = METADATA_CACHE.write();
    let entry = cache
        .entry(key)
        .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
    Arc::clone(entry)
        .downcast::<ModelMetadata<M>>()
        .unwrap_or(built)
}

/// Resolve the definition for `M`.
pub fn model_definition<M: Model>() -> Arc<ModelDefinition> {
    Arc::clone(&model_metadata::<M>().definition)
}

/// Number of types with cached metadata.
pub fn cached_model_count() -> usize {
    METADATA_CACHE.read().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldType, HostType, SqlField};

    #[derive(Debug, Default, PartialEq)]
    struct Customer {
        customer_id: i64,
        name: String,
        scratch: String,
    }

    impl Model for Customer {
        const MODEL_NAME: &'static str = "Customer";

        fn fields() -> Vec<FieldDefinition> {
            vec![
                FieldDefinition::new("customer_id", i64::field_type())
                    .alias("CustomerId")
                    .primary_key(true)
                    .auto_increment(true),
                FieldDefinition::new("name", String::field_type()).length(50),
                FieldDefinition::new("scratch", String::field_type()).ignore(true),
            ]
        }

        fn accessors() -> Vec<FieldAccessor<Self>> {
            vec![
                FieldAccessor::<Self>::new(
                    |m| m.customer_id.to_value(),
                    |m, v| {
                        m.customer_id = SqlField::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.name.to_value(),
                    |m, v| {
                        m.name = SqlField::from_value(v)?;
                        Ok(())
                    },
                ),
                FieldAccessor::<Self>::new(
                    |m| m.scratch.to_value(),
                    |m, v| {
                        m.scratch = SqlField::from_value(v)?;
                        Ok(())
                    },
                ),
            ]
        }
    }

    fn text(name: &'static str) -> FieldDefinition {
        FieldDefinition::new(name, FieldType::new(HostType::String, "alloc::string::String"))
    }

    #[test]
    fn test_metadata_is_memoized() {
        let a = model_metadata::<Customer>();
        let b = model_metadata::<Customer>();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&model_definition::<Customer>(), &a.definition));
        assert!(cached_model_count() >= 1);
    }

    #[test]
    fn test_ignored_fields_only_in_superset() {
        let def = model_definition::<Customer>();
        assert_eq!(def.field_definitions.len(), 2);
        assert_eq!(def.all_field_definitions.len(), 3);
        assert!(def.field("scratch").is_some_and(|f| f.ignore));
        assert_eq!(def.all_field_definitions[2].index, 2);
    }

    #[test]
    fn test_explicit_primary_key_wins() {
        let def = model_definition::<Customer>();
        let pk = def.primary_key().unwrap();
        assert_eq!(pk.name, "customer_id");
        assert_eq!(pk.field_name, "CustomerId");
    }

    #[test]
    fn test_primary_key_falls_back_to_id_convention() {
        let def = ModelDefinition::new("Tag", vec![text("label"), text("Id")], Vec::new());
        assert_eq!(def.primary_key().unwrap().name, "Id");
        assert!(def.field("Id").unwrap().is_primary_key);
        assert!(!def.field("label").unwrap().is_primary_key);
    }

    #[test]
    fn test_primary_key_falls_back_to_first_field() {
        let def = ModelDefinition::new("Note", vec![text("slug"), text("body")], Vec::new());
        assert_eq!(def.primary_key().unwrap().name, "slug");
    }

    #[test]
    fn test_only_first_flagged_key_is_kept() {
        let def = ModelDefinition::new(
            "Pair",
            vec![text("a").primary_key(true), text("b").primary_key(true)],
            Vec::new(),
        );
        assert_eq!(def.primary_key().unwrap().name, "a");
        assert!(!def.field("b").unwrap().is_primary_key);
    }

    #[test]
    fn test_empty_model_has_no_primary_key() {
        let def = ModelDefinition::new("Empty", Vec::new(), Vec::new());
        assert!(def.primary_key().is_none());
        assert!(matches!(
            def.require_primary_key("DELETE FROM \"Empty\""),
            Err(Error::MalformedOperation { .. })
        ));
    }

    #[test]
    fn test_find_field_by_column_name() {
        let def = model_definition::<Customer>();
        assert_eq!(def.find_field("customerid").unwrap().name, "customer_id");
        assert_eq!(def.find_field("NAME").unwrap().name, "name");
        assert!(def.find_field("missing").is_none());
    }

    #[test]
    fn test_accessors_read_and_write() {
        let meta = model_metadata::<Customer>();
        let mut c = Customer::default();
        let name = meta.definition.field("name").unwrap().clone();
        meta.set_value(&mut c, &name, Value::Text("Ada".into()))
            .unwrap();
        assert_eq!(c.name, "Ada");
        assert_eq!(meta.get_value(&c, &name), Value::Text("Ada".into()));
        assert_eq!(meta.instance(&c).value_of(&name), Value::Text("Ada".into()));
        assert_eq!(meta.primary_key_value(&c), Some(Value::BigInt(0)));
    }

    #[test]
    fn test_hash_map_field_values() {
        let mut values: HashMap<String, Value> = HashMap::new();
        values.insert("CustomerId".into(), Value::BigInt(9));
        let def = model_definition::<Customer>();
        assert_eq!(values.value_of(def.primary_key().unwrap()), Value::BigInt(9));
        assert_eq!(values.value_of(def.field("name").unwrap()), Value::Null);
    }
}
