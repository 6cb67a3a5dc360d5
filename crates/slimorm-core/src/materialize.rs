//! Row-to-model materialization.
//!
//! Each field is resolved to a column ordinal once per query: first by exact
//! (case-insensitive) name, then by a series of fuzzy rules. Resolutions,
//! including misses, are kept in an [`IndexCache`] so later rows of the same
//! result set skip name matching entirely.
//!
//! Conversion failures are logged and the field is left at its default, unless
//! the materializer runs in strict mode.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::Result;
use crate::field::FieldDefinition;
use crate::model::{Model, ModelMetadata, model_metadata};
use crate::naming::NamingStrategy;
use crate::row::DataReader;

/// Per-query cache of field ordinals, keyed by field member name.
///
/// `Some(None)` is the not-found sentinel: the field is skipped on every row.
#[derive(Debug, Default)]
pub struct IndexCache {
    ordinals: HashMap<&'static str, Option<usize>>,
    resolutions: usize,
    fuzzy_attempts: usize,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached ordinal for `field`, if it was resolved before.
    pub fn get(&self, field: &str) -> Option<Option<usize>> {
        self.ordinals.get(field).copied()
    }

    /// Number of name resolutions performed.
    pub fn resolutions(&self) -> usize {
        self.resolutions
    }

    /// Number of times the fuzzy matcher ran.
    pub fn fuzzy_attempts(&self) -> usize {
        self.fuzzy_attempts
    }

    fn ordinal_for<R: DataReader + ?Sized>(
        &mut self,
        reader: &R,
        field: &FieldDefinition,
        naming: &dyn NamingStrategy,
    ) -> Option<usize> {
        if let Some(cached) = self.ordinals.get(field.name) {
            return *cached;
        }
        self.resolutions += 1;
        let column = naming.column_name(field.field_name);
        let ordinal = reader.ordinal(&column).or_else(|| {
            self.fuzzy_attempts += 1;
            try_guess_column_index(field.field_name, reader)
        });
        if ordinal.is_none() {
            tracing::trace!(field = field.name, column = %column, "No column for field");
        }
        self.ordinals.insert(field.name, ordinal);
        ordinal
    }
}

// ============================================================================
// Fuzzy matching
// ============================================================================

fn disallowed_chars() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[^0-9A-Za-z_]").ok())
        .as_ref()
}

fn sanitize(name: &str) -> String {
    match disallowed_chars() {
        Some(re) => re.replace_all(name, "").into_owned(),
        None => name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect(),
    }
}

fn strip_underscores(name: &str) -> String {
    name.replace('_', "")
}

fn ends_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack
            .get(haystack.len() - needle.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(needle))
}

/// Guess which column holds `field_name` when no column matches exactly.
///
/// Rules are tried in order, each against every column, and the first hit
/// wins:
///
/// 1. column with underscores removed equals the field name
/// 2. column with characters other than letters, digits and `_` removed
/// 3. both of the above
/// 4. column ends with the field name (arbitrary prefix)
/// 5. 4 applied to the underscore-stripped column
/// 6. 4 applied to the sanitized column
/// 7. 4 applied to the sanitized, underscore-stripped column
///
/// Comparisons ignore case, and the field name also matches with its own
/// underscores removed, so `customer_id` finds `CustomerId`.
pub fn try_guess_column_index<R: DataReader + ?Sized>(field_name: &str, reader: &R) -> Option<usize> {
    let bare_field = strip_underscores(field_name);
    let is_match = |candidate: &str| {
        candidate.eq_ignore_ascii_case(field_name) || candidate.eq_ignore_ascii_case(&bare_field)
    };
    let is_suffix = |candidate: &str| {
        ends_with_ignore_case(candidate, field_name) || ends_with_ignore_case(candidate, &bare_field)
    };

    let columns: Vec<(String, String, String)> = (0..reader.field_count())
        .map(|i| {
            let name = reader.column_name(i).unwrap_or_default().to_string();
            let no_underscores = strip_underscores(&name);
            let sanitized = sanitize(&name);
            (name, no_underscores, sanitized)
        })
        .collect();

    type Rule = fn(&(String, String, String)) -> String;
    let exact_rules: [Rule; 3] = [
        |c| c.1.clone(),
        |c| c.2.clone(),
        |c| strip_underscores(&c.2),
    ];
    let suffix_rules: [Rule; 4] = [
        |c| c.0.clone(),
        |c| c.1.clone(),
        |c| c.2.clone(),
        |c| strip_underscores(&c.2),
    ];

    for rule in exact_rules {
        if let Some(i) = columns.iter().position(|c| is_match(&rule(c))) {
            return Some(i);
        }
    }
    for rule in suffix_rules {
        if let Some(i) = columns.iter().position(|c| is_suffix(&rule(c))) {
            return Some(i);
        }
    }
    None
}

// ============================================================================
// Materializer
// ============================================================================

/// Builds model instances from the rows of one result set.
pub struct Materializer<'a, M> {
    meta: Arc<ModelMetadata<M>>,
    naming: &'a dyn NamingStrategy,
    cache: IndexCache,
    strict: bool,
}

impl<'a, M: Model> Materializer<'a, M> {
    pub fn new(naming: &'a dyn NamingStrategy) -> Self {
        Self {
            meta: model_metadata::<M>(),
            naming,
            cache: IndexCache::new(),
            strict: false,
        }
    }

    /// Fail on the first field conversion error instead of logging it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn index_cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Build one instance from the reader's current row.
    pub fn populate<R: DataReader + ?Sized>(&mut self, reader: &R) -> Result<M> {
        let mut obj = M::default();
        for field in &self.meta.definition.all_field_definitions {
            let Some(ordinal) = self.cache.ordinal_for(reader, field, self.naming) else {
                continue;
            };
            let value = reader.value(ordinal);
            if let Err(e) = self.meta.set_value(&mut obj, field, value) {
                if self.strict {
                    return Err(e);
                }
                tracing::warn!(
                    model = M::MODEL_NAME,
                    field = field.name,
                    ordinal,
                    error = %e,
                    "Failed to materialize field, leaving default"
                );
            }
        }
        Ok(obj)
    }

    /// Read every remaining row.
    pub fn read_all<R: DataReader + ?Sized>(&mut self, reader: &mut R) -> Result<Vec<M>> {
        let mut out = Vec::new();
        while reader.read() {
            out.push(self.populate(reader)?);
        }
        tracing::trace!(model = M::MODEL_NAME, rows = out.len(), "Materialized rows");
        Ok(out)
    }

    /// Read the next row, if any.
    pub fn read_first<R: DataReader + ?Sized>(&mut self, reader: &mut R) -> Result<Option<M>> {
        if reader.read() {
            self.populate(reader).map(Some)
        } else {
            Ok(None)
        }
    }
}
