//! Generic provider using only the trait defaults.

use crate::provider::DialectProvider;
use crate::settings::DialectSettings;
use crate::type_map::{TypeMap, base_type_map};

/// Plain ANSI SQL: double-quoted identifiers, `1`/`0` booleans, the base type
/// map and no identity retrieval.
///
/// Useful for rendering statements without a concrete database, and as the
/// reference behavior the other providers deviate from.
#[derive(Debug)]
pub struct AnsiDialect {
    settings: DialectSettings,
    type_map: TypeMap,
}

impl AnsiDialect {
    pub fn new() -> Self {
        Self {
            settings: DialectSettings::default(),
            type_map: base_type_map().build(),
        }
    }
}

impl Default for AnsiDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectProvider for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }
}
