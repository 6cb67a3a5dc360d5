//! Mutable per-provider configuration.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use slimorm_core::{NamingStrategy, PassThroughNaming};

/// Default length for string columns without an explicit length.
pub const DEFAULT_STRING_LENGTH: u32 = 8000;

/// Default prefix for named parameters.
pub const DEFAULT_PARAM_PREFIX: &str = "@";

/// Column type formats for strings; `{}` is replaced with the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringColumnTemplate {
    pub ascii: &'static str,
    pub unicode: &'static str,
}

impl StringColumnTemplate {
    pub const fn new(ascii: &'static str, unicode: &'static str) -> Self {
        Self { ascii, unicode }
    }

    pub fn render(&self, length: u32, unicode: bool) -> String {
        let template = if unicode { self.unicode } else { self.ascii };
        template.replace("{}", &length.to_string())
    }
}

impl Default for StringColumnTemplate {
    fn default() -> Self {
        Self::new("VARCHAR({})", "NVARCHAR({})")
    }
}

struct SettingsState {
    default_string_length: u32,
    use_unicode: bool,
    naming_strategy: Arc<dyn NamingStrategy>,
    param_prefix: String,
    /// Derived from the three fields above; rebuilt on every change.
    string_column_definition: String,
}

/// Per-provider settings shared by every statement the provider renders.
///
/// Reads take a shared lock; setters take it exclusively and recompute the
/// derived string column definition before returning.
pub struct DialectSettings {
    template: StringColumnTemplate,
    state: RwLock<SettingsState>,
}

impl DialectSettings {
    pub fn new(template: StringColumnTemplate) -> Self {
        Self {
            template,
            state: RwLock::new(SettingsState {
                default_string_length: DEFAULT_STRING_LENGTH,
                use_unicode: false,
                naming_strategy: Arc::new(PassThroughNaming),
                param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
                string_column_definition: template.render(DEFAULT_STRING_LENGTH, false),
            }),
        }
    }

    pub fn template(&self) -> StringColumnTemplate {
        self.template
    }

    pub fn default_string_length(&self) -> u32 {
        self.state.read().default_string_length
    }

    pub fn set_default_string_length(&self, length: u32) {
        let mut state = self.state.write();
        state.default_string_length = length;
        state.string_column_definition = self.template.render(length, state.use_unicode);
        tracing::debug!(length, "Default string length changed");
    }

    pub fn use_unicode(&self) -> bool {
        self.state.read().use_unicode
    }

    pub fn set_use_unicode(&self, use_unicode: bool) {
        let mut state = self.state.write();
        state.use_unicode = use_unicode;
        state.string_column_definition =
            self.template.render(state.default_string_length, use_unicode);
        tracing::debug!(use_unicode, "Unicode string columns toggled");
    }

    /// Column type for strings without an explicit length.
    pub fn string_column_definition(&self) -> String {
        self.state.read().string_column_definition.clone()
    }

    /// Column type for a string of `length` characters, honoring the unicode flag.
    pub fn string_column_definition_for(&self, length: u32) -> String {
        self.template.render(length, self.use_unicode())
    }

    pub fn naming_strategy(&self) -> Arc<dyn NamingStrategy> {
        Arc::clone(&self.state.read().naming_strategy)
    }

    pub fn set_naming_strategy(&self, strategy: Arc<dyn NamingStrategy>) {
        tracing::debug!(strategy = ?strategy, "Naming strategy changed");
        self.state.write().naming_strategy = strategy;
    }

    pub fn param_prefix(&self) -> String {
        self.state.read().param_prefix.clone()
    }

    pub fn set_param_prefix(&self, prefix: impl Into<String>) {
        self.state.write().param_prefix = prefix.into();
    }
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self::new(StringColumnTemplate::default())
    }
}

impl fmt::Debug for DialectSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("DialectSettings")
            .field("default_string_length", &state.default_string_length)
            .field("use_unicode", &state.use_unicode)
            .field("naming_strategy", &state.naming_strategy)
            .field("param_prefix", &state.param_prefix)
            .finish()
    }
}
