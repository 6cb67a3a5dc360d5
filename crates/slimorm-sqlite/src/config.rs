//! SQLite connection configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use slimorm_core::{ConnectionError, ConnectionErrorKind, Result};

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// Private in-memory database, discarded when the connection closes.
    #[default]
    Memory,
    File(PathBuf),
}

impl DatabasePath {
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Library default; leaves whatever SQLite picks.
    #[default]
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "truncate" => Some(Self::Truncate),
            "persist" => Some(Self::Persist),
            "memory" => Some(Self::Memory),
            "wal" => Some(Self::Wal),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Settings applied when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: DatabasePath,
    /// `PRAGMA foreign_keys`
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Option<Duration>,
    /// Only applied to file databases.
    pub journal_mode: Option<JournalMode>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout: Some(Duration::from_secs(5)),
            journal_mode: None,
        }
    }
}

impl SqliteConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Parse a connection string.
    ///
    /// Accepted forms:
    /// - `:memory:` or `sqlite::memory:`
    /// - `sqlite://path/to/db.sqlite` or `sqlite:path/to/db.sqlite`
    /// - a plain file path
    ///
    /// Any form may carry `?key=value&...` options: `foreign_keys`,
    /// `busy_timeout` (milliseconds) and `journal_mode`.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let (location, query) = match url.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (url, None),
        };

        let location = location
            .strip_prefix("sqlite://")
            .or_else(|| location.strip_prefix("sqlite:"))
            .unwrap_or(location);
        if location.is_empty() {
            return Err(invalid(url, "database path is required"));
        }

        let mut config = if location == ":memory:" {
            Self::memory()
        } else {
            Self::file(location)
        };

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                return Err(invalid(url, &format!("option {pair:?} has no value")));
            };
            match key {
                "foreign_keys" => config.foreign_keys = parse_flag(value).ok_or_else(|| {
                    invalid(url, &format!("foreign_keys expects a boolean, got {value:?}"))
                })?,
                "busy_timeout" => {
                    let ms = value.parse::<u64>().map_err(|_| {
                        invalid(url, &format!("busy_timeout expects milliseconds, got {value:?}"))
                    })?;
                    config.busy_timeout = Some(Duration::from_millis(ms));
                }
                "journal_mode" => {
                    config.journal_mode = Some(JournalMode::parse(value).ok_or_else(|| {
                        invalid(url, &format!("unknown journal_mode {value:?}"))
                    })?);
                }
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                other => {
                    tracing::debug!(option = other, "Ignoring unknown SQLite connection option");
                }
            }
        }

        Ok(config)
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    /// PRAGMA statements run right after the database is opened.
    pub fn init_sql(&self) -> String {
        let mut sql = format!(
            "PRAGMA foreign_keys = {};\n",
            if self.foreign_keys { "ON" } else { "OFF" }
        );
        if let (Some(mode), DatabasePath::File(_)) = (self.journal_mode, &self.path) {
            sql.push_str(&format!("PRAGMA journal_mode = {};\n", mode.as_pragma()));
        }
        sql
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(url: &str, reason: &str) -> slimorm_core::Error {
    ConnectionError::new(
        ConnectionErrorKind::InvalidConnectionString,
        format!("{reason} in {url:?}"),
    )
    .into()
}
