//! `.env` file loading
//!
//! Parses line-oriented `KEY=VALUE` files into an [`EnvRecord`]. Malformed
//! lines are reported and skipped; only a missing file is fatal.

mod export;
mod rewrite;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

pub use export::{mask_value, shell_quote};
pub use rewrite::upsert;

/// Default env file location, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Placeholder shown in summaries for keys with an empty value
pub const UNSET: &str = "<unset>";

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Whether `key` is a valid environment variable identifier
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineIssue {
    /// No `=` separator on the line
    MissingSeparator,
    /// The key fails the identifier pattern
    InvalidKey(String),
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "missing '='"),
            Self::InvalidKey(key) => write!(f, "invalid key {key:?}"),
        }
    }
}

/// A skipped line, kept so callers can report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    /// What was wrong with it
    pub issue: LineIssue,
}

/// Classification of a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank line or `#` comment
    Skip,
    /// A valid assignment
    Entry {
        key: String,
        value: String,
        /// Line carried a leading `export ` token
        exported: bool,
    },
    /// A line that could not be parsed
    Invalid(LineIssue),
}

/// Parse one line of an env file
#[must_use]
pub fn parse_line(raw: &str) -> ParsedLine {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return ParsedLine::Skip;
    }

    let (line, exported) = strip_export(line);

    let Some((key, value)) = line.split_once('=') else {
        return ParsedLine::Invalid(LineIssue::MissingSeparator);
    };

    let key = key.trim();
    if !is_valid_key(key) {
        return ParsedLine::Invalid(LineIssue::InvalidKey(key.to_string()));
    }

    ParsedLine::Entry {
        key: key.to_string(),
        value: strip_quotes(value.trim()).to_string(),
        exported,
    }
}

fn strip_export(line: &str) -> (&str, bool) {
    match line.strip_prefix("export") {
        Some(rest) if rest.starts_with(char::is_whitespace) => (rest.trim_start(), true),
        _ => (line, false),
    }
}

/// Remove one layer of matching surrounding single or double quotes
#[must_use]
pub fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Ordered key/value pairs loaded from an env file
#[derive(Debug, Clone, Default)]
pub struct EnvRecord {
    source: Option<PathBuf>,
    entries: Vec<(String, String)>,
    warnings: Vec<ParseWarning>,
}

impl EnvRecord {
    /// Load and parse an env file
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvFileNotFound`] if the file does not exist, or an IO
    /// error if it cannot be read
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::EnvFileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let mut record = Self::parse(&content);
        record.source = Some(path.to_path_buf());

        tracing::debug!(
            path = %path.display(),
            loaded = record.len(),
            skipped = record.warnings.len(),
            "loaded env file"
        );
        Ok(record)
    }

    /// Parse env file content
    ///
    /// Later assignments to the same key overwrite earlier ones.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut record = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            match parse_line(raw) {
                ParsedLine::Skip => {}
                ParsedLine::Entry { key, value, .. } => record.insert(key, value),
                ParsedLine::Invalid(issue) => {
                    tracing::warn!(line, reason = %issue, "skipping env line");
                    record.warnings.push(ParseWarning { line, issue });
                }
            }
        }

        record
    }

    /// Set a key, overwriting any previous value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Value for `key`, possibly empty
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, treating an empty value as absent
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Iterate entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines skipped during parsing
    #[must_use]
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Path the record was loaded from, if any
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Export every entry into a child process environment
    pub fn apply_to(&self, command: &mut std::process::Command) {
        command.envs(self.iter());
    }
}
