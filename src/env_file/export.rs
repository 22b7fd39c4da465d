//! Presenting a loaded record: summaries and shell exports

use std::fmt::Write as _;

use super::{EnvRecord, UNSET};

/// Whether a key names a credential whose value should not be echoed
fn is_sensitive(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    upper.contains("TOKEN")
        || upper.contains("SECRET")
        || upper.contains("PASSWORD")
        || upper.ends_with("_KEY")
}

/// Mask a credential, keeping the first and last four characters
#[must_use]
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Quote a value for POSIX shells using single quotes
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl EnvRecord {
    /// Human-readable listing of loaded keys
    ///
    /// Empty values show as `<unset>`; credentials are masked.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let source = self
            .source()
            .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());
        let _ = writeln!(out, "Loaded {} variable(s) from {source}", self.len());

        let width = self.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in self.iter() {
            let shown = if value.is_empty() {
                UNSET.to_string()
            } else if is_sensitive(key) {
                mask_value(value)
            } else {
                value.to_string()
            };
            let _ = writeln!(out, "  {key:<width$} = {shown}");
        }

        if !self.warnings().is_empty() {
            let _ = writeln!(out, "Skipped {} malformed line(s)", self.warnings().len());
        }
        out
    }

    /// `export KEY='value'` lines suitable for `eval` in a POSIX shell
    #[must_use]
    pub fn shell_exports(&self) -> String {
        self.iter().fold(String::new(), |mut out, (key, value)| {
            let _ = writeln!(out, "export {key}={}", shell_quote(value));
            out
        })
    }
}
