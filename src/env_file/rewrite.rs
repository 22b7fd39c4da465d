//! In-place update of a single key in an env file

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use super::{ParsedLine, is_valid_key, parse_line};
use crate::{Error, Result};

/// Set `key` to `value` in the env file at `path`
///
/// The first line assigning `key` is replaced in place (keeping an `export `
/// prefix) and later duplicates are dropped; if no line assigns it, a new
/// line is appended. Every other line is left byte-for-byte unchanged. The
/// file is replaced atomically through a temp file in the same directory.
///
/// # Errors
///
/// Returns [`Error::EnvFileNotFound`] if the file is missing,
/// [`Error::Config`] for an invalid key, or an IO error on write failure
pub fn upsert(path: &Path, key: &str, value: &str) -> Result<()> {
    if !is_valid_key(key) {
        return Err(Error::Config(format!("invalid env key {key:?}")));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::EnvFileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;

    let updated = rewrite_content(&content, key, value);
    write_atomic(path, &updated)?;

    tracing::debug!(path = %path.display(), key, "updated env file");
    Ok(())
}

fn rewrite_content(content: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(content.len() + key.len() + value.len() + 2);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let eol = &line[body.len()..];

        match parse_line(body) {
            ParsedLine::Entry { key: k, exported, .. } if k == key => {
                if replaced {
                    continue;
                }
                replaced = true;
                let prefix = if exported { "export " } else { "" };
                out.push_str(&format!("{prefix}{key}={value}"));
                out.push_str(if eol.is_empty() { "\n" } else { eol });
            }
            _ => out.push_str(line),
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{key}={value}\n"));
    }

    out
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;

    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions())?;
    }

    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
