//! Resource resolution: load a file below the resource root and indent it
//!
//! References are joined onto the root after stripping any leading path
//! separators, so `"/abc.json"` and `"abc.json"` name the same file. `..`
//! segments are passed through untouched; callers are expected to supply
//! well-formed relative references.
//!
//! Resources are read as UTF-8 text. A file holding other bytes fails with
//! [`ResolveError::Read`] (`io::ErrorKind::InvalidData`) instead of being
//! copied through byte for byte.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

/// Indentation used when none is configured: one tab per level
pub const DEFAULT_INDENT_UNIT: &str = "\t";

/// Errors from [`Resolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resource is missing, unreadable or not UTF-8
    #[error("failed to read resource {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Indent(#[from] IndentError),
}

/// The indented text would not fit in memory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("indent depth {depth} is too large")]
pub struct IndentError {
    pub depth: usize,
}

/// Loads injectable resources relative to a root directory
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    indent_unit: String,
}

impl Resolver {
    /// Create a resolver that indents with [`DEFAULT_INDENT_UNIT`]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            indent_unit: DEFAULT_INDENT_UNIT.to_string(),
        }
    }

    /// Set the string prepended once per indentation level
    pub fn with_indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    /// Location of `relative` below the root
    pub fn path_for(&self, relative: &str) -> PathBuf {
        let trimmed = relative.trim_start_matches(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR);
        self.root.join(trimmed)
    }

    /// Read `relative` and indent each of its lines `depth` times
    pub fn resolve(&self, relative: &str, depth: usize) -> Result<String, ResolveError> {
        let path = self.path_for(relative);
        let content = std::fs::read_to_string(&path).map_err(|source| ResolveError::Read {
            path: path.clone(),
            source,
        })?;
        trace!(resource = %path.display(), depth, bytes = content.len(), "resolved resource");
        Ok(indent_lines(&content, depth, &self.indent_unit)?)
    }
}

/// Prefix every line of `text` with `depth` copies of `unit`
///
/// Lines are split on `'\n'` only; a `'\r'` before it stays part of the line.
/// The first line is indented too, and nothing is added after the last one, so
/// a trailing newline produces a final line holding only the indentation.
/// Returns `text` unchanged when `depth` is zero or `unit` is empty.
///
/// The output size is computed up front; a depth whose output cannot be
/// allocated fails with [`IndentError`] rather than aborting.
pub fn indent_lines(text: &str, depth: usize, unit: &str) -> Result<String, IndentError> {
    if depth == 0 || unit.is_empty() {
        return Ok(text.to_string());
    }

    let too_large = || IndentError { depth };
    let line_count = text.matches('\n').count() + 1;
    let prefix_len = unit.len().checked_mul(depth).ok_or_else(too_large)?;
    let total = prefix_len
        .checked_mul(line_count)
        .and_then(|n| n.checked_add(text.len()))
        .ok_or_else(too_large)?;

    let mut out = String::new();
    out.try_reserve_exact(total).map_err(|_| too_large())?;
    let mut prefix = String::new();
    prefix.try_reserve_exact(prefix_len).map_err(|_| too_large())?;
    for _ in 0..depth {
        prefix.push_str(unit);
    }

    for (i, line) in text.split('\n').enumerate() {
        if i != 0 {
            out.push('\n');
        }
        out.push_str(&prefix);
        out.push_str(line);
    }

    Ok(out)
}
