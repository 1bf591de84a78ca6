//! The ordered key list that drives both matching and output order.
//!
//! Every line of the key list input is kept verbatim. Whether a line is a
//! blank pass-through, a comment pass-through or an active key is decided by
//! [`KeyList::classify`] each time the list is read, never stored.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::config::DEFAULT_COMMENT_MARKER;
use crate::errors::{MigrateError, MigrateResult};

/// Classification of a single key list line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEntry<'a> {
    /// Empty line, written out as an empty line
    Blank,
    /// Comment line, written out verbatim
    Comment(&'a str),
    /// Key searched for as a literal line prefix
    Key(&'a str),
}

/// Ordered, immutable list of key list lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyList {
    lines: Vec<String>,
    comment_marker: String,
}

impl KeyList {
    /// Creates a key list from lines already in memory
    pub fn new(lines: Vec<String>, comment_marker: impl Into<String>) -> Self {
        Self {
            lines,
            comment_marker: comment_marker.into(),
        }
    }

    /// Creates a key list using the default `#` comment marker
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            lines.into_iter().map(Into::into).collect(),
            DEFAULT_COMMENT_MARKER,
        )
    }

    /// Reads one entry per line; only the line ending is removed
    pub fn from_reader<R: BufRead>(reader: R, comment_marker: &str) -> std::io::Result<Self> {
        let mut lines = Vec::new();
        for line in reader.split(b'\n') {
            let bytes = strip_line_ending(line?);
            lines.push(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(Self::new(lines, comment_marker))
    }

    /// Opens and reads a key list file
    pub fn load(path: &Path, comment_marker: &str) -> MigrateResult<Self> {
        let file = File::open(path).map_err(|e| MigrateError::key_list_read(path, e))?;
        let keys = Self::from_reader(BufReader::new(file), comment_marker)
            .map_err(|e| MigrateError::key_list_read(path, e))?;
        debug!(
            "Loaded {} key list entries ({} active keys) from {}",
            keys.len(),
            keys.active_keys().len(),
            path.display()
        );
        Ok(keys)
    }

    /// Classifies a line by content alone
    pub fn classify<'a>(&self, line: &'a str) -> KeyEntry<'a> {
        if line.is_empty() {
            KeyEntry::Blank
        } else if !self.comment_marker.is_empty() && line.starts_with(&self.comment_marker) {
            KeyEntry::Comment(line)
        } else {
            KeyEntry::Key(line)
        }
    }

    /// Iterates all entries in list order
    pub fn entries(&self) -> impl Iterator<Item = KeyEntry<'_>> + '_ {
        self.lines.iter().map(move |line| self.classify(line))
    }

    /// Active keys in first-seen order, without duplicates
    pub fn active_keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries()
            .filter_map(|entry| match entry {
                KeyEntry::Key(key) if seen.insert(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Drops a trailing `\n` and then a trailing `\r`
pub(crate) fn strip_line_ending(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    bytes
}
