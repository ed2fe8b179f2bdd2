//! Registered path table.
//!
//! # Responsibilities
//! - Hold up to [`MAX_PATH_ENTRIES`] `(pattern, response, callback)` entries
//! - Preserve registration order (entry identity is its index)
//! - Carry the transient per-entry `matched` flag between matcher and dispatcher
//!
//! # Design Decisions
//! - Fixed capacity; a full table rejects registration without mutating
//! - Pattern and response are immutable once registered
//! - Only the matcher and dispatcher touch `matched` (crate-private setters)

use std::fmt;

use bytes::Bytes;

use crate::error::ServerError;

/// Maximum number of registered paths.
pub const MAX_PATH_ENTRIES: usize = 5;

/// Callback fired after a matched path's response has been handed to the transport.
pub type PathCallback = Box<dyn FnMut() + Send>;

/// A registered path: pattern to look for, canned response to send, callback to run.
pub struct PathEntry {
    pattern: String,
    response: Bytes,
    callback: PathCallback,
    matched: bool,
}

impl PathEntry {
    pub fn new<F>(pattern: impl Into<String>, response: impl Into<Bytes>, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            pattern: pattern.into(),
            response: response.into(),
            callback: Box::new(callback),
            matched: false,
        }
    }

    /// Raw pattern text, searched for as a substring of each request.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Bytes sent verbatim when the pattern matches.
    pub fn response(&self) -> &Bytes {
        &self.response
    }

    /// Whether the last evaluated chunk contained this pattern.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn set_matched(&mut self, matched: bool) {
        self.matched = matched;
    }

    pub(crate) fn invoke(&mut self) {
        (self.callback)();
    }
}

impl fmt::Debug for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEntry")
            .field("pattern", &self.pattern)
            .field("response_len", &self.response.len())
            .field("matched", &self.matched)
            .finish_non_exhaustive()
    }
}

/// Ordered, fixed-capacity list of path entries.
#[derive(Debug)]
pub struct PathTable {
    entries: Vec<PathEntry>,
    capacity: usize,
}

impl PathTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PATH_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry. Returns its index, or `CapacityExceeded` with the table untouched.
    pub fn register(&mut self, entry: PathEntry) -> Result<usize, ServerError> {
        if self.entries.len() >= self.capacity {
            return Err(ServerError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&PathEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PathEntry> {
        self.entries.iter_mut()
    }

    /// Reset every `matched` flag.
    pub(crate) fn clear_matches(&mut self) {
        for entry in &mut self.entries {
            entry.matched = false;
        }
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::new()
    }
}
