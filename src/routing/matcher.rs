//! Request matching logic.
//!
//! # Responsibilities
//! - Decide whether a chunk looks like an HTTP/1.1 GET request
//! - Mark every registered path whose pattern occurs in the chunk
//! - Decide whether the chunk completes a request (terminator present)
//!
//! # Design Decisions
//! - Loose mode is a substring heuristic, not an HTTP parser: `GET` and
//!   `HTTP/1.1` may appear anywhere, patterns may appear anywhere
//! - Strict mode parses the request line and searches patterns in the target only
//! - Matching is case-sensitive on raw bytes; no normalization, no
//!   query-string stripping (`/foo` matches `/foo?x=1`)
//! - Every evaluation recomputes all flags; nothing carries over between chunks
//! - Requests split across chunks are not reassembled

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::http::response::DEFAULT_TERMINATOR;
use crate::routing::table::PathTable;

pub const HTTP_VERSION_MARKER: &[u8] = b"HTTP/1.1";
pub const GET_MARKER: &[u8] = b"GET";

/// Verdict for one received chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestEvaluation {
    pub is_http_get: bool,
    pub any_path_matched: bool,
    pub boundary_complete: bool,
}

/// Byte sequence marking the end of a request. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Terminator(String);

impl Terminator {
    pub fn new(value: impl Into<String>) -> Result<Self, ServerError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ServerError::EmptyTerminator);
        }
        Ok(Self(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Terminator {
    fn default() -> Self {
        Self(DEFAULT_TERMINATOR.to_string())
    }
}

impl fmt::Debug for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Terminator(\"{}\")", self.0.escape_debug())
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_debug())
    }
}

/// How a chunk is recognised as a GET request and where patterns are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Markers and patterns anywhere in the chunk.
    #[default]
    Loose,
    /// Request line must be `GET <target> HTTP/1.1`; patterns searched in `<target>`.
    Strict,
}

impl MatchMode {
    /// Returns the bytes patterns are searched in, or `None` if the chunk is not a GET request.
    fn search_region<'a>(&self, chunk: &'a [u8], terminator: &Terminator) -> Option<&'a [u8]> {
        match self {
            MatchMode::Loose => {
                (contains(chunk, HTTP_VERSION_MARKER) && contains(chunk, GET_MARKER)).then_some(chunk)
            }
            MatchMode::Strict => request_target(chunk, terminator),
        }
    }
}

/// Returns true if `needle` occurs in `haystack`. The empty needle occurs everywhere.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Extract the target of a `GET <target> HTTP/1.1` request line.
///
/// The line ends at the first `\n` or the terminator, whichever comes first;
/// a trailing `\r` is dropped.
fn request_target<'a>(chunk: &'a [u8], terminator: &Terminator) -> Option<&'a [u8]> {
    let line_end = [find(chunk, b"\n"), find(chunk, terminator.as_bytes())]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(chunk.len());
    let line = &chunk[..line_end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let mut parts = line.split(|b| *b == b' ');

    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if parts.next().is_some() || method != GET_MARKER || version != HTTP_VERSION_MARKER {
        return None;
    }
    Some(target)
}

/// Evaluate a chunk with the loose heuristic.
pub fn evaluate(chunk: &[u8], terminator: &Terminator, table: &mut PathTable) -> RequestEvaluation {
    evaluate_with(MatchMode::Loose, chunk, terminator, table)
}

/// Evaluate a chunk, updating the `matched` flag of every entry.
///
/// A chunk that is not a GET request short-circuits: the table is left untouched.
pub fn evaluate_with(
    mode: MatchMode,
    chunk: &[u8],
    terminator: &Terminator,
    table: &mut PathTable,
) -> RequestEvaluation {
    let Some(region) = mode.search_region(chunk, terminator) else {
        return RequestEvaluation::default();
    };

    let mut any_path_matched = false;
    for entry in table.iter_mut() {
        let matched = contains(region, entry.pattern().as_bytes());
        entry.set_matched(matched);
        any_path_matched |= matched;
    }

    RequestEvaluation {
        is_http_get: true,
        any_path_matched,
        boundary_complete: contains(chunk, terminator.as_bytes()),
    }
}
