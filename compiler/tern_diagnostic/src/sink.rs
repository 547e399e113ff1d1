//! Per-pass diagnostic sink.
//!
//! Ordered, append-only collection of findings for one file-analysis pass:
//! - Error limit to prevent overwhelming output
//! - Same-position duplicate suppression via message-prefix hashing
//! - Source-order flush (skips sorting when already ordered)
//!
//! Cleared and rebuilt on every re-analysis; a cancelled pass simply drops
//! the sink.

use std::hash::{Hash, Hasher};

use tern_ir::Span;

use crate::{Diagnostic, Rule};

/// Number of characters used for message-prefix deduplication.
const MESSAGE_PREFIX_LEN: usize = 30;

/// Hash the first N characters of a message for dedup comparison.
///
/// A lightweight hash instead of an owned prefix allocation; a collision
/// only suppresses a rare duplicate.
#[inline]
fn message_prefix_hash(msg: &str) -> u64 {
    let byte_end = msg
        .char_indices()
        .nth(MESSAGE_PREFIX_LEN)
        .map_or(msg.len(), |(idx, _)| idx);
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    msg[..byte_end].hash(&mut hasher);
    hasher.finish()
}

/// Ordered, append-only diagnostic collection for one analysis pass.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// Maximum number of errors before filtering (0 = unlimited).
    error_limit: usize,
    /// Last (span start, message prefix hash) of an error, for dedup.
    last_error: Option<(u32, u64)>,
}

impl DiagnosticSink {
    /// Create a sink with no error limit.
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    /// Create a sink that filters further errors once `limit` is reached.
    pub fn with_error_limit(limit: usize) -> Self {
        DiagnosticSink {
            error_limit: limit,
            ..DiagnosticSink::default()
        }
    }

    /// Append a finding.
    ///
    /// Returns `true` if the diagnostic was kept, `false` if the error limit
    /// or duplicate suppression filtered it.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if diag.is_error() {
            if self.limit_reached() {
                return false;
            }
            let key = (diag.span.start, message_prefix_hash(&diag.message));
            if self.last_error == Some(key) {
                return false;
            }
            self.last_error = Some(key);
            self.error_count += 1;
        }
        self.diagnostics.push(diag);
        true
    }

    /// Check if the error limit has been reached.
    pub fn limit_reached(&self) -> bool {
        self.error_limit > 0 && self.error_count >= self.error_limit
    }

    /// Number of error-category findings collected.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of findings collected.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if no findings were collected.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Iterate without draining.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Drop all findings and reset state, keeping the configured limit.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.last_error = None;
    }

    /// Sort findings into source order and return them, clearing the sink.
    ///
    /// Skips the sort when already ordered, the common case for a top-down
    /// checker walk.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let already_sorted = self
            .diagnostics
            .windows(2)
            .all(|w| (w[0].span.start, w[0].span.end()) <= (w[1].span.start, w[1].span.end()));
        if !already_sorted {
            self.diagnostics
                .sort_by_key(|d| (d.span.start, d.span.end()));
        }

        let result = std::mem::take(&mut self.diagnostics);
        self.error_count = 0;
        self.last_error = None;
        result
    }
}

/// Create the final diagnostic reported when the error limit stops a pass.
#[cold]
pub fn too_many_errors(limit: usize, span: Span) -> Diagnostic {
    Diagnostic::error(span, format!("analysis stopped after {limit} errors"))
        .with_rule(Rule::TypeMismatch)
}
