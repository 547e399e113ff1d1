//! Pre-computed line index for offset → line/column lookup.
//!
//! Built once per source text and immutable afterwards: a sorted table of
//! line-start offsets enabling O(log L) binary search instead of O(n)
//! scanning. Every diagnostic position conversion goes through this.

use crate::Span;

/// A 0-based line/character position, the editor-protocol convention.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Sorted, non-overlapping line-start table for one source text.
#[derive(Clone, Debug, Default)]
pub struct LineIndex {
    /// Byte offset of each line start; `offsets[0] == 0`.
    offsets: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from source text.
    ///
    /// Scans the source once to find all newlines: O(n) construction for
    /// O(log L) lookups.
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                offsets.push((i + 1) as u32);
            }
        }
        LineIndex { offsets }
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// 0-based line containing a byte offset, via binary search.
    #[inline]
    pub fn line_at(&self, offset: u32) -> u32 {
        let line_idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        line_idx as u32
    }

    /// Byte offset of a 0-based line start, or `None` if out of range.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.offsets.get(line as usize).copied()
    }

    /// 0-based `Position` for a byte offset.
    ///
    /// The character is counted in characters (not bytes) from the line
    /// start.
    pub fn position(&self, source: &str, offset: u32) -> Position {
        let line = self.line_at(offset);
        let line_start = self.offsets.get(line as usize).copied().unwrap_or(0) as usize;
        let end = (offset as usize).min(source.len());
        let character = u32::try_from(source[line_start..end].chars().count()).unwrap_or(u32::MAX);
        Position { line, character }
    }

    /// 1-based `(line, column)` for a byte offset, the human-readable form
    /// used for sorting and terminal output.
    pub fn line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let pos = self.position(source, offset);
        (pos.line + 1, pos.character + 1)
    }

    /// 1-based `(line, column)` of a span's start.
    pub fn span_start(&self, source: &str, span: Span) -> (u32, u32) {
        self.line_col(source, span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let source = "hello world";
        let index = LineIndex::build(source);
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(source, 0), (1, 1));
        assert_eq!(index.line_col(source, 5), (1, 6));
    }

    #[test]
    fn multiple_lines() {
        let source = "line1\nline2\nline3";
        let index = LineIndex::build(source);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_start(0), Some(0));
        assert_eq!(index.line_start(1), Some(6));
        assert_eq!(index.line_start(2), Some(12));
        assert_eq!(index.line_start(3), None);

        assert_eq!(index.line_at(0), 0);
        assert_eq!(index.line_at(5), 0); // the '\n' belongs to line 1
        assert_eq!(index.line_at(6), 1);
        assert_eq!(index.line_at(12), 2);
    }

    #[test]
    fn position_zero_based() {
        let source = "abc\ndefgh\nij";
        let index = LineIndex::build(source);
        assert_eq!(
            index.position(source, 4),
            Position {
                line: 1,
                character: 0
            }
        );
        assert_eq!(
            index.position(source, 7),
            Position {
                line: 1,
                character: 3
            }
        );
    }

    #[test]
    fn unicode_columns() {
        let source = "αβγ\nδε";
        let index = LineIndex::build(source);
        // Greek letters are 2 bytes each; columns count characters.
        assert_eq!(index.line_col(source, 2), (1, 2)); // 'β'
        assert_eq!(index.line_col(source, 7), (2, 1)); // 'δ' after '\n' at byte 6
    }

    #[test]
    fn empty_source() {
        let source = "";
        let index = LineIndex::build(source);
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(source, 0), (1, 1));
    }

    #[test]
    fn trailing_newline() {
        let source = "line1\nline2\n";
        let index = LineIndex::build(source);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_at(12), 2);
    }

    #[test]
    fn span_start_position() {
        let source = "x = 1\ny = 2\n";
        let index = LineIndex::build(source);
        assert_eq!(index.span_start(source, Span::new(6, 1)), (2, 1));
    }
}
