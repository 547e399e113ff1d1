//! Parser hand-off format.
//!
//! A serialized program is the flat AST plus the interner's string table in
//! id order. Loading re-interns the table into a fresh interner, so every
//! `Name` inside the tree resolves to the same string on both sides.

use crate::{Ast, StringInterner};

/// A serializable program: source text, string table, syntax tree.
///
/// The source text rides along because spans index into it; consumers
/// rebuild their line tables from it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WireProgram {
    pub source: String,
    /// Interned strings in id order; `Name(i)` indexes `strings[i]`.
    pub strings: Vec<String>,
    pub ast: Ast,
}

/// Error when a wire program's string table is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTableError {
    pub index: usize,
    pub expected: u32,
}

impl std::fmt::Display for WireTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wire string table entry {} interned out of order (expected id {})",
            self.index, self.expected
        )
    }
}

impl std::error::Error for WireTableError {}

impl WireProgram {
    /// Capture a program from a tree and the interner that named it.
    pub fn capture(source: impl Into<String>, ast: &Ast, interner: &StringInterner) -> Self {
        WireProgram {
            source: source.into(),
            strings: interner
                .strings_in_order()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            ast: ast.clone(),
        }
    }

    /// Load into a fresh interner, consuming the wire form. Returns the
    /// source text and the tree.
    ///
    /// The interner must be empty (ids must come out dense from zero) and
    /// the string table must be duplicate-free; otherwise the table is
    /// rejected.
    pub fn load(self, interner: &StringInterner) -> Result<(String, Ast), WireTableError> {
        for (index, text) in self.strings.iter().enumerate() {
            let expected = index as u32;
            let name = interner.intern(text);
            if name.raw() != expected {
                return Err(WireTableError { index, expected });
            }
        }
        Ok((self.source, self.ast))
    }
}
