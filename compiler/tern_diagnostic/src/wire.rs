//! Editor-protocol wire shape.
//!
//! `{range: {start: {line, character}, end: {line, character}}, severity,
//! message, rule?}` with 0-based positions and LSP severity numbers,
//! stable enough to serialize to any editor protocol.

use tern_ir::{LineIndex, Position};

use crate::{Category, Diagnostic};

/// A 0-based position range.
#[derive(Copy, Clone, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct WireRange {
    pub start: Position,
    pub end: Position,
}

/// One serialized finding.
#[derive(Clone, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct WireDiagnostic {
    pub range: WireRange,
    /// LSP severity: 1 error, 2 warning, 3 information, 4 hint.
    pub severity: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// LSP severity number for a category. Unused code maps to hint so editors
/// fade it rather than underline it.
pub fn severity_number(category: Category) -> u8 {
    match category {
        Category::Error => 1,
        Category::Warning => 2,
        Category::Information => 3,
        Category::UnusedCode => 4,
    }
}

impl WireDiagnostic {
    /// Convert an engine diagnostic using the file's line index.
    pub fn from_diagnostic(diag: &Diagnostic, source: &str, index: &LineIndex) -> Self {
        WireDiagnostic {
            range: WireRange {
                start: index.position(source, diag.span.start),
                end: index.position(source, diag.span.end()),
            },
            severity: severity_number(diag.category),
            message: diag.message.clone(),
            rule: diag.rule.map(|r| r.as_str().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rule;
    use tern_ir::Span;

    #[test]
    fn conversion_uses_zero_based_positions() {
        let source = "x = 1\ny = oops\n";
        let index = LineIndex::build(source);
        let diag =
            Diagnostic::error(Span::new(10, 4), "undefined name").with_rule(Rule::UndefinedVariable);
        let wire = WireDiagnostic::from_diagnostic(&diag, source, &index);
        assert_eq!(wire.range.start, Position { line: 1, character: 4 });
        assert_eq!(wire.range.end, Position { line: 1, character: 8 });
        assert_eq!(wire.severity, 1);
        assert_eq!(wire.rule.as_deref(), Some("undefined-variable"));
    }

    #[test]
    fn serialization_shape() {
        let source = "pass\n";
        let index = LineIndex::build(source);
        let diag = Diagnostic::unused_code(Span::new(0, 4), "unreachable code")
            .with_rule(Rule::UnreachableCode);
        let wire = WireDiagnostic::from_diagnostic(&diag, source, &index);
        let json = match serde_json::to_value(&wire) {
            Ok(v) => v,
            Err(e) => panic!("serialize failed: {e}"),
        };
        assert_eq!(json["severity"], 4);
        assert_eq!(json["range"]["start"]["line"], 0);
        assert_eq!(json["range"]["end"]["character"], 4);
        assert_eq!(json["rule"], "unreachable-code");
    }

    #[test]
    fn rule_omitted_when_absent() {
        let source = "pass\n";
        let index = LineIndex::build(source);
        let diag = Diagnostic::error(Span::new(0, 4), "internal error");
        let wire = WireDiagnostic::from_diagnostic(&diag, source, &index);
        let json = match serde_json::to_string(&wire) {
            Ok(v) => v,
            Err(e) => panic!("serialize failed: {e}"),
        };
        assert!(!json.contains("\"rule\""));
    }
}
