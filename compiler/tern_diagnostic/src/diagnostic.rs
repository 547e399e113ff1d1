use std::fmt;

use tern_ir::Span;

use crate::Rule;

/// Category of a finding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Category {
    Error,
    Warning,
    Information,
    UnusedCode,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Error => write!(f, "error"),
            Category::Warning => write!(f, "warning"),
            Category::Information => write!(f, "information"),
            Category::UnusedCode => write!(f, "unused"),
        }
    }
}

/// One finding from an analysis pass.
///
/// Never mutated after creation; owned by the per-file [`DiagnosticSink`]
/// for the duration of one pass.
///
/// [`DiagnosticSink`]: crate::DiagnosticSink
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be pushed to a sink, not silently dropped"]
pub struct Diagnostic {
    pub category: Category,
    pub message: String,
    pub span: Span,
    /// The rule that produced this finding, if rule-gated.
    pub rule: Option<Rule>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            category: Category::Error,
            message: message.into(),
            span,
            rule: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            category: Category::Warning,
            message: message.into(),
            span,
            rule: None,
        }
    }

    /// Create an information diagnostic.
    pub fn information(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            category: Category::Information,
            message: message.into(),
            span,
            rule: None,
        }
    }

    /// Create an unused-code diagnostic.
    pub fn unused_code(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            category: Category::UnusedCode,
            message: message.into(),
            span,
            rule: None,
        }
    }

    /// Tag with the producing rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Check if this is an error-category finding.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.category == Category::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_category() {
        let span = Span::new(0, 3);
        assert_eq!(Diagnostic::error(span, "m").category, Category::Error);
        assert_eq!(Diagnostic::warning(span, "m").category, Category::Warning);
        assert_eq!(
            Diagnostic::information(span, "m").category,
            Category::Information
        );
        assert_eq!(
            Diagnostic::unused_code(span, "m").category,
            Category::UnusedCode
        );
    }

    #[test]
    fn rule_tagging() {
        let d = Diagnostic::error(Span::new(0, 1), "m").with_rule(Rule::TypeMismatch);
        assert_eq!(d.rule, Some(Rule::TypeMismatch));
        assert!(d.is_error());
    }

    #[test]
    fn category_display() {
        assert_eq!(Category::Error.to_string(), "error");
        assert_eq!(Category::UnusedCode.to_string(), "unused");
    }
}
