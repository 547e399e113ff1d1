//! The closed rule enumeration and its configuration table.
//!
//! Rules are a tagged enumeration rather than free-form strings so that new
//! rules are exhaustively matched at compile time. Severity lookup is a flat
//! array index.

use std::fmt;

use crate::Category;

/// A named, independently toggleable category of check.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Rule {
    /// Member access on an optional (union containing `None`).
    OptionalMemberAccess,
    /// Calling a possibly-`None` value.
    OptionalCall,
    /// `isinstance` test that cannot change the narrowed type.
    UnnecessaryIsInstance,
    /// Method override incompatible with the base-class signature.
    IncompatibleOverride,
    /// Reference to a name with no declaration in any enclosing scope.
    UndefinedVariable,
    /// Statements that can never execute.
    UnreachableCode,
    /// Value incompatible with a declared or expected type.
    TypeMismatch,
    /// Call-site argument count or overload-resolution failure.
    CallArguments,
}

impl Rule {
    /// Every rule, in stable declaration order.
    pub const ALL: [Rule; 8] = [
        Rule::OptionalMemberAccess,
        Rule::OptionalCall,
        Rule::UnnecessaryIsInstance,
        Rule::IncompatibleOverride,
        Rule::UndefinedVariable,
        Rule::UnreachableCode,
        Rule::TypeMismatch,
        Rule::CallArguments,
    ];

    /// Stable configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Rule::OptionalMemberAccess => "optional-member-access",
            Rule::OptionalCall => "optional-call",
            Rule::UnnecessaryIsInstance => "unnecessary-isinstance",
            Rule::IncompatibleOverride => "incompatible-override",
            Rule::UndefinedVariable => "undefined-variable",
            Rule::UnreachableCode => "unreachable-code",
            Rule::TypeMismatch => "type-mismatch",
            Rule::CallArguments => "call-arguments",
        }
    }

    /// Parse a configuration name.
    pub fn from_name(name: &str) -> Option<Rule> {
        Rule::ALL.into_iter().find(|rule| rule.as_str() == name)
    }

    /// Default severity when no configuration overrides it.
    pub const fn default_severity(self) -> RuleSeverity {
        match self {
            Rule::OptionalMemberAccess
            | Rule::OptionalCall
            | Rule::UndefinedVariable
            | Rule::TypeMismatch
            | Rule::CallArguments => RuleSeverity::Error,
            Rule::UnnecessaryIsInstance | Rule::IncompatibleOverride | Rule::UnreachableCode => {
                RuleSeverity::Warning
            }
        }
    }

    /// Diagnostic category for a finding of this rule at a severity.
    ///
    /// Unreachable code is reported in the distinct unused-code category
    /// regardless of configured severity, so editors can fade it.
    pub fn category_for(self, severity: RuleSeverity) -> Category {
        if self == Rule::UnreachableCode {
            return Category::UnusedCode;
        }
        match severity {
            RuleSeverity::Error => Category::Error,
            RuleSeverity::Warning | RuleSeverity::None => Category::Warning,
        }
    }

    const fn table_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured severity for one rule. `None` suppresses the check entirely.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuleSeverity {
    Error,
    Warning,
    None,
}

impl RuleSeverity {
    /// Parse a configuration value.
    pub fn from_name(name: &str) -> Option<RuleSeverity> {
        match name {
            "error" => Some(RuleSeverity::Error),
            "warning" => Some(RuleSeverity::Warning),
            "none" => Some(RuleSeverity::None),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RuleSeverity::Error => "error",
            RuleSeverity::Warning => "warning",
            RuleSeverity::None => "none",
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when reading a rule configuration table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown severity {value:?} for rule {rule:?} (expected error, warning, or none)")]
    UnknownSeverity { rule: String, value: String },
}

/// Severity table for every rule.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RuleConfig {
    severities: [RuleSeverity; Rule::ALL.len()],
}

impl Default for RuleConfig {
    fn default() -> Self {
        let mut severities = [RuleSeverity::None; Rule::ALL.len()];
        for rule in Rule::ALL {
            severities[rule.table_index()] = rule.default_severity();
        }
        RuleConfig { severities }
    }
}

impl RuleConfig {
    /// Configuration with every rule disabled.
    pub fn all_disabled() -> Self {
        RuleConfig {
            severities: [RuleSeverity::None; Rule::ALL.len()],
        }
    }

    /// Build from (rule-name, severity-name) entries on top of the defaults.
    ///
    /// Unrecognized rule names are ignored with a logged warning, not a
    /// fatal error; unrecognized severity names are rejected.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let mut config = RuleConfig::default();
        for (rule_name, severity_name) in entries {
            let Some(rule) = Rule::from_name(rule_name) else {
                tracing::warn!(rule = rule_name, "ignoring unknown diagnostic rule");
                continue;
            };
            let Some(severity) = RuleSeverity::from_name(severity_name) else {
                return Err(ConfigError::UnknownSeverity {
                    rule: rule_name.to_owned(),
                    value: severity_name.to_owned(),
                });
            };
            config.set(rule, severity);
        }
        Ok(config)
    }

    /// Set one rule's severity.
    pub fn set(&mut self, rule: Rule, severity: RuleSeverity) {
        self.severities[rule.table_index()] = severity;
    }

    /// Look up one rule's severity.
    #[inline]
    pub fn severity(&self, rule: Rule) -> RuleSeverity {
        self.severities[rule.table_index()]
    }

    /// Check whether a rule should run at all.
    #[inline]
    pub fn is_enabled(&self, rule: Rule) -> bool {
        self.severity(rule) != RuleSeverity::None
    }
}
