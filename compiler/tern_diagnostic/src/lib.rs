//! Diagnostic system for the Tern type analyzer.
//!
//! - Closed rule enumeration with per-rule configurable severity
//! - Ordered, append-only per-pass diagnostic sink with dedup and limits
//! - Editor-protocol wire shape for serialization

mod diagnostic;
mod rule;
mod sink;
pub mod wire;

pub use diagnostic::{Category, Diagnostic};
pub use rule::{ConfigError, Rule, RuleConfig, RuleSeverity};
pub use sink::{too_many_errors, DiagnosticSink};
