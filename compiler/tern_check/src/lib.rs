//! Type evaluator and checker for the Tern type analyzer.
//!
//! The evaluator answers `type_of(expression)` on demand by walking a
//! scope's flow graph backward from the expression's recorded antecedent,
//! narrowing across branch conditions and joining at merge points, with
//! per-`(expression, flow node)` memoization invalidated by the session's
//! generation stamp. The checker drives a top-down walk over the bound
//! tree, asks the evaluator for every expression, and pushes rule-gated
//! findings into the diagnostic sink.
//!
//! [`FileSession`] is the per-file entry point for both the batch checker
//! and editor point queries.

mod cancel;
mod checker;
mod error;
mod eval;
mod session;

pub use cancel::CancellationToken;
pub use error::AnalysisError;
pub use session::{CheckOptions, FileSession, ScopeState};
