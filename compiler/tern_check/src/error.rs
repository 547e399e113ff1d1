//! Analysis error taxonomy.
//!
//! User-code type errors are never errors at this level: they surface as
//! diagnostics and evaluation always produces some type. Engine-internal
//! inconsistencies are caught at the scope-check boundary and reported as
//! a single internal-error diagnostic for that scope. What remains is the
//! control signal:

/// Why an analysis pass returned no diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The pass was cancelled cooperatively; the caller re-requests a
    /// fresh pass rather than resuming.
    #[error("analysis cancelled")]
    Cancelled,
    /// The session was asked to operate on a module it could not bind.
    #[error("internal analyzer error: {detail}")]
    Internal { detail: String },
}
