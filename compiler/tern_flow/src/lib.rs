//! Binder for the Tern type analyzer.
//!
//! Walks a module's syntax tree once and produces the [`BindResult`]: the
//! scope tree with per-scope symbol tables, append-only declaration lists,
//! and one flow graph per scope capturing execution order, branch
//! conditions, loop back-edges, and exception edges. Everything downstream
//! (type evaluation, checking, editor point queries) reads this structure;
//! it is never mutated after binding.

mod binder;
mod flow;
mod ids;
mod scope;

pub use binder::{bind, BindResult, FlowPoint};
pub use flow::{FlowArena, FlowNode};
pub use ids::{DeclId, FlowNodeId, ScopeId, SymbolId};
pub use scope::{DeclKind, Declaration, Scope, ScopeKind, Symbol};
