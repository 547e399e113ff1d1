//! Syntax tree and source model for the Tern type analyzer.
//!
//! The analyzer consumes an already-built syntax tree: parsing lives in an
//! external front end, and this crate defines the shape of its hand-off.
//!
//! - Flat AST arena with `ExprId(u32)` / `StmtId(u32)` handles: stable
//!   per-node integer identities, required as evaluation cache keys
//! - Compact 8-byte spans and an immutable line index for offset → line/col
//! - Interned names for O(1) identifier comparison
//! - The module-resolution interface consumed by the binder

mod ast;
mod builder;
mod line_index;
mod name;
mod node;
mod resolve;
mod span;
mod stack;

#[cfg(feature = "wire")]
pub mod wire;

pub use ast::{
    Ast, BinaryOp, BoolOp, ClassDef, CompareOp, ExceptHandler, Expr, ExprKind, FunctionDef, Param,
    Stmt, StmtKind, UnaryOp,
};
pub use builder::AstBuilder;
pub use line_index::{LineIndex, Position};
pub use name::{InternOverflow, Name, StringInterner};
pub use node::{ExprId, StmtId};
pub use resolve::{EmptyResolver, MapResolver, ModuleResolver, ResolvedModule};
pub use span::{Span, SpanError};
pub use stack::with_sufficient_stack;

/// Assert the size of a type at compile time.
///
/// Used to prevent accidental size regressions on hot types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}
