//! Type algebra for the Tern type analyzer.
//!
//! Pure, referentially-transparent operations over immutable value-semantics
//! types: union construction and join, assignability, narrowing, overload
//! resolution, and type-variable solving. No I/O anywhere in this crate.
//!
//! Types compare structurally (value semantics) with one deliberate
//! exception: classes compare by identity id, because class bodies may refer
//! back to their own class and structural comparison would never terminate.

mod assign;
mod builtins;
mod call;
mod display;
mod flags;
mod narrow;
mod ty;

pub use assign::is_assignable;
pub use builtins::{BuiltinNames, Builtins};
pub use call::{
    check_call, resolve_overload, substitute, ArgMismatch, CallError, CallMatch,
    OverloadResolution,
};
pub use display::TypeDisplay;
pub use flags::TypeFlags;
pub use narrow::{narrow, TypeGuard};
pub use ty::{
    join, union_of, ClassType, FunctionType, LiteralValue, ModuleType, ParamType, Type,
    TypeVarType,
};
