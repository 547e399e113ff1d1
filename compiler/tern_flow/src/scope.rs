//! Scopes, symbols, and declarations.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use tern_ir::{ExprId, Name, Span, StmtId};

use crate::{DeclId, FlowArena, ScopeId, SymbolId};

/// What kind of syntax created a scope.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Lambda,
}

/// One syntactic binding of a name.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: Name,
    pub kind: DeclKind,
    /// Back-reference to the declaring scope (an index, not ownership).
    pub scope: ScopeId,
    pub span: Span,
}

/// The binding forms the source language has.
#[derive(Clone, Debug)]
pub enum DeclKind {
    /// `name = value` / `name: annotation = value`.
    Assign {
        value: ExprId,
        annotation: Option<ExprId>,
    },
    /// Formal parameter of the function/lambda owning the scope.
    Param {
        index: usize,
        annotation: Option<ExprId>,
    },
    /// `def name(...)`.
    Function { stmt: StmtId },
    /// `class name(...)`.
    Class { stmt: StmtId },
    /// `import module` / `import module as name`.
    Import { module: Name, resolved: bool },
    /// Loop variable of a `for` statement.
    ForTarget { iter: ExprId },
    /// `except E as name`.
    ExceptBinding { class: Option<ExprId> },
}

/// All declarations of one name within one scope.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    /// Append-only, in source order.
    pub decls: SmallVec<[DeclId; 2]>,
}

/// One lexical scope: its symbol table, its flow graph, and a weak parent
/// back-reference. Created once by the binder and read-only afterwards.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub symbols: FxHashMap<Name, SymbolId>,
    pub flow: FlowArena,
    /// The `def`/`class` statement that owns this scope;
    /// `StmtId::INVALID` for the module scope and lambdas.
    pub owner: StmtId,
}

impl Scope {
    pub(crate) fn new(kind: ScopeKind, parent: Option<ScopeId>, owner: StmtId) -> Self {
        Scope {
            kind,
            parent,
            symbols: FxHashMap::default(),
            flow: FlowArena::new(),
            owner,
        }
    }
}
