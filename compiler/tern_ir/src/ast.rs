//! Flat AST for the Tern source language.
//!
//! Nodes live in contiguous arenas and reference each other through
//! `ExprId`/`StmtId` handles. The external parser produces this structure;
//! the analyzer never sees source text beyond spans.

use crate::{ExprId, Name, Span, StmtId};

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary arithmetic and annotation operators.
///
/// `BitOr` doubles as the union syntax in type annotations (`int | None`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitOr,
}

/// Short-circuit boolean operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum BoolOp {
    And,
    Or,
}

/// Comparison operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOp {
    Eq,
    NotEq,
    Is,
    IsNot,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// An expression node.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression variants.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprKind {
    /// Identifier reference.
    Name(Name),
    /// Integer literal.
    Int(i64),
    /// String literal (interned).
    Str(Name),
    /// Boolean literal.
    Bool(bool),
    /// The `None` literal.
    None,
    /// Attribute access: `value.attr`.
    Attribute { value: ExprId, attr: Name },
    /// Subscript: `value[index]` (generic application in annotations).
    Subscript { value: ExprId, index: ExprId },
    /// Call: `callee(args...)`.
    Call { callee: ExprId, args: Vec<ExprId> },
    /// Unary operation.
    Unary { op: UnaryOp, operand: ExprId },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Short-circuit boolean operation.
    BoolOp {
        op: BoolOp,
        left: ExprId,
        right: ExprId,
    },
    /// Comparison.
    Compare {
        op: CompareOp,
        left: ExprId,
        right: ExprId,
    },
    /// Tuple display (also multi-argument subscripts: `dict[str, int]`).
    Tuple(Vec<ExprId>),
    /// Anonymous function.
    Lambda { params: Vec<Param>, body: ExprId },
}

/// A formal parameter.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: Name,
    pub annotation: Option<ExprId>,
    pub default: Option<ExprId>,
    pub span: Span,
}

/// One `except` clause of a `try` statement.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptHandler {
    /// Exception class expression, `None` for a bare `except:`.
    pub class: Option<ExprId>,
    /// Bound name (`except E as name:`).
    pub name: Option<Name>,
    pub body: Vec<StmtId>,
    pub span: Span,
}

/// A function definition.
///
/// The parser resolves decorators; the analyzer only needs the `overload`
/// marker that groups successive definitions into an overload set.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<Param>,
    pub returns: Option<ExprId>,
    pub body: Vec<StmtId>,
    pub is_overload: bool,
}

/// A class definition.
///
/// `is_structural` marks protocol-style classes checked by member shape
/// rather than by base-class chain.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassDef {
    pub name: Name,
    pub bases: Vec<ExprId>,
    pub body: Vec<StmtId>,
    pub is_structural: bool,
}

/// A statement node.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement variants.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum StmtKind {
    /// Bare expression statement.
    Expr(ExprId),
    /// Assignment, optionally annotated: `target: ann = value`.
    Assign {
        target: ExprId,
        annotation: Option<ExprId>,
        value: ExprId,
    },
    /// `if`/`elif`/`else` (elif desugars to a nested `If` in `orelse`).
    If {
        test: ExprId,
        body: Vec<StmtId>,
        orelse: Vec<StmtId>,
    },
    While {
        test: ExprId,
        body: Vec<StmtId>,
    },
    For {
        target: ExprId,
        iter: ExprId,
        body: Vec<StmtId>,
    },
    Return(Option<ExprId>),
    Raise(Option<ExprId>),
    Try {
        body: Vec<StmtId>,
        handlers: Vec<ExceptHandler>,
        finally: Vec<StmtId>,
    },
    Break,
    Continue,
    Pass,
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Import { module: Name, alias: Option<Name> },
}

/// The flat syntax tree of one module.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    /// Module-level statements in source order.
    pub body: Vec<StmtId>,
}

impl Ast {
    /// Create an empty tree.
    pub fn new() -> Self {
        Ast::default()
    }

    /// Allocate an expression node.
    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, span });
        id
    }

    /// Allocate a statement node.
    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::new(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, span });
        id
    }

    /// Look up an expression. Returns `None` for invalid/foreign ids.
    #[inline]
    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    /// Look up a statement. Returns `None` for invalid/foreign ids.
    #[inline]
    pub fn stmt(&self, id: StmtId) -> Option<&Stmt> {
        self.stmts.get(id.index())
    }

    /// Number of expression nodes.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of statement nodes.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_lookup() {
        let mut ast = Ast::new();
        let a = ast.alloc_expr(ExprKind::Int(1), Span::new(0, 1));
        let b = ast.alloc_expr(ExprKind::Int(2), Span::new(4, 1));
        assert_ne!(a, b);
        assert_eq!(ast.expr_count(), 2);
        assert!(matches!(ast.expr(a).map(|e| &e.kind), Some(ExprKind::Int(1))));
        assert_eq!(ast.expr(ExprId::INVALID), None);
    }

    #[test]
    fn statement_body_order() {
        let mut ast = Ast::new();
        let one = ast.alloc_expr(ExprKind::Int(1), Span::new(0, 1));
        let s1 = ast.alloc_stmt(StmtKind::Expr(one), Span::new(0, 1));
        let s2 = ast.alloc_stmt(StmtKind::Pass, Span::new(2, 4));
        ast.body = vec![s1, s2];
        assert_eq!(ast.body.len(), 2);
        assert!(matches!(ast.stmt(s2).map(|s| &s.kind), Some(StmtKind::Pass)));
    }
}
