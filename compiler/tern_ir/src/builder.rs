//! Programmatic AST construction.
//!
//! The convenience layer used by tests and by front ends that build trees
//! directly. Nodes receive strictly increasing spans from an internal cursor
//! so positions stay distinct and diagnostics sort deterministically; callers
//! that care about exact positions use the `*_at` variants.

use crate::{
    Ast, BinaryOp, BoolOp, ClassDef, CompareOp, ExceptHandler, ExprId, ExprKind, FunctionDef, Name,
    Param, Span, StmtId, StmtKind, StringInterner,
};

/// Builder over an [`Ast`] and a shared interner.
pub struct AstBuilder<'a> {
    ast: Ast,
    interner: &'a StringInterner,
    cursor: u32,
}

impl<'a> AstBuilder<'a> {
    /// Create a builder against an interner.
    pub fn new(interner: &'a StringInterner) -> Self {
        AstBuilder {
            ast: Ast::new(),
            interner,
            cursor: 0,
        }
    }

    /// Finish, setting the module body.
    pub fn finish(mut self, body: Vec<StmtId>) -> Ast {
        self.ast.body = body;
        self.ast
    }

    /// Intern a name through the builder's interner.
    pub fn name_of(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.cursor, 1);
        self.cursor += 2;
        span
    }

    /// Allocate an expression with an explicit span.
    pub fn expr_at(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.cursor = self.cursor.max(span.end() + 1);
        self.ast.alloc_expr(kind, span)
    }

    /// Allocate a statement with an explicit span.
    pub fn stmt_at(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.cursor = self.cursor.max(span.end() + 1);
        self.ast.alloc_stmt(kind, span)
    }

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        self.ast.alloc_expr(kind, span)
    }

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.next_span();
        self.ast.alloc_stmt(kind, span)
    }

    // === Expressions ===

    pub fn name(&mut self, text: &str) -> ExprId {
        let name = self.interner.intern(text);
        self.expr(ExprKind::Name(name))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Int(value))
    }

    pub fn str_lit(&mut self, text: &str) -> ExprId {
        let name = self.interner.intern(text);
        self.expr(ExprKind::Str(name))
    }

    pub fn bool_lit(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::Bool(value))
    }

    pub fn none(&mut self) -> ExprId {
        self.expr(ExprKind::None)
    }

    pub fn attribute(&mut self, value: ExprId, attr: &str) -> ExprId {
        let attr = self.interner.intern(attr);
        self.expr(ExprKind::Attribute { value, attr })
    }

    pub fn subscript(&mut self, value: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprKind::Subscript { value, index })
    }

    pub fn call(&mut self, callee: ExprId, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call { callee, args })
    }

    pub fn unary(&mut self, op: crate::UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, left, right })
    }

    pub fn bool_op(&mut self, op: BoolOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::BoolOp { op, left, right })
    }

    pub fn compare(&mut self, op: CompareOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Compare { op, left, right })
    }

    pub fn tuple(&mut self, items: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Tuple(items))
    }

    pub fn lambda(&mut self, params: Vec<Param>, body: ExprId) -> ExprId {
        self.expr(ExprKind::Lambda { params, body })
    }

    /// `value is None`.
    pub fn is_none(&mut self, value: ExprId) -> ExprId {
        let none = self.none();
        self.compare(CompareOp::Is, value, none)
    }

    /// `value is not None`.
    pub fn is_not_none(&mut self, value: ExprId) -> ExprId {
        let none = self.none();
        self.compare(CompareOp::IsNot, value, none)
    }

    /// `isinstance(target, class)`.
    pub fn isinstance(&mut self, target: ExprId, class: ExprId) -> ExprId {
        let callee = self.name("isinstance");
        self.call(callee, vec![target, class])
    }

    // === Parameters ===

    pub fn param(&mut self, name: &str, annotation: Option<ExprId>) -> Param {
        let span = self.next_span();
        Param {
            name: self.interner.intern(name),
            annotation,
            default: None,
            span,
        }
    }

    pub fn param_with_default(
        &mut self,
        name: &str,
        annotation: Option<ExprId>,
        default: ExprId,
    ) -> Param {
        let span = self.next_span();
        Param {
            name: self.interner.intern(name),
            annotation,
            default: Some(default),
            span,
        }
    }

    // === Statements ===

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    /// `name = value`.
    pub fn assign(&mut self, name: &str, value: ExprId) -> StmtId {
        let target = self.name(name);
        self.stmt(StmtKind::Assign {
            target,
            annotation: None,
            value,
        })
    }

    /// `name: annotation = value`.
    pub fn assign_ann(&mut self, name: &str, annotation: ExprId, value: ExprId) -> StmtId {
        let target = self.name(name);
        self.stmt(StmtKind::Assign {
            target,
            annotation: Some(annotation),
            value,
        })
    }

    pub fn if_(&mut self, test: ExprId, body: Vec<StmtId>, orelse: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::If { test, body, orelse })
    }

    pub fn while_(&mut self, test: ExprId, body: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::While { test, body })
    }

    pub fn for_(&mut self, target: &str, iter: ExprId, body: Vec<StmtId>) -> StmtId {
        let target = self.name(target);
        self.stmt(StmtKind::For { target, iter, body })
    }

    pub fn return_(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return(value))
    }

    pub fn raise(&mut self, exc: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Raise(exc))
    }

    pub fn try_(
        &mut self,
        body: Vec<StmtId>,
        handlers: Vec<ExceptHandler>,
        finally: Vec<StmtId>,
    ) -> StmtId {
        self.stmt(StmtKind::Try {
            body,
            handlers,
            finally,
        })
    }

    pub fn handler(&mut self, class: Option<ExprId>, name: Option<&str>, body: Vec<StmtId>) -> ExceptHandler {
        let span = self.next_span();
        ExceptHandler {
            class,
            name: name.map(|n| self.interner.intern(n)),
            body,
            span,
        }
    }

    pub fn break_(&mut self) -> StmtId {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_(&mut self) -> StmtId {
        self.stmt(StmtKind::Continue)
    }

    pub fn pass(&mut self) -> StmtId {
        self.stmt(StmtKind::Pass)
    }

    pub fn def(
        &mut self,
        name: &str,
        params: Vec<Param>,
        returns: Option<ExprId>,
        body: Vec<StmtId>,
    ) -> StmtId {
        let name = self.interner.intern(name);
        self.stmt(StmtKind::FunctionDef(FunctionDef {
            name,
            params,
            returns,
            body,
            is_overload: false,
        }))
    }

    /// A function definition carrying the `overload` marker.
    pub fn def_overload(
        &mut self,
        name: &str,
        params: Vec<Param>,
        returns: Option<ExprId>,
        body: Vec<StmtId>,
    ) -> StmtId {
        let name = self.interner.intern(name);
        self.stmt(StmtKind::FunctionDef(FunctionDef {
            name,
            params,
            returns,
            body,
            is_overload: true,
        }))
    }

    pub fn class_def(&mut self, name: &str, bases: Vec<ExprId>, body: Vec<StmtId>) -> StmtId {
        let name = self.interner.intern(name);
        self.stmt(StmtKind::ClassDef(ClassDef {
            name,
            bases,
            body,
            is_structural: false,
        }))
    }

    pub fn structural_class_def(
        &mut self,
        name: &str,
        bases: Vec<ExprId>,
        body: Vec<StmtId>,
    ) -> StmtId {
        let name = self.interner.intern(name);
        self.stmt(StmtKind::ClassDef(ClassDef {
            name,
            bases,
            body,
            is_structural: true,
        }))
    }

    pub fn import(&mut self, module: &str, alias: Option<&str>) -> StmtId {
        let module = self.interner.intern(module);
        let alias = alias.map(|a| self.interner.intern(a));
        self.stmt(StmtKind::Import { module, alias })
    }
}
