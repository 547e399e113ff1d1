//! The binder pass.
//!
//! Two phases per scope, one pass over the tree: declaration collection
//! first (a name assigned anywhere in a scope is local to it, so later
//! statements see the symbol before its first assignment), then flow-graph
//! construction recording the antecedent flow node active at every
//! expression. That antecedent map is the key the evaluator walks from.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use tern_ir::{
    with_sufficient_stack, Ast, BoolOp, ExceptHandler, ExprId, ExprKind, ModuleResolver, Name,
    Span, StmtId, StmtKind,
};

use crate::{
    DeclId, DeclKind, Declaration, FlowArena, FlowNode, FlowNodeId, Scope, ScopeId, ScopeKind,
    Symbol, SymbolId,
};

/// The flow position recorded for an expression: which scope it occurs in
/// and the antecedent flow node active at that point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FlowPoint {
    pub scope: ScopeId,
    pub flow: FlowNodeId,
}

/// Everything the binder produces for one module.
#[derive(Debug, Default)]
pub struct BindResult {
    pub scopes: Vec<Scope>,
    pub symbols: Vec<Symbol>,
    pub decls: Vec<Declaration>,
    /// Antecedent flow position of every bound expression.
    pub expr_flow: FxHashMap<ExprId, FlowPoint>,
    /// Target declaration of assignment-like statements.
    pub stmt_decl: FxHashMap<StmtId, DeclId>,
    /// `except ... as name` binding declarations, keyed by (try stmt, handler index).
    pub handler_decl: FxHashMap<(StmtId, usize), DeclId>,
    /// Expressions returned by each function (`None` for bare `return`).
    pub returns: FxHashMap<StmtId, Vec<Option<ExprId>>>,
    /// Scope created for each `def`/`class` statement.
    pub scope_of_def: FxHashMap<StmtId, ScopeId>,
    /// Scope created for each lambda expression.
    pub scope_of_lambda: FxHashMap<ExprId, ScopeId>,
    /// Flow node active at the end of each scope's body (reachable or not,
    /// which is what fall-off-the-end return inference needs).
    pub scope_end: FxHashMap<ScopeId, FlowNodeId>,
    /// Contiguous runs of statically unreachable statements, merged spans.
    pub unreachable: Vec<Span>,
    /// Imports the module resolver could not find.
    pub unresolved_imports: Vec<(StmtId, Name)>,
}

impl BindResult {
    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn decl(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.index())
    }

    pub fn flow_point(&self, expr: ExprId) -> Option<FlowPoint> {
        self.expr_flow.get(&expr).copied()
    }

    /// Resolve a name from a scope outward.
    ///
    /// Class scopes are skipped for lookups that did not start in them,
    /// matching the source language's scoping rule that methods do not see
    /// the class body's names directly.
    pub fn lookup(&self, from: ScopeId, name: Name) -> Option<(ScopeId, SymbolId)> {
        let mut current = Some(from);
        let mut first = true;
        while let Some(id) = current {
            let scope = self.scope(id)?;
            let skip = scope.kind == ScopeKind::Class && !first;
            if !skip {
                if let Some(&sym) = scope.symbols.get(&name) {
                    return Some((id, sym));
                }
            }
            first = false;
            current = scope.parent;
        }
        None
    }

    /// All declarations of a name visible from a scope, outermost match
    /// only (the nearest scope that declares the name wins).
    pub fn declarations_of(&self, from: ScopeId, name: Name) -> &[DeclId] {
        match self.lookup(from, name) {
            Some((_, sym)) => match self.symbol(sym) {
                Some(symbol) => &symbol.decls,
                None => &[],
            },
            None => &[],
        }
    }
}

struct LoopContext {
    header: FlowNodeId,
    breaks: Vec<FlowNodeId>,
}

struct Binder<'a> {
    ast: &'a Ast,
    resolver: &'a dyn ModuleResolver,
    result: BindResult,
    scope: ScopeId,
    flow: FlowNodeId,
    loops: Vec<LoopContext>,
    /// Enclosing `except` merge labels, innermost last.
    handlers: Vec<FlowNodeId>,
    /// Enclosing `def` statements, innermost last.
    functions: Vec<StmtId>,
}

/// Bind a module.
pub fn bind(ast: &Ast, resolver: &dyn ModuleResolver) -> BindResult {
    let mut binder = Binder {
        ast,
        resolver,
        result: BindResult::default(),
        scope: ScopeId::MODULE,
        flow: FlowArena::START,
        loops: Vec::new(),
        handlers: Vec::new(),
        functions: Vec::new(),
    };
    let module = binder.new_scope(ScopeKind::Module, None, StmtId::INVALID);
    binder.scope = module;
    binder.collect_decls(module, &ast.body);
    binder.bind_stmts(&ast.body);
    let module_end = binder.flow;
    binder.result.scope_end.insert(module, module_end);
    tracing::debug!(
        scopes = binder.result.scopes.len(),
        decls = binder.result.decls.len(),
        "module bound"
    );
    binder.result
}

impl<'a> Binder<'a> {
    // === Arena plumbing ===

    fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, owner: StmtId) -> ScopeId {
        let id = ScopeId::new(self.result.scopes.len() as u32);
        self.result.scopes.push(Scope::new(kind, parent, owner));
        id
    }

    fn alloc(&mut self, node: FlowNode) -> FlowNodeId {
        self.result.scopes[self.scope.index()].flow.alloc(node)
    }

    fn is_unreachable(&self, id: FlowNodeId) -> bool {
        self.result.scopes[self.scope.index()].flow.is_unreachable(id)
    }

    fn add_antecedent(&mut self, label: FlowNodeId, antecedent: FlowNodeId) {
        self.result.scopes[self.scope.index()]
            .flow
            .add_antecedent(label, antecedent);
    }

    /// Merge branch ends: unreachable ends drop out; zero reachable ends
    /// stay unreachable; a single end needs no label.
    fn merge(&mut self, ends: &[FlowNodeId]) -> FlowNodeId {
        let mut reachable: SmallVec<[FlowNodeId; 4]> = SmallVec::new();
        for &end in ends {
            if !self.is_unreachable(end) && !reachable.contains(&end) {
                reachable.push(end);
            }
        }
        match reachable.len() {
            0 => FlowArena::UNREACHABLE,
            1 => reachable[0],
            _ => self.alloc(FlowNode::Label {
                antecedents: reachable,
            }),
        }
    }

    fn declare(&mut self, scope: ScopeId, name: Name, kind: DeclKind, span: Span) -> DeclId {
        let decl_id = DeclId::new(self.result.decls.len() as u32);
        self.result.decls.push(Declaration {
            name,
            kind,
            scope,
            span,
        });
        let existing = self.result.scopes[scope.index()].symbols.get(&name).copied();
        match existing {
            Some(sym) => self.result.symbols[sym.index()].decls.push(decl_id),
            None => {
                let sym = SymbolId::new(self.result.symbols.len() as u32);
                self.result.symbols.push(Symbol {
                    name,
                    decls: smallvec![decl_id],
                });
                self.result.scopes[scope.index()].symbols.insert(name, sym);
            }
        }
        decl_id
    }

    // === Declaration collection ===
    //
    // Walks a scope's statements including nested control flow, but never
    // descends into nested def/class/lambda bodies; those declare only
    // their own name here.

    fn collect_decls(&mut self, scope: ScopeId, stmts: &[StmtId]) {
        let ast = self.ast;
        for &sid in stmts {
            let Some(stmt) = ast.stmt(sid) else { continue };
            match &stmt.kind {
                StmtKind::Assign {
                    target,
                    annotation,
                    value,
                } => {
                    if let Some(name) = self.name_of_expr(*target) {
                        let decl = self.declare(
                            scope,
                            name,
                            DeclKind::Assign {
                                value: *value,
                                annotation: *annotation,
                            },
                            stmt.span,
                        );
                        self.result.stmt_decl.insert(sid, decl);
                    }
                }
                StmtKind::If { body, orelse, .. } => {
                    self.collect_decls(scope, body);
                    self.collect_decls(scope, orelse);
                }
                StmtKind::While { body, .. } => self.collect_decls(scope, body),
                StmtKind::For {
                    target,
                    iter,
                    body,
                } => {
                    if let Some(name) = self.name_of_expr(*target) {
                        let decl = self.declare(
                            scope,
                            name,
                            DeclKind::ForTarget { iter: *iter },
                            stmt.span,
                        );
                        self.result.stmt_decl.insert(sid, decl);
                    }
                    self.collect_decls(scope, body);
                }
                StmtKind::Try {
                    body,
                    handlers,
                    finally,
                } => {
                    self.collect_decls(scope, body);
                    for (index, handler) in handlers.iter().enumerate() {
                        if let Some(name) = handler.name {
                            let decl = self.declare(
                                scope,
                                name,
                                DeclKind::ExceptBinding {
                                    class: handler.class,
                                },
                                handler.span,
                            );
                            self.result.handler_decl.insert((sid, index), decl);
                        }
                        self.collect_decls(scope, &handler.body);
                    }
                    self.collect_decls(scope, finally);
                }
                StmtKind::FunctionDef(def) => {
                    let decl =
                        self.declare(scope, def.name, DeclKind::Function { stmt: sid }, stmt.span);
                    self.result.stmt_decl.insert(sid, decl);
                }
                StmtKind::ClassDef(def) => {
                    let decl =
                        self.declare(scope, def.name, DeclKind::Class { stmt: sid }, stmt.span);
                    self.result.stmt_decl.insert(sid, decl);
                }
                StmtKind::Import { module, alias } => {
                    let resolved = self.resolver.resolve(*module).is_some();
                    if !resolved {
                        self.result.unresolved_imports.push((sid, *module));
                    }
                    let bound_name = alias.unwrap_or(*module);
                    let decl = self.declare(
                        scope,
                        bound_name,
                        DeclKind::Import {
                            module: *module,
                            resolved,
                        },
                        stmt.span,
                    );
                    self.result.stmt_decl.insert(sid, decl);
                }
                StmtKind::Expr(_)
                | StmtKind::Return(_)
                | StmtKind::Raise(_)
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::Pass => {}
            }
        }
    }

    fn name_of_expr(&self, expr: ExprId) -> Option<Name> {
        match self.ast.expr(expr).map(|e| &e.kind) {
            Some(ExprKind::Name(name)) => Some(*name),
            _ => None,
        }
    }

    // === Flow construction ===

    fn bind_stmts(&mut self, stmts: &[StmtId]) {
        let ast = self.ast;
        let mut dead_span: Option<Span> = None;
        for &sid in stmts {
            if self.is_unreachable(self.flow) {
                if let Some(stmt) = ast.stmt(sid) {
                    dead_span = Some(match dead_span {
                        Some(span) => span.merge(stmt.span),
                        None => stmt.span,
                    });
                }
            }
            self.bind_stmt(sid);
        }
        if let Some(span) = dead_span {
            self.result.unreachable.push(span);
        }
    }

    fn bind_stmt(&mut self, sid: StmtId) {
        let ast = self.ast;
        let Some(stmt) = ast.stmt(sid) else { return };
        match &stmt.kind {
            StmtKind::Expr(e) => self.visit_expr(*e),
            StmtKind::Assign { target, value, .. } => {
                self.visit_expr(*value);
                match self.result.stmt_decl.get(&sid).copied() {
                    Some(decl) => {
                        let node = self.alloc(FlowNode::Assign {
                            decl,
                            antecedent: self.flow,
                        });
                        self.flow = node;
                        // The target name itself answers queries from the
                        // assignment onward.
                        self.result.expr_flow.insert(
                            *target,
                            FlowPoint {
                                scope: self.scope,
                                flow: node,
                            },
                        );
                    }
                    None => {
                        // Attribute or other non-name target: bind the
                        // base expression, no declaration involved.
                        self.visit_expr(*target);
                    }
                }
            }
            StmtKind::If { test, body, orelse } => self.bind_if(*test, body, orelse),
            StmtKind::While { test, body } => self.bind_while(*test, body),
            StmtKind::For { target, iter, body } => self.bind_for(sid, *target, *iter, body),
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.visit_expr(*e);
                }
                if let Some(&function) = self.functions.last() {
                    if let Some(returns) = self.result.returns.get_mut(&function) {
                        returns.push(*value);
                    }
                }
                self.flow = FlowArena::UNREACHABLE;
            }
            StmtKind::Raise(exc) => {
                if let Some(e) = exc {
                    self.visit_expr(*e);
                }
                let current = self.flow;
                if !self.is_unreachable(current) {
                    if let Some(&handler) = self.handlers.last() {
                        self.add_antecedent(handler, current);
                    }
                }
                self.flow = FlowArena::UNREACHABLE;
            }
            StmtKind::Try {
                body,
                handlers,
                finally,
            } => self.bind_try(sid, body, handlers, finally),
            StmtKind::Break => {
                let current = self.flow;
                let reachable = !self.is_unreachable(current);
                if let Some(ctx) = self.loops.last_mut() {
                    if reachable {
                        ctx.breaks.push(current);
                    }
                }
                self.flow = FlowArena::UNREACHABLE;
            }
            StmtKind::Continue => {
                let current = self.flow;
                let header = self.loops.last().map(|ctx| ctx.header);
                if let Some(header) = header {
                    if !self.is_unreachable(current) {
                        let back = self.alloc(FlowNode::LoopBack { antecedent: current });
                        self.add_antecedent(header, back);
                    }
                }
                self.flow = FlowArena::UNREACHABLE;
            }
            StmtKind::Pass => {}
            StmtKind::FunctionDef(def) => {
                // Defaults evaluate in the enclosing scope at definition time.
                for param in &def.params {
                    if let Some(default) = param.default {
                        self.visit_expr(default);
                    }
                }
                let child = self.new_scope(ScopeKind::Function, Some(self.scope), sid);
                self.result.scope_of_def.insert(sid, child);
                for (index, param) in def.params.iter().enumerate() {
                    self.declare(
                        child,
                        param.name,
                        DeclKind::Param {
                            index,
                            annotation: param.annotation,
                        },
                        param.span,
                    );
                }
                self.result.returns.insert(sid, Vec::new());
                let body = &def.body;
                self.in_scope(child, |binder| {
                    binder.collect_decls(child, body);
                    binder.functions.push(sid);
                    binder.bind_stmts(body);
                    binder.functions.pop();
                });
                self.bind_decl_assign(sid);
            }
            StmtKind::ClassDef(def) => {
                for &base in &def.bases {
                    self.visit_expr(base);
                }
                let child = self.new_scope(ScopeKind::Class, Some(self.scope), sid);
                self.result.scope_of_def.insert(sid, child);
                let body = &def.body;
                self.in_scope(child, |binder| {
                    binder.collect_decls(child, body);
                    binder.bind_stmts(body);
                });
                self.bind_decl_assign(sid);
            }
            StmtKind::Import { .. } => self.bind_decl_assign(sid),
        }
    }

    /// Chain the `Assign` node for a statement's collected declaration.
    fn bind_decl_assign(&mut self, sid: StmtId) {
        if let Some(decl) = self.result.stmt_decl.get(&sid).copied() {
            let node = self.alloc(FlowNode::Assign {
                decl,
                antecedent: self.flow,
            });
            self.flow = node;
        }
    }

    fn bind_if(&mut self, test: ExprId, body: &[StmtId], orelse: &[StmtId]) {
        self.visit_expr(test);
        let pre = self.flow;
        let truth = self.static_truthiness(test);

        let then_start = match truth {
            Some(false) => FlowArena::UNREACHABLE,
            _ => self.alloc(FlowNode::Branch {
                condition: test,
                assume: true,
                antecedent: pre,
            }),
        };
        self.flow = then_start;
        self.bind_stmts(body);
        let then_end = self.flow;

        let else_start = match truth {
            Some(true) => FlowArena::UNREACHABLE,
            _ => self.alloc(FlowNode::Branch {
                condition: test,
                assume: false,
                antecedent: pre,
            }),
        };
        self.flow = else_start;
        self.bind_stmts(orelse);
        let else_end = self.flow;

        self.flow = self.merge(&[then_end, else_end]);
    }

    fn bind_while(&mut self, test: ExprId, body: &[StmtId]) {
        let pre = self.flow;
        let header = self.alloc(FlowNode::Label {
            antecedents: smallvec![pre],
        });
        self.flow = header;
        self.visit_expr(test);
        let truth = self.static_truthiness(test);

        let body_start = match truth {
            Some(false) => FlowArena::UNREACHABLE,
            _ => self.alloc(FlowNode::Branch {
                condition: test,
                assume: true,
                antecedent: header,
            }),
        };
        // `while True:` has no false exit; only `break` leaves the loop.
        let exit = match truth {
            Some(true) => FlowArena::UNREACHABLE,
            _ => self.alloc(FlowNode::Branch {
                condition: test,
                assume: false,
                antecedent: header,
            }),
        };

        self.loops.push(LoopContext {
            header,
            breaks: Vec::new(),
        });
        self.flow = body_start;
        self.bind_stmts(body);
        let body_end = self.flow;
        if !self.is_unreachable(body_end) {
            let back = self.alloc(FlowNode::LoopBack {
                antecedent: body_end,
            });
            self.add_antecedent(header, back);
        }
        let ctx = match self.loops.pop() {
            Some(ctx) => ctx,
            None => return,
        };
        let mut ends = ctx.breaks;
        ends.push(exit);
        self.flow = self.merge(&ends);
    }

    fn bind_for(&mut self, sid: StmtId, target: ExprId, iter: ExprId, body: &[StmtId]) {
        self.visit_expr(iter);
        let pre = self.flow;
        let header = self.alloc(FlowNode::Label {
            antecedents: smallvec![pre],
        });

        let assign = match self.result.stmt_decl.get(&sid).copied() {
            Some(decl) => {
                let node = self.alloc(FlowNode::Assign {
                    decl,
                    antecedent: header,
                });
                self.result.expr_flow.insert(
                    target,
                    FlowPoint {
                        scope: self.scope,
                        flow: node,
                    },
                );
                node
            }
            None => header,
        };

        self.loops.push(LoopContext {
            header,
            breaks: Vec::new(),
        });
        self.flow = assign;
        self.bind_stmts(body);
        let body_end = self.flow;
        if !self.is_unreachable(body_end) {
            let back = self.alloc(FlowNode::LoopBack {
                antecedent: body_end,
            });
            self.add_antecedent(header, back);
        }
        let ctx = match self.loops.pop() {
            Some(ctx) => ctx,
            None => return,
        };
        // Normal exit happens at the header, before another assignment:
        // the loop may not have run at all.
        let mut ends = ctx.breaks;
        ends.push(header);
        self.flow = self.merge(&ends);
    }

    fn bind_try(
        &mut self,
        sid: StmtId,
        body: &[StmtId],
        handlers: &[ExceptHandler],
        finally: &[StmtId],
    ) {
        let pre = self.flow;
        let handler_label = if handlers.is_empty() {
            None
        } else {
            // The handler can observe the state on entry (an exception can
            // raise before any statement completes) plus every may-raise
            // point bound inside the body.
            let label = self.alloc(FlowNode::Label {
                antecedents: smallvec![pre],
            });
            self.handlers.push(label);
            Some(label)
        };

        self.bind_stmts(body);
        if handler_label.is_some() {
            self.handlers.pop();
        }
        let body_end = self.flow;

        let mut ends = vec![body_end];
        if let Some(label) = handler_label {
            for (index, handler) in handlers.iter().enumerate() {
                self.flow = label;
                if let Some(class) = handler.class {
                    self.visit_expr(class);
                }
                if let Some(decl) = self.result.handler_decl.get(&(sid, index)).copied() {
                    let node = self.alloc(FlowNode::Assign {
                        decl,
                        antecedent: self.flow,
                    });
                    self.flow = node;
                }
                self.bind_stmts(&handler.body);
                ends.push(self.flow);
            }
        }
        self.flow = self.merge(&ends);
        self.bind_stmts(finally);
    }

    fn in_scope(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let saved_scope = std::mem::replace(&mut self.scope, scope);
        let saved_flow = std::mem::replace(&mut self.flow, FlowArena::START);
        let saved_loops = std::mem::take(&mut self.loops);
        let saved_handlers = std::mem::take(&mut self.handlers);
        f(self);
        let end = self.flow;
        self.result.scope_end.insert(scope, end);
        self.scope = saved_scope;
        self.flow = saved_flow;
        self.loops = saved_loops;
        self.handlers = saved_handlers;
    }

    fn static_truthiness(&self, expr: ExprId) -> Option<bool> {
        match self.ast.expr(expr).map(|e| &e.kind) {
            Some(ExprKind::Bool(value)) => Some(*value),
            Some(ExprKind::Int(value)) => Some(*value != 0),
            Some(ExprKind::None) => Some(false),
            _ => None,
        }
    }

    // === Expressions ===

    fn visit_expr(&mut self, e: ExprId) {
        with_sufficient_stack(|| self.visit_expr_inner(e));
    }

    fn visit_expr_inner(&mut self, e: ExprId) {
        self.result.expr_flow.insert(
            e,
            FlowPoint {
                scope: self.scope,
                flow: self.flow,
            },
        );
        let ast = self.ast;
        let Some(expr) = ast.expr(e) else { return };
        match &expr.kind {
            ExprKind::Name(_)
            | ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::None => {}
            ExprKind::Attribute { value, .. } => self.visit_expr(*value),
            ExprKind::Subscript { value, index } => {
                self.visit_expr(*value);
                self.visit_expr(*index);
            }
            ExprKind::Call { callee, args } => {
                self.visit_expr(*callee);
                for &arg in args {
                    self.visit_expr(arg);
                }
                let node = self.alloc(FlowNode::Call {
                    call: e,
                    antecedent: self.flow,
                });
                self.flow = node;
                // A call may raise: its state feeds the enclosing handler.
                if let Some(&handler) = self.handlers.last() {
                    self.add_antecedent(handler, node);
                }
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(*operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
                self.visit_expr(*left);
                self.visit_expr(*right);
            }
            ExprKind::BoolOp { op, left, right } => {
                // The right operand only evaluates when the left decided
                // the outcome is still open, so it sees the left's
                // narrowing: `x is not None and x.f()`.
                self.visit_expr(*left);
                let pre = self.flow;
                let assume = *op == BoolOp::And;
                let taken = self.alloc(FlowNode::Branch {
                    condition: *left,
                    assume,
                    antecedent: pre,
                });
                self.flow = taken;
                self.visit_expr(*right);
                let after_right = self.flow;
                let skipped = self.alloc(FlowNode::Branch {
                    condition: *left,
                    assume: !assume,
                    antecedent: pre,
                });
                self.flow = self.merge(&[after_right, skipped]);
            }
            ExprKind::Tuple(items) => {
                for &item in items {
                    self.visit_expr(item);
                }
            }
            ExprKind::Lambda { params, body } => {
                for param in params {
                    if let Some(default) = param.default {
                        self.visit_expr(default);
                    }
                }
                let child = self.new_scope(ScopeKind::Lambda, Some(self.scope), StmtId::INVALID);
                self.result.scope_of_lambda.insert(e, child);
                for (index, param) in params.iter().enumerate() {
                    self.declare(
                        child,
                        param.name,
                        DeclKind::Param {
                            index,
                            annotation: param.annotation,
                        },
                        param.span,
                    );
                }
                let body = *body;
                self.in_scope(child, |binder| binder.visit_expr(body));
            }
        }
    }
}

#[cfg(test)]
mod tests;
