//! The checker pass.
//!
//! Walks every statement in source order, asks the evaluator for every
//! expression, and pushes rule-gated findings into the sink. A disabled
//! rule costs nothing: the check is skipped, not just its emission.
//! Cancellation is polled between statements; engine-internal
//! inconsistencies are flushed as one diagnostic at the owning scope's
//! boundary and the walk continues with the next scope.

use std::cell::RefCell;

use tern_diagnostic::{Diagnostic, DiagnosticSink, Rule, RuleSeverity};
use tern_ir::{BinaryOp, ExprId, ExprKind, Span, StmtId, StmtKind};
use tern_flow::{ScopeId, ScopeKind};
use tern_types::{
    check_call, is_assignable, resolve_overload, ClassType, OverloadResolution, Type,
};

use crate::cancel::CancellationToken;
use crate::error::AnalysisError;
use crate::eval::Evaluator;
use crate::session::{CheckOptions, ScopeState};

pub(crate) struct Checker<'a, 'e> {
    eval: &'a Evaluator<'e>,
    options: &'a CheckOptions,
    cancel: &'a CancellationToken,
    states: &'a RefCell<Vec<ScopeState>>,
    sink: DiagnosticSink,
    /// Enclosing `def` statements, innermost last.
    functions: Vec<StmtId>,
}

impl<'a, 'e> Checker<'a, 'e> {
    pub fn new(
        eval: &'a Evaluator<'e>,
        options: &'a CheckOptions,
        cancel: &'a CancellationToken,
        states: &'a RefCell<Vec<ScopeState>>,
    ) -> Self {
        let sink = if options.error_limit > 0 {
            DiagnosticSink::with_error_limit(options.error_limit)
        } else {
            DiagnosticSink::new()
        };
        Checker {
            eval,
            options,
            cancel,
            states,
            sink,
            functions: Vec::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(mut self) -> Result<Vec<Diagnostic>, AnalysisError> {
        let ast = self.eval.ast;
        self.set_state(ScopeId::MODULE, ScopeState::Checking);
        self.check_stmts(ScopeId::MODULE, &ast.body)?;

        // One distinct finding per contiguous unreachable run; type
        // findings inside the runs were suppressed during the walk.
        for index in 0..self.eval.bind.unreachable.len() {
            let span = self.eval.bind.unreachable[index];
            self.report(Rule::UnreachableCode, span, "code is unreachable".to_owned());
        }

        self.flush_internal(Span::DUMMY);
        self.set_state(ScopeId::MODULE, ScopeState::Checked);
        tracing::debug!(findings = self.sink.len(), "check pass complete");
        Ok(self.sink.flush())
    }

    fn set_state(&self, scope: ScopeId, state: ScopeState) {
        let mut states = self.states.borrow_mut();
        if let Some(slot) = states.get_mut(scope.index()) {
            *slot = state;
        }
    }

    fn report(&mut self, rule: Rule, span: Span, message: String) {
        let severity = self.options.rules.severity(rule);
        if severity == RuleSeverity::None {
            return;
        }
        let diag = Diagnostic {
            category: rule.category_for(severity),
            message,
            span,
            rule: Some(rule),
        };
        self.sink.push(diag);
    }

    /// Surface the first engine-internal inconsistency recorded while
    /// checking the scope that just finished, then keep going.
    fn flush_internal(&mut self, span: Span) {
        if let Some(detail) = self.eval.take_internal_error() {
            self.sink
                .push(Diagnostic::error(span, format!("internal analyzer error: {detail}")));
        }
    }

    fn in_dead_code(&self, span: Span) -> bool {
        self.eval
            .bind
            .unreachable
            .iter()
            .any(|run| run.start <= span.start && span.end() <= run.end())
    }

    fn check_stmts(&mut self, scope: ScopeId, stmts: &[StmtId]) -> Result<(), AnalysisError> {
        for &sid in stmts {
            if self.cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            self.check_stmt(scope, sid)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, scope: ScopeId, sid: StmtId) -> Result<(), AnalysisError> {
        let ast = self.eval.ast;
        let Some(stmt) = ast.stmt(sid) else {
            return Ok(());
        };
        // Proven-unreachable statements get the distinct unreachable-code
        // finding only, never conflicting-type findings.
        if self.in_dead_code(stmt.span) {
            return Ok(());
        }
        match &stmt.kind {
            StmtKind::Expr(e) => self.check_expr(*e),
            StmtKind::Assign {
                target,
                annotation,
                value,
            } => {
                self.check_expr(*value);
                if !self.eval.bind.stmt_decl.contains_key(&sid) {
                    // Attribute target: the base expression is a read.
                    self.check_expr(*target);
                }
                if let Some(ann) = annotation {
                    self.check_assign_annotation(scope, stmt.span, *ann, *value);
                }
            }
            StmtKind::If { test, body, orelse } => {
                self.check_expr(*test);
                self.check_stmts(scope, body)?;
                self.check_stmts(scope, orelse)?;
            }
            StmtKind::While { test, body } => {
                self.check_expr(*test);
                self.check_stmts(scope, body)?;
            }
            StmtKind::For { iter, body, .. } => {
                self.check_expr(*iter);
                self.check_stmts(scope, body)?;
            }
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.check_expr(*e);
                }
                self.check_return(scope, stmt.span, *value);
            }
            StmtKind::Raise(exc) => {
                if let Some(e) = exc {
                    self.check_expr(*e);
                }
            }
            StmtKind::Try {
                body,
                handlers,
                finally,
            } => {
                self.check_stmts(scope, body)?;
                for handler in handlers {
                    if let Some(class) = handler.class {
                        self.check_expr(class);
                    }
                    self.check_stmts(scope, &handler.body)?;
                }
                self.check_stmts(scope, finally)?;
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Pass => {}
            StmtKind::FunctionDef(def) => {
                for param in &def.params {
                    if let Some(default) = param.default {
                        self.check_expr(default);
                    }
                }
                self.check_override(scope, sid, stmt.span, def.name);
                if let Some(&child) = self.eval.bind.scope_of_def.get(&sid) {
                    self.set_state(child, ScopeState::Checking);
                    self.functions.push(sid);
                    let walked = self.check_stmts(child, &def.body);
                    self.functions.pop();
                    self.flush_internal(stmt.span);
                    self.set_state(child, ScopeState::Checked);
                    walked?;
                }
            }
            StmtKind::ClassDef(def) => {
                for &base in &def.bases {
                    self.check_expr(base);
                }
                if let Some(&child) = self.eval.bind.scope_of_def.get(&sid) {
                    self.set_state(child, ScopeState::Checking);
                    let walked = self.check_stmts(child, &def.body);
                    self.flush_internal(stmt.span);
                    self.set_state(child, ScopeState::Checked);
                    walked?;
                }
            }
            StmtKind::Import { module, .. } => {
                let unresolved = self
                    .eval
                    .bind
                    .unresolved_imports
                    .iter()
                    .any(|(s, _)| *s == sid);
                if unresolved {
                    let text = self.eval.interner.resolve(*module);
                    self.sink.push(Diagnostic::error(
                        stmt.span,
                        format!("import \"{text}\" could not be resolved"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_assign_annotation(&mut self, scope: ScopeId, span: Span, ann: ExprId, value: ExprId) {
        if !self.options.rules.is_enabled(Rule::TypeMismatch) {
            return;
        }
        let declared = self.eval.annotation_type(ann, scope);
        let inferred = self.eval.type_of(value);
        if inferred.suppresses_diagnostics() || declared.suppresses_diagnostics() {
            return;
        }
        if !is_assignable(&inferred, &declared) {
            let interner = self.eval.interner;
            self.report(
                Rule::TypeMismatch,
                span,
                format!(
                    "type \"{}\" is not assignable to declared type \"{}\"",
                    inferred.display(interner),
                    declared.display(interner)
                ),
            );
        }
    }

    fn check_return(&mut self, scope: ScopeId, span: Span, value: Option<ExprId>) {
        if !self.options.rules.is_enabled(Rule::TypeMismatch) {
            return;
        }
        let Some(&func_stmt) = self.functions.last() else {
            return;
        };
        let Some(StmtKind::FunctionDef(def)) = self.eval.ast.stmt(func_stmt).map(|s| &s.kind)
        else {
            return;
        };
        let Some(ret_ann) = def.returns else {
            return;
        };
        let ann_scope = match self.eval.bind.scope(scope).and_then(|s| s.parent) {
            Some(parent) => parent,
            None => scope,
        };
        let declared = self.eval.annotation_type(ret_ann, ann_scope);
        let actual = match value {
            Some(e) => self.eval.type_of(e),
            None => Type::None,
        };
        if actual.suppresses_diagnostics() || declared.suppresses_diagnostics() {
            return;
        }
        if !is_assignable(&actual, &declared) {
            let interner = self.eval.interner;
            self.report(
                Rule::TypeMismatch,
                span,
                format!(
                    "return type \"{}\" is not assignable to declared return type \"{}\"",
                    actual.display(interner),
                    declared.display(interner)
                ),
            );
        }
    }

    /// A method whose base classes declare the same name must stay
    /// signature-compatible with them.
    fn check_override(&mut self, scope: ScopeId, sid: StmtId, span: Span, name: tern_ir::Name) {
        if !self.options.rules.is_enabled(Rule::IncompatibleOverride) {
            return;
        }
        let Some(scope_ref) = self.eval.bind.scope(scope) else {
            return;
        };
        if scope_ref.kind != ScopeKind::Class {
            return;
        }
        let class_stmt = scope_ref.owner;
        let class = self.eval.class_type(class_stmt);
        let ours = Type::Function(self.eval.function_type(sid));
        for base in &class.bases {
            let Some(base_member) = base.member(name) else {
                continue;
            };
            match base_member {
                Type::Function(_) | Type::Overloads(_) => {
                    if !is_assignable(&ours, base_member) {
                        let interner = self.eval.interner;
                        self.report(
                            Rule::IncompatibleOverride,
                            span,
                            format!(
                                "method \"{}\" incompatibly overrides \"{}\" declared by \"{}\"",
                                interner.resolve(name),
                                base_member.display(interner),
                                interner.resolve(base.name),
                            ),
                        );
                    }
                }
                _ => {}
            }
            break;
        }
    }

    // === Expressions ===

    fn check_expr(&mut self, e: ExprId) {
        let ast = self.eval.ast;
        let Some(expr) = ast.expr(e) else {
            return;
        };
        match &expr.kind {
            ExprKind::Name(name) => self.check_name(e, expr.span, *name),
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::None => {}
            ExprKind::Attribute { value, attr } => {
                self.check_expr(*value);
                if self.options.rules.is_enabled(Rule::OptionalMemberAccess) {
                    let base = self.eval.type_of(*value);
                    if !base.suppresses_diagnostics() && base.has_none() {
                        let interner = self.eval.interner;
                        self.report(
                            Rule::OptionalMemberAccess,
                            expr.span,
                            format!(
                                "\"{}\" is not a known member of \"None\"",
                                interner.resolve(*attr)
                            ),
                        );
                    }
                }
            }
            ExprKind::Subscript { value, index } => {
                self.check_expr(*value);
                self.check_expr(*index);
            }
            ExprKind::Call { callee, args } => {
                self.check_expr(*callee);
                for &arg in args {
                    self.check_expr(arg);
                }
                if self.eval.is_isinstance_callee(*callee) {
                    self.check_isinstance(expr.span, args);
                } else {
                    self.check_call_site(expr.span, *callee, args);
                }
            }
            ExprKind::Unary { operand, .. } => self.check_expr(*operand),
            ExprKind::Binary { op, left, right } => {
                self.check_expr(*left);
                self.check_expr(*right);
                self.check_binary(expr.span, *op, *left, *right);
            }
            ExprKind::BoolOp { left, right, .. } | ExprKind::Compare { left, right, .. } => {
                self.check_expr(*left);
                self.check_expr(*right);
            }
            ExprKind::Tuple(items) => {
                for &item in items {
                    self.check_expr(item);
                }
            }
            ExprKind::Lambda { params, body } => {
                for param in params {
                    if let Some(default) = param.default {
                        self.check_expr(default);
                    }
                }
                self.check_expr(*body);
            }
        }
    }

    fn check_name(&mut self, e: ExprId, span: Span, name: tern_ir::Name) {
        if !self.options.rules.is_enabled(Rule::UndefinedVariable) {
            return;
        }
        let Some(point) = self.eval.bind.flow_point(e) else {
            return;
        };
        let defined = self.eval.bind.lookup(point.scope, name).is_some()
            || self.eval.builtins.class_named(name).is_some()
            || name == self.eval.builtins.names.isinstance;
        if !defined {
            let interner = self.eval.interner;
            self.report(
                Rule::UndefinedVariable,
                span,
                format!("\"{}\" is not defined", interner.resolve(name)),
            );
        }
    }

    fn check_isinstance(&mut self, span: Span, args: &[ExprId]) {
        if args.len() != 2 {
            self.report(
                Rule::CallArguments,
                span,
                format!("isinstance expects 2 arguments, got {}", args.len()),
            );
            return;
        }
        if !self.options.rules.is_enabled(Rule::UnnecessaryIsInstance) {
            return;
        }
        let target = self.eval.type_of(args[0]);
        let Some(class) = self.eval.class_of_static(args[1]) else {
            return;
        };
        if target.suppresses_diagnostics() {
            return;
        }
        if is_assignable(&target, &Type::instance(&class)) {
            let interner = self.eval.interner;
            self.report(
                Rule::UnnecessaryIsInstance,
                span,
                format!(
                    "unnecessary isinstance call: \"{}\" is always an instance of \"{}\"",
                    target.display(interner),
                    interner.resolve(class.name)
                ),
            );
        }
    }

    fn check_call_site(&mut self, span: Span, callee: ExprId, args: &[ExprId]) {
        let callee_type = self.eval.type_of(callee);
        if callee_type.suppresses_diagnostics() {
            return;
        }
        if callee_type.has_none() && self.options.rules.is_enabled(Rule::OptionalCall) {
            self.report(
                Rule::OptionalCall,
                span,
                "object of type \"None\" cannot be called".to_owned(),
            );
        }
        if !self.options.rules.is_enabled(Rule::CallArguments) {
            return;
        }
        let arg_types: Vec<Type> = args.iter().map(|&a| self.eval.type_of(a)).collect();
        let members: Vec<Type> = callee_type
            .members()
            .filter(|m| !m.is_none())
            .cloned()
            .collect();
        for member in members {
            match &member {
                Type::Function(func) => {
                    if let Err(err) = check_call(func, &arg_types) {
                        self.report_call_mismatches(span, &err.mismatches);
                    }
                }
                Type::Overloads(funcs) => match resolve_overload(funcs, &arg_types) {
                    OverloadResolution::Matched { .. } => {}
                    OverloadResolution::Ambiguous { candidates } => {
                        self.report(
                            Rule::CallArguments,
                            span,
                            format!(
                                "call is ambiguous between {} overload signatures",
                                candidates.len()
                            ),
                        );
                    }
                    OverloadResolution::NoMatch { mismatches, .. } => {
                        if mismatches.is_empty() {
                            self.report(
                                Rule::CallArguments,
                                span,
                                "no overload matches the call".to_owned(),
                            );
                        } else {
                            self.report_call_mismatches(span, &mismatches);
                        }
                    }
                },
                Type::Class(class) => self.check_constructor(span, class, &arg_types),
                Type::Unknown | Type::Never => {}
                other => {
                    let interner = self.eval.interner;
                    self.report(
                        Rule::CallArguments,
                        span,
                        format!("type \"{}\" is not callable", other.display(interner)),
                    );
                }
            }
        }
    }

    fn check_constructor(&mut self, span: Span, class: &ClassType, args: &[Type]) {
        let Some(init) = class.member(self.eval.builtins.names.init) else {
            if !args.is_empty() {
                self.report(
                    Rule::CallArguments,
                    span,
                    format!("too many arguments: expected 0, got {}", args.len()),
                );
            }
            return;
        };
        let bound = self.eval.bind_method(init.clone());
        match &bound {
            Type::Function(func) => {
                if let Err(err) = check_call(func, args) {
                    self.report_call_mismatches(span, &err.mismatches);
                }
            }
            Type::Overloads(funcs) => {
                if let OverloadResolution::NoMatch { mismatches, .. } =
                    resolve_overload(funcs, args)
                {
                    self.report_call_mismatches(span, &mismatches);
                }
            }
            _ => {}
        }
    }

    fn report_call_mismatches(
        &mut self,
        span: Span,
        mismatches: &[tern_types::ArgMismatch],
    ) {
        let interner = self.eval.interner;
        let rendered: Vec<String> = mismatches.iter().map(|m| m.describe(interner)).collect();
        for message in rendered {
            self.report(Rule::CallArguments, span, message);
        }
    }

    fn check_binary(&mut self, span: Span, op: BinaryOp, left: ExprId, right: ExprId) {
        if !self.options.rules.is_enabled(Rule::TypeMismatch) {
            return;
        }
        let lt = self.eval.type_of(left);
        let rt = self.eval.type_of(right);
        if lt.suppresses_diagnostics() || rt.suppresses_diagnostics() {
            return;
        }
        if self.eval.binary_type(op, &lt, &rt).is_none() {
            let interner = self.eval.interner;
            self.report(
                Rule::TypeMismatch,
                span,
                format!(
                    "operator \"{}\" is not supported for types \"{}\" and \"{}\"",
                    op_symbol(op),
                    lt.display(interner),
                    rt.display(interner)
                ),
            );
        }
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::BitOr => "|",
    }
}
