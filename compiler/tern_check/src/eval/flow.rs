//! The backward flow walk.
//!
//! From an expression's recorded antecedent, walk toward `Start`: an
//! `Assign` of the queried name answers with the declaration's type; a
//! `Branch` whose condition constrains the name narrows the answer from
//! further back; a `Label` joins its antecedents. Loop back-edges make the
//! graph cyclic, so loop headers evaluate as a bounded fixed point: a
//! back-edge reached while its header is in progress contributes the
//! current assumption instead of recursing.

use tern_ir::{CompareOp, ExprId, ExprKind, Name, UnaryOp};
use tern_flow::{FlowNode, FlowNodeId, ScopeId};
use tern_types::{join, narrow, union_of, LiteralValue, Type, TypeGuard};

use super::{Evaluator, MAX_LOOP_PASSES};

impl Evaluator<'_> {
    /// Narrowed type of `name` at a flow position within its own scope.
    pub(crate) fn flow_type(&self, scope: ScopeId, flow: FlowNodeId, name: Name) -> Type {
        tern_ir::with_sufficient_stack(|| self.flow_type_inner(scope, flow, name))
    }

    fn flow_type_inner(&self, scope: ScopeId, flow: FlowNodeId, name: Name) -> Type {
        let Some(scope_ref) = self.bind.scope(scope) else {
            self.record_internal(format!("scope {scope:?} out of range"));
            return Type::Unknown;
        };
        let Some(node) = scope_ref.flow.get(flow) else {
            self.record_internal(format!("flow node {flow:?} missing from {scope:?}"));
            return Type::Unknown;
        };
        match node {
            FlowNode::Start => self.start_type(scope, name),
            // Queries in dead code answer softly; the checker suppresses
            // findings there anyway.
            FlowNode::Unreachable => Type::Unknown,
            FlowNode::Assign { decl, antecedent } => match self.bind.decl(*decl) {
                Some(declaration) if declaration.name == name => self.decl_type(*decl),
                Some(_) => self.flow_type(scope, *antecedent, name),
                None => {
                    self.record_internal(format!("assign node references missing {decl:?}"));
                    Type::Unknown
                }
            },
            FlowNode::Branch {
                condition,
                assume,
                antecedent,
            } => {
                let incoming = self.flow_type(scope, *antecedent, name);
                self.apply_condition(incoming, *condition, *assume, name)
            }
            FlowNode::LoopBack { antecedent } | FlowNode::Call { antecedent, .. } => {
                self.flow_type(scope, *antecedent, name)
            }
            FlowNode::Label { antecedents } => self.label_type(scope, flow, name, antecedents),
        }
    }

    /// Type of a name at scope entry: parameters answer with their
    /// annotation; anything else is not yet bound.
    fn start_type(&self, scope: ScopeId, name: Name) -> Type {
        let Some(scope_ref) = self.bind.scope(scope) else {
            return Type::Unknown;
        };
        let Some(&sym) = scope_ref.symbols.get(&name) else {
            return Type::Unknown;
        };
        let Some(symbol) = self.bind.symbol(sym) else {
            return Type::Unknown;
        };
        for &decl_id in &symbol.decls {
            if let Some(declaration) = self.bind.decl(decl_id) {
                if matches!(declaration.kind, tern_flow::DeclKind::Param { .. }) {
                    return self.decl_type(decl_id);
                }
            }
        }
        Type::Unknown
    }

    /// Join a label's antecedents; loop headers iterate to a fixed point
    /// bounded by `MAX_LOOP_PASSES`.
    fn label_type(
        &self,
        scope: ScopeId,
        label: FlowNodeId,
        name: Name,
        antecedents: &[FlowNodeId],
    ) -> Type {
        let key = (scope.raw(), label.raw(), name.raw());
        {
            let state = self.loop_state.borrow();
            if state.pending.contains(&key) {
                return match state.assumptions.get(&key) {
                    Some(assumption) => assumption.clone(),
                    None => Type::Unknown,
                };
            }
        }

        let Some(scope_ref) = self.bind.scope(scope) else {
            return Type::Unknown;
        };
        let mut entries: Vec<FlowNodeId> = Vec::new();
        let mut backs: Vec<FlowNodeId> = Vec::new();
        for &antecedent in antecedents {
            match scope_ref.flow.get(antecedent) {
                Some(FlowNode::LoopBack { .. }) => backs.push(antecedent),
                _ => entries.push(antecedent),
            }
        }

        let mut assumption = union_of(entries.iter().map(|&a| self.flow_type(scope, a, name)));
        if backs.is_empty() {
            return assumption;
        }

        self.loop_state.borrow_mut().pending.insert(key);
        for _pass in 0..MAX_LOOP_PASSES {
            self.loop_state
                .borrow_mut()
                .assumptions
                .insert(key, assumption.clone());
            let back_type = union_of(backs.iter().map(|&a| self.flow_type(scope, a, name)));
            let next = join(assumption.clone(), back_type);
            if next == assumption {
                break;
            }
            assumption = next;
        }
        let mut state = self.loop_state.borrow_mut();
        state.pending.remove(&key);
        state.assumptions.remove(&key);
        assumption
    }

    // === Branch-condition narrowing ===

    /// Apply the guard a branch condition implies for `name`, if any.
    fn apply_condition(&self, incoming: Type, condition: ExprId, assume: bool, name: Name) -> Type {
        let Some(expr) = self.ast.expr(condition) else {
            return incoming;
        };
        match &expr.kind {
            // `if x:`
            ExprKind::Name(n) if *n == name => narrow(&incoming, &TypeGuard::Truthy, assume),
            // `if not <cond>:` flips the assumed side.
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.apply_condition(incoming, *operand, !assume, name),
            ExprKind::Compare {
                op,
                left,
                right,
            } => self.apply_comparison(incoming, *op, *left, *right, assume, name),
            ExprKind::Call { callee, args } => {
                self.apply_isinstance(incoming, *callee, args, assume, name)
            }
            ExprKind::BoolOp { op, left, right } => {
                // On the side where both operands are known to have been
                // decided (taken `and`, untaken `or`), both guards apply.
                let both = match op {
                    tern_ir::BoolOp::And => assume,
                    tern_ir::BoolOp::Or => !assume,
                };
                if both {
                    let after_left = self.apply_condition(incoming, *left, assume, name);
                    self.apply_condition(after_left, *right, assume, name)
                } else {
                    incoming
                }
            }
            _ => incoming,
        }
    }

    fn apply_comparison(
        &self,
        incoming: Type,
        op: CompareOp,
        left: ExprId,
        right: ExprId,
        assume: bool,
        name: Name,
    ) -> Type {
        // The test must mention the queried name on one side.
        let other = if self.is_name(left, name) {
            right
        } else if self.is_name(right, name) {
            left
        } else {
            return incoming;
        };

        match op {
            CompareOp::Is | CompareOp::IsNot => {
                if self.is_none_literal(other) {
                    let positive = (op == CompareOp::Is) == assume;
                    narrow(&incoming, &TypeGuard::IsNone, positive)
                } else {
                    incoming
                }
            }
            CompareOp::Eq | CompareOp::NotEq => {
                let positive = (op == CompareOp::Eq) == assume;
                if self.is_none_literal(other) {
                    // `x == None` narrows like an identity test.
                    return narrow(&incoming, &TypeGuard::IsNone, positive);
                }
                match self.literal_of(other) {
                    Some((value, class)) => {
                        narrow(&incoming, &TypeGuard::LiteralEq(value, class), positive)
                    }
                    None => incoming,
                }
            }
            _ => incoming,
        }
    }

    fn apply_isinstance(
        &self,
        incoming: Type,
        callee: ExprId,
        args: &[ExprId],
        assume: bool,
        name: Name,
    ) -> Type {
        if !self.is_isinstance_callee(callee) || args.len() != 2 {
            return incoming;
        }
        if !self.is_name(args[0], name) {
            return incoming;
        }
        match self.class_of_static(args[1]) {
            Some(class) => narrow(&incoming, &TypeGuard::IsInstance(class), assume),
            None => incoming,
        }
    }

    /// Resolve an expression statically to a class object, for `isinstance`
    /// narrowing and the unnecessary-isinstance rule.
    pub(crate) fn class_of_static(
        &self,
        expr: ExprId,
    ) -> Option<std::sync::Arc<tern_types::ClassType>> {
        match self.type_of(expr) {
            Type::Class(class) => Some(class),
            _ => None,
        }
    }

    fn is_name(&self, expr: ExprId, name: Name) -> bool {
        matches!(
            self.ast.expr(expr).map(|e| &e.kind),
            Some(ExprKind::Name(n)) if *n == name
        )
    }

    fn is_none_literal(&self, expr: ExprId) -> bool {
        matches!(self.ast.expr(expr).map(|e| &e.kind), Some(ExprKind::None))
    }

    fn literal_of(
        &self,
        expr: ExprId,
    ) -> Option<(LiteralValue, std::sync::Arc<tern_types::ClassType>)> {
        match self.ast.expr(expr).map(|e| &e.kind) {
            Some(ExprKind::Int(v)) => Some((
                LiteralValue::Int(*v),
                std::sync::Arc::clone(&self.builtins.int),
            )),
            Some(ExprKind::Str(s)) => Some((
                LiteralValue::Str(*s),
                std::sync::Arc::clone(&self.builtins.str),
            )),
            Some(ExprKind::Bool(b)) => Some((
                LiteralValue::Bool(*b),
                std::sync::Arc::clone(&self.builtins.bool),
            )),
            _ => None,
        }
    }
}
