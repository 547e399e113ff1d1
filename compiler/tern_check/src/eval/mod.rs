//! The type evaluator.
//!
//! `type_of` is memoized on `(expression, flow node)` plus the session's
//! generation stamp, idempotent, and callable in any order: the checker
//! batch-walks every expression, while an editor host issues point queries
//! for hover and completion against a merely-bound scope.
//!
//! Unresolved names evaluate to `Unknown`, never an error; the checker
//! separately reports undefined names when no declaration exists at all.

mod decl;
mod flow;

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use tern_ir::{
    with_sufficient_stack, Ast, BinaryOp, BoolOp, ExprId, ExprKind, ModuleResolver, Name,
    StmtId, StringInterner, UnaryOp,
};
use tern_flow::{BindResult, FlowNodeId, FlowPoint};
use tern_types::{
    check_call, join, narrow, resolve_overload, union_of, Builtins, ClassType, FunctionType,
    LiteralValue, ModuleType, OverloadResolution, ParamType, Type, TypeGuard,
};

/// Bound on loop fixed-point iteration. The loop-carried type is the union
/// of observed assignment types once the bound is hit.
pub(crate) const MAX_LOOP_PASSES: usize = 3;

/// One memoized evaluation result.
#[derive(Clone, Debug)]
pub(crate) struct CacheEntry {
    pub ty: Type,
    pub stamp: u32,
}

/// Caches owned by the session.
///
/// The expression cache survives edits; entries with a stale stamp are
/// lazily overwritten on the next query, which keeps invalidation O(1).
/// The structural caches are cleared on edit.
#[derive(Default)]
pub(crate) struct Caches {
    pub expr: RefCell<FxHashMap<(ExprId, FlowNodeId), CacheEntry>>,
    pub classes: RefCell<FxHashMap<StmtId, Arc<ClassType>>>,
    pub functions: RefCell<FxHashMap<StmtId, Arc<FunctionType>>>,
    pub modules: RefCell<FxHashMap<Name, Arc<ModuleType>>>,
}

impl Caches {
    pub fn clear_structural(&self) {
        self.classes.borrow_mut().clear();
        self.functions.borrow_mut().clear();
        self.modules.borrow_mut().clear();
    }
}

/// Loop fixed-point bookkeeping, keyed by (scope, header label, name).
#[derive(Default)]
pub(crate) struct LoopState {
    pub pending: FxHashSet<(u32, u32, u32)>,
    pub assumptions: FxHashMap<(u32, u32, u32), Type>,
}

/// Borrowed evaluation view over one session's state.
pub(crate) struct Evaluator<'a> {
    pub ast: &'a Ast,
    pub bind: &'a BindResult,
    pub builtins: &'a Builtins,
    pub interner: &'a StringInterner,
    pub resolver: &'a dyn ModuleResolver,
    pub version: u32,
    pub caches: &'a Caches,
    pub(crate) loop_state: RefCell<LoopState>,
    internal_error: RefCell<Option<String>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        ast: &'a Ast,
        bind: &'a BindResult,
        builtins: &'a Builtins,
        interner: &'a StringInterner,
        resolver: &'a dyn ModuleResolver,
        version: u32,
        caches: &'a Caches,
    ) -> Self {
        Evaluator {
            ast,
            bind,
            builtins,
            interner,
            resolver,
            version,
            caches,
            loop_state: RefCell::new(LoopState::default()),
            internal_error: RefCell::new(None),
        }
    }

    /// Record an engine-internal inconsistency; the checker surfaces the
    /// first one per scope and carries on.
    pub(crate) fn record_internal(&self, detail: impl Into<String>) {
        let mut slot = self.internal_error.borrow_mut();
        if slot.is_none() {
            let detail = detail.into();
            tracing::warn!(detail = %detail, "internal inconsistency during evaluation");
            *slot = Some(detail);
        }
    }

    /// Take the recorded internal error, if any.
    pub(crate) fn take_internal_error(&self) -> Option<String> {
        self.internal_error.borrow_mut().take()
    }

    /// Compute the type of an expression.
    #[tracing::instrument(level = "trace", skip_all, fields(expr = expr.raw()))]
    pub fn type_of(&self, expr: ExprId) -> Type {
        let Some(point) = self.bind.flow_point(expr) else {
            // Never bound: annotation position or an id from another tree.
            return Type::Unknown;
        };
        let key = (expr, point.flow);
        {
            let cache = self.caches.expr.borrow();
            if let Some(entry) = cache.get(&key) {
                if entry.stamp == self.version {
                    return entry.ty.clone();
                }
            }
        }
        let ty = with_sufficient_stack(|| self.eval_expr(expr, point));
        // Results computed under a pending loop assumption are provisional;
        // only settled values enter the cache.
        if self.loop_state.borrow().pending.is_empty() {
            self.caches.expr.borrow_mut().insert(
                key,
                CacheEntry {
                    ty: ty.clone(),
                    stamp: self.version,
                },
            );
        }
        ty
    }

    fn eval_expr(&self, expr: ExprId, point: FlowPoint) -> Type {
        let Some(node) = self.ast.expr(expr) else {
            self.record_internal(format!("expression {expr:?} missing from arena"));
            return Type::Unknown;
        };
        match &node.kind {
            ExprKind::Int(value) => {
                Type::Literal(LiteralValue::Int(*value), Arc::clone(&self.builtins.int))
            }
            ExprKind::Str(value) => {
                Type::Literal(LiteralValue::Str(*value), Arc::clone(&self.builtins.str))
            }
            ExprKind::Bool(value) => {
                Type::Literal(LiteralValue::Bool(*value), Arc::clone(&self.builtins.bool))
            }
            ExprKind::None => Type::None,
            ExprKind::Name(name) => self.name_type(*name, point),
            ExprKind::Attribute { value, attr } => {
                let base = self.type_of(*value);
                self.member_type(&base, *attr)
            }
            ExprKind::Subscript { value, .. } => {
                let base = self.type_of(*value);
                self.subscript_type(&base)
            }
            ExprKind::Call { callee, args } => self.call_type(*callee, args),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => Type::instance(&self.builtins.bool),
                UnaryOp::Neg => match self.type_of(*operand) {
                    Type::Literal(LiteralValue::Int(v), class) => {
                        Type::Literal(LiteralValue::Int(-v), class)
                    }
                    other if self.is_numeric(&other) => other.widen_literal(),
                    _ => Type::Unknown,
                },
            },
            ExprKind::Binary { op, left, right } => {
                let lt = self.type_of(*left);
                let rt = self.type_of(*right);
                self.binary_type(*op, &lt, &rt).unwrap_or(Type::Unknown)
            }
            ExprKind::BoolOp { op, left, right } => {
                let lt = self.type_of(*left);
                let rt = self.type_of(*right);
                match op {
                    // `a or b` is a-when-truthy, otherwise b.
                    BoolOp::Or => join(narrow(&lt, &TypeGuard::Truthy, true), rt),
                    // `a and b` is a-when-falsy, otherwise b.
                    BoolOp::And => join(narrow(&lt, &TypeGuard::Truthy, false), rt),
                }
            }
            ExprKind::Compare { .. } => Type::instance(&self.builtins.bool),
            ExprKind::Tuple(_) => Type::instance(&self.builtins.tuple),
            ExprKind::Lambda { params, body } => self.lambda_type(point, params, *body),
        }
    }

    fn name_type(&self, name: Name, point: FlowPoint) -> Type {
        match self.bind.lookup(point.scope, name) {
            Some((decl_scope, sym)) => {
                if decl_scope == point.scope {
                    self.flow_type(point.scope, point.flow, name)
                } else {
                    // Flow analysis does not cross scope boundaries; outer
                    // names answer with their declared type.
                    self.symbol_declared_type(sym)
                }
            }
            None => {
                if let Some(class) = self.builtins.class_named(name) {
                    Type::Class(Arc::clone(class))
                } else if name == self.builtins.names.isinstance {
                    self.isinstance_signature()
                } else {
                    Type::Unknown
                }
            }
        }
    }

    /// Member access through any base type.
    pub(crate) fn member_type(&self, base: &Type, attr: Name) -> Type {
        match base {
            Type::Unknown | Type::Never | Type::None => Type::Unknown,
            Type::Union(members) => union_of(
                members
                    .iter()
                    .filter(|m| !m.is_none())
                    .map(|m| self.member_type(m, attr)),
            ),
            Type::Instance(class, args) => {
                let Some(member) = class.member(attr) else {
                    return Type::Unknown;
                };
                let member = self.apply_class_args(class, args, member);
                self.bind_method(member)
            }
            Type::Literal(_, class) => match class.member(attr) {
                Some(member) => self.bind_method(member.clone()),
                None => Type::Unknown,
            },
            Type::Class(class) => class.member(attr).cloned().unwrap_or(Type::Unknown),
            Type::Module(module) => module.export(attr).cloned().unwrap_or(Type::Unknown),
            Type::Function(_) | Type::Overloads(_) | Type::TypeVar(_) => Type::Unknown,
        }
    }

    /// Substitute a generic class's type parameters with instance args.
    fn apply_class_args(&self, class: &Arc<ClassType>, args: &[Type], member: &Type) -> Type {
        if args.is_empty() || class.type_params.len() != args.len() {
            return member.clone();
        }
        let solution: FxHashMap<Name, Type> = class
            .type_params
            .iter()
            .zip(args.iter())
            .map(|(var, arg)| (var.name, arg.clone()))
            .collect();
        tern_types::substitute(member, &solution)
    }

    /// Drop a leading `self` parameter when a function is reached through
    /// an instance.
    pub(crate) fn bind_method(&self, member: Type) -> Type {
        let self_name = self.interner.intern("self");
        let strip = |func: &Arc<FunctionType>| -> Arc<FunctionType> {
            match func.params.first() {
                Some(first) if first.name == self_name => Arc::new(FunctionType {
                    name: func.name,
                    params: func.params[1..].to_vec(),
                    ret: func.ret.clone(),
                    is_overload: func.is_overload,
                    type_params: func.type_params.clone(),
                }),
                _ => Arc::clone(func),
            }
        };
        match &member {
            Type::Function(func) => Type::Function(strip(func)),
            Type::Overloads(funcs) => Type::Overloads(funcs.iter().map(strip).collect()),
            _ => member,
        }
    }

    fn call_type(&self, callee: ExprId, args: &[ExprId]) -> Type {
        // isinstance is special-cased: a built-in guard returning bool.
        if self.is_isinstance_callee(callee) {
            return Type::instance(&self.builtins.bool);
        }
        let arg_types: Vec<Type> = args.iter().map(|&a| self.type_of(a)).collect();
        let callee_type = self.type_of(callee);
        self.callable_result(&callee_type, &arg_types)
    }

    pub(crate) fn callable_result(&self, callee: &Type, args: &[Type]) -> Type {
        match callee {
            Type::Unknown | Type::Never => Type::Unknown,
            Type::Function(func) => match check_call(func, args) {
                Ok(m) => m.ret,
                Err(_) => Type::Unknown,
            },
            Type::Overloads(funcs) => match resolve_overload(funcs, args) {
                OverloadResolution::Matched { ret, .. } => ret,
                _ => Type::Unknown,
            },
            Type::Class(class) => Type::instance(class),
            Type::Union(members) => union_of(
                members
                    .iter()
                    .filter(|m| !m.is_none())
                    .map(|m| self.callable_result(m, args)),
            ),
            _ => Type::Unknown,
        }
    }

    /// Check whether a callee expression is the built-in `isinstance` with
    /// no local redefinition shadowing it.
    pub(crate) fn is_isinstance_callee(&self, callee: ExprId) -> bool {
        let Some(expr) = self.ast.expr(callee) else {
            return false;
        };
        let ExprKind::Name(name) = &expr.kind else {
            return false;
        };
        if *name != self.builtins.names.isinstance {
            return false;
        }
        match self.bind.flow_point(callee) {
            Some(point) => self.bind.lookup(point.scope, *name).is_none(),
            None => true,
        }
    }

    fn isinstance_signature(&self) -> Type {
        let object = Type::instance(&self.builtins.object);
        Type::Function(Arc::new(FunctionType {
            name: Some(self.builtins.names.isinstance),
            params: vec![
                ParamType {
                    name: self.interner.intern("obj"),
                    ty: object.clone(),
                    has_default: false,
                },
                ParamType {
                    name: self.interner.intern("classinfo"),
                    ty: object,
                    has_default: false,
                },
            ],
            ret: Type::instance(&self.builtins.bool),
            is_overload: false,
            type_params: Vec::new(),
        }))
    }

    fn lambda_type(
        &self,
        point: FlowPoint,
        params: &[tern_ir::Param],
        body: ExprId,
    ) -> Type {
        let param_types = params
            .iter()
            .map(|p| ParamType {
                name: p.name,
                ty: match p.annotation {
                    Some(ann) => self.annotation_type(ann, point.scope),
                    None => Type::Unknown,
                },
                has_default: p.default.is_some(),
            })
            .collect();
        Type::Function(Arc::new(FunctionType {
            name: None,
            params: param_types,
            ret: self.type_of(body),
            is_overload: false,
            type_params: Vec::new(),
        }))
    }

    fn is_numeric(&self, ty: &Type) -> bool {
        match ty.instance_class() {
            Some(class) => {
                class.derives_from(&self.builtins.int) || class.derives_from(&self.builtins.float)
            }
            None => false,
        }
    }

    /// Result type of a binary operation, `None` when the operand types do
    /// not support the operator (the checker reports that).
    pub(crate) fn binary_type(&self, op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
        let left = left.widen_literal();
        let right = right.widen_literal();
        if left.is_unknown() || right.is_unknown() {
            return Some(Type::Unknown);
        }
        // Unions and other compound operands stay un-diagnosed.
        let (Some(lc), Some(rc)) = (left.instance_class(), right.instance_class()) else {
            return match (&left, &right) {
                (Type::Union(_), _) | (_, Type::Union(_)) => Some(Type::Unknown),
                _ => None,
            };
        };
        let int = &self.builtins.int;
        let float = &self.builtins.float;
        let str_class = &self.builtins.str;
        let l_int = lc.derives_from(int);
        let r_int = rc.derives_from(int);
        let l_float = lc.derives_from(float) || l_int;
        let r_float = rc.derives_from(float) || r_int;
        let l_str = lc.derives_from(str_class);
        let r_str = rc.derives_from(str_class);

        match op {
            BinaryOp::Add => {
                if l_str && r_str {
                    Some(Type::instance(str_class))
                } else if l_int && r_int {
                    Some(Type::instance(int))
                } else if l_float && r_float {
                    Some(Type::instance(float))
                } else {
                    None
                }
            }
            BinaryOp::Sub | BinaryOp::Mod => {
                if l_int && r_int {
                    Some(Type::instance(int))
                } else if l_float && r_float {
                    Some(Type::instance(float))
                } else {
                    None
                }
            }
            BinaryOp::Mul => {
                if l_int && r_int {
                    Some(Type::instance(int))
                } else if l_float && r_float {
                    Some(Type::instance(float))
                } else if (l_str && r_int) || (l_int && r_str) {
                    Some(Type::instance(str_class))
                } else {
                    None
                }
            }
            // True division always yields float on numbers.
            BinaryOp::Div => {
                if l_float && r_float {
                    Some(Type::instance(float))
                } else {
                    None
                }
            }
            BinaryOp::BitOr => {
                if l_int && r_int {
                    Some(Type::instance(int))
                } else {
                    None
                }
            }
        }
    }
}
