//! Declaration, class, function, module, and annotation typing.

use std::sync::Arc;

use tern_ir::{ExprId, ExprKind, Name, StmtId, StmtKind};
use tern_flow::{DeclId, DeclKind, ScopeId, SymbolId};
use tern_types::{union_of, ClassType, FunctionType, ModuleType, ParamType, Type};

use super::Evaluator;

impl Evaluator<'_> {
    /// Declared-or-inferred type of one declaration.
    pub(crate) fn decl_type(&self, decl_id: DeclId) -> Type {
        let Some(declaration) = self.bind.decl(decl_id) else {
            self.record_internal(format!("declaration {decl_id:?} out of range"));
            return Type::Unknown;
        };
        match &declaration.kind {
            DeclKind::Assign { value, annotation } => match annotation {
                Some(ann) => self.annotation_type(*ann, declaration.scope),
                // Unannotated assignments widen literal initializers; the
                // literal value still narrows through equality guards on
                // the flow path.
                None => self.type_of(*value).widen_literal(),
            },
            DeclKind::Param { annotation, .. } => match annotation {
                Some(ann) => {
                    let scope = self.annotation_scope(declaration.scope);
                    self.annotation_type(*ann, scope)
                }
                None => Type::Unknown,
            },
            DeclKind::Function { stmt } => {
                // A def that belongs to a marked overload group answers
                // with the whole set, whichever declaration the flow walk
                // landed on.
                match self.overload_set_for(declaration) {
                    Some(set) => Type::Overloads(set),
                    None => Type::Function(self.function_type(*stmt)),
                }
            }
            DeclKind::Class { stmt } => Type::Class(self.class_type(*stmt)),
            DeclKind::Import { module, resolved } => {
                if *resolved {
                    Type::Module(self.module_type(*module))
                } else {
                    Type::Unknown
                }
            }
            DeclKind::ForTarget { iter } => {
                let iterable = self.type_of(*iter);
                self.element_type(&iterable)
            }
            DeclKind::ExceptBinding { class } => match class {
                Some(class_expr) => match self.type_of(*class_expr) {
                    Type::Class(class) => Type::instance(&class),
                    _ => Type::Unknown,
                },
                None => Type::Unknown,
            },
        }
    }

    /// The scope annotations on a function's parameters resolve in: the
    /// scope enclosing the function, not the function body itself.
    fn annotation_scope(&self, scope: ScopeId) -> ScopeId {
        match self.bind.scope(scope).and_then(|s| s.parent) {
            Some(parent) => parent,
            None => scope,
        }
    }

    /// Type of a symbol seen from outside its scope's flow: an overload
    /// set when several marked signatures share the name, otherwise the
    /// union of its declarations' types.
    pub(crate) fn symbol_declared_type(&self, sym: SymbolId) -> Type {
        let Some(symbol) = self.bind.symbol(sym) else {
            self.record_internal(format!("symbol {sym:?} out of range"));
            return Type::Unknown;
        };
        if let Some(overloads) = self.overload_set(&symbol.decls) {
            return Type::Overloads(overloads);
        }
        union_of(symbol.decls.iter().map(|&d| self.decl_type(d)))
    }

    /// The overload set a function declaration belongs to, via its
    /// symbol's sibling declarations.
    fn overload_set_for(
        &self,
        declaration: &tern_flow::Declaration,
    ) -> Option<Vec<Arc<FunctionType>>> {
        let scope = self.bind.scope(declaration.scope)?;
        let &sym = scope.symbols.get(&declaration.name)?;
        let symbol = self.bind.symbol(sym)?;
        self.overload_set(&symbol.decls)
    }

    /// Collect `overload`-marked signatures for a symbol; two or more form
    /// a set, resolved per call site in declaration order.
    pub(crate) fn overload_set(&self, decls: &[DeclId]) -> Option<Vec<Arc<FunctionType>>> {
        let mut marked = Vec::new();
        for &decl_id in decls {
            let Some(declaration) = self.bind.decl(decl_id) else {
                continue;
            };
            let DeclKind::Function { stmt } = declaration.kind else {
                continue;
            };
            let Some(StmtKind::FunctionDef(def)) = self.ast.stmt(stmt).map(|s| &s.kind) else {
                continue;
            };
            if def.is_overload {
                marked.push(self.function_type(stmt));
            }
        }
        if marked.len() >= 2 {
            Some(marked)
        } else {
            None
        }
    }

    /// Build (and cache) the class type for a `class` statement.
    ///
    /// Two-phase: a member-less stub enters the cache first so member
    /// annotations mentioning the class itself resolve to the same class
    /// id, then the finished class replaces it.
    pub(crate) fn class_type(&self, sid: StmtId) -> Arc<ClassType> {
        if let Some(class) = self.caches.classes.borrow().get(&sid) {
            return Arc::clone(class);
        }
        let Some(StmtKind::ClassDef(def)) = self.ast.stmt(sid).map(|s| &s.kind) else {
            self.record_internal(format!("class statement {sid:?} missing"));
            return Arc::clone(&self.builtins.object);
        };

        let bases: Vec<Arc<ClassType>> = def
            .bases
            .iter()
            .filter_map(|&base| match self.type_of(base) {
                Type::Class(class) => Some(class),
                _ => None,
            })
            .collect();
        let stub = self
            .builtins
            .fresh_class(def.name, bases, Vec::new(), def.is_structural);
        self.caches
            .classes
            .borrow_mut()
            .insert(sid, Arc::clone(&stub));

        let members = self.class_members(sid, &def.body);
        let class = self.builtins.with_members(&stub, members);
        self.caches
            .classes
            .borrow_mut()
            .insert(sid, Arc::clone(&class));
        class
    }

    /// Member table in declaration order, one entry per name.
    fn class_members(&self, sid: StmtId, body: &[StmtId]) -> Vec<(Name, Type)> {
        let Some(&scope) = self.bind.scope_of_def.get(&sid) else {
            self.record_internal(format!("class {sid:?} has no scope"));
            return Vec::new();
        };
        let Some(scope_ref) = self.bind.scope(scope) else {
            return Vec::new();
        };
        let mut members: Vec<(Name, Type)> = Vec::new();
        for &stmt in body {
            let Some(&decl_id) = self.bind.stmt_decl.get(&stmt) else {
                continue;
            };
            let Some(declaration) = self.bind.decl(decl_id) else {
                continue;
            };
            let name = declaration.name;
            if members.iter().any(|(n, _)| *n == name) {
                continue;
            }
            let Some(&sym) = scope_ref.symbols.get(&name) else {
                continue;
            };
            members.push((name, self.symbol_declared_type(sym)));
        }
        members
    }

    /// Build (and cache) the signature of a `def` statement.
    pub(crate) fn function_type(&self, sid: StmtId) -> Arc<FunctionType> {
        if let Some(func) = self.caches.functions.borrow().get(&sid) {
            return Arc::clone(func);
        }
        let Some(StmtKind::FunctionDef(def)) = self.ast.stmt(sid).map(|s| &s.kind) else {
            self.record_internal(format!("function statement {sid:?} missing"));
            return Arc::new(FunctionType {
                name: None,
                params: Vec::new(),
                ret: Type::Unknown,
                is_overload: false,
                type_params: Vec::new(),
            });
        };
        let ann_scope = match self.bind.scope_of_def.get(&sid) {
            Some(&scope) => self.annotation_scope(scope),
            None => ScopeId::MODULE,
        };
        let params: Vec<ParamType> = def
            .params
            .iter()
            .map(|p| ParamType {
                name: p.name,
                ty: match p.annotation {
                    Some(ann) => self.annotation_type(ann, ann_scope),
                    None => Type::Unknown,
                },
                has_default: p.default.is_some(),
            })
            .collect();

        // Stub first: a recursive function's return inference meets the
        // stub and degrades to Unknown instead of recursing forever.
        let stub = Arc::new(FunctionType {
            name: Some(def.name),
            params: params.clone(),
            ret: Type::Unknown,
            is_overload: def.is_overload,
            type_params: Vec::new(),
        });
        self.caches
            .functions
            .borrow_mut()
            .insert(sid, Arc::clone(&stub));

        let ret = match def.returns {
            Some(ann) => self.annotation_type(ann, ann_scope),
            None => self.inferred_return_type(sid),
        };
        let func = Arc::new(FunctionType {
            name: Some(def.name),
            params,
            ret,
            is_overload: def.is_overload,
            type_params: Vec::new(),
        });
        self.caches
            .functions
            .borrow_mut()
            .insert(sid, Arc::clone(&func));
        func
    }

    /// Join of all returned expression types; a reachable fall-off-the-end
    /// path contributes `None`.
    fn inferred_return_type(&self, sid: StmtId) -> Type {
        let mut parts: Vec<Type> = Vec::new();
        if let Some(returns) = self.bind.returns.get(&sid) {
            for value in returns {
                match value {
                    Some(expr) => parts.push(self.type_of(*expr).widen_literal()),
                    None => parts.push(Type::None),
                }
            }
        }
        let falls_off = match self.bind.scope_of_def.get(&sid) {
            Some(&scope) => match self.bind.scope_end.get(&scope) {
                Some(&end) => self
                    .bind
                    .scope(scope)
                    .is_some_and(|s| !s.flow.is_unreachable(end)),
                None => true,
            },
            None => true,
        };
        if falls_off || parts.is_empty() {
            parts.push(Type::None);
        }
        union_of(parts)
    }

    /// Build (and cache) a resolved module's type. Exports are sorted by
    /// name id so rendering stays deterministic.
    pub(crate) fn module_type(&self, module: Name) -> Arc<ModuleType> {
        if let Some(m) = self.caches.modules.borrow().get(&module) {
            return Arc::clone(m);
        }
        let exports = match self.resolver.resolve(module) {
            Some(resolved) => {
                let mut exports: Vec<(Name, Type)> = resolved
                    .exports
                    .iter()
                    .map(|(&name, text)| (name, self.export_annotation(text)))
                    .collect();
                exports.sort_by_key(|(name, _)| name.raw());
                exports
            }
            None => Vec::new(),
        };
        let ty = Arc::new(ModuleType {
            name: module,
            exports,
        });
        self.caches
            .modules
            .borrow_mut()
            .insert(module, Arc::clone(&ty));
        ty
    }

    /// Resolver exports carry annotation text evaluated against builtins:
    /// `"int"`, `"str | None"`.
    fn export_annotation(&self, text: &str) -> Type {
        union_of(text.split('|').map(|part| {
            let part = part.trim();
            if part == "None" {
                Type::None
            } else {
                let name = self.interner.intern(part);
                match self.builtins.class_named(name) {
                    Some(class) => Type::instance(class),
                    None => Type::Unknown,
                }
            }
        }))
    }

    // === Annotation expressions ===

    /// Evaluate a type annotation in a scope.
    pub(crate) fn annotation_type(&self, expr: ExprId, scope: ScopeId) -> Type {
        let Some(node) = self.ast.expr(expr) else {
            return Type::Unknown;
        };
        match &node.kind {
            ExprKind::None => Type::None,
            ExprKind::Name(name) => match self.class_object_of_name(scope, *name) {
                Some(class) => Type::instance(&class),
                None => Type::Unknown,
            },
            // `int | None` in annotation position.
            ExprKind::Binary {
                op: tern_ir::BinaryOp::BitOr,
                left,
                right,
            } => union_of([
                self.annotation_type(*left, scope),
                self.annotation_type(*right, scope),
            ]),
            // `list[int]`, `dict[str, int]`.
            ExprKind::Subscript { value, index } => {
                let Some(ExprKind::Name(name)) = self.ast.expr(*value).map(|e| &e.kind) else {
                    return Type::Unknown;
                };
                let Some(class) = self.class_object_of_name(scope, *name) else {
                    return Type::Unknown;
                };
                let args = match self.ast.expr(*index).map(|e| &e.kind) {
                    Some(ExprKind::Tuple(items)) => items
                        .iter()
                        .map(|&item| self.annotation_type(item, scope))
                        .collect(),
                    _ => vec![self.annotation_type(*index, scope)],
                };
                Type::Instance(class, args)
            }
            // `module.Class`.
            ExprKind::Attribute { value, attr } => {
                let Some(ExprKind::Name(module_name)) = self.ast.expr(*value).map(|e| &e.kind)
                else {
                    return Type::Unknown;
                };
                match self.imported_module(scope, *module_name) {
                    Some(module) => module.export(*attr).cloned().unwrap_or(Type::Unknown),
                    None => Type::Unknown,
                }
            }
            _ => Type::Unknown,
        }
    }

    /// Resolve a name to a class object: user classes first, builtins as
    /// the fallback, assignment aliases (`alias = SomeClass`) honored.
    pub(crate) fn class_object_of_name(
        &self,
        scope: ScopeId,
        name: Name,
    ) -> Option<Arc<ClassType>> {
        if let Some((_, sym)) = self.bind.lookup(scope, name) {
            let symbol = self.bind.symbol(sym)?;
            for &decl_id in symbol.decls.iter().rev() {
                let declaration = self.bind.decl(decl_id)?;
                match &declaration.kind {
                    DeclKind::Class { stmt } => return Some(self.class_type(*stmt)),
                    DeclKind::Assign { value, .. } => {
                        if let Type::Class(class) = self.type_of(*value) {
                            return Some(class);
                        }
                    }
                    _ => {}
                }
            }
            return None;
        }
        self.builtins.class_named(name).cloned()
    }

    fn imported_module(&self, scope: ScopeId, name: Name) -> Option<Arc<ModuleType>> {
        let (_, sym) = self.bind.lookup(scope, name)?;
        let symbol = self.bind.symbol(sym)?;
        for &decl_id in symbol.decls.iter().rev() {
            if let Some(declaration) = self.bind.decl(decl_id) {
                if let DeclKind::Import {
                    module,
                    resolved: true,
                } = &declaration.kind
                {
                    return Some(self.module_type(*module));
                }
            }
        }
        None
    }

    // === Container element access ===

    /// Element produced by iterating a value.
    pub(crate) fn element_type(&self, iterable: &Type) -> Type {
        match iterable {
            Type::Unknown | Type::Never => Type::Unknown,
            Type::Union(members) => {
                union_of(members.iter().map(|m| self.element_type(m)))
            }
            Type::Instance(class, args) => {
                if class.derives_from(&self.builtins.str) {
                    Type::instance(&self.builtins.str)
                } else if class.derives_from(&self.builtins.list) {
                    args.first().cloned().unwrap_or(Type::Unknown)
                } else if class.derives_from(&self.builtins.dict) {
                    args.first().cloned().unwrap_or(Type::Unknown)
                } else {
                    Type::Unknown
                }
            }
            Type::Literal(_, class) if class.derives_from(&self.builtins.str) => {
                Type::instance(&self.builtins.str)
            }
            _ => Type::Unknown,
        }
    }

    /// Result of subscripting a value.
    pub(crate) fn subscript_type(&self, base: &Type) -> Type {
        match base {
            Type::Unknown | Type::Never => Type::Unknown,
            Type::Union(members) => {
                union_of(members.iter().map(|m| self.subscript_type(m)))
            }
            Type::Instance(class, args) => {
                if class.derives_from(&self.builtins.str) {
                    Type::instance(&self.builtins.str)
                } else if class.derives_from(&self.builtins.list) {
                    args.first().cloned().unwrap_or(Type::Unknown)
                } else if class.derives_from(&self.builtins.dict) {
                    args.get(1).cloned().unwrap_or(Type::Unknown)
                } else {
                    Type::Unknown
                }
            }
            Type::Literal(_, class) if class.derives_from(&self.builtins.str) => {
                Type::instance(&self.builtins.str)
            }
            _ => Type::Unknown,
        }
    }
}
