//! The built-in class registry.
//!
//! Pre-interns well-known names and constructs the core class hierarchy once
//! per session, so every later comparison is a u32 id check rather than a
//! string lookup.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tern_ir::{Name, StringInterner};

use crate::{ClassType, FunctionType, ParamType, Type, TypeVarType};

/// Pre-interned names the analyzer compares against constantly.
pub struct BuiltinNames {
    pub object: Name,
    pub int: Name,
    pub float: Name,
    pub bool: Name,
    pub str: Name,
    pub list: Name,
    pub dict: Name,
    pub tuple: Name,
    /// The `isinstance` guard function.
    pub isinstance: Name,
    /// Conventional name of the initializer method.
    pub init: Name,
}

impl BuiltinNames {
    fn new(interner: &StringInterner) -> Self {
        BuiltinNames {
            object: interner.intern("object"),
            int: interner.intern("int"),
            float: interner.intern("float"),
            bool: interner.intern("bool"),
            str: interner.intern("str"),
            list: interner.intern("list"),
            dict: interner.intern("dict"),
            tuple: interner.intern("tuple"),
            isinstance: interner.intern("isinstance"),
            init: interner.intern("init"),
        }
    }
}

// Class ids are process-unique; sessions never reuse one.
static NEXT_CLASS_ID: AtomicU32 = AtomicU32::new(0);

fn fresh_class_id() -> u32 {
    NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)
}

/// The built-in classes of one session.
pub struct Builtins {
    pub names: BuiltinNames,
    pub object: Arc<ClassType>,
    pub int: Arc<ClassType>,
    pub float: Arc<ClassType>,
    pub bool: Arc<ClassType>,
    pub str: Arc<ClassType>,
    pub list: Arc<ClassType>,
    pub dict: Arc<ClassType>,
    pub tuple: Arc<ClassType>,
}

impl Builtins {
    /// Build the core hierarchy: `object` at the root, `bool` deriving
    /// `int`, the container classes generic over fresh type variables.
    pub fn new(interner: &StringInterner) -> Self {
        let names = BuiltinNames::new(interner);

        let object = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.object,
            bases: Vec::new(),
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });
        let int = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.int,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });
        let float = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.float,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });
        // bool is a subclass of int, matching the source language.
        let bool_class = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.bool,
            bases: vec![Arc::clone(&int)],
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });

        let str_stub = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.str,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });
        // str's methods mention str itself; the finished class shares the
        // stub's id, so instance types built from either compare equal.
        let str_class = Arc::new(ClassType {
            members: vec![
                (
                    interner.intern("upper"),
                    method(interner, "upper", &[], Type::instance(&str_stub)),
                ),
                (
                    interner.intern("strip"),
                    method(interner, "strip", &[], Type::instance(&str_stub)),
                ),
            ],
            ..(*str_stub).clone()
        });

        let item_var = Arc::new(TypeVarType {
            name: interner.intern("T"),
            bound: Option::None,
        });
        let list = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.list,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: vec![Arc::clone(&item_var)],
        });
        let key_var = Arc::new(TypeVarType {
            name: interner.intern("K"),
            bound: Option::None,
        });
        let value_var = Arc::new(TypeVarType {
            name: interner.intern("V"),
            bound: Option::None,
        });
        let dict = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.dict,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: vec![key_var, value_var],
        });
        let tuple = Arc::new(ClassType {
            id: fresh_class_id(),
            name: names.tuple,
            bases: vec![Arc::clone(&object)],
            members: Vec::new(),
            is_structural: false,
            type_params: Vec::new(),
        });

        Builtins {
            names,
            object,
            int,
            float,
            bool: bool_class,
            str: str_class,
            list,
            dict,
            tuple,
        }
    }

    /// Allocate a class with a fresh id, rooting base-less classes at
    /// `object`.
    pub fn fresh_class(
        &self,
        name: Name,
        bases: Vec<Arc<ClassType>>,
        members: Vec<(Name, Type)>,
        is_structural: bool,
    ) -> Arc<ClassType> {
        let bases = if bases.is_empty() {
            vec![Arc::clone(&self.object)]
        } else {
            bases
        };
        Arc::new(ClassType {
            id: fresh_class_id(),
            name,
            bases,
            members,
            is_structural,
            type_params: Vec::new(),
        })
    }

    /// Replace a class's members, keeping its identity.
    ///
    /// Used for the two-phase build of classes whose members mention the
    /// class itself: allocate first, fill members second. Id equality makes
    /// instances of both phases interchangeable.
    pub fn with_members(
        &self,
        class: &Arc<ClassType>,
        members: Vec<(Name, Type)>,
    ) -> Arc<ClassType> {
        Arc::new(ClassType {
            members,
            ..(**class).clone()
        })
    }

    /// Resolve a built-in class by name.
    pub fn class_named(&self, name: Name) -> Option<&Arc<ClassType>> {
        if name == self.names.object {
            Some(&self.object)
        } else if name == self.names.int {
            Some(&self.int)
        } else if name == self.names.float {
            Some(&self.float)
        } else if name == self.names.bool {
            Some(&self.bool)
        } else if name == self.names.str {
            Some(&self.str)
        } else if name == self.names.list {
            Some(&self.list)
        } else if name == self.names.dict {
            Some(&self.dict)
        } else if name == self.names.tuple {
            Some(&self.tuple)
        } else {
            Option::None
        }
    }
}

fn method(interner: &StringInterner, name: &str, params: &[(Name, Type)], ret: Type) -> Type {
    Type::Function(Arc::new(FunctionType {
        name: Some(interner.intern(name)),
        params: params
            .iter()
            .map(|(name, ty)| ParamType {
                name: *name,
                ty: ty.clone(),
                has_default: false,
            })
            .collect(),
        ret,
        is_overload: false,
        type_params: Vec::new(),
    }))
}
