//! The type data model.

use std::sync::Arc;

use tern_ir::Name;

/// A literal value carried by a literal type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LiteralValue {
    Int(i64),
    Str(Name),
    Bool(bool),
}

impl LiteralValue {
    /// Truthiness of the value, when decidable from the value alone.
    ///
    /// String truthiness needs the interned text (only `""` is falsy), which
    /// this crate cannot reach; `None` means the guard must keep the member
    /// on both sides of a truthiness branch.
    pub fn truthiness(self) -> Option<bool> {
        match self {
            LiteralValue::Int(v) => Some(v != 0),
            LiteralValue::Bool(b) => Some(b),
            LiteralValue::Str(_) => Option::None,
        }
    }
}

/// A class definition: name, base classes, members.
///
/// # Identity
/// Classes compare by `id`, not structurally. A class body may mention its
/// own class (a method returning an instance of it), so structural
/// comparison would not terminate. Ids are process-unique; see
/// `Builtins::fresh_class`.
#[derive(Clone, Debug)]
pub struct ClassType {
    pub id: u32,
    pub name: Name,
    pub bases: Vec<Arc<ClassType>>,
    /// Declared members in declaration order.
    pub members: Vec<(Name, Type)>,
    /// Protocol-style class checked by member shape, not base chain.
    pub is_structural: bool,
    pub type_params: Vec<Arc<TypeVarType>>,
}

impl PartialEq for ClassType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassType {}

impl std::hash::Hash for ClassType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ClassType {
    /// Look up a member on this class or, depth-first, its bases.
    pub fn member(&self, name: Name) -> Option<&Type> {
        if let Some((_, ty)) = self.members.iter().find(|(n, _)| *n == name) {
            return Some(ty);
        }
        self.bases.iter().find_map(|base| base.member(name))
    }

    /// Look up a member declared directly on this class.
    pub fn own_member(&self, name: Name) -> Option<&Type> {
        self.members
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| ty)
    }

    /// Check nominal derivation: `self` is `ancestor` or derives from it.
    pub fn derives_from(&self, ancestor: &ClassType) -> bool {
        if self.id == ancestor.id {
            return true;
        }
        self.bases.iter().any(|base| base.derives_from(ancestor))
    }

    /// The root class of a well-formed registry has no bases.
    pub fn is_root(&self) -> bool {
        self.bases.is_empty()
    }
}

/// A type variable solved per call site.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TypeVarType {
    pub name: Name,
    pub bound: Option<Type>,
}

/// One formal parameter of a function type.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParamType {
    pub name: Name,
    pub ty: Type,
    pub has_default: bool,
}

/// A function signature.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FunctionType {
    pub name: Option<Name>,
    pub params: Vec<ParamType>,
    pub ret: Type,
    /// Whether this signature came from an `overload`-marked definition.
    pub is_overload: bool,
    pub type_params: Vec<Arc<TypeVarType>>,
}

impl FunctionType {
    /// Number of parameters without defaults.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| !p.has_default).count()
    }
}

/// A resolved module and its exported bindings.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ModuleType {
    pub name: Name,
    pub exports: Vec<(Name, Type)>,
}

impl ModuleType {
    /// Look up an exported binding.
    pub fn export(&self, name: Name) -> Option<&Type> {
        self.exports
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| ty)
    }
}

/// The type of an expression or declaration.
///
/// Immutable value object; structurally equal types compare equal (classes
/// by id, see [`ClassType`]), which makes cached copies safe.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Type {
    /// Not (yet) known; assignable to and from anything so one unresolved
    /// input never cascades.
    Unknown,
    /// The empty type: unreachable values, empty unions.
    Never,
    /// The `None` singleton.
    None,
    Module(Arc<ModuleType>),
    /// The class object itself (`int`, not an int value).
    Class(Arc<ClassType>),
    /// An instance of a class, with type arguments for generic classes.
    Instance(Arc<ClassType>, Vec<Type>),
    Function(Arc<FunctionType>),
    /// An overload set; resolved per call site in declaration order.
    Overloads(Vec<Arc<FunctionType>>),
    /// Flattened, deduplicated union in first-occurrence order. Built only
    /// through [`union_of`]; never directly contains another union.
    Union(Vec<Type>),
    TypeVar(Arc<TypeVarType>),
    /// A literal value type and the class it belongs to.
    Literal(LiteralValue, Arc<ClassType>),
}

impl Type {
    /// Instance of a class with no type arguments.
    pub fn instance(class: &Arc<ClassType>) -> Type {
        Type::Instance(Arc::clone(class), Vec::new())
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    #[inline]
    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Type::None)
    }

    /// Iterate union members, or the type itself for non-unions.
    pub fn members(&self) -> std::slice::Iter<'_, Type> {
        match self {
            Type::Union(members) => members.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    /// The class behind an instance or literal, if any.
    pub fn instance_class(&self) -> Option<&Arc<ClassType>> {
        match self {
            Type::Instance(class, _) => Some(class),
            Type::Literal(_, class) => Some(class),
            _ => None,
        }
    }

    /// Widen a literal to an instance of its class; other types unchanged.
    pub fn widen_literal(&self) -> Type {
        match self {
            Type::Literal(_, class) => Type::instance(class),
            Type::Union(members) => union_of(members.iter().map(Type::widen_literal)),
            other => other.clone(),
        }
    }
}

/// Build a union: flattened, `Never` dropped, deduplicated, first-occurrence
/// order. An empty union is `Never`; a single member is itself.
pub fn union_of(members: impl IntoIterator<Item = Type>) -> Type {
    let mut out: Vec<Type> = Vec::new();
    for member in members {
        match member {
            Type::Never => {}
            Type::Union(inner) => {
                for ty in inner {
                    if !out.contains(&ty) {
                        out.push(ty);
                    }
                }
            }
            ty => {
                if !out.contains(&ty) {
                    out.push(ty);
                }
            }
        }
    }
    match out.len() {
        0 => Type::Never,
        1 => match out.pop() {
            Some(ty) => ty,
            Option::None => Type::Never,
        },
        _ => Type::Union(out),
    }
}

/// Join two types at a control-flow merge point.
pub fn join(a: Type, b: Type) -> Type {
    union_of([a, b])
}

#[cfg(test)]
mod tests;
