//! Pre-computed type property flags.
//!
//! One traversal answers the questions every rule asks first ("does this
//! contain Unknown / None / Never?"), so checks can short-circuit without
//! repeated deep matching.

use bitflags::bitflags;

use crate::Type;

bitflags! {
    /// Presence properties of a type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeFlags: u8 {
        /// Contains `Unknown` at the top level or inside a union.
        const HAS_UNKNOWN = 1 << 0;
        /// Contains `None` at the top level or inside a union.
        const HAS_NONE = 1 << 1;
        /// Is `Never`.
        const IS_NEVER = 1 << 2;
        /// Contains a type variable.
        const HAS_TYPE_VAR = 1 << 3;
    }
}

impl TypeFlags {
    /// Compute flags for a type.
    ///
    /// Union members contribute their flags; other compound types are
    /// opaque here (their internals do not gate rule short-circuits).
    pub fn of(ty: &Type) -> TypeFlags {
        match ty {
            Type::Unknown => TypeFlags::HAS_UNKNOWN,
            Type::None => TypeFlags::HAS_NONE,
            Type::Never => TypeFlags::IS_NEVER,
            Type::TypeVar(_) => TypeFlags::HAS_TYPE_VAR,
            Type::Union(members) => members
                .iter()
                .fold(TypeFlags::empty(), |acc, m| acc | TypeFlags::of(m)),
            _ => TypeFlags::empty(),
        }
    }
}

impl Type {
    /// Check whether the type is or contains `Unknown`.
    #[inline]
    pub fn has_unknown(&self) -> bool {
        TypeFlags::of(self).contains(TypeFlags::HAS_UNKNOWN)
    }

    /// Check whether the type is or contains `None`.
    #[inline]
    pub fn has_none(&self) -> bool {
        TypeFlags::of(self).contains(TypeFlags::HAS_NONE)
    }

    /// Check whether a rule should skip this type entirely: `Unknown` and
    /// `Never` inputs never produce findings (no cascades, no dead-code
    /// noise).
    #[inline]
    pub fn suppresses_diagnostics(&self) -> bool {
        let flags = TypeFlags::of(self);
        flags.contains(TypeFlags::HAS_UNKNOWN) || flags.contains(TypeFlags::IS_NEVER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{union_of, Builtins};
    use tern_ir::StringInterner;

    #[test]
    fn flags_of_primitives() {
        assert_eq!(TypeFlags::of(&Type::Unknown), TypeFlags::HAS_UNKNOWN);
        assert_eq!(TypeFlags::of(&Type::None), TypeFlags::HAS_NONE);
        assert_eq!(TypeFlags::of(&Type::Never), TypeFlags::IS_NEVER);
    }

    #[test]
    fn union_accumulates() {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let ty = union_of([Type::instance(&builtins.int), Type::None, Type::Unknown]);
        let flags = TypeFlags::of(&ty);
        assert!(flags.contains(TypeFlags::HAS_NONE));
        assert!(flags.contains(TypeFlags::HAS_UNKNOWN));
        assert!(!flags.contains(TypeFlags::IS_NEVER));
    }

    #[test]
    fn suppression() {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        assert!(Type::Unknown.suppresses_diagnostics());
        assert!(Type::Never.suppresses_diagnostics());
        assert!(!Type::instance(&builtins.int).suppresses_diagnostics());
        assert!(union_of([Type::instance(&builtins.int), Type::Unknown]).suppresses_diagnostics());
    }
}
