//! Arena index handles for binder output.
//!
//! Plain u32 newtypes. Back-references (scope parent, declaration scope)
//! are these indices, never owning pointers, so the scope tree and flow
//! graphs stay cycle-free at the ownership level even though the flow
//! graphs contain cycles at the edge level.

use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

arena_id! {
    /// Index of a scope in the bind result.
    ScopeId
}

arena_id! {
    /// Index of a symbol in the bind result.
    SymbolId
}

arena_id! {
    /// Index of a declaration in the bind result.
    DeclId
}

arena_id! {
    /// Index of a flow node within its scope's flow arena.
    FlowNodeId
}

impl ScopeId {
    /// The module scope is always bound first.
    pub const MODULE: ScopeId = ScopeId(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_4_bytes() {
        assert_eq!(std::mem::size_of::<ScopeId>(), 4);
        assert_eq!(std::mem::size_of::<FlowNodeId>(), 4);
    }

    #[test]
    fn module_scope_is_zero() {
        assert_eq!(ScopeId::MODULE, ScopeId::new(0));
        assert_eq!(ScopeId::MODULE.index(), 0);
    }
}
