//! Algebraic properties of the type model, checked over generated inputs.

use std::sync::Arc;

use proptest::prelude::*;
use tern_ir::StringInterner;
use tern_types::{
    is_assignable, join, narrow, union_of, Builtins, LiteralValue, Type, TypeGuard,
};

/// Map a small code to a concrete type against a fixed registry.
fn atom(builtins: &Builtins, code: u8) -> Type {
    match code % 8 {
        0 => Type::instance(&builtins.int),
        1 => Type::instance(&builtins.str),
        2 => Type::instance(&builtins.bool),
        3 => Type::instance(&builtins.float),
        4 => Type::None,
        5 => Type::Unknown,
        6 => Type::Literal(LiteralValue::Int(i64::from(code)), Arc::clone(&builtins.int)),
        _ => Type::Literal(LiteralValue::Bool(code % 2 == 0), Arc::clone(&builtins.bool)),
    }
}

fn guard(builtins: &Builtins, code: u8) -> TypeGuard {
    match code % 4 {
        0 => TypeGuard::IsNone,
        1 => TypeGuard::IsInstance(Arc::clone(&builtins.int)),
        2 => TypeGuard::Truthy,
        _ => TypeGuard::LiteralEq(LiteralValue::Int(3), Arc::clone(&builtins.int)),
    }
}

fn same_members(a: &Type, b: &Type) -> bool {
    a.members().all(|m| b.members().any(|n| n == m))
        && b.members().all(|m| a.members().any(|n| n == m))
}

proptest! {
    #[test]
    fn join_is_commutative_as_a_set(xs in prop::collection::vec(0u8..16, 1..4),
                                    ys in prop::collection::vec(0u8..16, 1..4)) {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let a = union_of(xs.iter().map(|&c| atom(&builtins, c)));
        let b = union_of(ys.iter().map(|&c| atom(&builtins, c)));
        let ab = join(a.clone(), b.clone());
        let ba = join(b, a);
        prop_assert!(same_members(&ab, &ba), "join not set-commutative: {ab:?} vs {ba:?}");
    }

    #[test]
    fn unions_stay_flat_and_deduped(xs in prop::collection::vec(0u8..16, 0..6)) {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let inner = union_of(xs.iter().map(|&c| atom(&builtins, c)));
        let outer = union_of([inner.clone(), inner.clone()]);
        prop_assert_eq!(&outer, &inner);
        if let Type::Union(members) = &outer {
            prop_assert!(members.len() > 1);
            for (i, m) in members.iter().enumerate() {
                prop_assert!(!matches!(m, Type::Union(_)), "nested union survived");
                prop_assert!(!m.is_never(), "Never member survived");
                prop_assert!(!members[..i].contains(m), "duplicate member survived");
            }
        }
    }

    #[test]
    fn narrowing_never_widens(xs in prop::collection::vec(0u8..16, 1..4),
                              g in 0u8..8, positive in any::<bool>()) {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let ty = union_of(xs.iter().map(|&c| atom(&builtins, c)));
        let narrowed = narrow(&ty, &guard(&builtins, g), positive);
        prop_assert!(
            is_assignable(&narrowed, &ty),
            "narrowed {narrowed:?} not assignable to original {ty:?}"
        );
    }

    #[test]
    fn narrowing_is_idempotent(xs in prop::collection::vec(0u8..16, 1..4),
                               g in 0u8..8, positive in any::<bool>()) {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let ty = union_of(xs.iter().map(|&c| atom(&builtins, c)));
        let g = guard(&builtins, g);
        let once = narrow(&ty, &g, positive);
        let twice = narrow(&once, &g, positive);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn assignability_is_reflexive(xs in prop::collection::vec(0u8..16, 1..4)) {
        let interner = StringInterner::new();
        let builtins = Builtins::new(&interner);
        let ty = union_of(xs.iter().map(|&c| atom(&builtins, c)));
        prop_assert!(is_assignable(&ty, &ty));
    }
}
