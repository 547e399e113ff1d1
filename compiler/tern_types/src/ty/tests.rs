use std::sync::Arc;

use pretty_assertions::assert_eq;
use tern_ir::StringInterner;

use crate::{union_of, Builtins, LiteralValue, Type};

#[test]
fn union_flattens_and_dedups() {
    let interner = StringInterner::new();
    let builtins = Builtins::new(&interner);
    let int = Type::instance(&builtins.int);
    let text = Type::instance(&builtins.str);

    let inner = union_of([int.clone(), Type::None]);
    let outer = union_of([inner, text.clone(), int.clone()]);
    match &outer {
        Type::Union(members) => {
            assert_eq!(members.len(), 3);
            assert_eq!(members[0], int);
            assert_eq!(members[1], Type::None);
            assert_eq!(members[2], text);
        }
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn empty_union_is_never() {
    assert_eq!(union_of([]), Type::Never);
    assert_eq!(union_of([Type::Never, Type::Never]), Type::Never);
}

#[test]
fn single_member_union_collapses() {
    let interner = StringInterner::new();
    let builtins = Builtins::new(&interner);
    let int = Type::instance(&builtins.int);
    assert_eq!(union_of([int.clone(), Type::Never]), int);
}

#[test]
fn class_equality_is_by_id() {
    let interner = StringInterner::new();
    let builtins = Builtins::new(&interner);
    // Two registries produce distinct ids for same-named classes.
    let other = Builtins::new(&interner);
    assert_eq!(builtins.int, builtins.int);
    assert_eq!(
        Type::instance(&builtins.int),
        Type::Instance(Arc::clone(&builtins.int), Vec::new())
    );
    assert_ne!(builtins.int, other.int);
}

#[test]
fn derives_through_base_chain() {
    let interner = StringInterner::new();
    let builtins = Builtins::new(&interner);
    assert!(builtins.bool.derives_from(&builtins.int));
    assert!(builtins.bool.derives_from(&builtins.object));
    assert!(!builtins.int.derives_from(&builtins.bool));
}

#[test]
fn widen_literal() {
    let interner = StringInterner::new();
    let builtins = Builtins::new(&interner);
    let lit = Type::Literal(LiteralValue::Int(3), Arc::clone(&builtins.int));
    assert_eq!(lit.widen_literal(), Type::instance(&builtins.int));

    let union = union_of([lit, Type::None]);
    assert_eq!(
        union.widen_literal(),
        union_of([Type::instance(&builtins.int), Type::None])
    );
}

#[test]
fn members_iterates_non_union_as_singleton() {
    let members: Vec<_> = Type::Unknown.members().cloned().collect();
    assert_eq!(members, vec![Type::Unknown]);
}

#[test]
fn literal_truthiness() {
    let interner = StringInterner::new();
    assert_eq!(LiteralValue::Int(0).truthiness(), Some(false));
    assert_eq!(LiteralValue::Int(7).truthiness(), Some(true));
    assert_eq!(LiteralValue::Bool(false).truthiness(), Some(false));
    assert_eq!(
        LiteralValue::Str(interner.intern("s")).truthiness(),
        None
    );
}
