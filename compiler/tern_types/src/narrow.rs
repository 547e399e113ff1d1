//! Type narrowing along control-flow branches.
//!
//! A guard describes the runtime test a branch condition performs; `narrow`
//! removes union members inconsistent with the test's outcome. If nothing
//! survives, the result is `Never` and code reachable only through it is
//! dead.

use std::sync::Arc;

use crate::{union_of, ClassType, LiteralValue, Type};

/// The runtime test a branch condition performs on one name.
#[derive(Clone, Debug)]
pub enum TypeGuard {
    /// `x is None` (positive) / `x is not None` (negative).
    IsNone,
    /// `isinstance(x, C)`.
    IsInstance(Arc<ClassType>),
    /// Truthiness of `x` itself.
    Truthy,
    /// `x == <literal>` (positive) / `x != <literal>` (negative).
    LiteralEq(LiteralValue, Arc<ClassType>),
}

/// Narrow `ty` under `guard`, on the taken (`positive`) or untaken side.
pub fn narrow(ty: &Type, guard: &TypeGuard, positive: bool) -> Type {
    if ty.is_never() {
        return Type::Never;
    }
    union_of(
        ty.members()
            .filter_map(|member| narrow_member(member, guard, positive)),
    )
}

fn narrow_member(member: &Type, guard: &TypeGuard, positive: bool) -> Option<Type> {
    match guard {
        TypeGuard::IsNone => narrow_is_none(member, positive),
        TypeGuard::IsInstance(class) => narrow_isinstance(member, class, positive),
        TypeGuard::Truthy => narrow_truthy(member, positive),
        TypeGuard::LiteralEq(value, class) => narrow_literal_eq(member, *value, class, positive),
    }
}

fn narrow_is_none(member: &Type, positive: bool) -> Option<Type> {
    if positive {
        match member {
            Type::None => Some(Type::None),
            // An unresolved or unsolved member passing the test is None.
            Type::Unknown | Type::TypeVar(_) => Some(Type::None),
            _ => None,
        }
    } else {
        match member {
            Type::None => None,
            other => Some(other.clone()),
        }
    }
}

fn narrow_isinstance(member: &Type, class: &Arc<ClassType>, positive: bool) -> Option<Type> {
    if positive {
        match member {
            // Narrowing Unknown by a positive class test yields the tested
            // instance type instead of staying opaque.
            Type::Unknown | Type::TypeVar(_) => Some(Type::instance(class)),
            Type::Instance(have, _) => {
                if have.derives_from(class) {
                    Some(member.clone())
                } else if class.derives_from(have) {
                    // Test against a subclass of the declared type.
                    Some(Type::instance(class))
                } else {
                    None
                }
            }
            Type::Literal(_, have) => have.derives_from(class).then(|| member.clone()),
            // None and non-instance values only pass a test against the
            // root class.
            _ => class.is_root().then(|| member.clone()),
        }
    } else {
        match member {
            Type::Unknown => Some(Type::Unknown),
            Type::Instance(have, _) => (!have.derives_from(class)).then(|| member.clone()),
            Type::Literal(_, have) => (!have.derives_from(class)).then(|| member.clone()),
            _ => (!class.is_root()).then(|| member.clone()),
        }
    }
}

fn narrow_truthy(member: &Type, positive: bool) -> Option<Type> {
    match member {
        Type::None => (!positive).then_some(Type::None),
        Type::Literal(value, _) => match value.truthiness() {
            Some(truthy) => (truthy == positive).then(|| member.clone()),
            // Undecidable (string literals): survives both sides.
            None => Some(member.clone()),
        },
        other => Some(other.clone()),
    }
}

fn narrow_literal_eq(
    member: &Type,
    value: LiteralValue,
    class: &Arc<ClassType>,
    positive: bool,
) -> Option<Type> {
    if positive {
        match member {
            Type::Literal(have, _) => (*have == value).then(|| member.clone()),
            Type::Instance(have, _) => {
                class.derives_from(have).then(|| Type::Literal(value, Arc::clone(class)))
            }
            Type::Unknown | Type::TypeVar(_) => Some(Type::Literal(value, Arc::clone(class))),
            _ => None,
        }
    } else {
        match member {
            // Only the exactly-equal literal member is excluded; an
            // instance member still holds other values.
            Type::Literal(have, _) if *have == value => None,
            other => Some(other.clone()),
        }
    }
}
