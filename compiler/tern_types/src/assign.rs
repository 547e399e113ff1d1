//! Structural assignability.

use crate::{ClassType, FunctionType, Type};
use tern_ir::Name;

/// Check whether a value of type `src` is acceptable where `dest` is
/// expected.
///
/// `Unknown` is assignable to and from anything so that one unresolved
/// input never cascades into dependent findings. `Never` (the empty type)
/// is assignable to everything.
pub fn is_assignable(src: &Type, dest: &Type) -> bool {
    if src == dest {
        return true;
    }
    match (src, dest) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Never, _) => true,

        // A union source needs every member accepted; a union destination
        // needs any member to accept. Source first: for union-to-union this
        // gives the member-wise subset semantics.
        (Type::Union(members), _) => members.iter().all(|m| is_assignable(m, dest)),
        (_, Type::Union(members)) => members.iter().any(|m| is_assignable(src, m)),

        // Type variables stand for their bound; unbounded means anything.
        (_, Type::TypeVar(var)) => match &var.bound {
            Some(bound) => is_assignable(src, bound),
            None => true,
        },
        (Type::TypeVar(var), _) => match &var.bound {
            Some(bound) => is_assignable(bound, dest),
            None => true,
        },

        // A literal belongs to its class; distinct literals are distinct.
        (Type::Literal(_, class), _) => match dest {
            Type::Literal(..) => false,
            _ => instance_assignable(class, &[], dest),
        },

        (Type::Instance(src_class, src_args), _) => {
            instance_assignable(src_class, src_args, dest)
        }

        (Type::Class(src_class), Type::Class(dest_class)) => src_class.derives_from(dest_class),

        (Type::Function(sf), Type::Function(df)) => function_assignable(sf, df),
        (Type::Overloads(sfs), Type::Function(df)) => {
            sfs.iter().any(|sf| function_assignable(sf, df))
        }
        (Type::Function(sf), Type::Overloads(dfs)) => {
            dfs.iter().all(|df| function_assignable(sf, df))
        }
        (Type::Overloads(sfs), Type::Overloads(dfs)) => dfs
            .iter()
            .all(|df| sfs.iter().any(|sf| function_assignable(sf, df))),

        (Type::Module(sm), Type::Module(dm)) => sm.name == dm.name,

        // Everything is an object: the root class (no bases) accepts any
        // value kind, including None, class objects, and functions.
        (_, Type::Instance(dest_class, _)) if dest_class.is_root() => true,

        _ => false,
    }
}

fn instance_assignable(src_class: &ClassType, src_args: &[Type], dest: &Type) -> bool {
    match dest {
        Type::Instance(dest_class, dest_args) => {
            if dest_class.is_structural {
                return structural_assignable(src_class, dest_class);
            }
            if !src_class.derives_from(dest_class) {
                return false;
            }
            // Unapplied generics carry no arguments and act as Unknown.
            if src_args.len() != dest_args.len() {
                return true;
            }
            // Invariant by default: pairwise assignable in both directions,
            // which stays transparent to Unknown arguments.
            src_args
                .iter()
                .zip(dest_args.iter())
                .all(|(s, d)| is_assignable(s, d) && is_assignable(d, s))
        }
        _ => false,
    }
}

/// Structural check: every member the destination declares (through its
/// bases) must exist on the source with an assignable type.
fn structural_assignable(src_class: &ClassType, dest_class: &ClassType) -> bool {
    let mut required: Vec<(Name, &Type)> = Vec::new();
    collect_members(dest_class, &mut required);
    required.iter().all(|(name, dest_member)| {
        src_class
            .member(*name)
            .is_some_and(|src_member| is_assignable(src_member, dest_member))
    })
}

fn collect_members<'a>(class: &'a ClassType, out: &mut Vec<(Name, &'a Type)>) {
    for (name, ty) in &class.members {
        if !out.iter().any(|(n, _)| n == name) {
            out.push((*name, ty));
        }
    }
    for base in &class.bases {
        collect_members(base, out);
    }
}

/// Function compatibility: the source must accept every call the
/// destination signature allows. Parameters are contravariant, the return
/// type covariant.
fn function_assignable(src: &FunctionType, dest: &FunctionType) -> bool {
    // The destination may be called with anywhere from its required count
    // to its full parameter count.
    if src.required_params() > dest.required_params() {
        return false;
    }
    if src.params.len() < dest.params.len() {
        return false;
    }
    // Source parameters beyond the destination's count must be optional.
    if src.params[dest.params.len()..].iter().any(|p| !p.has_default) {
        return false;
    }
    let params_ok = dest
        .params
        .iter()
        .zip(src.params.iter())
        .all(|(d, s)| is_assignable(&d.ty, &s.ty));
    params_ok && is_assignable(&src.ret, &dest.ret)
}
