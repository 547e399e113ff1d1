//! Call checking, overload resolution, and type-variable solving.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use tern_ir::{Name, StringInterner};

use crate::{is_assignable, union_of, FunctionType, ParamType, Type};

/// One reason a call does not fit a signature.
#[derive(Clone, Debug)]
pub enum ArgMismatch {
    TooManyArgs { expected: usize, got: usize },
    TooFewArgs { expected: usize, got: usize },
    Incompatible { index: usize, expected: Type, actual: Type },
    BoundViolation { var: Name, bound: Type, solved: Type },
}

impl ArgMismatch {
    /// Render for diagnostic text.
    pub fn describe(&self, interner: &StringInterner) -> String {
        match self {
            ArgMismatch::TooManyArgs { expected, got } => {
                format!("too many arguments: expected {expected}, got {got}")
            }
            ArgMismatch::TooFewArgs { expected, got } => {
                format!("too few arguments: expected {expected}, got {got}")
            }
            ArgMismatch::Incompatible {
                index,
                expected,
                actual,
            } => format!(
                "argument {} of type \"{}\" is not assignable to parameter of type \"{}\"",
                index + 1,
                actual.display(interner),
                expected.display(interner),
            ),
            ArgMismatch::BoundViolation { var, bound, solved } => format!(
                "solved type \"{}\" for type variable \"{}\" violates its bound \"{}\"",
                solved.display(interner),
                interner.resolve(*var),
                bound.display(interner),
            ),
        }
    }
}

/// A failed signature check.
#[derive(Clone, Debug)]
pub struct CallError {
    pub mismatches: Vec<ArgMismatch>,
}

/// A successful signature check.
#[derive(Clone, Debug)]
pub struct CallMatch {
    /// Return type with solved type variables substituted.
    pub ret: Type,
    /// Whether every argument type equals its parameter type exactly.
    pub exact: bool,
}

/// Outcome of resolving a call against an overload set.
#[derive(Clone, Debug)]
pub enum OverloadResolution {
    Matched {
        func: Arc<FunctionType>,
        ret: Type,
    },
    /// More than one candidate matched with every argument exactly equal
    /// to its parameter type.
    Ambiguous { candidates: Vec<Arc<FunctionType>> },
    /// No candidate matched; carries the best-scoring candidate's
    /// mismatches for diagnostic text.
    NoMatch {
        best: Option<Arc<FunctionType>>,
        mismatches: Vec<ArgMismatch>,
    },
}

/// Per-call accumulated lower bounds for each type variable.
#[derive(Default)]
struct ConstraintSet {
    lower: FxHashMap<Name, Vec<Type>>,
}

/// Gather constraints by matching a parameter type against an argument type.
fn constrain(param: &Type, arg: &Type, set: &mut ConstraintSet) {
    match (param, arg) {
        (Type::TypeVar(var), _) => {
            set.lower.entry(var.name).or_default().push(arg.clone());
        }
        (Type::Instance(pc, pa), Type::Instance(ac, aa))
            if pc == ac && pa.len() == aa.len() =>
        {
            for (p, a) in pa.iter().zip(aa.iter()) {
                constrain(p, a, set);
            }
        }
        (Type::Function(pf), Type::Function(af)) if pf.params.len() == af.params.len() => {
            for (pp, ap) in pf.params.iter().zip(af.params.iter()) {
                constrain(&pp.ty, &ap.ty, set);
            }
            constrain(&pf.ret, &af.ret, set);
        }
        _ => {}
    }
}

/// Substitute solved type variables into a type.
///
/// Variables without a solution are left untouched (they belong to an
/// enclosing scope, not this call).
pub fn substitute(ty: &Type, solution: &FxHashMap<Name, Type>) -> Type {
    match ty {
        Type::TypeVar(var) => solution.get(&var.name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Instance(class, args) if !args.is_empty() => Type::Instance(
            Arc::clone(class),
            args.iter().map(|a| substitute(a, solution)).collect(),
        ),
        Type::Union(members) => union_of(members.iter().map(|m| substitute(m, solution))),
        Type::Function(func) => Type::Function(Arc::new(FunctionType {
            name: func.name,
            params: func
                .params
                .iter()
                .map(|p| ParamType {
                    name: p.name,
                    ty: substitute(&p.ty, solution),
                    has_default: p.has_default,
                })
                .collect(),
            ret: substitute(&func.ret, solution),
            is_overload: func.is_overload,
            type_params: func.type_params.clone(),
        })),
        other => other.clone(),
    }
}

/// Solve gathered constraints: each variable becomes the join of its lower
/// bounds, checked against any declared bound; unconstrained variables
/// solve to `Unknown`.
fn solve(
    func: &FunctionType,
    set: &ConstraintSet,
) -> Result<FxHashMap<Name, Type>, ArgMismatch> {
    let mut solution = FxHashMap::default();
    for var in &func.type_params {
        let solved = match set.lower.get(&var.name) {
            Some(bounds) if !bounds.is_empty() => union_of(bounds.iter().cloned()),
            _ => Type::Unknown,
        };
        if let Some(bound) = &var.bound {
            if !is_assignable(&solved, bound) {
                return Err(ArgMismatch::BoundViolation {
                    var: var.name,
                    bound: bound.clone(),
                    solved,
                });
            }
        }
        solution.insert(var.name, solved);
    }
    // Variables gathered from parameter positions but not declared on the
    // function still participate, so a malformed signature degrades softly.
    for (name, bounds) in &set.lower {
        solution
            .entry(*name)
            .or_insert_with(|| union_of(bounds.iter().cloned()));
    }
    Ok(solution)
}

/// Check a call against one signature.
pub fn check_call(func: &FunctionType, args: &[Type]) -> Result<CallMatch, CallError> {
    if args.len() > func.params.len() {
        return Err(CallError {
            mismatches: vec![ArgMismatch::TooManyArgs {
                expected: func.params.len(),
                got: args.len(),
            }],
        });
    }
    let required = func.required_params();
    if args.len() < required {
        return Err(CallError {
            mismatches: vec![ArgMismatch::TooFewArgs {
                expected: required,
                got: args.len(),
            }],
        });
    }

    let mut set = ConstraintSet::default();
    for (param, arg) in func.params.iter().zip(args.iter()) {
        constrain(&param.ty, arg, &mut set);
    }
    let solution = match solve(func, &set) {
        Ok(solution) => solution,
        Err(mismatch) => {
            return Err(CallError {
                mismatches: vec![mismatch],
            })
        }
    };

    let mut mismatches = Vec::new();
    let mut exact = true;
    for (index, (param, arg)) in func.params.iter().zip(args.iter()).enumerate() {
        let expected = substitute(&param.ty, &solution);
        if !is_assignable(arg, &expected) {
            mismatches.push(ArgMismatch::Incompatible {
                index,
                expected,
                actual: arg.clone(),
            });
            exact = false;
        } else if *arg != expected {
            exact = false;
        }
    }
    if args.len() != func.params.len() {
        // Defaults were used; the call shape is not exact.
        exact = false;
    }

    if mismatches.is_empty() {
        Ok(CallMatch {
            ret: substitute(&func.ret, &solution),
            exact,
        })
    } else {
        Err(CallError { mismatches })
    }
}

/// Resolve a call against an overload set in declaration order.
///
/// The first fully-matching candidate wins. `Ambiguous` is reported only
/// when more than one candidate matches with every argument exactly equal
/// to its parameter type (the literal-equality tie).
pub fn resolve_overload(
    candidates: &[Arc<FunctionType>],
    args: &[Type],
) -> OverloadResolution {
    let mut first_match: Option<(Arc<FunctionType>, Type)> = None;
    let mut exact_matches: Vec<Arc<FunctionType>> = Vec::new();
    let mut best: Option<(Arc<FunctionType>, Vec<ArgMismatch>)> = None;

    for candidate in candidates {
        match check_call(candidate, args) {
            Ok(m) => {
                if m.exact {
                    exact_matches.push(Arc::clone(candidate));
                }
                if first_match.is_none() {
                    first_match = Some((Arc::clone(candidate), m.ret));
                }
            }
            Err(e) => {
                let better = match &best {
                    Some((_, existing)) => e.mismatches.len() < existing.len(),
                    None => true,
                };
                if better {
                    best = Some((Arc::clone(candidate), e.mismatches));
                }
            }
        }
    }

    if exact_matches.len() > 1 {
        tracing::trace!(count = exact_matches.len(), "ambiguous overload call");
        return OverloadResolution::Ambiguous {
            candidates: exact_matches,
        };
    }
    match first_match {
        Some((func, ret)) => OverloadResolution::Matched { func, ret },
        None => {
            let (best, mismatches) = match best {
                Some((func, mismatches)) => (Some(func), mismatches),
                None => (None, Vec::new()),
            };
            OverloadResolution::NoMatch { best, mismatches }
        }
    }
}
