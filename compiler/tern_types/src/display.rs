//! Deterministic type rendering for diagnostics and hover text.
//!
//! Names live in the interner, so rendering borrows it; output is stable
//! for identical types (unions render in member order, which `union_of`
//! fixes at first occurrence).

use std::fmt;

use tern_ir::StringInterner;

use crate::{FunctionType, LiteralValue, Type};

/// Borrowing display adapter; obtained from [`Type::display`].
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    interner: &'a StringInterner,
}

impl Type {
    /// Render against an interner.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, interner }
    }
}

fn write_function(
    f: &mut fmt::Formatter<'_>,
    func: &FunctionType,
    interner: &StringInterner,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, param) in func.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: ", interner.resolve(param.name))?;
        write_type(f, &param.ty, interner)?;
        if param.has_default {
            write!(f, " = ...")?;
        }
    }
    write!(f, ") -> ")?;
    write_type(f, &func.ret, interner)
}

fn write_type(f: &mut fmt::Formatter<'_>, ty: &Type, interner: &StringInterner) -> fmt::Result {
    match ty {
        Type::Unknown => write!(f, "Unknown"),
        Type::Never => write!(f, "Never"),
        Type::None => write!(f, "None"),
        Type::Module(module) => write!(f, "module[{}]", interner.resolve(module.name)),
        Type::Class(class) => write!(f, "type[{}]", interner.resolve(class.name)),
        Type::Instance(class, args) => {
            write!(f, "{}", interner.resolve(class.name))?;
            if !args.is_empty() {
                write!(f, "[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_type(f, arg, interner)?;
                }
                write!(f, "]")?;
            }
            Ok(())
        }
        Type::Function(func) => write_function(f, func, interner),
        Type::Overloads(funcs) => {
            write!(f, "overload[")?;
            for (i, func) in funcs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_function(f, func, interner)?;
            }
            write!(f, "]")
        }
        Type::Union(members) => {
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write_type(f, member, interner)?;
            }
            Ok(())
        }
        Type::TypeVar(var) => write!(f, "{}", interner.resolve(var.name)),
        Type::Literal(value, _) => match value {
            LiteralValue::Int(v) => write!(f, "Literal[{v}]"),
            LiteralValue::Str(s) => write!(f, "Literal['{}']", interner.resolve(*s)),
            LiteralValue::Bool(true) => write!(f, "Literal[True]"),
            LiteralValue::Bool(false) => write!(f, "Literal[False]"),
        },
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.ty, self.interner)
    }
}
