//! Human-readable type rendering.
//!
//! This is the form used in the signature listing (`F is (Int)->Bool;`) and
//! in diagnostics. `Mutable` renders as the type stored at its address.

use std::fmt;

use crate::{ObjType, Type};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("Any"),
            Type::Bool => f.write_str("Bool"),
            Type::Id => f.write_str("Id"),
            Type::Int => f.write_str("Int"),
            Type::Real => f.write_str("Real"),
            Type::Str => f.write_str("Str"),
            Type::TimeDiff => f.write_str("TimeDiff"),
            Type::TimePnt => f.write_str("TimePnt"),
            Type::Addr(elems) => {
                f.write_str("<[")?;
                for (i, (dir, ty)) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {ty}", dir.keyword())?;
                }
                f.write_str("]>")
            }
            Type::Dict(key, val) => write!(f, "{{{key}:{val}}}"),
            Type::Err(elem) => write_postfix(f, elem, '!'),
            Type::Func { params, ret } => {
                f.write_str("(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")->{ret}")
            }
            Type::List(elem) => write!(f, "[{elem}]"),
            Type::Mutable { target, .. } => write!(f, "{target}"),
            Type::Obj(obj) => write!(f, "{obj}"),
            Type::Opt(elem) => write_postfix(f, elem, '?'),
            Type::Seq(elem) => write_postfix(f, elem, '*'),
            Type::Set(elem) => write!(f, "{{{elem}}}"),
        }
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<{")?;
        for (i, (name, ty)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, ".{name}:{ty}")?;
        }
        f.write_str("}>")
    }
}

/// Postfix operators bind tighter than `->`, so function operands need parens.
fn write_postfix(f: &mut fmt::Formatter<'_>, elem: &Type, op: char) -> fmt::Result {
    if matches!(elem.resolved(), Type::Func { .. }) {
        write!(f, "({elem}){op}")
    } else {
        write!(f, "{elem}{op}")
    }
}
