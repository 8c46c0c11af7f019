//! Runtime type descriptors.
//!
//! Turns a [`Type`] into C++ source that rebuilds the equivalent runtime
//! descriptor (`Stela::Type::TType`). Used for export metadata and for the
//! address table in the link unit.

use std::fmt::Write;

use stela_types::{AddrDir, Type};

use crate::body::string_literal;
use crate::UnserializableType;

/// C++ expression constructing the runtime descriptor of `ty`.
///
/// `Mutable` serializes as the type stored at its address. `Err` and `Func`
/// have no descriptor constructor and are refused.
pub fn type_descriptor(ty: &Type) -> Result<String, UnserializableType> {
    let mut out = String::new();
    gen(ty, &mut out)?;
    Ok(out)
}

fn gen(ty: &Type, out: &mut String) -> Result<(), UnserializableType> {
    stela_ir::ensure_sufficient_stack(|| match ty {
        Type::Any => leaf(out, "TAny"),
        Type::Bool => leaf(out, "TBool"),
        Type::Id => leaf(out, "TId"),
        Type::Int => leaf(out, "TInt"),
        Type::Real => leaf(out, "TReal"),
        Type::Str => leaf(out, "TStr"),
        Type::TimeDiff => leaf(out, "TTimeDiff"),
        Type::TimePnt => leaf(out, "TTimePnt"),
        Type::Addr(elems) => {
            let is_sequence = elems.iter().any(|(_, t)| t.is_seq());
            if is_sequence {
                out.push_str("Stela::Type::TSeq::Get(");
            }
            out.push_str(
                "Stela::Type::TAddr::Get(std::vector<std::pair<Stela::TAddrDir, Stela::Type::TType>>{",
            );
            for (i, (dir, elem)) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let dir = match dir {
                    AddrDir::Asc => "Asc",
                    AddrDir::Desc => "Desc",
                };
                let _ = write!(out, "std::make_pair(Stela::TAddrDir::{dir}, ");
                gen(elem, out)?;
                out.push(')');
            }
            out.push_str("})");
            if is_sequence {
                out.push(')');
            }
            Ok(())
        }
        Type::Dict(key, val) => {
            out.push_str("Stela::Type::TDict::Get(");
            gen(key, out)?;
            out.push_str(", ");
            gen(val, out)?;
            out.push(')');
            Ok(())
        }
        Type::List(elem) => unary(out, "TList", elem),
        Type::Opt(elem) => unary(out, "TOpt", elem),
        Type::Seq(elem) => unary(out, "TSeq", elem),
        Type::Set(elem) => unary(out, "TSet", elem),
        Type::Mutable { target, .. } => gen(target, out),
        Type::Obj(obj) => {
            out.push_str("Stela::Type::TObj::Get(std::map<std::string, Stela::Type::TType>{");
            for (i, (name, field)) in obj.fields().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{{{}, ", string_literal(name));
                gen(field, out)?;
                out.push('}');
            }
            out.push_str("})");
            Ok(())
        }
        Type::Err(_) | Type::Func { .. } => Err(UnserializableType { ty: ty.clone() }),
    })
}

fn leaf(out: &mut String, name: &str) -> Result<(), UnserializableType> {
    let _ = write!(out, "Stela::Type::{name}::Get()");
    Ok(())
}

fn unary(out: &mut String, name: &str, elem: &Type) -> Result<(), UnserializableType> {
    let _ = write!(out, "Stela::Type::{name}::Get(");
    gen(elem, out)?;
    out.push(')');
    Ok(())
}
