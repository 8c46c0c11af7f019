//! Stela types as C++ types, and the names generated code uses for them.

use std::fmt::Write;

use stela_ir::Namespace;
use stela_types::{AddrDir, ObjType, Type};

/// The C++ type a value of `ty` has in generated code.
pub fn cpp_type(ty: &Type) -> String {
    stela_ir::ensure_sufficient_stack(|| match ty {
        Type::Any => "Stela::Rt::TAny".to_owned(),
        Type::Bool => "bool".to_owned(),
        Type::Id => "Stela::Rt::TUuid".to_owned(),
        Type::Int => "int64_t".to_owned(),
        Type::Real => "double".to_owned(),
        Type::Str => "std::string".to_owned(),
        Type::TimeDiff => "Stela::Rt::TTimeDiff".to_owned(),
        Type::TimePnt => "Stela::Rt::TTimePnt".to_owned(),
        Type::Addr(elems) => {
            let elems: Vec<String> = elems
                .iter()
                .map(|(dir, elem)| {
                    let dir = match dir {
                        AddrDir::Asc => "TAsc",
                        AddrDir::Desc => "TDesc",
                    };
                    format!("Stela::Rt::{dir}<{}>", cpp_type(elem))
                })
                .collect();
            format!("Stela::Rt::TAddr<{}>", elems.join(", "))
        }
        Type::Dict(key, val) => format!("Stela::Rt::TDict<{}, {}>", cpp_type(key), cpp_type(val)),
        Type::Err(elem) => format!("Stela::Rt::TErr<{}>", cpp_type(elem)),
        Type::Func { params, ret } => {
            let params: Vec<String> = params.iter().map(cpp_type).collect();
            format!("std::function<{} ({})>", cpp_type(ret), params.join(", "))
        }
        Type::List(elem) => format!("std::vector<{}>", cpp_type(elem)),
        Type::Mutable { target, .. } => cpp_type(target),
        Type::Obj(obj) => format!("Stela::Rt::Objects::{}", object_name(obj)),
        Type::Opt(elem) => format!("Stela::Rt::TOpt<{}>", cpp_type(elem)),
        Type::Seq(elem) => format!("Stela::Rt::TSeq<{}>", cpp_type(elem)),
        Type::Set(elem) => format!("Stela::Rt::TSet<{}>", cpp_type(elem)),
    })
}

/// Structural name of an object type.
///
/// `O<field count>_` followed by `<name length><name><type code>` per field.
/// Objects with the same fields get the same name wherever they appear, so
/// one header per name is enough.
pub fn object_name(obj: &ObjType) -> String {
    let mut out = String::new();
    mangle_obj(obj, &mut out);
    out
}

fn mangle_obj(obj: &ObjType, out: &mut String) {
    let _ = write!(out, "O{}_", obj.len());
    for (name, ty) in obj.fields() {
        let _ = write!(out, "{}{name}", name.len());
        mangle(ty, out);
    }
}

fn mangle(ty: &Type, out: &mut String) {
    stela_ir::ensure_sufficient_stack(|| match ty {
        Type::Any => out.push('a'),
        Type::Bool => out.push('b'),
        Type::Id => out.push('d'),
        Type::Int => out.push('i'),
        Type::Real => out.push('r'),
        Type::Str => out.push('s'),
        Type::TimeDiff => out.push('t'),
        Type::TimePnt => out.push('p'),
        Type::Addr(elems) => {
            let _ = write!(out, "A{}", elems.len());
            for (dir, elem) in elems {
                out.push(match dir {
                    AddrDir::Asc => 'a',
                    AddrDir::Desc => 'd',
                });
                mangle(elem, out);
            }
        }
        Type::Dict(key, val) => {
            out.push('D');
            mangle(key, out);
            mangle(val, out);
        }
        Type::Err(elem) => {
            out.push('E');
            mangle(elem, out);
        }
        Type::Func { params, ret } => {
            let _ = write!(out, "F{}", params.len());
            for param in params {
                mangle(param, out);
            }
            mangle(ret, out);
        }
        Type::List(elem) => {
            out.push('L');
            mangle(elem, out);
        }
        Type::Mutable { target, .. } => mangle(target, out),
        Type::Obj(obj) => mangle_obj(obj, out),
        Type::Opt(elem) => {
            out.push('P');
            mangle(elem, out);
        }
        Type::Seq(elem) => {
            out.push('Q');
            mangle(elem, out);
        }
        Type::Set(elem) => {
            out.push('S');
            mangle(elem, out);
        }
    });
}

/// Fully qualified C++ namespace of a package, e.g. `::NSgeo::NSshapes`.
pub fn cpp_namespace(ns: &Namespace) -> String {
    ns.segments().iter().map(|seg| format!("::NS{seg}")).collect()
}

/// C++ name of an exported function.
pub fn export_fn(name: &str) -> String {
    format!("F{name}")
}

/// C++ name of an object field.
pub fn member(field: &str) -> String {
    format!("M_{field}")
}
