//! Structural object collection.

use std::collections::BTreeSet;

use crate::{type_leaf_pattern, ObjType, Type};

/// Add every object type reachable inside `ty` (including `ty` itself) to `out`.
///
/// Objects nested in object fields are collected too, so the set is closed
/// under "appears in a field of".
pub fn collect_objects(ty: &Type, out: &mut BTreeSet<ObjType>) {
    match ty {
        type_leaf_pattern!() => {}
        Type::Addr(elems) => {
            for (_, elem) in elems {
                collect_objects(elem, out);
            }
        }
        Type::Dict(key, val) => {
            collect_objects(key, out);
            collect_objects(val, out);
        }
        Type::Err(elem)
        | Type::List(elem)
        | Type::Opt(elem)
        | Type::Seq(elem)
        | Type::Set(elem) => collect_objects(elem, out),
        Type::Func { params, ret } => {
            for param in params {
                collect_objects(param, out);
            }
            collect_objects(ret, out);
        }
        Type::Mutable { addr, target } => {
            collect_objects(addr, out);
            collect_objects(target, out);
        }
        Type::Obj(obj) => {
            if out.insert(obj.clone()) {
                for (_, field) in obj.fields() {
                    collect_objects(field, out);
                }
            }
        }
    }
}
