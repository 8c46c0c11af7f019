use std::collections::BTreeSet;

use pretty_assertions::assert_eq;

use super::*;

fn point() -> Type {
    Type::obj([("y", Type::Int), ("x", Type::Int)])
}

#[test]
fn obj_fields_are_name_ordered() {
    let Type::Obj(obj) = point() else {
        panic!("expected object");
    };
    let names: Vec<_> = obj.fields().map(|(n, _)| n).collect();
    assert_eq!(names, ["x", "y"]);
}

#[test]
fn obj_identity_is_structural() {
    let a = Type::obj([("x", Type::Int), ("y", Type::Int)]);
    assert_eq!(a, point());
}

#[test]
fn display_signature_form() {
    let f = Type::func(vec![Type::Int], Type::Bool);
    assert_eq!(f.to_string(), "(Int)->Bool");

    let g = Type::func(
        vec![Type::list(Type::Str), Type::dict(Type::Id, Type::Real)],
        Type::opt(Type::Int),
    );
    assert_eq!(g.to_string(), "([Str], {Id:Real})->Int?");
}

#[test]
fn display_composites() {
    assert_eq!(point().to_string(), "<{.x:Int, .y:Int}>");
    assert_eq!(
        Type::addr([(AddrDir::Asc, Type::Int), (AddrDir::Desc, Type::Str)]).to_string(),
        "<[asc Int, desc Str]>"
    );
    assert_eq!(Type::seq(Type::TimePnt).to_string(), "TimePnt*");
    assert_eq!(Type::set(Type::TimeDiff).to_string(), "{TimeDiff}");
    assert_eq!(Type::err(Type::Int).to_string(), "Int!");
}

#[test]
fn display_parenthesizes_function_operands() {
    let f = Type::opt(Type::func(vec![], Type::Int));
    assert_eq!(f.to_string(), "(()->Int)?");
}

#[test]
fn mutable_is_transparent() {
    let key = Type::addr([(AddrDir::Asc, Type::Int)]);
    let m = Type::mutable(key, Type::Str);
    assert_eq!(m.resolved(), &Type::Str);
    assert_eq!(m.to_string(), "Str");
}

#[test]
fn seq_and_addr_predicates() {
    let key = Type::addr([(AddrDir::Asc, Type::Int)]);
    assert!(key.is_addr());
    assert!(!key.is_seq());
    let keys = Type::seq(key.clone());
    assert!(keys.is_seq());
    assert_eq!(keys.seq_elem(), Some(&key));
    assert_eq!(key.addr_elems().map(<[_]>::len), Some(1));
}

#[test]
fn opaque_parts_are_found_when_nested() {
    assert!(!Type::list(Type::Int).has_opaque_part());
    assert!(Type::list(Type::err(Type::Int)).has_opaque_part());
    assert!(Type::addr([(AddrDir::Asc, Type::func(vec![], Type::Int))]).has_opaque_part());
}

#[test]
fn collect_objects_finds_nested_objects_once() {
    let inner = Type::obj([("a", Type::Bool)]);
    let outer = Type::obj([("inner", inner.clone()), ("n", Type::Int)]);
    let ty = Type::dict(Type::Str, Type::list(outer.clone()));

    let mut objects = BTreeSet::new();
    collect_objects(&ty, &mut objects);
    collect_objects(&inner, &mut objects);

    assert_eq!(objects.len(), 2);
    let Type::Obj(inner) = inner else { unreachable!() };
    let Type::Obj(outer) = outer else { unreachable!() };
    assert!(objects.contains(&inner));
    assert!(objects.contains(&outer));
}

#[test]
fn collect_objects_ignores_leaves() {
    let mut objects = BTreeSet::new();
    collect_objects(&Type::seq(Type::Int), &mut objects);
    assert!(objects.is_empty());
}
