use std::cell::Cell;

use pretty_assertions::assert_eq;
use stela_ir::{Expr, ExprKind, NewStmt, Pos};
use stela_types::{AddrDir, Type};
use uuid::Uuid;

use super::*;
use crate::address::{AddressMap, IdentitySource};
use crate::collect::AddressPair;

struct Fixed;

impl IdentitySource for Fixed {
    fn next_id(&mut self) -> Uuid {
        Uuid::from_u128(1)
    }
}

fn key() -> Type {
    Type::addr([(AddrDir::Asc, Type::Int)])
}

fn scope() -> PackageScope {
    let pairs = [AddressPair::new(&key(), &key())];
    PackageScope {
        qualified: "::NSt".to_owned(),
        exports: Default::default(),
        addresses: AddressMap::assign(&pairs, &mut Fixed).unwrap(),
    }
}

fn case(name: Option<&str>, block: Option<Vec<TestCaseDef>>) -> TestCaseDef {
    TestCaseDef {
        name: name.map(str::to_owned),
        body: Expr::bool(true),
        block: block.map(|cases| TestCaseBlock { cases }),
        pos: PosRange::new(Pos::new(3, 5), Pos::new(3, 9)),
    }
}

fn test_def(with: Option<WithClause>, cases: Vec<TestCaseDef>) -> TestDef {
    TestDef {
        with,
        block: TestCaseBlock { cases },
        pos: PosRange::new(Pos::new(1, 1), Pos::new(9, 2)),
    }
}

fn render(test: &Test) -> String {
    let mut out = CppPrinter::new(Vec::new());
    test.write(&mut out).unwrap();
    String::from_utf8(out.finish().unwrap()).unwrap()
}

fn collect_ids(block: &TestBlock, out: &mut Vec<u32>) {
    for case in block.cases() {
        out.push(case.id().0);
        if let Some(nested) = case.block() {
            collect_ids(nested, out);
        }
    }
}

#[test]
fn ids_follow_construction_order_across_the_tree() {
    let scope = scope();
    let mut ids = TestIdGen::new();
    let first = Test::build(
        &test_def(
            None,
            vec![case(Some("outer"), Some(vec![case(None, None), case(None, None)])), case(None, None)],
        ),
        &mut ids,
        &scope,
    )
    .unwrap();
    let second = Test::build(&test_def(None, vec![case(None, None)]), &mut ids, &scope).unwrap();

    let mut seen = vec![first.id().0];
    collect_ids(first.block(), &mut seen);
    seen.push(second.id().0);
    collect_ids(second.block(), &mut seen);
    assert_eq!(seen, [1, 2, 3, 4, 5, 6, 7]);
}

struct Tracked<'a>(&'a Cell<usize>);

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn failed_child_releases_built_siblings() {
    let dropped = Cell::new(0);
    let built = Cell::new(0);
    let result = build_children(&[1, 2, 3, 4], |&n| {
        if n == 3 {
            return Err("third child failed");
        }
        built.set(built.get() + 1);
        Ok(Tracked(&dropped))
    });
    assert_eq!(result.err(), Some("third child failed"));
    assert_eq!(built.get(), 2);
    assert_eq!(dropped.get(), 2);
}

#[test]
fn failed_case_aborts_the_block() {
    let scope = scope();
    let mut bad = case(None, None);
    bad.body = Expr::reference("missing", Type::Bool);
    let mut ids = TestIdGen::new();
    let err = Test::build(&test_def(None, vec![case(None, None), bad]), &mut ids, &scope)
        .err()
        .unwrap();
    assert!(matches!(err, CodegenError::Invariant { .. }));
}

#[test]
fn nested_case_is_written_before_its_parent_record() {
    let scope = scope();
    let mut ids = TestIdGen::new();
    let test = Test::build(
        &test_def(None, vec![case(Some("a \"b\""), Some(vec![case(None, None)]))]),
        &mut ids,
        &scope,
    )
    .unwrap();
    let text = render(&test);

    let child = text.find("static const Stela::Package::TTestCase TI_3").unwrap();
    let parent = text.find("static const Stela::Package::TTestCase TI_2").unwrap();
    let top = text.find("static const Stela::Package::TTest TI_1").unwrap();
    assert!(text.find("static bool T2(").unwrap() < child);
    assert!(child < parent && parent < top);

    assert!(text.contains(
        "static const Stela::Package::TTestCase TI_2 {\n\
         \x20 Stela::Rt::TOpt<std::string>(\"a \\\"b\\\"\"),\n\
         \x20 Stela::TPosRange(Stela::TPos(3, 5), Stela::TPos(3, 9)),\n\
         \x20 &TF_2,\n\
         \x20 Stela::Package::TTestBlock{&TI_3}\n\
         };\n"
    ));
    assert!(text.contains(
        "static const Stela::Package::TTest TI_1 {\n\
         \x20 nullptr,\n\
         \x20 Stela::TPosRange(Stela::TPos(1, 1), Stela::TPos(9, 2)),\n\
         \x20 Stela::Package::TTestBlock{&TI_2}\n\
         };\n"
    ));
}

#[test]
fn with_fixture_registers_tagged_effects() {
    let scope = scope();
    let addr = |n| Expr::new(ExprKind::Addr(vec![(AddrDir::Asc, Expr::int(n))]), key());
    let with = WithClause {
        news: vec![NewStmt {
            lhs: addr(1),
            rhs: addr(2),
            pos: PosRange::default(),
        }],
        pos: PosRange::default(),
    };
    let mut ids = TestIdGen::new();
    let test = Test::build(&test_def(Some(with), vec![case(None, None)]), &mut ids, &scope).unwrap();
    assert_eq!(test.with().map(With::len), Some(1));

    let text = render(&test);
    assert!(text.starts_with(
        "static bool TW_1(Stela::Package::TContext &ctx) {\n\
         \x20 ctx.AddEffect(Stela::Rt::TAddr<Stela::Rt::TAsc<int64_t>>(INT64_C(1)), \
         ::NSt::Index_00000000_0000_0000_0000_000000000001, \
         Stela::Rt::MakeNew(Stela::Rt::TAddr<Stela::Rt::TAsc<int64_t>>(INT64_C(2))));\n\
         \x20 return true;\n\
         }\n"
    ));
    assert!(text.contains("static const Stela::Package::TFuncInfo IW_1 {"));
    assert!(text.contains("  &IW_1,\n"));
}
