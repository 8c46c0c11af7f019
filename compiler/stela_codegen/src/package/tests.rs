use pretty_assertions::assert_eq;
use stela_ir::{
    BinaryOp, Expr, ExprKind, FunctionDef, NewStmt, Param, PosRange, TestCaseBlock, TestCaseDef,
    TestDef, WithClause,
};
use stela_types::{AddrDir, Type};

use super::*;
use crate::collect::AddressPair;

/// Hands out 1, 2, 3, ...
#[derive(Default)]
struct Counter(u128);

impl IdentitySource for Counter {
    fn next_id(&mut self) -> Uuid {
        self.0 += 1;
        Uuid::from_u128(self.0)
    }
}

fn is_positive() -> FunctionDef {
    FunctionDef {
        name: "F".into(),
        params: vec![Param::new("x", Type::Int)],
        ret: Type::Bool,
        body: Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Gt,
                lhs: Box::new(Expr::reference("x", Type::Int)),
                rhs: Box::new(Expr::int(0)),
            },
            Type::Bool,
        ),
        pos: PosRange::default(),
    }
}

fn package(namespace: &[&str], functions: Vec<FunctionDef>, tests: Vec<TestDef>) -> PackageAst {
    PackageAst {
        namespace: Namespace::new(namespace.iter().copied()),
        version: 3,
        imports: vec![],
        functions,
        tests,
    }
}

fn build(ast: &PackageAst) -> Package {
    let mut queue = DiagnosticQueue::new();
    let package = Package::build(ast, &mut Counter::default(), &mut queue).unwrap();
    assert_eq!(queue.has_errors(), None);
    package
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

fn key() -> Type {
    Type::addr([(AddrDir::Asc, Type::Int)])
}

fn addr_of(n: i64) -> Expr {
    Expr::new(ExprKind::Addr(vec![(AddrDir::Asc, Expr::int(n))]), key())
}

#[test]
fn single_export_package() {
    let dir = tempfile::tempdir().unwrap();
    let package = build(&package(&["geo"], vec![is_positive()], vec![]));
    let artifacts = package.emit(dir.path()).unwrap();

    assert_eq!(artifacts.header, dir.path().join("geo.h"));
    assert!(artifacts.objects.is_empty());
    assert_eq!(
        read(&artifacts.header),
        r#"/* geo.stela

   This file was generated by the Stela compiler. */

#pragma once

#include <cstdint>
#include <functional>
#include <string>
#include <vector>

#include <stela/package/api.h>
#include <stela/package/rt.h>
#include <stela/rt.h>

namespace NSgeo {

  extern const Stela::Package::TInfo PackageInfo;

  bool FF(Stela::Package::TContext &ctx, int64_t v_x);

} // NSgeo
"#
    );

    let implementation = read(&artifacts.implementation);
    assert!(implementation.contains("static Stela::Rt::TValue RF_F("));
    assert!(implementation.contains("  assert(args.size() == 1);\n"));
    assert!(implementation.contains(
        "  Stela::Package::TParamMap{{\"x\", Stela::Type::TInt::Get()}},\n  /* ret */ Stela::Type::TBool::Get(),\n"
    ));
    assert!(implementation.contains(
        "    /* exports */ std::unordered_map<std::string, const Stela::Package::TFuncInfo *>{\n\
         \x20     {\"F\", &IF_F},\n\
         \x20   },\n\
         \x20   /* tests */ std::vector<const Stela::Package::TTest *>{},\n\
         \x20   /* index ids */ std::unordered_set<Stela::Rt::TUuid *>{}\n\
         \x20 };\n"
    ));
    assert!(implementation.contains(
        "  bool FF(Stela::Package::TContext &ctx, int64_t v_x) {\n    return (v_x > INT64_C(0));\n  }\n"
    ));

    assert_eq!(
        read(&artifacts.link),
        r#"/* geo.stela

   This file was generated by the Stela compiler. */

#include <cstdint>
#include <string>
#include <unordered_map>
#include <utility>

#include <stela/package/link.h>
#include <stela/rt.h>
#include <stela/type/impl.h>

#include "geo.h"

static Stela::Package::TLinkInfo LinkInfo {
  "geo",
  3,
  &::NSgeo::PackageInfo,
  std::unordered_map<std::string, const Stela::Package::TInfo *>{},
  std::unordered_map<Stela::Rt::TUuid, std::pair<Stela::Type::TType, Stela::Type::TType>>{}
};

extern "C" Stela::Package::TLinkInfo *GetLinkInfo() {
  return &LinkInfo;
}

extern "C" int32_t GetApiVersion() {
  return 1;
}
"#
    );

    assert_eq!(read(&artifacts.signatures), "F is (Int)->Bool;\n");
}

#[test]
fn with_binding_gets_one_identity_used_by_the_fixture() {
    let with = WithClause {
        news: vec![NewStmt {
            lhs: addr_of(1),
            rhs: addr_of(2),
            pos: PosRange::default(),
        }],
        pos: PosRange::default(),
    };
    let test = TestDef {
        with: Some(with),
        block: TestCaseBlock {
            cases: vec![TestCaseDef {
                name: None,
                body: Expr::bool(true),
                block: None,
                pos: PosRange::default(),
            }],
        },
        pos: PosRange::default(),
    };
    let package = build(&package(&["db", "seed"], vec![], vec![test]));
    assert_eq!(package.addresses().len(), 1);
    let (id, pair) = package.addresses().iter().next().unwrap();
    assert_eq!(pair, &AddressPair::new(&key(), &key()));

    let dir = tempfile::tempdir().unwrap();
    let artifacts = package.emit(dir.path()).unwrap();
    assert_eq!(artifacts.implementation, dir.path().join("db").join("seed.cc"));

    let index = cpp_index_name(id);
    let implementation = read(&artifacts.implementation);
    assert!(implementation.contains(&format!("::NSdb::NSseed::{index}, Stela::Rt::MakeNew(")));
    assert!(implementation.contains(&format!("Stela::Rt::TUuid {index}(\"{}\");", id.hyphenated())));
    assert!(implementation.contains("/* tests */ std::vector<const Stela::Package::TTest *>{\n"));
    assert!(implementation.contains("&TI_1,\n"));

    let header = read(&artifacts.header);
    assert!(header.contains(&format!("extern Stela::Rt::TUuid {index};")));

    let link = read(&artifacts.link);
    let key_desc = "Stela::Type::TAddr::Get(std::vector<std::pair<Stela::TAddrDir, Stela::Type::TType>>{\
                    std::make_pair(Stela::TAddrDir::Asc, Stela::Type::TInt::Get())})";
    assert!(link.contains(&format!(
        "{{Stela::Rt::TUuid(\"{}\"), std::make_pair({key_desc}, {key_desc})}},",
        id.hyphenated()
    )));
}

#[test]
fn sequence_exports_stay_out_of_the_export_table() {
    let keys = FunctionDef {
        name: "Keys".into(),
        params: vec![Param::new("ks", Type::seq(Type::Int))],
        ret: Type::seq(Type::Int),
        body: Expr::reference("ks", Type::seq(Type::Int)),
        pos: PosRange::default(),
    };
    let mut queue = DiagnosticQueue::new();
    let package = Package::build(
        &package(&["q"], vec![is_positive(), keys], vec![]),
        &mut Counter::default(),
        &mut queue,
    )
    .unwrap();
    assert_eq!(queue.warning_count(), 1);

    let dir = tempfile::tempdir().unwrap();
    let artifacts = package.emit(dir.path()).unwrap();
    assert_eq!(
        read(&artifacts.signatures),
        "F is (Int)->Bool;\nKeys is (Int*)->Int*;\n"
    );
    let implementation = read(&artifacts.implementation);
    assert!(implementation.contains("Stela::Rt::TSeq<int64_t> FKeys(Stela::Package::TContext &ctx"));
    assert!(!implementation.contains("IF_Keys"));
    assert!(!implementation.contains("RF_Keys"));
    assert!(read(&artifacts.header).contains("FKeys("));
}

#[test]
fn unserializable_address_is_reported() {
    let bad = Type::addr([(AddrDir::Asc, Type::func(vec![], Type::Int))]);
    let read_bad = Expr::new(
        ExprKind::Read {
            addr: Box::new(Expr::reference("k", bad.clone())),
            value: Type::Int,
        },
        Type::Int,
    );
    let func = FunctionDef {
        name: "G".into(),
        params: vec![Param::new("k", bad)],
        ret: Type::Int,
        body: read_bad,
        pos: PosRange::default(),
    };
    let mut queue = DiagnosticQueue::new();
    let result = Package::build(&package(&["p"], vec![func], vec![]), &mut Counter::default(), &mut queue);
    assert!(matches!(result, Err(CodegenError::Reported(_))));
    let codes: Vec<_> = queue.flush().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, [ErrorCode::E5002]);
}

#[test]
fn objects_get_headers_and_compared_objects_get_equality() {
    let point = Type::obj([("x", Type::Int), ("y", Type::Int)]);
    let same = FunctionDef {
        name: "Same".into(),
        params: vec![Param::new("a", point.clone()), Param::new("b", point.clone())],
        ret: Type::Bool,
        body: Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Eq,
                lhs: Box::new(Expr::reference("a", point.clone())),
                rhs: Box::new(Expr::reference("b", point)),
            },
            Type::Bool,
        ),
        pos: PosRange::default(),
    };
    let package = build(&package(&["shapes"], vec![same], vec![]));
    let dir = tempfile::tempdir().unwrap();
    let artifacts = package.emit(dir.path()).unwrap();

    let object = dir.path().join("objects").join("O2_1xi1yi.h");
    assert_eq!(artifacts.objects, [object.clone()]);
    let header = read(&object);
    assert!(header.contains(
        "      struct O2_1xi1yi {\n        int64_t M_x;\n        int64_t M_y;\n      };\n"
    ));
    assert!(read(&artifacts.header).contains("#include \"objects/O2_1xi1yi.h\"\n"));

    let implementation = read(&artifacts.implementation);
    assert!(implementation.contains(
        "static bool operator==(const O2_1xi1yi &lhs, const O2_1xi1yi &rhs) {\n\
         \x20       return lhs.M_x == rhs.M_x && lhs.M_y == rhs.M_y;\n"
    ));
}

#[test]
fn emitting_twice_gives_the_same_text() {
    let package = build(&package(&["geo"], vec![is_positive()], vec![]));
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = package.emit(first.path()).unwrap();
    let b = package.emit(second.path()).unwrap();
    assert_eq!(read(&a.implementation), read(&b.implementation));
}

#[test]
fn unwritable_output_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("geo");
    fs::write(&blocker, "not a directory").unwrap();
    let package = build(&package(&["geo", "shapes"], vec![is_positive()], vec![]));
    let err = package.emit(dir.path()).unwrap_err();
    match err {
        CodegenError::Io { path, .. } => assert_eq!(path, blocker),
        other => panic!("expected an I/O error, got {other}"),
    }
}

#[test]
fn module_path_is_named_by_package_and_version() {
    let package = build(&package(&["geo", "shapes"], vec![is_positive()], vec![]));
    assert_eq!(
        package.module_path(Path::new("/out")),
        Path::new("/out/geo/shapes.3.so")
    );
}
