//! Object and address collection.
//!
//! Walks every body in a package, `where`-bound function bodies included,
//! and gathers:
//! - every object type that appears in an expression or signature,
//! - the object types compared with `==`/`!=` (they need equality helpers),
//! - every address touched: `(from, to)` pairs from reads, mutable slots,
//!   `new` bindings and `delete` statements.

use std::collections::{BTreeMap, BTreeSet};

use stela_ir::{
    for_each_expr, for_each_test_case_expr, BinaryOp, Expr, ExprKind, NewStmt, PackageAst,
    PosRange, Stmt,
};
use stela_types::{collect_objects, ObjType, Type};

/// One address: a key type and the type stored under it.
///
/// Both sides are stored resolved, so a `Mutable` never appears here.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressPair {
    pub from: Type,
    pub to: Type,
}

impl AddressPair {
    pub fn new(from: &Type, to: &Type) -> Self {
        AddressPair {
            from: from.resolved().clone(),
            to: to.resolved().clone(),
        }
    }

    /// A sequence of keys describes an iteration result, not an index.
    pub fn is_sequence(&self) -> bool {
        self.from.is_seq()
    }
}

/// Addresses found so far, each with the first place it was seen.
pub type AddressSet = BTreeMap<AddressPair, PosRange>;

/// Everything collected from one package.
#[derive(Debug, Default)]
pub struct Collected {
    pub objects: BTreeSet<ObjType>,
    pub comparisons: BTreeSet<ObjType>,
    pub addresses: AddressSet,
}

impl Collected {
    #[tracing::instrument(level = "debug", skip_all, fields(package = %ast.namespace))]
    pub fn from_package(ast: &PackageAst) -> Self {
        let mut collected = Collected::default();
        for func in &ast.functions {
            for param in &func.params {
                collect_objects(&param.ty, &mut collected.objects);
            }
            collect_objects(&func.ret, &mut collected.objects);
            collected.visit(&func.body);
        }
        for test in &ast.tests {
            if let Some(with) = &test.with {
                for new in &with.news {
                    collected.visit(&new.lhs);
                    collected.visit(&new.rhs);
                    collect_addresses_from_binding(new, &mut collected.addresses);
                }
            }
            for_each_test_case_expr(&test.block, &mut |body| collected.visit(body));
        }
        tracing::debug!(
            objects = collected.objects.len(),
            comparisons = collected.comparisons.len(),
            addresses = collected.addresses.len(),
            "collected package types"
        );
        collected
    }

    fn visit(&mut self, expr: &Expr) {
        collect_objects_in(expr, &mut self.objects);
        collect_comparisons(expr, &mut self.comparisons);
        collect_addresses(expr, &mut self.addresses);
    }
}

/// Add every object type used in `expr` to `out`.
pub fn collect_objects_in(expr: &Expr, out: &mut BTreeSet<ObjType>) {
    walk(expr, &mut |e| {
        collect_objects(&e.ty, out);
        match &e.kind {
            ExprKind::Read { value, .. } => collect_objects(value, out),
            ExprKind::Where { functions, .. } => {
                for func in functions {
                    collect_objects(&func.ty(), out);
                }
            }
            ExprKind::Effecting { stmts, .. } => {
                for stmt in stmts {
                    if let Stmt::Delete { value, .. } = stmt {
                        collect_objects(value, out);
                    }
                }
            }
            _ => {}
        }
    });
}

/// Add the object types compared for equality in `expr` to `out`.
pub fn collect_comparisons(expr: &Expr, out: &mut BTreeSet<ObjType>) {
    walk(expr, &mut |e| {
        if let ExprKind::Binary {
            op: BinaryOp::Eq | BinaryOp::Ne,
            lhs,
            ..
        } = &e.kind
        {
            collect_objects(&lhs.ty, out);
        }
    });
}

/// Add every address touched in `expr` to `out`.
pub fn collect_addresses(expr: &Expr, out: &mut AddressSet) {
    walk(expr, &mut |e| {
        if let Type::Mutable { addr, target } = &e.ty {
            note(out, AddressPair::new(addr, target), e.pos);
        }
        match &e.kind {
            ExprKind::Read { addr, value } => note(out, AddressPair::new(&addr.ty, value), e.pos),
            ExprKind::Effecting { stmts, .. } => {
                for stmt in stmts {
                    match stmt {
                        Stmt::New(new) => collect_addresses_from_binding(new, out),
                        Stmt::Delete { addr, value, pos } => {
                            note(out, AddressPair::new(&addr.ty, value), *pos);
                        }
                    }
                }
            }
            _ => {}
        }
    });
}

/// Add the address a `new` binding writes to, plus any touched on either side.
pub fn collect_addresses_from_binding(new: &NewStmt, out: &mut AddressSet) {
    note(out, AddressPair::new(&new.lhs.ty, &new.rhs.ty), new.pos);
    collect_addresses(&new.lhs, out);
    collect_addresses(&new.rhs, out);
}

fn note(out: &mut AddressSet, pair: AddressPair, pos: PosRange) {
    out.entry(pair).or_insert(pos);
}

/// Pre-order walk that also enters `where`-bound function bodies.
fn walk<'a>(expr: &'a Expr, f: &mut dyn FnMut(&'a Expr)) {
    let mut closures = Vec::new();
    for_each_expr(expr, &mut |e: &'a Expr| {
        f(e);
        if let ExprKind::Where { functions, .. } = &e.kind {
            closures.extend(functions.iter().map(|func| &func.body));
        }
    });
    for body in closures {
        stela_ir::ensure_sufficient_stack(|| walk(body, &mut *f));
    }
}
