//! Pre-order expression walking.

use crate::{ensure_sufficient_stack, Expr, ExprKind, Stmt, TestCaseBlock};

/// Call `f` on `expr` and every sub-expression, parents before children.
///
/// Bodies of `where`-bound functions are not entered: they are separate
/// code, and passes that need them (object and address collection) recurse
/// into `ExprKind::Where::functions` themselves.
pub fn for_each_expr<'a>(expr: &'a Expr, f: &mut dyn FnMut(&'a Expr)) {
    ensure_sufficient_stack(|| {
        f(expr);
        match &expr.kind {
            ExprKind::Lit(_) | ExprKind::Ref(_) | ExprKind::Unknown => {}
            ExprKind::Unary { operand, .. } => for_each_expr(operand, f),
            ExprKind::Binary { lhs, rhs, .. } => {
                for_each_expr(lhs, f);
                for_each_expr(rhs, f);
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => {
                for_each_expr(cond, f);
                for_each_expr(then, f);
                for_each_expr(otherwise, f);
            }
            ExprKind::Call { args, .. } | ExprKind::List(args) | ExprKind::Set(args) => {
                for arg in args {
                    for_each_expr(arg, f);
                }
            }
            ExprKind::Dict(entries) => {
                for (key, val) in entries {
                    for_each_expr(key, f);
                    for_each_expr(val, f);
                }
            }
            ExprKind::Obj(fields) => {
                for (_, field) in fields {
                    for_each_expr(field, f);
                }
            }
            ExprKind::Addr(elems) => {
                for (_, elem) in elems {
                    for_each_expr(elem, f);
                }
            }
            ExprKind::Member { object: inner, .. }
            | ExprKind::Known(inner)
            | ExprKind::Read { addr: inner, .. }
            | ExprKind::Collect(inner)
            | ExprKind::Where { body: inner, .. } => for_each_expr(inner, f),
            ExprKind::Effecting { stmts, result } => {
                for stmt in stmts {
                    match stmt {
                        Stmt::New(new) => {
                            for_each_expr(&new.lhs, f);
                            for_each_expr(&new.rhs, f);
                        }
                        Stmt::Delete { addr, .. } => for_each_expr(addr, f),
                    }
                }
                for_each_expr(result, f);
            }
        }
    });
}

/// Call `f` on the body of every case in `block`, nested blocks included.
pub fn for_each_test_case_expr<'a>(block: &'a TestCaseBlock, f: &mut dyn FnMut(&'a Expr)) {
    for case in &block.cases {
        f(&case.body);
        if let Some(nested) = &case.block {
            for_each_test_case_expr(nested, f);
        }
    }
}
