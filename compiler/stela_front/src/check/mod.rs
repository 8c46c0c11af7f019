//! Structural type checking of an annotated package.
//!
//! The external parser annotates every expression with a type; this pass
//! verifies the annotations are consistent with each other and with the
//! declarations they refer to, so code generation can trust them.

use rustc_hash::{FxHashMap, FxHashSet};
use stela_diagnostic::{type_mismatch, Diagnostic, DiagnosticQueue, ErrorCode, ErrorGuaranteed};
use stela_ir::{
    ensure_sufficient_stack, BinaryOp, Expr, ExprKind, FunctionDef, Literal, LocalFunction,
    Namespace, NewStmt, PackageAst, Param, PosRange, Stmt, TestCaseBlock, UnaryOp,
};
use stela_types::Type;
use uuid::Uuid;

/// Check every function and test of `package`, reporting into `queue`.
#[tracing::instrument(level = "debug", skip_all, fields(namespace = %package.namespace))]
pub fn check_package(package: &PackageAst, queue: &mut DiagnosticQueue) -> Result<(), ErrorGuaranteed> {
    let mut checker = Checker::new(package, queue);

    for func in &package.functions {
        checker.check_function(&func.params, &func.ret, &func.body);
    }

    for test in &package.tests {
        if let Some(with) = &test.with {
            for new in &with.news {
                checker.check_new(new);
            }
        }
        checker.check_test_block(&test.block);
    }

    match checker.failed {
        Some(guar) => Err(guar),
        None => Ok(()),
    }
}

struct Checker<'a, 'q> {
    exports: FxHashMap<&'a str, &'a FunctionDef>,
    imports: FxHashSet<&'a Namespace>,
    /// Innermost scope last. Holds parameters and `where`-bound functions.
    scopes: Vec<FxHashMap<&'a str, Type>>,
    queue: &'q mut DiagnosticQueue,
    failed: Option<ErrorGuaranteed>,
}

impl<'a, 'q> Checker<'a, 'q> {
    fn new(package: &'a PackageAst, queue: &'q mut DiagnosticQueue) -> Self {
        let mut checker = Checker {
            exports: FxHashMap::default(),
            imports: package.imports.iter().collect(),
            scopes: Vec::new(),
            queue,
            failed: None,
        };
        for func in &package.functions {
            if let Some(first) = checker.exports.insert(func.name.as_str(), func) {
                checker.report(
                    Diagnostic::error(ErrorCode::E2006)
                        .with_message(format!("`{}` is defined more than once", func.name))
                        .with_label(func.pos, "duplicate definition")
                        .with_secondary_label(first.pos, "first defined here"),
                );
            }
        }
        checker
    }

    fn report(&mut self, diag: Diagnostic) {
        self.failed = Some(self.queue.emit_error(diag));
    }

    fn expect_type(&mut self, found: &Type, expected: &Type, range: PosRange, context: &str) {
        if !same(found, expected) {
            let diag = type_mismatch(range, &expected.to_string(), &found.to_string(), context);
            self.report(diag);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn check_function(&mut self, params: &'a [Param], ret: &Type, body: &'a Expr) {
        let scope = params.iter().map(|p| (p.name.as_str(), p.ty.clone())).collect();
        self.scopes.push(scope);
        self.check_expr(body);
        self.expect_type(&body.ty, ret, body.pos, "as the declared return type");
        self.scopes.pop();
    }

    fn check_test_block(&mut self, block: &'a TestCaseBlock) {
        for case in &block.cases {
            self.scopes.push(FxHashMap::default());
            self.check_expr(&case.body);
            self.scopes.pop();
            self.expect_type(&case.body.ty, &Type::Bool, case.body.pos, "for a test case");
            if let Some(nested) = &case.block {
                self.check_test_block(nested);
            }
        }
    }

    fn check_new(&mut self, new: &'a NewStmt) {
        self.check_expr(&new.lhs);
        self.check_expr(&new.rhs);
        self.expect_addr(&new.lhs, "`new` target");
    }

    fn expect_addr(&mut self, expr: &Expr, what: &str) {
        if !expr.ty.is_addr() {
            self.report(
                Diagnostic::error(ErrorCode::E2007)
                    .with_message(format!("{what} must be an address, found `{}`", expr.ty))
                    .with_label(expr.pos, "not an address"),
            );
        }
    }

    fn check_expr(&mut self, expr: &'a Expr) {
        ensure_sufficient_stack(|| self.check_expr_inner(expr));
    }

    fn check_expr_inner(&mut self, expr: &'a Expr) {
        let ty = &expr.ty;
        match &expr.kind {
            ExprKind::Lit(lit) => {
                let lit_ty = match lit {
                    Literal::Bool(_) => Type::Bool,
                    Literal::Int(_) => Type::Int,
                    Literal::Real(_) => Type::Real,
                    Literal::Str(_) => Type::Str,
                    Literal::Id(_) => Type::Id,
                };
                self.expect_type(ty, &lit_ty, expr.pos, "for this literal");
                if let Literal::Id(value) = lit {
                    if let Err(err) = Uuid::parse_str(value) {
                        self.report(
                            Diagnostic::error(ErrorCode::E2009)
                                .with_message(format!("malformed id literal `{value}`: {err}"))
                                .with_label(expr.pos, "not a valid id"),
                        );
                    }
                }
            }
            ExprKind::Ref(name) => {
                let found = self.lookup(name).cloned();
                match found {
                    Some(found) => self.expect_type(ty, &found, expr.pos, "for this reference"),
                    None => self.report(
                        Diagnostic::error(ErrorCode::E2002)
                            .with_message(format!("unknown name `{name}`"))
                            .with_label(expr.pos, "not found in this scope"),
                    ),
                }
            }
            ExprKind::Unary { op, operand } => {
                self.check_expr(operand);
                match op {
                    UnaryOp::Not => {
                        self.expect_type(&operand.ty, &Type::Bool, operand.pos, "for `not`");
                        self.expect_type(ty, &Type::Bool, expr.pos, "as the result of `not`");
                    }
                    UnaryOp::Neg => {
                        self.expect_numeric(operand);
                        self.expect_type(ty, &operand.ty, expr.pos, "as the result of negation");
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
                self.check_binary(*op, lhs, rhs, expr);
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.check_expr(cond);
                self.check_expr(then);
                self.check_expr(otherwise);
                self.expect_type(&cond.ty, &Type::Bool, cond.pos, "for `if` condition");
                self.expect_type(&then.ty, ty, then.pos, "for `then` branch");
                self.expect_type(&otherwise.ty, ty, otherwise.pos, "for `else` branch");
            }
            ExprKind::Call {
                package,
                callee,
                args,
            } => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.check_call(package.as_ref(), callee, args, expr);
            }
            ExprKind::List(elems) | ExprKind::Set(elems) => {
                let elem_ty = match (&expr.kind, ty.resolved()) {
                    (ExprKind::List(_), Type::List(e)) | (ExprKind::Set(_), Type::Set(e)) => {
                        Some((**e).clone())
                    }
                    _ => None,
                };
                for elem in elems {
                    self.check_expr(elem);
                }
                match elem_ty {
                    Some(elem_ty) => {
                        for elem in elems {
                            self.expect_type(&elem.ty, &elem_ty, elem.pos, "for this element");
                        }
                    }
                    None => self.mismatch_kind(expr, "a collection"),
                }
            }
            ExprKind::Dict(entries) => {
                for (key, val) in entries {
                    self.check_expr(key);
                    self.check_expr(val);
                }
                match ty.resolved() {
                    Type::Dict(key_ty, val_ty) => {
                        for (key, val) in entries {
                            self.expect_type(&key.ty, key_ty, key.pos, "for this key");
                            self.expect_type(&val.ty, val_ty, val.pos, "for this value");
                        }
                    }
                    _ => self.mismatch_kind(expr, "a dict"),
                }
            }
            ExprKind::Obj(fields) => {
                for (_, field) in fields {
                    self.check_expr(field);
                }
                let built = Type::obj(fields.iter().map(|(n, e)| (n.clone(), e.ty.clone())));
                self.expect_type(&built, ty, expr.pos, "for this object");
            }
            ExprKind::Member { object, field } => {
                self.check_expr(object);
                let field_ty = match object.ty.resolved() {
                    Type::Obj(obj) => obj.field(field).cloned(),
                    _ => None,
                };
                match field_ty {
                    Some(field_ty) => self.expect_type(ty, &field_ty, expr.pos, "for this field"),
                    None => self.report(
                        Diagnostic::error(ErrorCode::E2005)
                            .with_message(format!("`{}` has no field `{field}`", object.ty))
                            .with_label(expr.pos, "unknown field"),
                    ),
                }
            }
            ExprKind::Addr(elems) => {
                for (_, elem) in elems {
                    self.check_expr(elem);
                }
                let built = Type::addr(elems.iter().map(|(d, e)| (*d, e.ty.clone())));
                self.expect_type(&built, ty, expr.pos, "for this address");
            }
            ExprKind::Known(inner) => {
                self.check_expr(inner);
                self.expect_type(ty, &Type::opt(inner.ty.clone()), expr.pos, "for `known`");
            }
            ExprKind::Unknown => {
                if !matches!(ty.resolved(), Type::Opt(_)) {
                    self.mismatch_kind(expr, "an optional");
                }
            }
            ExprKind::Read { addr, value } => {
                self.check_expr(addr);
                if addr.ty.is_addr() {
                    self.expect_type(ty, value, expr.pos, "for this read");
                } else if addr.ty.seq_elem().is_some_and(Type::is_addr) {
                    self.expect_type(ty, &Type::seq(value.clone()), expr.pos, "for this read");
                } else {
                    self.expect_addr(addr, "read source");
                }
            }
            ExprKind::Collect(seq) => {
                self.check_expr(seq);
                match seq.ty.seq_elem() {
                    Some(elem) => {
                        let list = Type::list(elem.clone());
                        self.expect_type(ty, &list, expr.pos, "for `collect`");
                    }
                    None => self.mismatch_kind(seq, "a sequence"),
                }
            }
            ExprKind::Where { body, functions } => {
                self.check_where(body, functions);
                self.expect_type(&body.ty, ty, body.pos, "for `where` body");
            }
            ExprKind::Effecting { stmts, result } => {
                for stmt in stmts {
                    match stmt {
                        Stmt::New(new) => self.check_new(new),
                        Stmt::Delete { addr, .. } => {
                            self.check_expr(addr);
                            self.expect_addr(addr, "`delete` target");
                        }
                    }
                }
                self.check_expr(result);
                self.expect_type(&result.ty, ty, result.pos, "for `effecting` result");
            }
        }
    }

    fn check_where(&mut self, body: &'a Expr, functions: &'a [LocalFunction]) {
        let scope = functions.iter().map(|f| (f.name.as_str(), f.ty())).collect();
        self.scopes.push(scope);
        for func in functions {
            self.check_function(&func.params, &func.ret, &func.body);
        }
        self.check_expr(body);
        self.scopes.pop();
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, expr: &Expr) {
        if op.is_logical() {
            self.expect_type(&lhs.ty, &Type::Bool, lhs.pos, "for a logical operand");
            self.expect_type(&rhs.ty, &Type::Bool, rhs.pos, "for a logical operand");
            self.expect_type(&expr.ty, &Type::Bool, expr.pos, "as a logical result");
        } else if op.is_comparison() {
            self.expect_type(&rhs.ty, &lhs.ty, rhs.pos, "to match the left operand");
            self.expect_type(&expr.ty, &Type::Bool, expr.pos, "as a comparison result");
        } else {
            let concat = op == BinaryOp::Add && same(&lhs.ty, &Type::Str);
            if !concat {
                self.expect_numeric(lhs);
            }
            self.expect_type(&rhs.ty, &lhs.ty, rhs.pos, "to match the left operand");
            self.expect_type(&expr.ty, &lhs.ty, expr.pos, "as the arithmetic result");
        }
    }

    fn check_call(
        &mut self,
        package: Option<&Namespace>,
        callee: &str,
        args: &[Expr],
        expr: &Expr,
    ) {
        if let Some(package) = package {
            // Imported signatures are checked when that package is compiled.
            if !self.imports.contains(package) {
                self.report(
                    Diagnostic::error(ErrorCode::E2008)
                        .with_message(format!("package `{package}` is not imported"))
                        .with_label(expr.pos, format!("call to `{callee}`")),
                );
            }
            return;
        }

        let signature = match self.lookup(callee) {
            Some(Type::Func { params, ret }) => Some((params.clone(), (**ret).clone())),
            Some(_) => None,
            None => self.exports.get(callee).map(|f| {
                let params = f.params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>();
                (params, f.ret.clone())
            }),
        };
        let Some((params, ret)) = signature else {
            self.report(
                Diagnostic::error(ErrorCode::E2003)
                    .with_message(format!("unknown function `{callee}`"))
                    .with_label(expr.pos, "not a function in scope"),
            );
            return;
        };

        if params.len() != args.len() {
            self.report(
                Diagnostic::error(ErrorCode::E2004)
                    .with_message(format!(
                        "`{callee}` takes {} argument(s) but {} were supplied",
                        params.len(),
                        args.len()
                    ))
                    .with_label(expr.pos, "wrong number of arguments"),
            );
            return;
        }
        for (arg, param) in args.iter().zip(&params) {
            self.expect_type(&arg.ty, param, arg.pos, "for this argument");
        }
        self.expect_type(&expr.ty, &ret, expr.pos, "as the call result");
    }

    fn expect_numeric(&mut self, expr: &Expr) {
        if !expr.ty.is_numeric() {
            self.report(type_mismatch(
                expr.pos,
                "Int or Real",
                &expr.ty.to_string(),
                "for an arithmetic operand",
            ));
        }
    }

    fn mismatch_kind(&mut self, expr: &Expr, expected: &str) {
        self.report(type_mismatch(
            expr.pos,
            expected,
            &expr.ty.to_string(),
            "for this expression",
        ));
    }
}

/// Type equality looking through `Mutable` at the top level.
fn same(a: &Type, b: &Type) -> bool {
    a.resolved() == b.resolved()
}
