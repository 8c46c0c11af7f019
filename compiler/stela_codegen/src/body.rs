//! Lowering checked expressions to C++ expressions.
//!
//! Every expression lowers to a single C++ expression. Statement-like
//! constructs (`where`, `effecting`) become immediately invoked lambdas
//! capturing by reference, so `ctx` and parameters stay reachable.

use std::fmt::Write;

use rustc_hash::{FxHashMap, FxHashSet};
use stela_ir::{BinaryOp, Expr, ExprKind, Literal, LocalFunction, NewStmt, Param, Stmt, UnaryOp};
use stela_types::Type;
use uuid::Uuid;

use crate::address::{cpp_index_name, AddressMap};
use crate::native::{cpp_namespace, cpp_type, export_fn, member};
use crate::CodegenError;

/// What every body in a package can refer to.
#[derive(Debug)]
pub struct PackageScope {
    /// Qualified C++ namespace of the package.
    pub qualified: String,
    pub exports: FxHashSet<String>,
    pub addresses: AddressMap,
}

impl PackageScope {
    /// Qualified C++ name of the identity of `from -> to`.
    pub fn index_ref(&self, from: &Type, to: &Type) -> Result<String, CodegenError> {
        let id = self.addresses.id_for(from, to).ok_or_else(|| {
            CodegenError::invariant(format!(
                "no identity for address `{}` -> `{}`",
                from.resolved(),
                to.resolved()
            ))
        })?;
        Ok(format!("{}::{}", self.qualified, cpp_index_name(id)))
    }
}

pub struct Lowerer<'p> {
    scope: &'p PackageScope,
    locals: Vec<FxHashMap<String, String>>,
    next_local: usize,
}

impl<'p> Lowerer<'p> {
    pub fn new(scope: &'p PackageScope) -> Self {
        Lowerer {
            scope,
            locals: Vec::new(),
            next_local: 0,
        }
    }

    /// Bring function parameters into scope as `v_<name>`.
    #[must_use]
    pub fn with_params(mut self, params: &[Param]) -> Self {
        self.push_params(params);
        self
    }

    pub fn lower(&mut self, expr: &Expr) -> Result<String, CodegenError> {
        stela_ir::ensure_sufficient_stack(|| self.lower_inner(expr))
    }

    /// `ctx.AddEffect(...)` registering a `new` binding.
    pub fn lower_new(&mut self, new: &NewStmt) -> Result<String, CodegenError> {
        let index = self.scope.index_ref(&new.lhs.ty, &new.rhs.ty)?;
        let lhs = self.lower(&new.lhs)?;
        let rhs = self.lower(&new.rhs)?;
        Ok(format!("ctx.AddEffect({lhs}, {index}, Stela::Rt::MakeNew({rhs}))"))
    }

    fn lower_inner(&mut self, expr: &Expr) -> Result<String, CodegenError> {
        Ok(match &expr.kind {
            ExprKind::Lit(lit) => literal(lit)?,
            ExprKind::Ref(name) => self.lookup(name)?.to_owned(),
            ExprKind::Unary { op, operand } => {
                let operand = self.lower(operand)?;
                match op {
                    UnaryOp::Not => format!("(!{operand})"),
                    UnaryOp::Neg => format!("(-{operand})"),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let is_real = matches!(lhs.ty.resolved(), Type::Real);
                let lhs = self.lower(lhs)?;
                let rhs = self.lower(rhs)?;
                if *op == BinaryOp::Mod && is_real {
                    format!("std::fmod({lhs}, {rhs})")
                } else {
                    format!("({lhs} {} {rhs})", op.symbol())
                }
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => format!(
                "({} ? {} : {})",
                self.lower(cond)?,
                self.lower(then)?,
                self.lower(otherwise)?
            ),
            ExprKind::Call {
                package,
                callee,
                args,
            } => self.lower_call(package.as_ref(), callee, args)?,
            ExprKind::List(elems) | ExprKind::Set(elems) => {
                format!("{}{{{}}}", cpp_type(&expr.ty), self.lower_list(elems)?)
            }
            ExprKind::Dict(entries) => {
                let mut out = String::new();
                for (i, (key, val)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{{{}, {}}}", self.lower(key)?, self.lower(val)?);
                }
                format!("{}{{{out}}}", cpp_type(&expr.ty))
            }
            ExprKind::Obj(fields) => {
                let mut fields: Vec<&(String, Expr)> = fields.iter().collect();
                fields.sort_by(|a, b| a.0.cmp(&b.0));
                let mut out = Vec::with_capacity(fields.len());
                for (_, field) in fields {
                    out.push(self.lower(field)?);
                }
                format!("{}{{{}}}", cpp_type(&expr.ty), out.join(", "))
            }
            ExprKind::Member { object, field } => {
                format!("({}).{}", self.lower(object)?, member(field))
            }
            ExprKind::Addr(elems) => {
                let mut out = Vec::with_capacity(elems.len());
                for (_, elem) in elems {
                    out.push(self.lower(elem)?);
                }
                format!("{}({})", cpp_type(&expr.ty), out.join(", "))
            }
            ExprKind::Known(inner) => format!("{}({})", cpp_type(&expr.ty), self.lower(inner)?),
            ExprKind::Unknown => format!("{}()", cpp_type(&expr.ty)),
            ExprKind::Read { addr, value } => {
                let value_ty = cpp_type(value);
                let lowered = self.lower(addr)?;
                if addr.ty.is_seq() {
                    format!("Stela::Rt::ReadEach<{value_ty}>(ctx, {lowered})")
                } else {
                    let index = self.scope.index_ref(&addr.ty, value)?;
                    format!("ctx.Read<{value_ty}>({lowered}, {index})")
                }
            }
            ExprKind::Collect(inner) => format!("Stela::Rt::Collect({})", self.lower(inner)?),
            ExprKind::Where { body, functions } => self.lower_where(&expr.ty, body, functions)?,
            ExprKind::Effecting { stmts, result } => {
                let mut out = format!("[&]() -> {} {{ ", cpp_type(&expr.ty));
                for stmt in stmts {
                    match stmt {
                        Stmt::New(new) => {
                            let _ = write!(out, "{}; ", self.lower_new(new)?);
                        }
                        Stmt::Delete { addr, value, .. } => {
                            let index = self.scope.index_ref(&addr.ty, value)?;
                            let _ = write!(
                                out,
                                "ctx.AddEffect({}, {index}, Stela::Rt::MakeDelete<{}>()); ",
                                self.lower(addr)?,
                                cpp_type(value)
                            );
                        }
                    }
                }
                let _ = write!(out, "return {}; }}()", self.lower(result)?);
                out
            }
        })
    }

    fn lower_call(
        &mut self,
        package: Option<&stela_ir::Namespace>,
        callee: &str,
        args: &[Expr],
    ) -> Result<String, CodegenError> {
        let args = self.lower_list(args)?;
        let ctx_args = if args.is_empty() {
            "ctx".to_owned()
        } else {
            format!("ctx, {args}")
        };
        if let Some(package) = package {
            return Ok(format!(
                "{}::{}({ctx_args})",
                cpp_namespace(package),
                export_fn(callee)
            ));
        }
        if let Some(local) = self.find_local(callee) {
            return Ok(format!("{local}({args})"));
        }
        if self.scope.exports.contains(callee) {
            return Ok(format!(
                "{}::{}({ctx_args})",
                self.scope.qualified,
                export_fn(callee)
            ));
        }
        Err(CodegenError::invariant(format!(
            "call to unknown function `{callee}`"
        )))
    }

    fn lower_where(
        &mut self,
        ty: &Type,
        body: &Expr,
        functions: &[LocalFunction],
    ) -> Result<String, CodegenError> {
        let mut bound = FxHashMap::default();
        let mut names = Vec::with_capacity(functions.len());
        for func in functions {
            let name = format!("L_{}_{}", func.name, self.next_local);
            self.next_local += 1;
            bound.insert(func.name.clone(), name.clone());
            names.push(name);
        }
        self.locals.push(bound);
        let result = self.lower_where_scoped(ty, body, functions, &names);
        self.locals.pop();
        result
    }

    fn lower_where_scoped(
        &mut self,
        ty: &Type,
        body: &Expr,
        functions: &[LocalFunction],
        names: &[String],
    ) -> Result<String, CodegenError> {
        let mut out = format!("[&]() -> {} {{ ", cpp_type(ty));
        for (func, name) in functions.iter().zip(names) {
            let _ = write!(out, "{} {name}; ", cpp_type(&func.ty()));
        }
        for (func, name) in functions.iter().zip(names) {
            let params: Vec<String> = func
                .params
                .iter()
                .map(|p| format!("{} v_{}", cpp_type(&p.ty), p.name))
                .collect();
            self.push_params(&func.params);
            let lowered = self.lower(&func.body);
            self.locals.pop();
            let _ = write!(
                out,
                "{name} = [&]({}) -> {} {{ return {}; }}; ",
                params.join(", "),
                cpp_type(&func.ret),
                lowered?
            );
        }
        let _ = write!(out, "return {}; }}()", self.lower(body)?);
        Ok(out)
    }

    fn lower_list(&mut self, exprs: &[Expr]) -> Result<String, CodegenError> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            out.push(self.lower(expr)?);
        }
        Ok(out.join(", "))
    }

    fn push_params(&mut self, params: &[Param]) {
        self.locals.push(
            params
                .iter()
                .map(|p| (p.name.clone(), format!("v_{}", p.name)))
                .collect(),
        );
    }

    fn find_local(&self, name: &str) -> Option<&str> {
        self.locals
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<&str, CodegenError> {
        self.find_local(name)
            .ok_or_else(|| CodegenError::invariant(format!("reference to unknown name `{name}`")))
    }
}

fn literal(lit: &Literal) -> Result<String, CodegenError> {
    Ok(match lit {
        Literal::Bool(value) => value.to_string(),
        Literal::Int(i64::MIN) => "(-INT64_C(9223372036854775807) - 1)".to_owned(),
        Literal::Int(value) => format!("INT64_C({value})"),
        Literal::Real(value) => real(*value),
        Literal::Str(value) => format!("std::string({})", string_literal(value)),
        Literal::Id(value) => {
            let id = Uuid::parse_str(value)
                .map_err(|err| CodegenError::invariant(format!("malformed id literal: {err}")))?;
            format!("Stela::Rt::TUuid(\"{}\")", id.hyphenated())
        }
    })
}

fn real(value: f64) -> String {
    if value.is_nan() {
        "std::numeric_limits<double>::quiet_NaN()".to_owned()
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("({sign}std::numeric_limits<double>::infinity())")
    } else if value.is_sign_negative() {
        format!("({value:?})")
    } else {
        format!("{value:?}")
    }
}

/// A quoted C++ string literal. Control characters use 3-digit octal
/// escapes so a following digit cannot extend them.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\{:03o}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
