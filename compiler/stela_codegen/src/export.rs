//! Exported functions.
//!
//! Every top-level function becomes an export: a typed C++ declaration and
//! definition inside the package namespace, and (unless it returns a
//! sequence) a dynamic-dispatch wrapper `RF_<name>` plus a metadata record
//! `IF_<name>` listed in the package's export table.

use std::fmt::{self, Write};
use std::io;

use stela_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use stela_ir::{FunctionDef, Param};
use stela_types::Type;

use crate::body::{string_literal, Lowerer, PackageScope};
use crate::native::{cpp_type, export_fn};
use crate::printer::CppPrinter;
use crate::type_gen::type_descriptor;
use crate::CodegenError;

pub struct Export {
    name: String,
    params: Vec<Param>,
    ret: Type,
    body: String,
    dispatch: Option<Dispatch>,
}

/// Runtime descriptors for the dispatch wrapper's metadata record.
struct Dispatch {
    params: Vec<(String, String)>,
    ret: String,
}

impl Export {
    /// Build the export, lowering its body now.
    #[tracing::instrument(level = "debug", skip_all, fields(export = %func.name))]
    pub fn build(
        func: &FunctionDef,
        scope: &PackageScope,
        queue: &mut DiagnosticQueue,
    ) -> Result<Self, CodegenError> {
        let mut reported = None;
        for param in &func.params {
            if param.ty.has_opaque_part() {
                reported = Some(queue.emit_error(unmarshallable(func, &param.ty, &param.name)));
            }
        }
        if func.ret.has_opaque_part() {
            reported = Some(queue.emit_error(unmarshallable(func, &func.ret, "return value")));
        }
        if let Some(guar) = reported {
            return Err(CodegenError::Reported(guar));
        }

        let body = Lowerer::new(scope)
            .with_params(&func.params)
            .lower(&func.body)?;

        let dispatch = if func.ret.is_seq() {
            tracing::warn!(
                export = %func.name,
                "export returns a sequence; no dynamic-dispatch wrapper generated"
            );
            queue.add(
                Diagnostic::warning(ErrorCode::E5001)
                    .with_message(format!(
                        "export `{}` returns `{}` and cannot be called dynamically",
                        func.name, func.ret
                    ))
                    .with_label(func.pos, "sequence results cannot be returned to callers")
                    .with_note("the function can still be called from Stela code"),
            );
            None
        } else {
            let mut params = Vec::with_capacity(func.params.len());
            for param in &func.params {
                params.push((param.name.clone(), descriptor(&param.ty)?));
            }
            Some(Dispatch {
                params,
                ret: descriptor(&func.ret)?,
            })
        };

        Ok(Export {
            name: func.name.clone(),
            params: func.params.clone(),
            ret: func.ret.clone(),
            body,
            dispatch,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Listed in the export table and callable by name at run time.
    pub fn is_dispatchable(&self) -> bool {
        self.dispatch.is_some()
    }

    /// The export's signature as a `Func` type.
    pub fn signature(&self) -> Type {
        Type::func(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.ret.clone(),
        )
    }

    fn prototype(&self) -> String {
        let mut out = format!(
            "{} {}(Stela::Package::TContext &ctx",
            cpp_type(&self.ret),
            export_fn(&self.name)
        );
        for param in &self.params {
            let _ = write!(out, ", {} v_{}", cpp_type(&param.ty), param.name);
        }
        out.push(')');
        out
    }

    pub(crate) fn write_decl<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        writeln!(out, "{};", self.prototype())
    }

    pub(crate) fn write_def<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        writeln!(out, "{} {{", self.prototype())?;
        {
            let mut out = out.indent();
            writeln!(out, "return {};", self.body)?;
        }
        writeln!(out, "}}")?;
        writeln!(out)
    }

    /// `RF_<name>` and `IF_<name>`, at file scope.
    pub(crate) fn write_dispatch<W: io::Write>(
        &self,
        out: &mut CppPrinter<W>,
        qualified: &str,
    ) -> fmt::Result {
        let Some(dispatch) = &self.dispatch else {
            return Ok(());
        };
        writeln!(
            out,
            "static Stela::Rt::TValue RF_{}(Stela::Package::TContext &ctx, const Stela::Package::TArgs &args) {{",
            self.name
        )?;
        {
            let mut out = out.indent();
            writeln!(out, "assert(args.size() == {});", self.params.len())?;
            let mut call = format!("{qualified}::{}(ctx", export_fn(&self.name));
            for param in &self.params {
                let _ = write!(
                    call,
                    ", Stela::Rt::FromValue<{}>(args.at({}))",
                    cpp_type(&param.ty),
                    string_literal(&param.name)
                );
            }
            call.push(')');
            writeln!(out, "return Stela::Rt::ToValue(ctx, {call});")?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        writeln!(out, "static const Stela::Package::TFuncInfo IF_{} {{", self.name)?;
        {
            let mut out = out.indent();
            let params: Vec<String> = dispatch
                .params
                .iter()
                .map(|(name, desc)| format!("{{{}, {desc}}}", string_literal(name)))
                .collect();
            writeln!(out, "Stela::Package::TParamMap{{{}}},", params.join(", "))?;
            writeln!(out, "/* ret */ {},", dispatch.ret)?;
            writeln!(out, "RF_{}", self.name)?;
        }
        writeln!(out, "}};")?;
        writeln!(out)
    }
}

fn descriptor(ty: &Type) -> Result<String, CodegenError> {
    type_descriptor(ty).map_err(|err| CodegenError::invariant(err.to_string()))
}

fn unmarshallable(func: &FunctionDef, ty: &Type, what: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E5003)
        .with_message(format!(
            "export `{}` cannot be marshalled: {what} has type `{ty}`",
            func.name
        ))
        .with_label(func.pos, "exported here")
        .with_note("error and function types have no runtime representation")
}
