//! The compilation pipeline and its session lock.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use stela_codegen::{Artifacts, CodegenError, Package, TimeIdentities};
use stela_diagnostic::emitter::{ColorMode, DiagnosticEmitter, TerminalEmitter};
use stela_diagnostic::{Diagnostic, DiagnosticQueue, Severity};
use stela_front::{FrontEnd, PackagePath};
use stela_ir::{Namespace, PackageAst, VersionedName};

use crate::options::{CompileRequest, ToolchainConfig};
use crate::toolchain::{BuildProfile, NativeBuild, Toolchain, ToolchainError};
use crate::{CompilationFailure, Stage};

const SUPPORT_LINE: &str = "Error while compiling generated C++. \
     Re-run with --debug to see the toolchain output, and report it with your Stela source";

/// A compiler session: front end, toolchain and the lock that keeps
/// requests from overlapping.
///
/// Share one `Compiler` (behind an `Arc` if needed) between callers; each
/// [`Compiler::compile`] holds the lock from locating the source until the
/// toolchain exits.
pub struct Compiler<F, T> {
    front: F,
    toolchain: T,
    config: ToolchainConfig,
    color: ColorMode,
    session: Mutex<()>,
}

impl<F: FrontEnd, T: Toolchain> Compiler<F, T> {
    pub fn new(front: F, toolchain: T, config: ToolchainConfig) -> Self {
        Compiler {
            front,
            toolchain,
            config,
            color: ColorMode::Never,
            session: Mutex::new(()),
        }
    }

    /// Color diagnostics written to a terminal.
    #[must_use]
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Compile one package into a loadable shared module.
    ///
    /// Diagnostics, progress notices and toolchain echo go to `diag_out`.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(source = %request.source.display(), debug = request.debug_cc)
    )]
    pub fn compile(
        &self,
        request: &CompileRequest,
        diag_out: &mut dyn Write,
    ) -> Result<VersionedName, CompilationFailure> {
        let _session = self.session.lock();

        let (path, namespace) = locate(&request.source, diag_out)?;
        let mut run = Run {
            out: diag_out,
            rel: path.rel().to_path_buf(),
            machine: request.machine_mode,
            color: self.color,
            queue: DiagnosticQueue::new(),
        };

        let ast = self.parse(&mut run, &path, &namespace)?;
        self.type_check(&mut run, &ast)?;
        let (package, artifacts) = generate(&mut run, &ast, &request.out_dir)?;
        self.compile_native(&mut run, &package, &artifacts, request)?;

        let name = package.versioned_name();
        tracing::debug!(%name, "compiled");
        Ok(name)
    }

    /// Parse and type-check only; nothing is written.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %source.display()))]
    pub fn check(
        &self,
        source: &Path,
        diag_out: &mut dyn Write,
    ) -> Result<Namespace, CompilationFailure> {
        let _session = self.session.lock();

        let (path, namespace) = locate(source, diag_out)?;
        let mut run = Run {
            out: diag_out,
            rel: path.rel().to_path_buf(),
            machine: false,
            color: self.color,
            queue: DiagnosticQueue::new(),
        };
        let ast = self.parse(&mut run, &path, &namespace)?;
        self.type_check(&mut run, &ast)?;
        run.report_warnings();
        Ok(namespace)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = %namespace))]
    fn parse(
        &self,
        run: &mut Run<'_>,
        path: &PackagePath,
        namespace: &Namespace,
    ) -> Result<PackageAst, CompilationFailure> {
        run.notice("Synth + Symbols");
        match self.front.parse(&path.abs(), namespace, &mut run.queue) {
            Some(ast) if run.queue.has_errors().is_none() => Ok(ast),
            _ => Err(run.fail(Stage::Parsing)),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = %ast.namespace))]
    fn type_check(&self, run: &mut Run<'_>, ast: &PackageAst) -> Result<(), CompilationFailure> {
        run.notice("TypeCheck");
        self.front.type_check(ast, &mut run.queue);
        if run.queue.has_errors().is_some() {
            return Err(run.fail(Stage::TypeChecking));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = %package.namespace()))]
    fn compile_native(
        &self,
        run: &mut Run<'_>,
        package: &Package,
        artifacts: &Artifacts,
        request: &CompileRequest,
    ) -> Result<(), CompilationFailure> {
        run.notice("Compiling C++");
        let build = NativeBuild {
            out_dir: request.out_dir.clone(),
            output: package.module_path(&request.out_dir),
            link_unit: artifacts.link.clone(),
            units: vec![artifacts.implementation.clone()],
            profile: BuildProfile::from_debug_flag(request.debug_cc),
        };

        match build.run(&self.config, &self.toolchain) {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "toolchain failed");
                if request.debug_cc {
                    run.echo(&err);
                }
                let _ = writeln!(run.out, "{SUPPORT_LINE}");
                Err(CompilationFailure::new(
                    Stage::NativeCompilation,
                    native_detail(&err),
                ))
            }
        }
    }
}

fn locate(
    source: &Path,
    out: &mut dyn Write,
) -> Result<(PackagePath, Namespace), CompilationFailure> {
    PackagePath::locate(source)
        .and_then(|path| path.namespace().map(|ns| (path, ns)))
        .map_err(|err| {
            let _ = writeln!(out, "error: {err}");
            CompilationFailure::new(Stage::Parsing, err.to_string())
        })
}

#[tracing::instrument(level = "debug", skip_all, fields(package = %ast.namespace))]
fn generate(
    run: &mut Run<'_>,
    ast: &PackageAst,
    out_dir: &Path,
) -> Result<(Package, Artifacts), CompilationFailure> {
    run.notice("Code Gen");
    let built = Package::build(ast, &mut TimeIdentities::new(), &mut run.queue)
        .and_then(|package| package.emit(out_dir).map(|artifacts| (package, artifacts)));
    match built {
        Ok(built) => {
            run.report_warnings();
            Ok(built)
        }
        Err(CodegenError::Reported(_)) => Err(run.fail(Stage::CodeGeneration)),
        Err(err) => {
            let _ = writeln!(run.out, "error: {err}");
            Err(CompilationFailure::new(Stage::CodeGeneration, err.to_string()))
        }
    }
}

fn native_detail(err: &ToolchainError) -> String {
    match err {
        ToolchainError::Spawn { program, .. } => format!("cannot run '{program}'"),
        ToolchainError::Failed {
            program,
            exit_code: Some(code),
            ..
        } => format!("'{program}' exited with code {code}"),
        ToolchainError::Failed { program, .. } => format!("'{program}' was terminated"),
    }
}

/// Per-request state: the diagnostic stream and queue.
struct Run<'a> {
    out: &'a mut dyn Write,
    rel: PathBuf,
    machine: bool,
    color: ColorMode,
    queue: DiagnosticQueue,
}

impl Run<'_> {
    fn notice(&mut self, stage: &str) {
        tracing::debug!(stage, "entering stage");
        if self.machine {
            let _ = writeln!(self.out, "MM_NOTICE: {stage}");
        }
    }

    /// Print `Errors in:` and the sorted queue, and build the failure.
    fn fail(&mut self, stage: Stage) -> CompilationFailure {
        let rel = self.rel.display().to_string();
        let _ = writeln!(self.out, "Errors in: {rel}");
        let diagnostics = self.queue.flush();
        self.emit(&diagnostics);
        CompilationFailure::new(stage, format!("errors in {rel}"))
    }

    fn report_warnings(&mut self) {
        if !self.queue.is_empty() {
            let diagnostics = self.queue.flush();
            self.emit(&diagnostics);
        }
    }

    fn emit(&mut self, diagnostics: &[Diagnostic]) {
        let errors = count(diagnostics, Severity::Error);
        let warnings = count(diagnostics, Severity::Warning);
        let mut emitter = TerminalEmitter::with_color_mode(&mut *self.out, self.color, true)
            .with_path(self.rel.display().to_string());
        emitter.emit_all(diagnostics);
        emitter.emit_summary(errors, warnings);
        emitter.flush();
    }

    fn echo(&mut self, err: &ToolchainError) {
        match err {
            ToolchainError::Failed { stdout, stderr, .. } => {
                for stream in [stdout, stderr] {
                    if !stream.is_empty() {
                        let _ = self.out.write_all(stream.as_bytes());
                        if !stream.ends_with('\n') {
                            let _ = writeln!(self.out);
                        }
                    }
                }
            }
            ToolchainError::Spawn { .. } => {
                let _ = writeln!(self.out, "error: {err}");
            }
        }
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}
