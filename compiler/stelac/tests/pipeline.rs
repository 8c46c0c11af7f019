//! End-to-end runs of the compile pipeline against an in-memory front end
//! and a recording toolchain.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use stela_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use stela_front::{FrontEnd, ROOT_MARKER};
use stela_ir::{
    BinaryOp, Expr, ExprKind, FunctionDef, Namespace, PackageAst, Param, Pos, PosRange,
    VersionedName,
};
use stela_types::Type;
use stelac::{
    CompilationFailure, CompileRequest, Compiler, Invocation, Stage, Toolchain, ToolchainConfig,
    ToolchainError, ToolchainOutput,
};
use tempfile::TempDir;

/// Hands back a fixed package, after reporting any canned parse errors.
#[derive(Default)]
struct MemoryFrontEnd {
    package: Option<PackageAst>,
    parse_errors: Vec<Diagnostic>,
}

impl MemoryFrontEnd {
    fn with(package: PackageAst) -> Self {
        MemoryFrontEnd {
            package: Some(package),
            parse_errors: Vec::new(),
        }
    }
}

impl FrontEnd for MemoryFrontEnd {
    fn parse(
        &self,
        _path: &Path,
        namespace: &Namespace,
        queue: &mut DiagnosticQueue,
    ) -> Option<PackageAst> {
        for diag in &self.parse_errors {
            queue.add(diag.clone());
        }
        self.package.clone().map(|mut package| {
            package.namespace = namespace.clone();
            package
        })
    }
}

/// Records every invocation and how many ran at once.
struct Recorder {
    exit_code: i32,
    delay: Duration,
    calls: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Recorder {
    fn exiting(exit_code: i32) -> Self {
        Recorder {
            exit_code,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }
}

impl Toolchain for Recorder {
    fn run(&self, invocation: &Invocation) -> Result<ToolchainOutput, ToolchainError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.calls.lock().push(invocation.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(ToolchainOutput {
            exit_code: Some(self.exit_code),
            stdout: "cc says hello\n".into(),
            stderr: "shapes.cc:1: error: nope\n".into(),
        })
    }
}

struct Tree {
    dir: TempDir,
}

impl Tree {
    /// A source root with a `geo/shapes.stela` package.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/geo")).unwrap();
        fs::write(dir.path().join("src").join(ROOT_MARKER), "").unwrap();
        Tree { dir }
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("src/geo/shapes.stela")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn request(&self) -> CompileRequest {
        CompileRequest::new(self.source(), self.out())
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

fn package(functions: Vec<FunctionDef>) -> PackageAst {
    PackageAst {
        namespace: Namespace::default(),
        version: 3,
        imports: vec![],
        functions,
        tests: vec![],
    }
}

fn compiler(
    front: MemoryFrontEnd,
    toolchain: Recorder,
) -> Compiler<MemoryFrontEnd, Recorder> {
    Compiler::new(front, toolchain, ToolchainConfig::default())
}

fn compile(
    compiler: &Compiler<MemoryFrontEnd, Recorder>,
    request: &CompileRequest,
) -> (Result<VersionedName, CompilationFailure>, String) {
    let mut out = Vec::new();
    let result = compiler.compile(request, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn success_returns_versioned_name_and_builds_module() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(0));

    let (result, printed) = compile(&compiler, &tree.request());

    let name = result.unwrap();
    assert_eq!(name, VersionedName::new(Namespace::new(["geo", "shapes"]), 3));
    assert_eq!(name.to_string(), "geo/shapes.3");
    assert_eq!(printed, "");

    let out = tree.out();
    let geo = out.join("geo");
    assert!(geo.join("shapes.h").is_file());
    assert_eq!(
        fs::read_to_string(geo.join("shapes.stela.sig")).unwrap(),
        "F is (Int)->Bool;\n"
    );

    let calls = compiler.toolchain().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "c++");
    assert_eq!(calls[0].cwd, out);
    assert_eq!(
        calls[0].args,
        vec![
            "-std=c++17".to_owned(),
            "-x".into(),
            "c++".into(),
            "-fPIC".into(),
            "-shared".into(),
            "-o".into(),
            display(&geo.join("shapes.3.so")),
            "-iquote".into(),
            display(&out),
            display(&geo.join("shapes.link.cc")),
            display(&geo.join("shapes.cc")),
            "-O2".into(),
            "-DNDEBUG".into(),
        ]
    );
}

#[test]
fn debug_request_uses_debug_profile() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(0));
    let mut request = tree.request();
    request.debug_cc = true;

    let (result, _) = compile(&compiler, &request);
    result.unwrap();

    let args = &compiler.toolchain().calls()[0].args;
    assert!(args.iter().any(|a| a == "-g"));
    assert!(args.iter().any(|a| a == "-Werror"));
    assert!(!args.iter().any(|a| a == "-O2" || a == "-DNDEBUG"));
}

#[test]
fn machine_mode_prints_stage_notices() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(0));
    let mut request = tree.request();
    request.machine_mode = true;

    let (result, printed) = compile(&compiler, &request);
    result.unwrap();
    assert_eq!(
        printed,
        "MM_NOTICE: Synth + Symbols\n\
         MM_NOTICE: TypeCheck\n\
         MM_NOTICE: Code Gen\n\
         MM_NOTICE: Compiling C++\n"
    );
}

#[test]
fn parse_errors_are_printed_and_stop_the_pipeline() {
    let tree = Tree::new();
    let front = MemoryFrontEnd {
        package: None,
        parse_errors: vec![Diagnostic::error(ErrorCode::E0001)
            .with_message("malformed syntax tree")
            .with_label(PosRange::point(Pos::new(2, 5)), "here")],
    };
    let compiler = compiler(front, Recorder::exiting(0));

    let (result, printed) = compile(&compiler, &tree.request());

    let failure = result.unwrap_err();
    assert_eq!(failure.stage, Stage::Parsing);
    assert!(failure.to_string().contains("during parsing"));
    assert!(failure.to_string().contains("see the diagnostics printed above"));
    assert_eq!(
        printed,
        "Errors in: geo/shapes.stela\n\
         error[E0001]: malformed syntax tree\n  \
         --> geo/shapes.stela:2:5: here\n\
         error: aborting due to previous error\n"
    );
    assert!(compiler.toolchain().calls().is_empty());
    assert!(!tree.out().exists());
}

#[test]
fn diagnostics_are_printed_in_position_order() {
    let tree = Tree::new();
    let at = |line| PosRange::point(Pos::new(line, 1));
    let front = MemoryFrontEnd {
        package: Some(package(vec![])),
        parse_errors: vec![
            Diagnostic::error(ErrorCode::E0001)
                .with_message("second")
                .with_label(at(9), "b"),
            Diagnostic::error(ErrorCode::E0001)
                .with_message("first")
                .with_label(at(4), "a"),
        ],
    };
    let compiler = compiler(front, Recorder::exiting(0));

    let (result, printed) = compile(&compiler, &tree.request());

    assert_eq!(result.unwrap_err().stage, Stage::Parsing);
    let first = printed.find("first").unwrap();
    let second = printed.find("second").unwrap();
    assert!(first < second);
    assert!(printed.ends_with("error: aborting due to 2 previous errors\n"));
}

#[test]
fn type_errors_fail_type_checking() {
    let tree = Tree::new();
    let mut bad = is_positive();
    bad.body = Expr::int(1);
    let compiler = compiler(MemoryFrontEnd::with(package(vec![bad])), Recorder::exiting(0));

    let (result, printed) = compile(&compiler, &tree.request());

    assert_eq!(result.unwrap_err().stage, Stage::TypeChecking);
    assert!(printed.starts_with("Errors in: geo/shapes.stela\n"));
    assert!(printed.contains("error[E2001]"));
    assert!(compiler.toolchain().calls().is_empty());
}

#[test]
fn unmarshallable_export_fails_code_generation() {
    let tree = Tree::new();
    let opaque = FunctionDef {
        name: "G".into(),
        params: vec![Param::new("cb", Type::func(vec![], Type::Int))],
        ret: Type::Int,
        body: Expr::int(0),
        pos: PosRange::default(),
    };
    let compiler = compiler(MemoryFrontEnd::with(package(vec![opaque])), Recorder::exiting(0));

    let (result, printed) = compile(&compiler, &tree.request());

    assert_eq!(result.unwrap_err().stage, Stage::CodeGeneration);
    assert!(printed.starts_with("Errors in: geo/shapes.stela\n"));
    assert!(printed.contains("error[E5003]"));
    assert!(compiler.toolchain().calls().is_empty());
}

#[test]
fn toolchain_failure_in_release_hides_output() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(1));

    let (result, printed) = compile(&compiler, &tree.request());

    let failure = result.unwrap_err();
    assert_eq!(failure.stage, Stage::NativeCompilation);
    assert!(failure.detail.contains("exited with code 1"));
    assert!(!printed.contains("cc says hello"));
    assert!(!printed.contains("error: nope"));
    assert!(printed.contains("Error while compiling generated C++"));
    // Artifacts stay behind.
    assert!(tree.out().join("geo/shapes.cc").is_file());
}

#[test]
fn toolchain_failure_in_debug_echoes_output() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(1));
    let mut request = tree.request();
    request.debug_cc = true;

    let (result, printed) = compile(&compiler, &request);

    assert_eq!(result.unwrap_err().stage, Stage::NativeCompilation);
    assert!(printed.starts_with("cc says hello\nshapes.cc:1: error: nope\n"));
    assert!(printed.contains("Error while compiling generated C++"));
}

#[test]
fn invalid_package_name_is_rejected() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(0));
    let request = CompileRequest::new(tree.dir.path().join("src/a.foo.stela"), tree.out());

    let (result, printed) = compile(&compiler, &request);

    assert_eq!(result.unwrap_err().stage, Stage::Parsing);
    assert!(printed.contains("package names may not contain a '.'"));
    assert!(compiler.toolchain().calls().is_empty());
}

#[test]
fn check_parses_and_type_checks_only() {
    let tree = Tree::new();
    let compiler = compiler(MemoryFrontEnd::with(package(vec![is_positive()])), Recorder::exiting(0));
    let mut out = Vec::new();

    let namespace = compiler.check(&tree.source(), &mut out).unwrap();

    assert_eq!(namespace.to_string(), "geo/shapes");
    assert!(out.is_empty());
    assert!(!tree.out().exists());
    assert!(compiler.toolchain().calls().is_empty());
}

#[test]
fn concurrent_requests_do_not_overlap() {
    let tree = Tree::new();
    let mut recorder = Recorder::exiting(0);
    recorder.delay = Duration::from_millis(20);
    let compiler = Arc::new(compiler(
        MemoryFrontEnd::with(package(vec![is_positive()])),
        recorder,
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let compiler = Arc::clone(&compiler);
            let request = CompileRequest::new(tree.source(), tree.out().join(format!("run{i}")));
            thread::spawn(move || {
                let mut out = Vec::new();
                compiler.compile(&request, &mut out)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(compiler.toolchain().calls().len(), 4);
    assert_eq!(compiler.toolchain().max_active.load(Ordering::SeqCst), 1);
}
