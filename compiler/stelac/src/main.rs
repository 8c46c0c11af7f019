//! Stela Compiler CLI

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use stela_diagnostic::emitter::ColorMode;
use stela_front::JsonFrontEnd;
use stelac::options::parse_compile_options;
use stelac::{init_tracing, CompileOptions, Compiler, SystemToolchain, ToolchainConfig};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "compile" => {
            if args.len() < 3 {
                eprintln!("Usage: stela compile <file.stela> [options]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  -o <dir>        Output directory (default: the package source root)");
                eprintln!("  -d, --debug     Debug C++ build; echo compiler output on failure");
                eprintln!("  --machine       Print MM_NOTICE progress lines");
                std::process::exit(1);
            }

            // -o needs lookahead
            let mut options = CompileOptions::default();
            let mut i = 3;
            while i < args.len() {
                if args[i] == "-o" && i + 1 < args.len() {
                    options.out_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    let parsed = parse_compile_options(&args[i..=i]);
                    options.merge(&parsed);
                    i += 1;
                }
            }

            compile_file(&args[2], options);
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: stela check <file.stela>");
                std::process::exit(1);
            }
            check_file(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("Stela Compiler {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn compiler() -> Compiler<JsonFrontEnd, SystemToolchain> {
    let color = if io::stderr().is_terminal() {
        ColorMode::Auto
    } else {
        ColorMode::Never
    };
    Compiler::new(JsonFrontEnd::new(), SystemToolchain, ToolchainConfig::from_env())
        .with_color(color)
}

fn compile_file(path: &str, options: CompileOptions) {
    let request = options.into_request(Path::new(path));
    let mut stderr = io::stderr().lock();
    match compiler().compile(&request, &mut stderr) {
        Ok(name) => println!("{name}"),
        Err(failure) => {
            eprintln!("error: {failure}");
            std::process::exit(1);
        }
    }
}

fn check_file(path: &str) {
    let mut stderr = io::stderr().lock();
    match compiler().check(Path::new(path), &mut stderr) {
        Ok(namespace) => println!("OK: {namespace}"),
        Err(failure) => {
            eprintln!("error: {failure}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Stela Compiler");
    println!();
    println!("Usage: stela <command> [options]");
    println!();
    println!("Commands:");
    println!("  compile <file.stela>   Compile a package to a loadable module");
    println!("  check <file.stela>     Parse and type-check without generating code");
    println!("  help                   Show this message");
    println!("  version                Show version information");
    println!();
    println!("Environment:");
    println!("  STELA_CXX              C++ compiler to run (default: c++)");
    println!("  STELA_RUNTIME_INCLUDE  Directory holding the Stela runtime headers");
    println!("  STELA_CXXFLAGS         Extra flags passed to the C++ compiler");
    println!("  RUST_LOG               Enable tracing, e.g. RUST_LOG=stelac=debug");
}
