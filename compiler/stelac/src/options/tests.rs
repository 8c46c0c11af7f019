use std::collections::HashMap;

use pretty_assertions::assert_eq;

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|&s| s.to_owned()).collect()
}

#[test]
fn parse_flags() {
    let options = parse_compile_options(&args(&["--debug", "--machine", "--out=build"]));
    assert_eq!(
        options,
        CompileOptions {
            out_dir: Some(PathBuf::from("build")),
            debug: true,
            machine: true,
        }
    );
    assert!(parse_compile_options(&args(&["-d"])).debug);
}

#[test]
fn unknown_flags_are_ignored() {
    assert_eq!(
        parse_compile_options(&args(&["--bogus"])),
        CompileOptions::default()
    );
}

#[test]
fn merge_later_out_dir_wins_and_flags_accumulate() {
    let mut options = CompileOptions {
        out_dir: Some(PathBuf::from("a")),
        debug: true,
        machine: false,
    };
    options.merge(&CompileOptions {
        out_dir: Some(PathBuf::from("b")),
        debug: false,
        machine: true,
    });
    assert_eq!(options.out_dir, Some(PathBuf::from("b")));
    assert!(options.debug);
    assert!(options.machine);

    options.merge(&CompileOptions::default());
    assert_eq!(options.out_dir, Some(PathBuf::from("b")));
}

#[test]
fn request_defaults_out_dir_to_source_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(stela_front::ROOT_MARKER), "").unwrap();
    let source = dir.path().join("geo").join("shapes.stela");

    let request = CompileOptions::default().into_request(&source);
    assert_eq!(request.out_dir, dir.path());
    assert_eq!(request.source, source);
    assert!(!request.debug_cc);
}

#[test]
fn request_keeps_explicit_out_dir() {
    let options = CompileOptions {
        out_dir: Some(PathBuf::from("/tmp/out")),
        debug: true,
        machine: true,
    };
    let request = options.into_request(Path::new("src/a.stela"));
    assert_eq!(
        request,
        CompileRequest {
            source: PathBuf::from("src/a.stela"),
            out_dir: PathBuf::from("/tmp/out"),
            debug_cc: true,
            machine_mode: true,
        }
    );
}

#[test]
fn toolchain_defaults() {
    let config = ToolchainConfig::from_vars(|_| None);
    assert_eq!(config, ToolchainConfig::default());
    assert_eq!(config.compiler, "c++");
}

#[test]
fn toolchain_from_vars() {
    let vars: HashMap<&str, &str> = [
        ("STELA_CXX", " g++-13 "),
        ("STELA_RUNTIME_INCLUDE", "/opt/stela/include"),
        ("STELA_CXXFLAGS", "  -pipe   -fno-rtti "),
    ]
    .into_iter()
    .collect();
    let config = ToolchainConfig::from_vars(|key| vars.get(key).map(|v| (*v).to_owned()));
    assert_eq!(
        config,
        ToolchainConfig {
            compiler: "g++-13".into(),
            runtime_include: Some(PathBuf::from("/opt/stela/include")),
            extra_args: vec!["-pipe".into(), "-fno-rtti".into()],
        }
    );
}

#[test]
fn blank_compiler_keeps_default() {
    let config = ToolchainConfig::from_vars(|key| (key == "STELA_CXX").then(|| "  ".to_owned()));
    assert_eq!(config.compiler, "c++");
}
