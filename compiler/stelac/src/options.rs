//! Compile requests, CLI options and toolchain configuration.

use std::path::{Path, PathBuf};

use stela_front::PackagePath;

/// One compile request at the library boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileRequest {
    pub source: PathBuf,
    pub out_dir: PathBuf,
    /// Debug build profile; also echoes toolchain output on failure.
    pub debug_cc: bool,
    /// Print `MM_NOTICE:` progress lines.
    pub machine_mode: bool,
}

impl CompileRequest {
    pub fn new(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        CompileRequest {
            source: source.into(),
            out_dir: out_dir.into(),
            debug_cc: false,
            machine_mode: false,
        }
    }
}

/// Options for `stela compile`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Output directory; defaults to the package's source root.
    pub out_dir: Option<PathBuf>,
    pub debug: bool,
    pub machine: bool,
}

impl CompileOptions {
    /// Merge another set of options into this one (later wins).
    pub fn merge(&mut self, other: &Self) {
        if other.out_dir.is_some() {
            self.out_dir.clone_from(&other.out_dir);
        }
        self.debug |= other.debug;
        self.machine |= other.machine;
    }

    pub fn into_request(self, source: &Path) -> CompileRequest {
        let out_dir = self.out_dir.unwrap_or_else(|| default_out_dir(source));
        CompileRequest {
            source: source.to_path_buf(),
            out_dir,
            debug_cc: self.debug,
            machine_mode: self.machine,
        }
    }
}

/// Parse `stela compile` flags. `-o <dir>` needs lookahead and is handled
/// by the caller; `--out=<dir>` is accepted here.
pub fn parse_compile_options(args: &[String]) -> CompileOptions {
    let mut options = CompileOptions::default();

    for arg in args {
        if arg == "-d" || arg == "--debug" {
            options.debug = true;
        } else if arg == "--machine" {
            options.machine = true;
        } else if let Some(dir) = arg.strip_prefix("--out=") {
            options.out_dir = Some(PathBuf::from(dir));
        } else if let Some(dir) = arg.strip_prefix("-o=") {
            options.out_dir = Some(PathBuf::from(dir));
        } else {
            eprintln!("warning: unknown option '{arg}'");
        }
    }

    options
}

fn default_out_dir(source: &Path) -> PathBuf {
    match PackagePath::locate(source) {
        Ok(path) => path.root().to_path_buf(),
        // The compile itself reports the bad name.
        Err(_) => source
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    }
}

/// Which C++ compiler to run and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolchainConfig {
    pub compiler: String,
    /// Directory holding the `stela/...` runtime headers.
    pub runtime_include: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            compiler: "c++".to_owned(),
            runtime_include: None,
            extra_args: Vec::new(),
        }
    }
}

impl ToolchainConfig {
    /// Defaults overridden by `STELA_CXX`, `STELA_RUNTIME_INCLUDE` and
    /// `STELA_CXXFLAGS` (whitespace separated).
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`ToolchainConfig::from_env`], reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ToolchainConfig::default();
        if let Some(cxx) = var("STELA_CXX").filter(|v| !v.trim().is_empty()) {
            config.compiler = cxx.trim().to_owned();
        }
        if let Some(include) = var("STELA_RUNTIME_INCLUDE").filter(|v| !v.is_empty()) {
            config.runtime_include = Some(PathBuf::from(include));
        }
        if let Some(flags) = var("STELA_CXXFLAGS") {
            config.extra_args = flags.split_whitespace().map(str::to_owned).collect();
        }
        config
    }
}

#[cfg(test)]
mod tests;
