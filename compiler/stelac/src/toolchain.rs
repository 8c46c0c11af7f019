//! The native C++ toolchain step.
//!
//! Generated sources become one shared module per request. The subprocess
//! sits behind [`Toolchain`] so the pipeline can be driven by a recorder in
//! tests; [`SystemToolchain`] is the real thing.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::options::ToolchainConfig;

/// C++ dialect of the generated sources.
const CXX_STANDARD: &str = "-std=c++17";

/// A fully resolved external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    /// Space-joined command line, for error messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolchainOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolchainOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug)]
pub enum ToolchainError {
    /// The compiler could not be started at all.
    Spawn { program: String, source: io::Error },
    /// The compiler ran and exited unsuccessfully.
    Failed {
        program: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        command: String,
    },
}

impl fmt::Display for ToolchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                if source.kind() == io::ErrorKind::NotFound {
                    write!(f, "C++ compiler '{program}' not found: {source}")
                } else {
                    write!(f, "cannot run C++ compiler '{program}': {source}")
                }
            }
            Self::Failed {
                program,
                exit_code,
                command,
                ..
            } => {
                write!(f, "compiling with '{program}' failed")?;
                if let Some(code) = exit_code {
                    write!(f, " (exit code {code})")?;
                }
                write!(f, "\n\nCommand: {command}")
            }
        }
    }
}

impl std::error::Error for ToolchainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Failed { .. } => None,
        }
    }
}

/// Runs external commands to completion.
pub trait Toolchain {
    /// Run `invocation` and capture its output. A non-zero exit is not an
    /// error at this level; see [`NativeBuild::run`].
    fn run(&self, invocation: &Invocation) -> Result<ToolchainOutput, ToolchainError>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn run(&self, invocation: &Invocation) -> Result<ToolchainOutput, ToolchainError> {
        (**self).run(invocation)
    }
}

/// Spawns real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    #[tracing::instrument(level = "debug", skip_all, fields(program = %invocation.program))]
    fn run(&self, invocation: &Invocation) -> Result<ToolchainOutput, ToolchainError> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .output()
            .map_err(|source| ToolchainError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        tracing::debug!(status = ?output.status, "toolchain finished");
        Ok(ToolchainOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildProfile {
    /// Symbols kept, warnings are errors except the ones generated code trips.
    Debug,
    /// Optimized, assertions compiled out.
    Release,
}

impl BuildProfile {
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            BuildProfile::Debug
        } else {
            BuildProfile::Release
        }
    }

    pub fn flags(self) -> &'static [&'static str] {
        match self {
            BuildProfile::Debug => &[
                "-g",
                "-Wall",
                "-Wextra",
                "-Werror",
                "-Wno-unused-parameter",
                "-Wno-unused-variable",
                "-Wno-type-limits",
                "-Wno-parentheses",
            ],
            BuildProfile::Release => &["-O2", "-DNDEBUG"],
        }
    }
}

/// One shared-module build: the link unit plus every package implementation.
#[derive(Clone, Debug)]
pub struct NativeBuild {
    pub out_dir: PathBuf,
    /// The `.so` to produce.
    pub output: PathBuf,
    pub link_unit: PathBuf,
    pub units: Vec<PathBuf>,
    pub profile: BuildProfile,
}

impl NativeBuild {
    pub fn invocation(&self, config: &ToolchainConfig) -> Invocation {
        let mut args: Vec<String> = vec![CXX_STANDARD.into(), "-x".into(), "c++".into()];
        if let Some(include) = &config.runtime_include {
            args.push(format!("-I{}", include.display()));
        }
        args.extend(["-fPIC".into(), "-shared".into(), "-o".into(), display(&self.output)]);
        args.extend(["-iquote".into(), display(&self.out_dir)]);
        args.push(display(&self.link_unit));
        args.extend(self.units.iter().map(|unit| display(unit)));
        args.extend(self.profile.flags().iter().map(|&flag| flag.to_owned()));
        args.extend(config.extra_args.iter().cloned());

        Invocation {
            program: config.compiler.clone(),
            args,
            cwd: self.out_dir.clone(),
        }
    }

    /// Run the build, turning a non-zero exit into [`ToolchainError::Failed`].
    #[tracing::instrument(level = "debug", skip_all, fields(output = %self.output.display()))]
    pub fn run(
        &self,
        config: &ToolchainConfig,
        toolchain: &dyn Toolchain,
    ) -> Result<ToolchainOutput, ToolchainError> {
        let invocation = self.invocation(config);
        tracing::debug!(command = %invocation.command_line(), "invoking C++ compiler");
        let output = toolchain.run(&invocation)?;
        if output.success() {
            return Ok(output);
        }
        Err(ToolchainError::Failed {
            program: invocation.program.clone(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            command: invocation.command_line(),
        })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
