//! The Stela package compiler driver.
//!
//! [`Compiler::compile`] runs one request end to end:
//!
//! ```text
//! locate -> parse -> type-check -> code gen -> C++ toolchain -> VersionedName
//! ```
//!
//! Each stage runs only if the previous one left no errors. Any failure
//! prints what it can to the caller's diagnostic stream and comes back as a
//! single [`CompilationFailure`]. The whole pipeline holds the compiler's
//! session lock, so requests through one [`Compiler`] never overlap.
//!
//! # Environment
//!
//! - `STELA_CXX`, `STELA_RUNTIME_INCLUDE`, `STELA_CXXFLAGS`: see
//!   [`ToolchainConfig::from_env`].
//! - `RUST_LOG=stelac=debug`: enable tracing (see [`init_tracing`]).
//! - `STELA_LOG_TREE=1`: hierarchical tracing output.

mod failure;
pub mod options;
mod session;
pub mod toolchain;
mod tracing_setup;

pub use failure::{CompilationFailure, Stage};
pub use options::{CompileOptions, CompileRequest, ToolchainConfig};
pub use session::Compiler;
pub use toolchain::{
    BuildProfile, Invocation, NativeBuild, SystemToolchain, Toolchain, ToolchainError,
    ToolchainOutput,
};
pub use tracing_setup::init_tracing;
