//! Stela package code generation.
//!
//! Turns a type-checked [`PackageAst`](stela_ir::PackageAst) into the C++
//! sources and link metadata a Stela runtime loads:
//!
//! ```text
//! PackageAst
//!   -> collect      objects, compared objects, address pairs
//!   -> address      one identity per non-sequence address pair
//!   -> export/suite exports and tests, bodies lowered eagerly
//!   -> package      header, implementation, link unit, signature listing
//! ```
//!
//! [`Package::build`] reports source problems into a
//! [`DiagnosticQueue`](stela_diagnostic::DiagnosticQueue) and returns
//! [`CodegenError::Reported`]; everything else is an internal or I/O error.

pub mod address;
mod body;
pub mod collect;
mod error;
pub mod export;
pub mod native;
mod package;
pub mod printer;
pub mod suite;
pub mod type_gen;

pub use address::{AddressMap, IdentitySource, TimeIdentities};
pub use body::PackageScope;
pub use error::{CodegenError, UnserializableType};
pub use package::{Artifacts, Package};
pub use type_gen::type_descriptor;

/// Version of the link-info layout the generated link unit exposes.
pub const API_VERSION: u32 = 1;
