//! Front end for the Stela compiler.
//!
//! The surface grammar is parsed by an external tool that writes the
//! annotated syntax tree as JSON. This crate reads that interchange form,
//! names the package from its path, and checks the annotated types before
//! code generation trusts them.
//!
//! The [`FrontEnd`] trait is the seam the driver compiles against, so tests
//! can hand it packages built in memory.

mod check;
mod json;
mod package_path;

use std::path::Path;

use stela_diagnostic::DiagnosticQueue;
use stela_ir::{Namespace, PackageAst};

pub use check::check_package;
pub use json::JsonFrontEnd;
pub use package_path::{PackagePath, PackagePathError, ROOT_MARKER, SOURCE_EXTENSION};

/// Parse and type-check entry points.
///
/// Problems are reported into `queue`; `parse` returns `None` when it could
/// not produce a tree at all.
pub trait FrontEnd {
    fn parse(
        &self,
        path: &Path,
        namespace: &Namespace,
        queue: &mut DiagnosticQueue,
    ) -> Option<PackageAst>;

    fn type_check(&self, package: &PackageAst, queue: &mut DiagnosticQueue) {
        // Errors land in the queue; the driver polls it.
        let _ = check_package(package, queue);
    }
}
