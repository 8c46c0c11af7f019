//! JSON syntax-tree interchange.
//!
//! The external parser writes the annotated tree of one package as JSON;
//! the shape is the serde form of [`PackageAst`]. The namespace is not part
//! of the document: it comes from the source path.

use std::fs;
use std::path::Path;

use stela_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use stela_ir::{Namespace, PackageAst, Pos, PosRange};

use crate::FrontEnd;

/// Front end reading JSON syntax trees from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFrontEnd;

impl JsonFrontEnd {
    pub fn new() -> Self {
        JsonFrontEnd
    }

    /// Decode one package document.
    pub fn parse_str(
        &self,
        text: &str,
        namespace: &Namespace,
        queue: &mut DiagnosticQueue,
    ) -> Option<PackageAst> {
        match serde_json::from_str::<PackageAst>(text) {
            Ok(mut package) => {
                package.namespace = namespace.clone();
                tracing::debug!(
                    functions = package.functions.len(),
                    tests = package.tests.len(),
                    "decoded package"
                );
                Some(package)
            }
            Err(err) => {
                let pos = Pos::new(to_u32(err.line()), to_u32(err.column()));
                queue.add(
                    Diagnostic::error(ErrorCode::E0001)
                        .with_message(format!("malformed syntax tree: {err}"))
                        .with_label(PosRange::point(pos), "here"),
                );
                None
            }
        }
    }
}

impl FrontEnd for JsonFrontEnd {
    #[tracing::instrument(level = "debug", skip_all, fields(namespace = %namespace))]
    fn parse(
        &self,
        path: &Path,
        namespace: &Namespace,
        queue: &mut DiagnosticQueue,
    ) -> Option<PackageAst> {
        match fs::read_to_string(path) {
            Ok(text) => self.parse_str(&text, namespace, queue),
            Err(err) => {
                queue.add(
                    Diagnostic::error(ErrorCode::E0003)
                        .with_message(format!("cannot read `{}`: {err}", path.display())),
                );
                None
            }
        }
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
