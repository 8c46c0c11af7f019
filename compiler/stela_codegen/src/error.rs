//! Code generation errors.

use std::io;
use std::path::PathBuf;

use stela_diagnostic::ErrorGuaranteed;
use stela_types::Type;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Source problems were reported into the diagnostic queue.
    #[error("code generation rejected the package; see the reported diagnostics")]
    Reported(ErrorGuaranteed),
    /// An internal contract of the collector or assigner was broken.
    #[error("internal code generation error: {message}")]
    Invariant { message: String },
    #[error("cannot write `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CodegenError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        CodegenError::Invariant {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A type with no runtime descriptor constructor (`Err` or `Func`).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("type `{ty}` has no runtime type descriptor")]
pub struct UnserializableType {
    pub ty: Type,
}
