//! The one failure kind callers see.

use std::fmt;

/// Pipeline stage a request failed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Parsing,
    TypeChecking,
    CodeGeneration,
    NativeCompilation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parsing => "parsing",
            Stage::TypeChecking => "type-checking",
            Stage::CodeGeneration => "code generation",
            Stage::NativeCompilation => "native compilation",
        })
    }
}

/// A request failed. Details were already written to the diagnostic stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("compilation failed during {stage} ({detail}); see the diagnostics printed above")]
pub struct CompilationFailure {
    pub stage: Stage,
    pub detail: String,
}

impl CompilationFailure {
    pub fn new(stage: Stage, detail: impl Into<String>) -> Self {
        CompilationFailure {
            stage,
            detail: detail.into(),
        }
    }
}
