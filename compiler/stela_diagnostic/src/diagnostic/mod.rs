//! Core diagnostic types.

use std::fmt;

use stela_ir::{Pos, PosRange};

use crate::ErrorCode;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A source range with an explanatory message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub range: PosRange,
    pub message: String,
    /// Whether this is the main error location.
    pub is_primary: bool,
}

impl Label {
    pub fn primary(range: PosRange, message: impl Into<String>) -> Self {
        Label {
            range,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(range: PosRange, message: impl Into<String>) -> Self {
        Label {
            range,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// A diagnostic: code, severity, message, and where it happened.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[cold]
    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    #[cold]
    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a primary label at the error location.
    pub fn with_label(mut self, range: PosRange, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(range, message));
        self
    }

    pub fn with_secondary_label(mut self, range: PosRange, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(range, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn primary_range(&self) -> Option<PosRange> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.range)
    }

    /// Sort key for the queue: start of the primary label, or 1:1.
    pub fn sort_pos(&self) -> Pos {
        self.primary_range().map_or(Pos::new(1, 1), |r| r.start)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// Create a type mismatch diagnostic.
#[cold]
pub fn type_mismatch(range: PosRange, expected: &str, found: &str, context: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(format!(
            "type mismatch: expected `{expected}`, found `{found}`"
        ))
        .with_label(range, format!("expected `{expected}` {context}"))
}
