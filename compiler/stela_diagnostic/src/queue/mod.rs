//! Position-sorted diagnostic queue.
//!
//! Each compile owns one queue and threads it by `&mut` through parsing,
//! type checking and code generation. Stages only append; the driver polls
//! [`DiagnosticQueue::has_errors`] between stages and drains the queue with
//! [`DiagnosticQueue::flush`] when it prints.

use crate::{Diagnostic, ErrorGuaranteed};

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors kept (0 = unlimited).
    pub error_limit: usize,
    /// Drop a diagnostic identical to one already queued at the same position.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 50,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// No limits, no deduplication (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Collects diagnostics and hands them back sorted by (line, column).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Add a diagnostic of any severity.
    ///
    /// Returns `true` if it was kept, `false` if the error limit was hit or
    /// it duplicated an earlier entry.
    pub fn add(&mut self, diag: Diagnostic) -> bool {
        let is_error = diag.is_error();
        if is_error && self.limit_reached() {
            return false;
        }
        if self.config.deduplicate && self.diagnostics.contains(&diag) {
            return false;
        }
        if is_error {
            self.error_count += 1;
        } else if diag.severity == crate::Severity::Warning {
            self.warning_count += 1;
        }
        self.diagnostics.push(diag);
        true
    }

    /// Record an error and get proof it was recorded.
    ///
    /// The proof is returned even when the limit or deduplication dropped
    /// this particular diagnostic: an error was reported either way.
    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diag.is_error(), "emit_error called with {}", diag.severity);
        self.add(diag);
        ErrorGuaranteed::new()
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// `Some` if at least one error has been recorded since the last flush.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Drain the queue, sorted by position.
    ///
    /// The sort is stable, so diagnostics at the same position keep the
    /// order they were reported in.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let already_sorted = self
            .diagnostics
            .windows(2)
            .all(|w| w[0].sort_pos() <= w[1].sort_pos());
        if !already_sorted {
            self.diagnostics.sort_by_key(Diagnostic::sort_pos);
        }
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diagnostics)
    }
}
