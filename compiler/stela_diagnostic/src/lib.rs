//! Diagnostic system for the Stela compiler.
//!
//! Source problems (parse and type errors, code generation rejections) are
//! never raised individually. Each stage pushes [`Diagnostic`]s into a
//! [`DiagnosticQueue`] passed to it by reference; the driver checks
//! [`DiagnosticQueue::has_errors`] after every stage and prints the queue
//! sorted by position when it stops.
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is proof that at least one error was recorded:
//!
//! ```text
//! let guarantee = queue.emit_error(diagnostic);
//! fn check_package(..) -> Result<(), ErrorGuaranteed> { ... }
//! ```

mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{type_mismatch, Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::DiagnosticQueue;
