//! Indentation-aware C++ writer.
//!
//! All four package artifacts are written through [`CppPrinter`]. Text is
//! written with `write!`/`writeln!`; the first write on a line is preceded by
//! one indent unit (two spaces) per open indent level. Indent levels are
//! held by guards, so they unwind on every exit path.
//!
//! I/O errors are sticky: the first one is kept, later writes are skipped,
//! and [`CppPrinter::finish`] reports it.

use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};

const INDENT_UNIT: &str = "  ";

pub struct CppPrinter<W: io::Write> {
    out: W,
    indent: usize,
    start_of_line: bool,
    error: Option<io::Error>,
}

impl<W: io::Write> CppPrinter<W> {
    pub fn new(out: W) -> Self {
        CppPrinter {
            out,
            indent: 0,
            start_of_line: true,
            error: None,
        }
    }

    /// End the current line.
    pub fn eol(&mut self) {
        self.raw("\n");
        self.start_of_line = true;
    }

    /// Indent everything written until the guard drops.
    pub fn indent(&mut self) -> Indent<'_, W> {
        self.indent += 1;
        Indent { printer: self }
    }

    /// Open `namespace <prefix><seg> {` for each segment; the guard closes
    /// them innermost first.
    pub fn namespace<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        prefix: &'static str,
    ) -> NamespaceScope<'_, W> {
        let segments: Vec<String> = segments.iter().map(|s| s.as_ref().to_owned()).collect();
        for seg in &segments {
            self.put(&format!("namespace {prefix}{seg} {{"));
            self.eol();
            self.eol();
            self.indent += 1;
        }
        NamespaceScope {
            printer: self,
            segments,
            prefix,
        }
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    /// Write text containing no newline.
    fn put(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.start_of_line {
            self.start_of_line = false;
            for _ in 0..self.indent {
                self.raw(INDENT_UNIT);
            }
        }
        self.raw(text);
    }

    fn raw(&mut self, text: &str) {
        if self.error.is_none() {
            if let Err(err) = self.out.write_all(text.as_bytes()) {
                self.error = Some(err);
            }
        }
    }
}

impl<W: io::Write> fmt::Write for CppPrinter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.put(first);
        }
        for line in lines {
            self.eol();
            self.put(line);
        }
        if self.error.is_some() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// Guard for one indent level.
pub struct Indent<'p, W: io::Write> {
    printer: &'p mut CppPrinter<W>,
}

impl<W: io::Write> Drop for Indent<'_, W> {
    fn drop(&mut self) {
        debug_assert!(self.printer.indent > 0, "indent guard underflow");
        self.printer.indent -= 1;
    }
}

impl<W: io::Write> Deref for Indent<'_, W> {
    type Target = CppPrinter<W>;

    fn deref(&self) -> &Self::Target {
        self.printer
    }
}

impl<W: io::Write> DerefMut for Indent<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.printer
    }
}

/// Guard for a run of nested namespaces.
pub struct NamespaceScope<'p, W: io::Write> {
    printer: &'p mut CppPrinter<W>,
    segments: Vec<String>,
    prefix: &'static str,
}

impl<W: io::Write> Drop for NamespaceScope<'_, W> {
    fn drop(&mut self) {
        for seg in self.segments.iter().rev() {
            self.printer.indent -= 1;
            self.printer.eol();
            self.printer.put(&format!("}} // {}{seg}", self.prefix));
            self.printer.eol();
        }
    }
}

impl<W: io::Write> Deref for NamespaceScope<'_, W> {
    type Target = CppPrinter<W>;

    fn deref(&self) -> &Self::Target {
        self.printer
    }
}

impl<W: io::Write> DerefMut for NamespaceScope<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.printer
    }
}

#[cfg(test)]
mod tests;
