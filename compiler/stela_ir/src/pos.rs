//! Line/column source positions.
//!
//! Positions are 1-based and come straight from the external parser. They
//! are used to sort diagnostics and are embedded in generated test metadata.

use std::fmt;

/// A single source position (1-based line and column).
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Pos { line, column }
    }
}

impl fmt::Debug for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source positions, `start` inclusive, `limit` exclusive.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PosRange {
    pub start: Pos,
    pub limit: Pos,
}

impl PosRange {
    #[inline]
    pub const fn new(start: Pos, limit: Pos) -> Self {
        PosRange { start, limit }
    }

    /// Zero-width range at `pos`.
    #[inline]
    pub const fn point(pos: Pos) -> Self {
        PosRange {
            start: pos,
            limit: pos,
        }
    }

    /// Merge two ranges into one covering both.
    #[must_use]
    pub fn merge(self, other: PosRange) -> PosRange {
        PosRange {
            start: self.start.min(other.start),
            limit: self.limit.max(other.limit),
        }
    }
}

impl fmt::Debug for PosRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.limit)
    }
}

impl fmt::Display for PosRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.limit)
    }
}
