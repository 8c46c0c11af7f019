//! Error codes for compiler diagnostics.
//!
//! The first digit is the phase:
//! - E0xxx: syntax interchange and package naming
//! - E2xxx: type errors
//! - E5xxx: code generation
//! - E9xxx: internal compiler errors

use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Syntax (E0xxx)
    /// Malformed syntax tree
    E0001,
    /// Invalid package file name
    E0002,
    /// Unreadable source file
    E0003,

    // Types (E2xxx)
    /// Type mismatch
    E2001,
    /// Unknown name
    E2002,
    /// Unknown function
    E2003,
    /// Wrong number of arguments
    E2004,
    /// Unknown object field
    E2005,
    /// Duplicate export
    E2006,
    /// Expected an address
    E2007,
    /// Call into a package that is not imported
    E2008,
    /// Malformed id literal
    E2009,

    // Code generation (E5xxx)
    /// Export cannot be called dynamically (warning)
    E5001,
    /// Address component has no runtime type descriptor
    E5002,
    /// Export signature cannot be marshalled
    E5003,

    // Internal (E9xxx)
    /// Internal compiler error
    E9001,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// Check if this is a syntax-stage error (E0xxx).
    pub fn is_syntax_error(&self) -> bool {
        self.as_str().starts_with("E0")
    }

    /// Check if this is a type error (E2xxx).
    pub fn is_type_error(&self) -> bool {
        self.as_str().starts_with("E2")
    }

    /// Check if this is a code generation error (E5xxx).
    pub fn is_codegen_error(&self) -> bool {
        self.as_str().starts_with("E5")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
