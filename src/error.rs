//! Error taxonomy for the compiler and applier.
//!
//! Every failure mode described in the engine's error table maps to exactly one
//! variant here. `code()` recovers the negative status number a C-style caller
//! would expect; library consumers should match on the enum instead.

use std::fmt;

/// A single outcome of compiling or applying a template.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("system error: {0}")]
    System(String),

    #[error("unexpected end of template at line {line}")]
    UnexpectedEnd { line: u32 },

    #[error("empty tag at line {line}")]
    EmptyTag { line: u32 },

    #[error("value too big to encode")]
    TooBig,

    #[error("bad delimiter definition at line {line}")]
    BadDelimiter { line: u32 },

    #[error("section nesting too deep")]
    TooDeep,

    #[error("mismatched or unmatched closing tag {tag:?} at line {line}")]
    Closing { tag: String, line: u32 },

    #[error("malformed unescape tag at line {line}")]
    BadUnescapeTag { line: u32 },

    #[error("provider interface missing a required method")]
    InvalidInterface,

    #[error("partial {0:?} not found")]
    NotFound(String),

    #[error("tag {0:?} is undefined")]
    UndefinedTag(String),

    #[error("partial nesting exceeded the configured limit")]
    TooMuchNesting,

    #[error("out of memory")]
    OutOfMemory,

    #[error("provider error {0}")]
    User(i32),
}

impl Error {
    /// The negative status code a caller bridging to the original C ABI would expect.
    pub fn code(&self) -> i32 {
        match self {
            Error::System(_) => -1,
            Error::UnexpectedEnd { .. } => -2,
            Error::EmptyTag { .. } => -3,
            Error::TooBig => -4,
            Error::BadDelimiter { .. } => -5,
            Error::TooDeep => -6,
            Error::Closing { .. } => -7,
            Error::BadUnescapeTag { .. } => -8,
            Error::InvalidInterface => -9,
            Error::NotFound(_) => -11,
            Error::UndefinedTag(_) => -12,
            Error::TooMuchNesting => -13,
            Error::OutOfMemory => -14,
            Error::User(code) => -100 - code.abs(),
        }
    }

    /// The same status, wrapped as a bare numeric [`Code`] for callers that
    /// want to carry it without matching on the enum.
    pub fn status(&self) -> Code {
        Code(self.code())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bare numeric status, for callers that want the `MUSTACH_ERROR_*`-style integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code(pub i32);

pub type Result<T> = std::result::Result<T, Error>;
