//! Console error types

/// Recoverable console error. Reported, then the menu is shown again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// E01: Menu choice not in the command table (or not a number)
    IllegalChoice,
    /// E02: Numeric argument could not be parsed
    InvalidValue,
    /// E03: Console transport failed
    Io,
}

impl ConsoleError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::IllegalChoice => "E01",
            Self::InvalidValue => "E02",
            Self::Io => "E03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::IllegalChoice => "illegal choice",
            Self::InvalidValue => "invalid value",
            Self::Io => "console i/o error",
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
