//! Error types for the Amalgam bridge

use std::fmt;
use thiserror::Error;

/// Source location in script code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Byte offset in source
    pub offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Format a source context with caret pointer for errors
pub fn format_error_context(source: &str, location: &SourceLocation) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line_idx = (location.line.saturating_sub(1)) as usize;

    if line_idx >= lines.len() {
        return String::new();
    }

    let mut result = String::new();
    let line_num_width = format!("{}", location.line + 1).len().max(3);

    if line_idx > 0 {
        result.push_str(&format!(
            "{:>width$} | {}\n",
            location.line - 1,
            lines[line_idx - 1],
            width = line_num_width
        ));
    }

    result.push_str(&format!(
        "{:>width$} | {}\n",
        location.line,
        lines[line_idx],
        width = line_num_width
    ));

    let pointer_offset = (location.column.saturating_sub(1)) as usize;
    result.push_str(&format!(
        "{:>width$} | {}^\n",
        "",
        " ".repeat(pointer_offset),
        width = line_num_width
    ));

    if line_idx + 1 < lines.len() {
        result.push_str(&format!(
            "{:>width$} | {}\n",
            location.line + 1,
            lines[line_idx + 1],
            width = line_num_width
        ));
    }

    result
}

/// Main error type for the bridge and its script frontend
#[derive(Error, Debug)]
pub enum Error {
    /// Lexer error - invalid token or character
    #[error("SyntaxError: {message} at {location}{}", if source_context.is_empty() { String::new() } else { format!("\n{}", source_context) })]
    LexerError {
        message: String,
        location: SourceLocation,
        source_context: String,
    },

    /// Parser error - invalid syntax
    #[error("SyntaxError: {message} at {location}{}", if source_context.is_empty() { String::new() } else { format!("\n{}", source_context) })]
    ParseError {
        message: String,
        location: SourceLocation,
        source_context: String,
    },

    /// Boundary error - a bridge contract was violated at dispatch time
    #[error("{kind}: {message}")]
    Bridge {
        kind: BridgeErrorKind,
        message: String,
    },

    /// Uncaught script-level throw
    #[error("ScriptError: {message}")]
    ScriptError { message: String },

    /// Internal host error
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error
    #[error("IOError: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

/// Bridge boundary error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    /// Type is not constructible from script
    NotConstructible,
    /// Member name is not declared for the type
    UnknownMember,
    /// Write through a const handle or to a read-only property
    AccessViolation,
    /// Handle whose object has been destroyed
    DanglingHandle,
    /// Value cannot cross the boundary in the requested shape
    UnmarshalableType,
    /// Native method signaled failure
    NativeInvocationError,
}

impl fmt::Display for BridgeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeErrorKind::NotConstructible => write!(f, "NotConstructible"),
            BridgeErrorKind::UnknownMember => write!(f, "UnknownMember"),
            BridgeErrorKind::AccessViolation => write!(f, "AccessViolation"),
            BridgeErrorKind::DanglingHandle => write!(f, "DanglingHandle"),
            BridgeErrorKind::UnmarshalableType => write!(f, "UnmarshalableType"),
            BridgeErrorKind::NativeInvocationError => write!(f, "NativeInvocationError"),
        }
    }
}

impl Error {
    /// Create a new lexer error
    pub fn lexer_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Error::LexerError {
            message: message.into(),
            location,
            source_context: String::new(),
        }
    }

    /// Create a new lexer error with source context
    pub fn lexer_error_with_context(
        message: impl Into<String>,
        location: SourceLocation,
        source: &str,
    ) -> Self {
        Error::LexerError {
            message: message.into(),
            source_context: format_error_context(source, &location),
            location,
        }
    }

    /// Create a new parse error
    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Error::ParseError {
            message: message.into(),
            location,
            source_context: String::new(),
        }
    }

    /// Create a new parse error with source context
    pub fn parse_error_with_context(
        message: impl Into<String>,
        location: SourceLocation,
        source: &str,
    ) -> Self {
        Error::ParseError {
            message: message.into(),
            source_context: format_error_context(source, &location),
            location,
        }
    }

    /// Create a NotConstructible error
    pub fn not_constructible(class: &str) -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::NotConstructible,
            message: format!("type '{}' cannot be constructed from script", class),
        }
    }

    /// Create an UnknownMember error
    pub fn unknown_member(class: &str, member: &str) -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::UnknownMember,
            message: format!("type '{}' has no member '{}'", class, member),
        }
    }

    /// Create an AccessViolation error
    pub fn access_violation(message: impl Into<String>) -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::AccessViolation,
            message: message.into(),
        }
    }

    /// Create a DanglingHandle error
    pub fn dangling_handle() -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::DanglingHandle,
            message: "handle refers to a destroyed object".to_string(),
        }
    }

    /// Create an UnmarshalableType error
    pub fn unmarshalable(message: impl Into<String>) -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::UnmarshalableType,
            message: message.into(),
        }
    }

    /// Create a NativeInvocationError
    pub fn native_invocation(message: impl Into<String>) -> Self {
        Error::Bridge {
            kind: BridgeErrorKind::NativeInvocationError,
            message: message.into(),
        }
    }

    /// Create a ScriptError for an uncaught throw
    pub fn script_error(message: impl Into<String>) -> Self {
        Error::ScriptError {
            message: message.into(),
        }
    }

    /// Add source context to an existing lexer/parser error
    pub fn with_source_context(self, source: &str) -> Self {
        match self {
            Error::LexerError {
                message, location, ..
            } => Error::LexerError {
                message,
                source_context: format_error_context(source, &location),
                location,
            },
            Error::ParseError {
                message, location, ..
            } => Error::ParseError {
                message,
                source_context: format_error_context(source, &location),
                location,
            },
            other => other,
        }
    }

    /// The error-kind name surfaced to script code as `e.name`
    pub fn script_name(&self) -> &'static str {
        match self {
            Error::LexerError { .. } | Error::ParseError { .. } => "SyntaxError",
            Error::Bridge { kind, .. } => match kind {
                BridgeErrorKind::NotConstructible => "NotConstructible",
                BridgeErrorKind::UnknownMember => "UnknownMember",
                BridgeErrorKind::AccessViolation => "AccessViolation",
                BridgeErrorKind::DanglingHandle => "DanglingHandle",
                BridgeErrorKind::UnmarshalableType => "UnmarshalableType",
                BridgeErrorKind::NativeInvocationError => "NativeInvocationError",
            },
            Error::ScriptError { .. } => "ScriptError",
            Error::InternalError(_) => "InternalError",
            Error::IoError { .. } => "IOError",
        }
    }

    /// The bare message without the kind prefix
    pub fn script_message(&self) -> String {
        match self {
            Error::LexerError { message, .. } | Error::ParseError { message, .. } => {
                message.clone()
            }
            Error::Bridge { message, .. } => message.clone(),
            Error::ScriptError { message } => message.clone(),
            Error::InternalError(message) => message.clone(),
            Error::IoError { source } => source.to_string(),
        }
    }
}

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, Error>;
