use std::result;

use thiserror::Error;

pub type GenericResult<T> = result::Result<T, Box<dyn std::error::Error>>;
pub type KestrelResult<T> = result::Result<T, KestrelError>;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Scan error at line {line}: {message}")]
pub struct ScanError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Resolve error at line {line}: {message}")]
pub struct ResolutionError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    Type,
    UndefinedVariable,
    Arity { expected: usize, actual: usize },
    NotCallable,
    Output,
    StackOverflow,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Interpret error at line {line}: {message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: u32,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: u32, message: &str) -> RuntimeError {
        RuntimeError {
            kind,
            line,
            message: message.to_string(),
        }
    }

    pub fn type_error(line: u32, message: &str) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Type, line, message)
    }
}

/// Raised by scope lookups, which know names but not source lines.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Undefined variable ({name}).")]
pub struct UndefinedVariable {
    pub name: String,
}

impl UndefinedVariable {
    pub fn at_line(self, line: u32) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::UndefinedVariable, line, &self.to_string())
    }
}

/// Any failure produced while running a program, tagged with the stage that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KestrelError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl KestrelError {
    /// Static errors (everything raised before execution starts).
    pub fn is_static(&self) -> bool {
        !matches!(self, KestrelError::Runtime(_))
    }
}
