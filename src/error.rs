//! Error handling for xpad-rs
//!
//! This module defines the top-level error type, a Result alias used across
//! the crate, and the structured evaluation error reported by the command
//! evaluator. Component errors that stay local to one concern
//! ([`ReadError`](crate::source::ReadError),
//! [`AnalysisError`](crate::analysis::AnalysisError),
//! [`PlotError`](crate::plot::PlotError)) live next to their component and
//! convert into [`XpadError`] where they cross a module boundary.

use crate::source::ReadError;
use thiserror::Error;

/// Main error type for xpad-rs operations
#[derive(Error, Debug)]
pub enum XpadError {
    /// A source read failed for one item
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// An expression failed to evaluate
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// A workspace entry or source node does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A name that does not satisfy the identifier rule was used as a key
    #[error("Invalid workspace name: {0:?}")]
    InvalidName(String),

    /// Saving or loading a session failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A persisted source refers to a reader kind nobody registered
    #[error("Unknown source kind: {0}")]
    UnknownSourceKind(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<XpadError>,
    },
}

impl XpadError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        XpadError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for xpad-rs operations
pub type Result<T> = std::result::Result<T, XpadError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

/// Classification of an expression failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    /// Reference to a name that is neither a workspace entry nor a binding
    Name,
    /// The expression text could not be parsed
    Syntax,
    /// An operation was applied to values of the wrong type or shape
    Type,
    /// Division by zero, overflow and similar
    Arithmetic,
    /// An injected function failed, or the expression threw
    Runtime,
    /// A sandbox limit (operations, depth, sizes) was exceeded
    Limit,
}

impl std::fmt::Display for EvaluationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationErrorKind::Name => write!(f, "NameError"),
            EvaluationErrorKind::Syntax => write!(f, "SyntaxError"),
            EvaluationErrorKind::Type => write!(f, "TypeError"),
            EvaluationErrorKind::Arithmetic => write!(f, "ArithmeticError"),
            EvaluationErrorKind::Runtime => write!(f, "RuntimeError"),
            EvaluationErrorKind::Limit => write!(f, "LimitError"),
        }
    }
}

/// Structured failure of one `evaluate` call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct EvaluationError {
    pub kind: EvaluationErrorKind,
    pub message: String,
    /// 1-based line of the failure, when the engine knows it
    pub line: Option<usize>,
    /// 1-based column of the failure, when the engine knows it
    pub column: Option<usize>,
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Attach a source position
    pub fn at(mut self, line: Option<usize>, column: Option<usize>) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn is_name_error(&self) -> bool {
        self.kind == EvaluationErrorKind::Name
    }
}
