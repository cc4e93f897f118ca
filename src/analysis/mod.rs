//! Compute functions on data items
//!
//! This module provides the numeric operations behind the expression
//! language and the standard bindings:
//! - Element-wise arithmetic and maths functions with metadata propagation
//! - Cumulative integration and time windowing along the time axis
//! - FFT amplitude/phase spectra, single-shot and sliding-window

pub mod arith;
pub mod calculus;
pub mod fft;

pub use arith::{binary, unary, BinaryOp, Operand, UnaryOp};
pub use calculus::{integrate, window_by_time};
pub use fft::{rfftfreq, unwrap_phase, FftAnalyzer, Spectrum};

use thiserror::Error;

/// Failure of a compute function on its input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Operands whose shapes cannot be combined
    #[error("operands could not be broadcast together with shapes {0} {1}")]
    Shape(String, String),

    #[error("{0} can only operate on 1D traces currently")]
    NotOneDimensional(&'static str),

    #[error("'{0}' has no time coordinate")]
    NoTime(String),

    #[error("cannot apply {0} to a tuple of items")]
    Tuple(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// numpy-style shape text, e.g. `(3,)` or `(2, 4)`
pub(crate) fn shape_text(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// `"PREFIX( text )"`, or empty when `text` is empty
pub(crate) fn wrap_label(prefix: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{prefix}( {text} )")
    }
}
