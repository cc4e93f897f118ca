//! Externally supplied functions callable from expressions
//!
//! A binding is a plain Rust closure over [`Value`]s. The evaluator converts
//! engine values at the boundary, so bindings never see the engine's types
//! and can be tested on their own.

use crate::analysis::AnalysisError;
use crate::plot::PlotError;
use crate::types::DataItem;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on the arity of a variadic binding
pub const MAX_ARITY: usize = 8;

/// A value crossing the binding boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Number(f64),
    Text(String),
    Item(DataItem),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "nothing",
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Item(_) => "data item",
            Value::List(_) => "list",
        }
    }

    /// The data item of argument `index` of `function`
    pub fn expect_item(&self, function: &str, index: usize) -> Result<&DataItem, BindingError> {
        match self {
            Value::Item(item) => Ok(item),
            other => Err(BindingError::Argument {
                function: function.to_string(),
                index,
                expected: "data item",
                got: other.type_name(),
            }),
        }
    }

    /// The number of argument `index` of `function`
    pub fn expect_number(&self, function: &str, index: usize) -> Result<f64, BindingError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(BindingError::Argument {
                function: function.to_string(),
                index,
                expected: "number",
                got: other.type_name(),
            }),
        }
    }
}

impl From<DataItem> for Value {
    fn from(item: DataItem) -> Self {
        Value::Item(item)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Number of arguments a binding accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Inclusive range
    Range(usize, usize),
}

impl Arity {
    pub fn min(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::Range(n, _) => n,
        }
    }

    pub fn max(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::Range(_, n) => n,
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        (self.min()..=self.max()).contains(&count)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

/// Failure inside a binding, reported as an evaluation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("{function}() takes {expected} argument(s) but {given} were given")]
    Arity {
        function: String,
        expected: Arity,
        given: usize,
    },

    #[error("{function}() argument {index}: expected {expected}, got {got}")]
    Argument {
        function: String,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("{0}")]
    Failed(String),
}

impl BindingError {
    /// Whether the caller passed the wrong number or kind of arguments
    pub fn is_usage_error(&self) -> bool {
        matches!(self, BindingError::Arity { .. } | BindingError::Argument { .. })
    }
}

/// Per-call context handed to a binding
#[derive(Debug, Default)]
pub struct BindingContext {
    output: String,
}

impl BindingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line to the evaluation's captured output
    pub fn println(&mut self, line: impl AsRef<str>) {
        self.output.push_str(line.as_ref());
        self.output.push('\n');
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

/// Callable behind a binding
pub type BindingFn =
    Arc<dyn Fn(&mut BindingContext, Vec<Value>) -> Result<Value, BindingError> + Send + Sync>;

#[derive(Clone)]
pub struct Binding {
    pub arity: Arity,
    pub func: BindingFn,
}

impl Binding {
    pub fn new<F>(arity: Arity, func: F) -> Self
    where
        F: Fn(&mut BindingContext, Vec<Value>) -> Result<Value, BindingError> + Send + Sync + 'static,
    {
        Self {
            arity,
            func: Arc::new(func),
        }
    }

    /// Check the arity and run
    pub fn call(
        &self,
        name: &str,
        ctx: &mut BindingContext,
        args: Vec<Value>,
    ) -> Result<Value, BindingError> {
        if !self.arity.accepts(args.len()) {
            return Err(BindingError::Arity {
                function: name.to_string(),
                expected: self.arity,
                given: args.len(),
            });
        }
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("arity", &self.arity).finish()
    }
}

/// The full set of bindings, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: BTreeMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a binding
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) -> &mut Self {
        self.map.insert(name.into(), binding);
        self
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.insert(name, binding);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> + '_ {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(Arity::Range(1, 3).accepts(3));
        assert!(!Arity::Range(1, 3).accepts(0));
        assert_eq!(Arity::Range(1, 3).to_string(), "1 to 3");
    }

    #[test]
    fn test_call_checks_arity() {
        let double = Binding::new(Arity::Exact(1), |_, args| {
            Ok(Value::Number(args[0].expect_number("double", 0)? * 2.0))
        });
        let mut ctx = BindingContext::new();
        assert_eq!(
            double.call("double", &mut ctx, vec![Value::Number(2.0)]),
            Ok(Value::Number(4.0))
        );
        let err = double.call("double", &mut ctx, vec![]).unwrap_err();
        assert_eq!(err.to_string(), "double() takes 1 argument(s) but 0 were given");
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_argument_type_error() {
        let err = Value::Text("x".into()).expect_item("fftp", 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "fftp() argument 0: expected data item, got string"
        );
    }

    #[test]
    fn test_context_collects_lines() {
        let mut ctx = BindingContext::new();
        ctx.println("first");
        ctx.println("second");
        assert_eq!(ctx.into_output(), "first\nsecond\n");
    }

    #[test]
    fn test_bindings_replace() {
        let mut bindings = Bindings::new();
        bindings.insert("f", Binding::new(Arity::Exact(0), |_, _| Ok(Value::Unit)));
        bindings.insert("f", Binding::new(Arity::Exact(1), |_, _| Ok(Value::Unit)));
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get("f").map(|b| b.arity), Some(Arity::Exact(1)));
    }
}
