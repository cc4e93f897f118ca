//! Expression evaluation over the workspace
//!
//! Commands are Rhai statements run with the workspace entries as
//! variables. Functions beyond the language and the data item operators
//! come from [`Bindings`], supplied by the host.
//!
//! ## Example Commands
//!
//! Combining two traces:
//! ```rhai
//! c = a + b
//! ```
//!
//! Spectrum of a windowed signal:
//! ```rhai
//! w = window_by_time(ip, 0.1, 0.3);
//! spec = fftp(w);
//! plot(spec[0])
//! ```
//!
//! Several statements and output:
//! ```rhai
//! total = integrate(power);
//! print(total.units)
//! ```

pub mod bindings;
pub mod builtins;
mod engine;

pub use bindings::{Arity, Binding, BindingContext, BindingError, Bindings, Value, MAX_ARITY};
pub use engine::{CommandEvaluator, EvaluationReport, EvaluatorState};

use rhai::{Engine, ParseError, AST};
use std::collections::HashMap;

/// Compiled commands kept per evaluator
const CACHE_CAPACITY: usize = 256;

/// Cache of compiled commands keyed by source text
#[derive(Default)]
pub struct ScriptCache {
    cache: HashMap<String, AST>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Get a cached AST or compile and cache it
    pub fn get_or_compile(&mut self, engine: &Engine, source: &str) -> Result<AST, ParseError> {
        if let Some(ast) = self.cache.get(source) {
            return Ok(ast.clone());
        }

        let ast = engine.compile(source)?;

        if self.cache.len() >= CACHE_CAPACITY {
            self.cache.clear();
        }
        self.cache.insert(source.to_string(), ast.clone());
        Ok(ast)
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
