//! Reader construction by kind
//!
//! Session files store a source's reader kind and configuration, never the
//! reader itself. A [`ReaderFactory`] maps each kind to a constructor so a
//! loaded session can be made readable again.

use super::{MemoryReader, ReadError, SourceConfig, SourceReader};
use crate::error::{Result, XpadError};
use std::collections::HashMap;

/// Builds a reader from its persisted configuration
pub type ReaderConstructor =
    Box<dyn Fn(&SourceConfig) -> std::result::Result<Box<dyn SourceReader>, ReadError> + Send + Sync>;

/// Registry of reader constructors keyed by [`SourceReader::kind`]
pub struct ReaderFactory {
    constructors: HashMap<String, ReaderConstructor>,
}

impl ReaderFactory {
    /// A factory that knows no kinds
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A factory with the readers shipped in this crate
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(MemoryReader::KIND, |config| {
            Ok(Box::new(MemoryReader::from_config(config)?) as Box<dyn SourceReader>)
        });
        factory
    }

    /// Register or replace the constructor for `kind`
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&SourceConfig) -> std::result::Result<Box<dyn SourceReader>, ReadError>
            + Send
            + Sync
            + 'static,
    {
        let kind = kind.into();
        tracing::debug!("Registered reader kind '{}'", kind);
        self.constructors.insert(kind, Box::new(constructor));
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn build(&self, kind: &str, config: &SourceConfig) -> Result<Box<dyn SourceReader>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| XpadError::UnknownSourceKind(kind.to_string()))?;
        constructor(config).map_err(|e| {
            XpadError::Read(e).with_context(format!("Failed to build '{kind}' reader"))
        })
    }
}

impl Default for ReaderFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}
