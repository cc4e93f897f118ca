//! Data source trees
//!
//! Sources are heterogeneous (file-backed, directory-backed or computed); the
//! common surface is small: a label, a set of variable descriptors, optional
//! children and a read capability. Concrete formats plug in through the
//! [`SourceReader`] trait, and a [`SourceNode`] owns one reader plus the
//! opaque configuration it was built from.
//!
//! ## Tree shape
//!
//! Children are owned by their parent and can only be attached while building
//! a node ([`SourceNode::with_child`]) or through
//! [`SourceRegistry::attach_child`], so a tree can never contain a cycle.
//! A node without children is an ordinary leaf.
//!
//! ## Modules
//!
//! - [`registry`] - Ordered list of root nodes with an id index
//! - [`selection`] - Batch reads over (variable, source) × selector
//! - [`memory`] - In-memory source, also used for computed data
//! - [`factory`] - Rebuilds readers from persisted configuration

pub mod factory;
pub mod memory;
pub mod registry;
pub mod selection;

pub use factory::ReaderFactory;
pub use memory::{MemoryReader, MemorySourceBuilder};
pub use registry::SourceRegistry;
pub use selection::{read_selection, ReadBatch, ReadFailure, ReadProgress, Selection, TaggedItem};

use crate::types::{DataItem, VariableDescriptor};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Opaque per-source configuration, interpreted only by the source's reader
pub type SourceConfig = BTreeMap<String, serde_json::Value>;

/// Process-unique identity of a source node.
///
/// Two nodes with the same label and configuration are still distinct
/// sources. Ids are not persisted; a loaded session gets fresh ones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// Global counter for generating unique source IDs
static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl SourceId {
    fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure to read one item from a source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("source '{source_label}' has no variable '{variable}'")]
    UnknownVariable {
        source_label: String,
        variable: String,
    },

    #[error("source '{0}' cannot be read directly")]
    NotReadable(String),

    #[error("no data for '{variable}' with selector '{selector}'")]
    NoData { variable: String, selector: String },

    #[error("no source with id {0}")]
    UnknownSource(SourceId),

    /// Source-specific I/O or format failure
    #[error("{0}")]
    Failed(String),
}

impl ReadError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ReadError::Failed(reason.into())
    }

    /// Human-readable reason
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Format-specific read capability of a source.
///
/// Implementations must be `Send` so a registry can be handed to another
/// thread, although every call happens on one thread at a time.
#[cfg_attr(test, mockall::automock)]
pub trait SourceReader: Send {
    /// Stable identifier of the implementation, stored in session files so
    /// the [`ReaderFactory`] can rebuild the reader
    fn kind(&self) -> &'static str;

    /// Read one variable. `selector` narrows the request (e.g. a shot or
    /// run number) and may be empty.
    fn read(&mut self, variable: &VariableDescriptor, selector: &str) -> Result<DataItem, ReadError>;
}

/// A node in a tree of sources
pub struct SourceNode {
    id: SourceId,
    label: String,
    variables: Vec<VariableDescriptor>,
    children: Vec<SourceNode>,
    config: SourceConfig,
    reader: Option<Box<dyn SourceReader>>,
}

impl SourceNode {
    /// A grouping node with no read capability
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: SourceId::next(),
            label: label.into(),
            variables: Vec::new(),
            children: Vec::new(),
            config: SourceConfig::new(),
            reader: None,
        }
    }

    /// A readable node backed by `reader`
    pub fn with_reader(label: impl Into<String>, reader: Box<dyn SourceReader>) -> Self {
        Self {
            reader: Some(reader),
            ..Self::new(label)
        }
    }

    /// Add a variable; a descriptor with the same name is replaced
    pub fn with_variable(mut self, descriptor: VariableDescriptor) -> Self {
        match self
            .variables
            .iter_mut()
            .find(|v| v.name() == descriptor.name())
        {
            Some(existing) => *existing = descriptor,
            None => self.variables.push(descriptor),
        }
        self
    }

    pub fn with_variables(self, descriptors: impl IntoIterator<Item = VariableDescriptor>) -> Self {
        descriptors.into_iter().fold(self, Self::with_variable)
    }

    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_config(mut self, config: SourceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Kind of the attached reader, `None` for grouping nodes
    pub fn kind(&self) -> Option<&'static str> {
        self.reader.as_ref().map(|r| r.kind())
    }

    pub fn is_readable(&self) -> bool {
        self.reader.is_some()
    }

    /// Direct children in attachment order
    pub fn children(&self) -> &[SourceNode] {
        &self.children
    }

    /// Direct children in attachment order (empty for leaves)
    pub fn traverse_children(&self) -> std::slice::Iter<'_, SourceNode> {
        self.children.iter()
    }

    /// Names of this node's own variables matching a shell-style wildcard,
    /// case-insensitively. An empty or absent pattern matches everything.
    pub fn list_variables(&self, pattern: Option<&str>) -> VariableNames<'_> {
        VariableNames {
            inner: self.variables.iter(),
            matcher: NameMatcher::new(pattern),
        }
    }

    /// Read `variable` through this node's reader and stamp provenance on
    /// the result
    pub fn read(&mut self, variable: &str, selector: &str) -> Result<DataItem, ReadError> {
        let descriptor = self
            .variables
            .iter()
            .find(|v| v.name() == variable)
            .ok_or_else(|| ReadError::UnknownVariable {
                source_label: self.label.clone(),
                variable: variable.to_string(),
            })?;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ReadError::NotReadable(self.label.clone()))?;

        let mut item = reader.read(descriptor, selector)?;
        stamp_provenance(&mut item, descriptor, &self.label);
        tracing::debug!(
            "Read {} from '{}' (selector {:?}): {} values",
            variable,
            self.label,
            selector,
            item.value.len()
        );
        Ok(item)
    }

    fn attach(&mut self, child: SourceNode) {
        self.children.push(child);
    }
}

impl fmt::Debug for SourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind())
            .field("variables", &self.variables.len())
            .field("children", &self.children)
            .finish()
    }
}

fn stamp_provenance(item: &mut DataItem, descriptor: &VariableDescriptor, source_label: &str) {
    if item.name.is_empty() {
        item.name = descriptor.name().to_string();
    }
    if item.source.is_empty() {
        item.source = source_label.to_string();
    }
    if item.label.is_empty() {
        item.label = if descriptor.label().is_empty() {
            descriptor.name().to_string()
        } else {
            descriptor.label().to_string()
        };
    }
    if item.units.is_empty() {
        item.units = descriptor.units().to_string();
    }
    if item.description.is_empty() {
        item.description = descriptor.description().to_string();
    }
    if item.dims.is_empty() {
        item.dims = descriptor.dims().to_vec();
    }
}

/// `glob` only accepts `**` as a whole path component; names have no
/// components, so any run of stars means the same as one.
fn collapse_stars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if !(c == '*' && out.ends_with('*')) {
            out.push(c);
        }
    }
    out
}

#[derive(Clone)]
enum NameMatcher {
    All,
    Glob(Pattern),
    Literal(String),
}

impl NameMatcher {
    fn new(pattern: Option<&str>) -> Self {
        match pattern.map(str::to_lowercase) {
            None => NameMatcher::All,
            Some(p) if p.is_empty() => NameMatcher::All,
            Some(p) => match Pattern::new(&collapse_stars(&p)) {
                Ok(glob) => NameMatcher::Glob(glob),
                Err(_) => NameMatcher::Literal(p),
            },
        }
    }

    fn matches(&self, name: &str) -> bool {
        const OPTIONS: MatchOptions = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        match self {
            NameMatcher::All => true,
            NameMatcher::Glob(glob) => glob.matches_with(&name.to_lowercase(), OPTIONS),
            NameMatcher::Literal(literal) => name.to_lowercase() == *literal,
        }
    }
}

/// Lazy sequence of a node's variable names. Clone it to restart.
#[derive(Clone)]
pub struct VariableNames<'a> {
    inner: std::slice::Iter<'a, VariableDescriptor>,
    matcher: NameMatcher,
}

impl<'a> Iterator for VariableNames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let matcher = &self.matcher;
        self.inner
            .by_ref()
            .map(VariableDescriptor::name)
            .find(|name| matcher.matches(name))
    }
}
