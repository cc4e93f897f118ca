//! In-memory source
//!
//! Holds fully materialized items keyed by variable and selector. Used for
//! data computed elsewhere and as the reference [`SourceReader`]
//! implementation. The items live in the node's configuration under
//! `"items"`, so a session file can rebuild the reader through the
//! [`ReaderFactory`](super::ReaderFactory).

use super::{ReadError, SourceConfig, SourceNode, SourceReader};
use crate::error::{Result, XpadError};
use crate::types::{DataItem, VariableDescriptor};
use std::collections::BTreeMap;

/// Configuration key holding the items
const ITEMS_KEY: &str = "items";

type ItemTable = BTreeMap<String, BTreeMap<String, DataItem>>;

/// Reader serving items from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    items: ItemTable,
}

impl MemoryReader {
    pub const KIND: &'static str = "memory";

    /// Rebuild from a node configuration. A missing `"items"` key gives an
    /// empty reader.
    pub fn from_config(config: &SourceConfig) -> std::result::Result<Self, ReadError> {
        let items = match config.get(ITEMS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ReadError::failed(format!("invalid memory source configuration: {e}"))
            })?,
            None => ItemTable::new(),
        };
        Ok(Self { items })
    }
}

impl SourceReader for MemoryReader {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// Exact selector first, then the item stored under the empty selector
    fn read(
        &mut self,
        variable: &VariableDescriptor,
        selector: &str,
    ) -> std::result::Result<DataItem, ReadError> {
        self.items
            .get(variable.name())
            .and_then(|by_selector| by_selector.get(selector).or_else(|| by_selector.get("")))
            .cloned()
            .ok_or_else(|| ReadError::NoData {
                variable: variable.name().to_string(),
                selector: selector.to_string(),
            })
    }
}

/// Builder for an in-memory [`SourceNode`]
#[derive(Debug, Default)]
pub struct MemorySourceBuilder {
    label: String,
    items: ItemTable,
    descriptors: Vec<VariableDescriptor>,
    children: Vec<SourceNode>,
}

impl MemorySourceBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Serve `item` for `variable` under `selector`. The first item added for
    /// a variable also defines its descriptor unless one is given explicitly.
    pub fn item(mut self, variable: &str, selector: &str, item: DataItem) -> Self {
        if !self.descriptors.iter().any(|d| d.name() == variable) {
            self.descriptors.push(describe(variable, &item));
        }
        self.items
            .entry(variable.to_string())
            .or_default()
            .insert(selector.to_string(), item);
        self
    }

    /// Declare or replace a variable's descriptor
    pub fn descriptor(mut self, descriptor: VariableDescriptor) -> Self {
        match self
            .descriptors
            .iter_mut()
            .find(|d| d.name() == descriptor.name())
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        self
    }

    pub fn child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn build(self) -> Result<SourceNode> {
        let items = serde_json::to_value(&self.items)
            .map_err(|e| XpadError::Persistence(format!("cannot store memory items: {e}")))?;
        let mut config = SourceConfig::new();
        config.insert(ITEMS_KEY.to_string(), items);

        let node = SourceNode::with_reader(self.label, Box::new(MemoryReader { items: self.items }))
            .with_variables(self.descriptors)
            .with_config(config);
        Ok(self.children.into_iter().fold(node, SourceNode::with_child))
    }
}

/// Descriptor derived from a sample item, coordinates stripped
fn describe(variable: &str, item: &DataItem) -> VariableDescriptor {
    let descriptor = VariableDescriptor::new(variable)
        .with_label(item.label.clone())
        .with_units(item.units.clone())
        .with_description(item.description.clone());
    item.dims.iter().fold(descriptor, |d, dim| {
        let mut dim = dim.clone();
        dim.data = None;
        d.with_dimension(dim)
    })
}
