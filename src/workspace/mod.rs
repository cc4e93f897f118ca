//! The workspace: uniquely named data items shared by the display layer and
//! the command evaluator.
//!
//! Every key satisfies the identifier rule in [`naming`], no two keys are
//! equal, and insertion order is display order. The display layer reads the
//! workspace and mutates it only through these methods; the evaluator gets
//! it by `&mut` for the duration of one evaluation.
//!
//! # Example
//!
//! ```
//! use xpad_rs::{DataItem, Workspace};
//!
//! let mut ws = Workspace::new();
//! let first = ws.insert_unique("ip", DataItem::series("ip", vec![1.0]));
//! let second = ws.insert_unique("ip", DataItem::series("ip", vec![2.0]));
//! assert_eq!((first.as_str(), second.as_str()), ("ip", "ip_1"));
//! ```

pub mod naming;

use crate::error::{Result, XpadError};
use crate::source::ReadBatch;
use crate::types::DataItem;
use std::collections::HashMap;

pub use naming::{is_reserved, is_valid_name, sanitize};

/// Mapping from identifier-safe names to data items, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    order: Vec<String>,
    items: HashMap<String, DataItem>,
    revision: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform `candidate` into a valid name not yet used in the workspace.
    ///
    /// Deterministic for a given workspace state; applying it to its own
    /// output (before inserting) returns the output unchanged.
    pub fn make_unique(&self, candidate: &str) -> String {
        naming::unique_name(candidate, |name| self.contains(name), self.len())
    }

    /// The first name of `a, b, …, z, aa, …` that is not a key yet
    pub fn generate_name(&self) -> String {
        naming::first_free_generated(|name| self.contains(name), self.len())
    }

    /// Set or overwrite an entry. Fails if `name` is not a valid identifier.
    pub fn insert(&mut self, name: &str, item: DataItem) -> Result<()> {
        if !is_valid_name(name) {
            return Err(XpadError::InvalidName(name.to_string()));
        }
        if self.items.insert(name.to_string(), item).is_none() {
            self.order.push(name.to_string());
        }
        self.bump();
        tracing::debug!("Workspace: set {}", name);
        Ok(())
    }

    /// Insert under `make_unique(candidate)` and return the chosen name
    pub fn insert_unique(&mut self, candidate: &str, item: DataItem) -> String {
        let name = self.make_unique(candidate);
        self.order.push(name.clone());
        self.items.insert(name.clone(), item);
        self.bump();
        tracing::debug!("Workspace: added {} (from {:?})", name, candidate);
        name
    }

    /// Insert every item a read batch produced, named after its variable
    pub fn insert_batch(&mut self, batch: ReadBatch) -> Vec<String> {
        batch
            .items
            .into_iter()
            .map(|tagged| self.insert_unique(&tagged.variable, tagged.item))
            .collect()
    }

    /// Move an entry to a new name and return the name actually used.
    ///
    /// `new_name` goes through the same sanitizing and de-duplication as
    /// [`make_unique`](Self::make_unique), with the old key counted as free.
    /// The entry keeps its display position, and the old key disappears in
    /// the same step the new one appears. Renaming to a name that sanitizes
    /// to the current one is a no-op.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<String> {
        if !self.contains(old_name) {
            return Err(XpadError::NotFound(format!("workspace entry {old_name:?}")));
        }

        let target = naming::unique_name(
            new_name,
            |name| name != old_name && self.contains(name),
            self.len(),
        );
        if target == old_name {
            return Ok(target);
        }

        let item = self
            .items
            .remove(old_name)
            .ok_or_else(|| XpadError::NotFound(format!("workspace entry {old_name:?}")))?;
        self.items.insert(target.clone(), item);
        if let Some(slot) = self.order.iter_mut().find(|n| n.as_str() == old_name) {
            *slot = target.clone();
        }
        self.bump();
        tracing::debug!("Workspace: renamed {} -> {}", old_name, target);
        Ok(target)
    }

    /// Remove an entry, returning its item
    pub fn remove(&mut self, name: &str) -> Option<DataItem> {
        let item = self.items.remove(name)?;
        self.order.retain(|n| n != name);
        self.bump();
        tracing::debug!("Workspace: removed {}", name);
        Some(item)
    }

    pub fn get(&self, name: &str) -> Option<&DataItem> {
        self.items.get(name)
    }

    /// Mutable access for in-place edits such as comments
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataItem> {
        let item = self.items.get_mut(name)?;
        self.revision += 1;
        Some(item)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataItem)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.items.get(name).map(|item| (name.as_str(), item)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.items.clear();
        self.bump();
    }

    /// Counter bumped on every mutation; display caches compare against it
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
