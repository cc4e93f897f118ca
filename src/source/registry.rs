//! Ordered collection of source trees
//!
//! The registry owns every root [`SourceNode`] and keeps an index from
//! [`SourceId`] to the node's position in its tree. The index is rebuilt
//! whenever the set of nodes changes, so lookups never see a stale path.

use super::{ReadError, SourceId, SourceNode, VariableNames};
use crate::error::{Result, XpadError};
use crate::types::DataItem;
use std::collections::HashMap;

/// Owner of all sources known to a session
#[derive(Debug, Default)]
pub struct SourceRegistry {
    roots: Vec<SourceNode>,
    /// Child indices from a root position down to each node
    index: HashMap<SourceId, Vec<usize>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root source and index its tree
    pub fn add_root(&mut self, node: SourceNode) -> SourceId {
        let id = node.id();
        tracing::info!("Added source '{}' ({})", node.label(), id);
        self.roots.push(node);
        self.reindex();
        id
    }

    /// Remove a root source with its whole subtree. Returns `false` when `id`
    /// is not a root.
    pub fn remove_root(&mut self, id: SourceId) -> bool {
        self.take_root(id).is_some()
    }

    /// Remove a root source and hand it back
    pub fn take_root(&mut self, id: SourceId) -> Option<SourceNode> {
        let position = self.roots.iter().position(|n| n.id() == id)?;
        let node = self.roots.remove(position);
        self.reindex();
        tracing::info!("Removed source '{}' ({})", node.label(), id);
        Some(node)
    }

    /// Attach `child` below an existing node
    pub fn attach_child(&mut self, parent: SourceId, child: SourceNode) -> Result<SourceId> {
        let id = child.id();
        self.get_mut(parent)
            .ok_or_else(|| XpadError::NotFound(format!("source {parent}")))?
            .attach(child);
        self.reindex();
        Ok(id)
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceNode> {
        let (first, rest) = self.index.get(&id)?.split_first()?;
        rest.iter()
            .try_fold(self.roots.get(*first)?, |node, &i| node.children.get(i))
    }

    /// Mutable access to a node. Its children cannot be changed through the
    /// returned reference, which keeps the index valid.
    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut SourceNode> {
        let (first, rest) = self.index.get(&id)?.split_first()?;
        rest.iter()
            .try_fold(self.roots.get_mut(*first)?, |node, &i| node.children.get_mut(i))
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Root sources in insertion order
    pub fn roots(&self) -> &[SourceNode] {
        &self.roots
    }

    /// Number of root sources
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every node in pre-order with its depth (roots at 0)
    pub fn walk(&self) -> Vec<(usize, &SourceNode)> {
        fn visit<'a>(node: &'a SourceNode, depth: usize, out: &mut Vec<(usize, &'a SourceNode)>) {
            out.push((depth, node));
            for child in &node.children {
                visit(child, depth + 1, out);
            }
        }

        let mut out = Vec::with_capacity(self.index.len());
        for root in &self.roots {
            visit(root, 0, &mut out);
        }
        out
    }

    /// Variable names of one node matching `pattern`
    pub fn list_variables(&self, id: SourceId, pattern: Option<&str>) -> Result<VariableNames<'_>> {
        self.get(id)
            .map(|node| node.list_variables(pattern))
            .ok_or_else(|| XpadError::NotFound(format!("source {id}")))
    }

    /// Direct children of one node
    pub fn traverse_children(&self, id: SourceId) -> Result<std::slice::Iter<'_, SourceNode>> {
        self.get(id)
            .map(SourceNode::traverse_children)
            .ok_or_else(|| XpadError::NotFound(format!("source {id}")))
    }

    /// Read through the node with identity `id`
    pub fn read(
        &mut self,
        id: SourceId,
        variable: &str,
        selector: &str,
    ) -> std::result::Result<DataItem, ReadError> {
        self.get_mut(id)
            .ok_or(ReadError::UnknownSource(id))?
            .read(variable, selector)
    }

    fn reindex(&mut self) {
        fn visit(node: &SourceNode, path: &mut Vec<usize>, index: &mut HashMap<SourceId, Vec<usize>>) {
            index.insert(node.id(), path.clone());
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                visit(child, path, index);
                path.pop();
            }
        }

        self.index.clear();
        let mut path = Vec::new();
        for (i, root) in self.roots.iter().enumerate() {
            path.push(i);
            visit(root, &mut path, &mut self.index);
            path.pop();
        }
        tracing::trace!("Source index rebuilt: {} nodes", self.index.len());
    }
}
