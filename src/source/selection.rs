//! Batch reads over a user selection
//!
//! A read request is the product of the selected (variable, source) pairs
//! and a list of selectors. Each combination is read independently: a
//! failure is recorded and the batch moves on. A progress hook sees every
//! attempt and may stop the batch early.

use super::{ReadError, SourceId, SourceRegistry};
use crate::config::ReadConfig;
use crate::types::DataItem;
use std::ops::ControlFlow;

/// One selected variable of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub variable: String,
    pub source: SourceId,
}

impl Selection {
    pub fn new(variable: impl Into<String>, source: SourceId) -> Self {
        Self {
            variable: variable.into(),
            source,
        }
    }
}

/// A successfully read item, tagged with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedItem {
    pub variable: String,
    pub selector: String,
    pub source: SourceId,
    pub item: DataItem,
}

/// A read that failed, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFailure {
    pub variable: String,
    pub selector: String,
    pub source: SourceId,
    pub error: ReadError,
}

/// State passed to the progress hook after each attempt
#[derive(Debug)]
pub struct ReadProgress<'a> {
    /// 0-based position of this attempt
    pub index: usize,
    pub total: usize,
    pub variable: &'a str,
    pub selector: &'a str,
    /// `None` on success
    pub error: Option<&'a ReadError>,
}

/// Everything one `read_selection` call produced
#[derive(Debug, Default)]
pub struct ReadBatch {
    pub items: Vec<TaggedItem>,
    pub failures: Vec<ReadFailure>,
    /// The progress hook stopped the batch before every attempt was made
    pub cancelled: bool,
}

impl ReadBatch {
    pub fn attempts(&self) -> usize {
        self.items.len() + self.failures.len()
    }
}

/// Read every selection under every selector.
///
/// Selectors form the outer loop, so results for one selector stay together.
/// An empty selector list reads each selection once with the configured
/// default selector.
pub fn read_selection<F>(
    registry: &mut SourceRegistry,
    selections: &[Selection],
    selectors: &[String],
    reads: &ReadConfig,
    mut progress: F,
) -> ReadBatch
where
    F: FnMut(&ReadProgress<'_>) -> ControlFlow<()>,
{
    let selectors = reads.selectors_or_default(selectors);
    let total = selectors.len() * selections.len();
    let mut batch = ReadBatch::default();

    let attempts = selectors
        .iter()
        .flat_map(|selector| selections.iter().map(move |s| (selector, s)));

    for (index, (selector, selection)) in attempts.enumerate() {
        let result = registry.read(selection.source, &selection.variable, selector);

        let flow = match &result {
            Ok(_) => progress(&ReadProgress {
                index,
                total,
                variable: &selection.variable,
                selector,
                error: None,
            }),
            Err(error) => {
                tracing::warn!(
                    "Could not read {} ({:?}) from {}: {}",
                    selection.variable,
                    selector,
                    selection.source,
                    error
                );
                progress(&ReadProgress {
                    index,
                    total,
                    variable: &selection.variable,
                    selector,
                    error: Some(error),
                })
            }
        };

        match result {
            Ok(item) => batch.items.push(TaggedItem {
                variable: selection.variable.clone(),
                selector: selector.clone(),
                source: selection.source,
                item,
            }),
            Err(error) => batch.failures.push(ReadFailure {
                variable: selection.variable.clone(),
                selector: selector.clone(),
                source: selection.source,
                error,
            }),
        }

        if flow.is_break() {
            batch.cancelled = index + 1 < total;
            break;
        }
    }

    tracing::info!(
        "Read {} items, {} failures{}",
        batch.items.len(),
        batch.failures.len(),
        if batch.cancelled { " (cancelled)" } else { "" }
    );
    batch
}
