//! Hand-written readers for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xpad_rs::source::{ReadError, SourceReader};
use xpad_rs::{DataItem, VariableDescriptor};

/// Reader that serves a constant ramp for every variable except the ones
/// listed as broken, and counts its reads
pub struct FlakyReader {
    broken: Vec<String>,
    reads: Arc<AtomicUsize>,
}

impl FlakyReader {
    pub fn new(broken: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let reader = Self {
            broken: broken.iter().map(|s| s.to_string()).collect(),
            reads: reads.clone(),
        };
        (reader, reads)
    }
}

impl SourceReader for FlakyReader {
    fn kind(&self) -> &'static str {
        "flaky"
    }

    fn read(&mut self, variable: &VariableDescriptor, selector: &str) -> Result<DataItem, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|b| b == variable.name()) {
            return Err(ReadError::failed(format!("{} is corrupt", variable.name())));
        }
        let offset = selector.parse::<f64>().unwrap_or(0.0);
        Ok(DataItem::series(variable.name(), vec![offset, offset + 1.0, offset + 2.0]))
    }
}
