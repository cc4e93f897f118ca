//! # xpad-rs: data-source browser core with an expression workspace
//!
//! Hierarchical data sources expose named variables. Reads materialize
//! [`DataItem`]s into a flat [`Workspace`] under unique identifier names,
//! where a sandboxed [`CommandEvaluator`] combines them with element-wise
//! arithmetic and host-supplied bindings (plotting, FFT, integration).
//!
//! ## Architecture
//!
//! - **Sources**: [`SourceNode`] trees held by a [`SourceRegistry`]; concrete
//!   formats plug in through [`SourceReader`]
//! - **Selection**: [`read_selection`] reads variables × selectors into a
//!   [`ReadBatch`] with per-item failures
//! - **Workspace**: ordered name → item map with identifier-safe naming
//! - **Scripting**: Rhai engine with data item operators and [`Bindings`]
//! - **Session**: JSON save/restore of sources and workspace
//!
//! ## Configuration
//!
//! Evaluator limits and plot settings are read from `config.toml` in the
//! platform config directory under `io.github.xpad-rs`:
//!
//! - **Linux**: `~/.config/io.github.xpad-rs/`
//! - **macOS**: `~/Library/Application Support/io.github.xpad-rs/`
//! - **Windows**: `%APPDATA%\io.github.xpad-rs\`
//!
//! ## Example
//!
//! ```
//! use xpad_rs::{
//!     read_selection, CommandEvaluator, DataItem, MemorySourceBuilder, Selection,
//!     SourceRegistry, Workspace, XpadConfig,
//! };
//! use std::ops::ControlFlow;
//!
//! let node = MemorySourceBuilder::new("shot 1")
//!     .item("a", "", DataItem::series("a", vec![1.0, 2.0, 3.0]))
//!     .item("b", "", DataItem::series("b", vec![10.0, 20.0, 30.0]))
//!     .build()
//!     .unwrap();
//! let mut registry = SourceRegistry::new();
//! let id = registry.add_root(node);
//!
//! let batch = read_selection(
//!     &mut registry,
//!     &[Selection::new("a", id), Selection::new("b", id)],
//!     &[],
//!     &XpadConfig::default().reads,
//!     |_| ControlFlow::Continue(()),
//! );
//! let mut workspace = Workspace::new();
//! workspace.insert_batch(batch);
//!
//! let mut evaluator = CommandEvaluator::default();
//! let report = evaluator.evaluate(&mut workspace, "c = a + b");
//! assert!(report.is_ok());
//! assert_eq!(workspace.get("c").unwrap().values(), Some(&[11.0, 22.0, 33.0][..]));
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod plot;
pub mod scripting;
pub mod session;
pub mod source;
pub mod types;
pub mod workspace;

// Re-export commonly used types
pub use config::{ReadConfig, XpadConfig};
pub use error::{EvaluationError, EvaluationErrorKind, Result, ResultExt, XpadError};
pub use scripting::{Bindings, CommandEvaluator, EvaluationReport, EvaluatorState};
pub use session::{load_session_into, save_session, SessionFile};
pub use source::{
    read_selection, MemorySourceBuilder, ReadBatch, ReadError, ReaderFactory, Selection,
    SourceId, SourceNode, SourceReader, SourceRegistry,
};
pub use types::{DataItem, DataValue, Dimension, VariableDescriptor};
pub use workspace::Workspace;
