//! xpad console - Main Entry Point
//!
//! Evaluates workspace expressions read line by line from stdin.
//!
//! ```text
//! xpad [SESSION]
//! ```
//!
//! Console commands: `:ls` lists workspace entries, `:sources` prints the
//! source tree, `:read VARIABLE [SELECTOR...]` reads a variable from every
//! source that lists it, `:save PATH` saves the session, `:quit` exits.

use anyhow::Context;
use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xpad_rs::{
    load_session_into, plot::LogPlotter, plot::SharedPlotBackend, read_selection, save_session,
    scripting::builtins, CommandEvaluator, ReaderFactory, Selection, SourceRegistry, Workspace,
    XpadConfig,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,xpad_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = XpadConfig::load_or_default();
    let factory = ReaderFactory::with_builtins();
    let mut registry = SourceRegistry::new();
    let mut workspace = Workspace::new();

    if let Some(path) = std::env::args().nth(1) {
        load_session_into(&path, &factory, &mut registry, &mut workspace)
            .with_context(|| format!("Failed to open session {path}"))?;
    }

    let plotter: SharedPlotBackend = Arc::new(Mutex::new(LogPlotter));
    let mut evaluator = CommandEvaluator::with_bindings(
        config.evaluator.clone(),
        builtins::standard(plotter, &config.plot),
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(char::is_whitespace).unwrap_or((line, "")) {
            (":quit", _) => break,
            (":ls", _) => {
                for (name, item) in workspace.iter() {
                    writeln!(stdout, "{name}\t{}", item.display_label())?;
                }
            }
            (":sources", _) => {
                for (depth, node) in registry.walk() {
                    let names: Vec<_> = node.list_variables(None).collect();
                    writeln!(
                        stdout,
                        "{}{} [{}]",
                        "  ".repeat(depth),
                        node.label(),
                        names.join(", ")
                    )?;
                }
            }
            (":read", args) if !args.trim().is_empty() => {
                let mut words = args.split_whitespace();
                let variable = words.next().unwrap_or_default();
                let selectors: Vec<String> = words.map(str::to_string).collect();
                let selections: Vec<_> = registry
                    .walk()
                    .into_iter()
                    .filter(|(_, node)| node.variable(variable).is_some())
                    .map(|(_, node)| Selection::new(variable, node.id()))
                    .collect();

                let batch = read_selection(
                    &mut registry,
                    &selections,
                    &selectors,
                    &config.reads,
                    |_| ControlFlow::Continue(()),
                );
                for failure in &batch.failures {
                    writeln!(stdout, "{}: {}", failure.variable, failure.error)?;
                }
                let names = workspace.insert_batch(batch);
                writeln!(stdout, "{}", names.join(" "))?;
            }
            (":save", path) if !path.trim().is_empty() => {
                if let Err(e) = save_session(path.trim(), &registry, &workspace) {
                    writeln!(stdout, "{e}")?;
                }
            }
            _ => {
                let report = evaluator.evaluate(&mut workspace, line);
                write!(stdout, "{}", report.output)?;
                if let Some(e) = report.error() {
                    writeln!(stdout, "{e}")?;
                }
            }
        }
        stdout.flush()?;
    }

    Ok(())
}
