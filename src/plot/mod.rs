//! Plotting backend contract and figure preparation
//!
//! Rendering is done by an external backend. This module turns data items
//! into backend-neutral [`Figure`]s, applying the checks and down-sampling
//! every backend needs, and defines the [`PlotBackend`] trait the standard
//! bindings draw through.

use crate::config::PlotConfig;
use crate::types::{DataItem, DataValue};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    #[error("Cannot plot '{0}' as it has too many dimensions")]
    TooManyDimensions(String),

    #[error("Data must be 2 dimensional")]
    NotTwoDimensional,

    #[error("'{label}' has {x} x values for {y} y values")]
    LengthMismatch { label: String, x: usize, y: usize },

    #[error("nothing to plot")]
    Empty,

    #[error("plot backend failed: {0}")]
    Backend(String),
}

/// One line in a panel
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// One set of axes; panels of a figure share the x axis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Panel {
    pub traces: Vec<Trace>,
    pub xlabel: String,
    pub ylabel: String,
    /// Over-plotted groups show a legend
    pub legend: bool,
}

/// A backend-neutral figure
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    /// Stacked panels sharing the x axis
    Lines { panels: Vec<Panel> },
    /// One quantity against another
    Xy {
        x: Vec<f64>,
        y: Vec<f64>,
        xlabel: String,
        ylabel: String,
    },
    /// Contour plot of a row-major 2-D array
    Contour {
        filled: bool,
        title: String,
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
}

/// Renders prepared figures
pub trait PlotBackend: Send {
    fn show(&mut self, figure: Figure) -> Result<(), PlotError>;
}

/// Backend handle shared between the bindings that draw through it
pub type SharedPlotBackend = Arc<Mutex<dyn PlotBackend>>;

/// One argument of `plot`: an item in its own panel, or several over-plotted
#[derive(Debug, Clone, PartialEq)]
pub enum PlotGroup {
    Single(DataItem),
    Overlay(Vec<DataItem>),
}

/// A prepared figure plus the notices produced while preparing it
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub figure: Figure,
    pub warnings: Vec<String>,
}

/// Lay out `plot(g1, g2, …)`: one panel per group, top to bottom.
///
/// A tuple item is over-plotted like a group of its members.
pub fn prepare_lines(groups: &[PlotGroup], config: &PlotConfig) -> Result<Prepared, PlotError> {
    if groups.is_empty() {
        return Err(PlotError::Empty);
    }

    let mut warnings = Vec::new();
    let mut panels = Vec::with_capacity(groups.len());
    for group in groups {
        let panel = match group {
            PlotGroup::Single(item) => match &item.value {
                DataValue::Tuple(members) => overlay_panel(members, config, &mut warnings)?,
                _ => {
                    let mut panel = Panel {
                        traces: item_traces(item, config, &mut warnings)?,
                        xlabel: xlabel(item),
                        ylabel: ylabel(item),
                        legend: false,
                    };
                    panel.legend = panel.traces.len() > 1;
                    panel
                }
            },
            PlotGroup::Overlay(items) => overlay_panel(items, config, &mut warnings)?,
        };
        panels.push(panel);
    }

    Ok(Prepared {
        figure: Figure::Lines { panels },
        warnings,
    })
}

/// Lay out `plotxy(x, y)`, axis titles from the item names
pub fn prepare_xy(x: &DataItem, y: &DataItem) -> Result<Figure, PlotError> {
    let (xs, ys) = match (x.values(), y.values()) {
        (Some(xs), Some(ys)) => (xs, ys),
        (None, _) => return Err(PlotError::TooManyDimensions(x.display_label().to_string())),
        (_, None) => return Err(PlotError::TooManyDimensions(y.display_label().to_string())),
    };
    if xs.len() != ys.len() {
        return Err(PlotError::LengthMismatch {
            label: y.display_label().to_string(),
            x: xs.len(),
            y: ys.len(),
        });
    }
    Ok(Figure::Xy {
        x: xs.to_vec(),
        y: ys.to_vec(),
        xlabel: x.name.clone(),
        ylabel: y.name.clone(),
    })
}

/// Lay out `contour(z)` / `contourf(z)`; `z` must be 2-D
pub fn prepare_contour(z: &DataItem, filled: bool) -> Result<Figure, PlotError> {
    match &z.value {
        DataValue::Grid { shape, values } if shape.len() == 2 => Ok(Figure::Contour {
            filled,
            title: z.display_label().to_string(),
            rows: shape[0],
            cols: shape[1],
            values: values.clone(),
        }),
        _ => Err(PlotError::NotTwoDimensional),
    }
}

fn overlay_panel(
    items: &[DataItem],
    config: &PlotConfig,
    warnings: &mut Vec<String>,
) -> Result<Panel, PlotError> {
    let mut traces = Vec::new();
    for item in items {
        traces.extend(item_traces(item, config, warnings)?);
    }
    Ok(Panel {
        traces,
        xlabel: items.first().map(xlabel).unwrap_or_default(),
        ylabel: String::new(),
        legend: true,
    })
}

/// Legend entry: description or label, then the source
fn legend_label(item: &DataItem) -> String {
    let base = if item.description.is_empty() {
        item.display_label()
    } else {
        item.description.as_str()
    };
    if item.source.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, item.source)
    }
}

fn ylabel(item: &DataItem) -> String {
    if !item.description.is_empty() {
        return item.description.clone();
    }
    if item.units.is_empty() {
        item.display_label().to_string()
    } else {
        format!("{} ({})", item.display_label(), item.units)
    }
}

fn xlabel(item: &DataItem) -> String {
    item.time_dim()
        .map(|d| d.display_label().to_string())
        .unwrap_or_default()
}

/// x coordinates: the time axis, or the single axis of a 1-D item, or the
/// sample index when no coordinates are known
fn abscissa(item: &DataItem, len: usize) -> Vec<f64> {
    item.time()
        .or_else(|| match item.dims.as_slice() {
            [only] => only.data.as_deref(),
            _ => None,
        })
        .map(<[f64]>::to_vec)
        .unwrap_or_else(|| (0..len).map(|i| i as f64).collect())
}

fn item_traces(
    item: &DataItem,
    config: &PlotConfig,
    warnings: &mut Vec<String>,
) -> Result<Vec<Trace>, PlotError> {
    let label = legend_label(item);
    match &item.value {
        DataValue::Scalar(v) => Ok(vec![Trace {
            label,
            x: vec![0.0],
            y: vec![*v],
        }]),
        DataValue::Series(values) => {
            let x = abscissa(item, values.len());
            Ok(vec![trace(label, x, values.clone(), config, warnings)?])
        }
        // A 2-D array with time along the first axis is one trace per column
        DataValue::Grid { shape, values } if shape.len() == 2 && item.order == 0 => {
            let time = item
                .time()
                .ok_or_else(|| PlotError::TooManyDimensions(item.display_label().to_string()))?;
            let (rows, cols) = (shape[0], shape[1]);
            if rows.checked_mul(cols) != Some(values.len()) {
                return Err(PlotError::LengthMismatch {
                    label,
                    x: rows.saturating_mul(cols),
                    y: values.len(),
                });
            }
            (0..cols)
                .map(|j| {
                    let column = (0..rows).map(|i| values[i * cols + j]).collect();
                    trace(format!("{label} [{j}]"), time.to_vec(), column, config, warnings)
                })
                .collect()
        }
        DataValue::Grid { .. } => Err(PlotError::TooManyDimensions(item.display_label().to_string())),
        DataValue::Tuple(members) => {
            let mut traces = Vec::new();
            for member in members {
                traces.extend(item_traces(member, config, warnings)?);
            }
            Ok(traces)
        }
    }
}

fn trace(
    label: String,
    x: Vec<f64>,
    y: Vec<f64>,
    config: &PlotConfig,
    warnings: &mut Vec<String>,
) -> Result<Trace, PlotError> {
    if x.len() != y.len() {
        return Err(PlotError::LengthMismatch {
            label,
            x: x.len(),
            y: y.len(),
        });
    }
    let size = y.len();
    if config.max_points == 0 || size <= config.max_points {
        return Ok(Trace { label, x, y });
    }

    let stride = size.div_ceil(config.max_points);
    let x: Vec<f64> = x.into_iter().step_by(stride).collect();
    let y: Vec<f64> = y.into_iter().step_by(stride).collect();
    let warning = format!(
        "Warning: too many samples ({size}). Down-sampling to {} points",
        y.len()
    );
    tracing::warn!("{} for '{}'", warning, label);
    warnings.push(warning);
    Ok(Trace { label, x, y })
}

/// Headless backend that keeps every figure it is shown
#[derive(Debug, Default)]
pub struct RecordingPlotter {
    figures: Vec<Figure>,
}

impl RecordingPlotter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    /// The most recent figure
    pub fn last(&self) -> Option<&Figure> {
        self.figures.last()
    }

    pub fn take(&mut self) -> Vec<Figure> {
        std::mem::take(&mut self.figures)
    }
}

impl PlotBackend for RecordingPlotter {
    fn show(&mut self, figure: Figure) -> Result<(), PlotError> {
        self.figures.push(figure);
        Ok(())
    }
}

/// Backend that only logs a summary of each figure
#[derive(Debug, Default)]
pub struct LogPlotter;

impl PlotBackend for LogPlotter {
    fn show(&mut self, figure: Figure) -> Result<(), PlotError> {
        match &figure {
            Figure::Lines { panels } => tracing::info!(
                "plot: {} panel(s), {} trace(s)",
                panels.len(),
                panels.iter().map(|p| p.traces.len()).sum::<usize>()
            ),
            Figure::Xy { x, xlabel, ylabel, .. } => {
                tracing::info!("plotxy: {} vs {} ({} points)", ylabel, xlabel, x.len())
            }
            Figure::Contour {
                filled, title, rows, cols, ..
            } => tracing::info!(
                "{}: {} ({}x{})",
                if *filled { "contourf" } else { "contour" },
                title,
                rows,
                cols
            ),
        }
        Ok(())
    }
}
