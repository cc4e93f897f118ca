//! Standard plot and compute bindings
//!
//! | Name | Arguments | Result |
//! |---|---|---|
//! | `plot` | 1 to 8 items or lists of items | draws stacked panels |
//! | `plotxy` | x, y | draws y against x |
//! | `contour`, `contourf` | 2-D item | draws a contour plot |
//! | `integrate` | item | cumulative integral |
//! | `fftp` | item | `[amplitude, phase]` |
//! | `sldfft` | item, stride, width | `[amplitude, phase]` over windows |
//! | `window_by_time` | item, tmin, tmax | samples inside the window |

use super::bindings::{Arity, Binding, BindingError, Bindings, Value, MAX_ARITY};
use crate::analysis::{self, FftAnalyzer};
use crate::config::PlotConfig;
use crate::plot::{self, Figure, PlotError, PlotGroup, SharedPlotBackend};
use std::sync::{Arc, Mutex};

/// Bindings drawing through `plotter`
pub fn standard(plotter: SharedPlotBackend, config: &PlotConfig) -> Bindings {
    let fft = Arc::new(Mutex::new(FftAnalyzer::new()));
    let mut bindings = Bindings::new();

    {
        let plotter = plotter.clone();
        let config = config.clone();
        bindings.insert(
            "plot",
            Binding::new(Arity::Range(1, MAX_ARITY), move |ctx, args| {
                let groups = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, arg)| plot_group("plot", i, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let prepared = plot::prepare_lines(&groups, &config)?;
                for warning in &prepared.warnings {
                    ctx.println(warning);
                }
                show(&plotter, prepared.figure)
            }),
        );
    }

    {
        let plotter = plotter.clone();
        bindings.insert(
            "plotxy",
            Binding::new(Arity::Exact(2), move |_, args| {
                let figure = plot::prepare_xy(
                    args[0].expect_item("plotxy", 0)?,
                    args[1].expect_item("plotxy", 1)?,
                )?;
                show(&plotter, figure)
            }),
        );
    }

    for (name, filled) in [("contour", false), ("contourf", true)] {
        let plotter = plotter.clone();
        bindings.insert(
            name,
            Binding::new(Arity::Exact(1), move |ctx, args| {
                match plot::prepare_contour(args[0].expect_item(name, 0)?, filled) {
                    Ok(figure) => show(&plotter, figure),
                    Err(PlotError::NotTwoDimensional) => {
                        ctx.println(PlotError::NotTwoDimensional.to_string());
                        Ok(Value::Unit)
                    }
                    Err(e) => Err(e.into()),
                }
            }),
        );
    }

    bindings.insert(
        "integrate",
        Binding::new(Arity::Exact(1), |_, args| {
            Ok(analysis::integrate(args[0].expect_item("integrate", 0)?)?.into())
        }),
    );

    {
        let fft = fft.clone();
        bindings.insert(
            "fftp",
            Binding::new(Arity::Exact(1), move |_, args| {
                let item = args[0].expect_item("fftp", 0)?;
                let (amp, phase) = lock(&fft)?.fftp(item)?;
                Ok(Value::List(vec![amp.into(), phase.into()]))
            }),
        );
    }

    bindings.insert(
        "sldfft",
        Binding::new(Arity::Exact(3), move |_, args| {
            let item = args[0].expect_item("sldfft", 0)?;
            let stride = args[1].expect_number("sldfft", 1)?;
            let width = args[2].expect_number("sldfft", 2)?;
            let (amp, phase) = lock(&fft)?.sldfft(item, stride, width)?;
            Ok(Value::List(vec![amp.into(), phase.into()]))
        }),
    );

    bindings.insert(
        "window_by_time",
        Binding::new(Arity::Exact(3), |_, args| {
            let item = args[0].expect_item("window_by_time", 0)?;
            let tmin = args[1].expect_number("window_by_time", 1)?;
            let tmax = args[2].expect_number("window_by_time", 2)?;
            Ok(analysis::window_by_time(item, tmin, tmax)?.into())
        }),
    );

    bindings
}

fn plot_group(function: &str, index: usize, arg: Value) -> Result<PlotGroup, BindingError> {
    match arg {
        Value::Item(item) => Ok(PlotGroup::Single(item)),
        Value::List(values) => values
            .into_iter()
            .map(|v| match v {
                Value::Item(item) => Ok(item),
                other => Err(BindingError::Argument {
                    function: function.to_string(),
                    index,
                    expected: "list of data items",
                    got: other.type_name(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PlotGroup::Overlay),
        other => Err(BindingError::Argument {
            function: function.to_string(),
            index,
            expected: "data item or list of data items",
            got: other.type_name(),
        }),
    }
}

fn show(plotter: &SharedPlotBackend, figure: Figure) -> Result<Value, BindingError> {
    plotter
        .lock()
        .map_err(|e| BindingError::Failed(format!("plot backend unavailable: {e}")))?
        .show(figure)?;
    Ok(Value::Unit)
}

fn lock(fft: &Mutex<FftAnalyzer>) -> Result<std::sync::MutexGuard<'_, FftAnalyzer>, BindingError> {
    fft.lock()
        .map_err(|e| BindingError::Failed(format!("FFT planner unavailable: {e}")))
}
