//! Operations along the time axis

use super::{wrap_label, AnalysisError};
use crate::types::{DataItem, DataValue};

/// Time coordinates and sample values of a 1-D trace
fn trace<'a>(item: &'a DataItem, operation: &'static str) -> Result<(&'a [f64], &'a [f64]), AnalysisError> {
    let values = match &item.value {
        DataValue::Series(values) => values.as_slice(),
        DataValue::Tuple(_) => return Err(AnalysisError::Tuple(operation)),
        _ => return Err(AnalysisError::NotOneDimensional(operation)),
    };
    let time = item
        .time()
        .ok_or_else(|| AnalysisError::NoTime(item.display_label().to_string()))?;
    if time.len() != values.len() {
        return Err(AnalysisError::Invalid(format!(
            "time coordinate of '{}' has {} points for {} samples",
            item.display_label(),
            time.len(),
            values.len()
        )));
    }
    Ok((time, values))
}

/// Cumulative trapezoidal integral along the time axis, starting at zero
pub fn integrate(item: &DataItem) -> Result<DataItem, AnalysisError> {
    let (time, values) = trace(item, "integrate")?;

    let mut total = 0.0;
    let mut integral = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i > 0 {
            total += 0.5 * (values[i] + values[i - 1]) * (time[i] - time[i - 1]);
        }
        integral.push(total);
    }

    let time_units = item.time_dim().map(|d| d.units.as_str()).unwrap_or_default();
    let units = match (item.units.is_empty(), time_units.is_empty()) {
        (false, false) => format!("{}*{}", item.units, time_units),
        (false, true) => item.units.clone(),
        (true, _) => time_units.to_string(),
    };

    Ok(DataItem {
        name: wrap_label("INT", &item.name),
        label: wrap_label("INT", &item.label),
        source: item.source.clone(),
        units,
        description: item.description.clone(),
        dims: item.dims.clone(),
        order: item.order,
        value: DataValue::Series(integral),
        ..Default::default()
    })
}

/// Keep the samples with `tmin <= t <= tmax`
pub fn window_by_time(item: &DataItem, tmin: f64, tmax: f64) -> Result<DataItem, AnalysisError> {
    if tmin > tmax {
        return Err(AnalysisError::Invalid(format!(
            "empty time window: tmin ({tmin}) > tmax ({tmax})"
        )));
    }
    let (time, values) = trace(item, "window_by_time")?;

    let (kept_time, kept_values): (Vec<f64>, Vec<f64>) = time
        .iter()
        .zip(values)
        .filter(|&(&t, _)| t >= tmin && t <= tmax)
        .map(|(&t, &v)| (t, v))
        .unzip();

    let mut windowed = item.clone();
    windowed.comment.clear();
    windowed.value = DataValue::Series(kept_values);
    if let Some(dim) = windowed.dims.get_mut(item.order) {
        dim.data = Some(kept_time);
    }
    Ok(windowed)
}
