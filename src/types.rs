//! Core data types for xpad-rs
//!
//! This module contains the fundamental data structures shared by sources,
//! the workspace and the command evaluator.
//!
//! # Main Types
//!
//! - [`Dimension`] - A named axis of a quantity, optionally with coordinates
//! - [`VariableDescriptor`] - Metadata for one readable quantity in a source
//! - [`DataValue`] - The numeric payload of a data item
//! - [`DataItem`] - A materialized value plus its provenance
//!
//! # Serialization
//!
//! Experimental data routinely contains NaN and infinite samples, which JSON
//! numbers cannot represent. Numeric payloads are written through
//! [`json_floats`], which stores non-finite values as the strings `"NaN"`,
//! `"inf"` and `"-inf"` so sessions round-trip exactly.

use serde::{Deserialize, Serialize};

/// Time units that trigger the kHz frequency convention in spectral analysis
pub const SECOND_UNITS: &[&str] = &["s", "S", "sec", "Sec", "SEC"];

/// A named axis of a variable or data item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimension {
    /// Axis name, e.g. "time"
    pub name: String,
    /// Display label (falls back to the name when empty)
    #[serde(default)]
    pub label: String,
    /// Physical units of the coordinate values
    #[serde(default)]
    pub units: String,
    /// Coordinate values along this axis, when known
    #[serde(default, with = "json_floats::option")]
    pub data: Option<Vec<f64>>,
}

impl Dimension {
    fn is_identical(&self, other: &Dimension) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.units == other.units
            && match (&self.data, &other.data) {
                (Some(a), Some(b)) => same_bits(a, b),
                (None, None) => true,
                _ => false,
            }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the coordinate values
    pub fn with_data(mut self, data: Vec<f64>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the units
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Label for axis titles
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Whether the units denote seconds
    pub fn is_seconds(&self) -> bool {
        SECOND_UNITS.contains(&self.units.as_str())
    }
}

/// Metadata for one readable quantity within a source.
///
/// Descriptors are built once with the `with_*` methods and then handed to a
/// [`SourceNode`](crate::source::SourceNode), which only gives out shared
/// references. There are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    units: String,
    #[serde(default)]
    dims: Vec<Dimension>,
}

impl VariableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            description: String::new(),
            units: String::new(),
            dims: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_dimension(mut self, dim: Dimension) -> Self {
        self.dims.push(dim);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }
}

/// Numeric payload of a [`DataItem`]
///
/// Deserialization rejects grids whose shape does not cover their values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataValue")]
pub enum DataValue {
    /// A single number
    Scalar(#[serde(with = "json_floats::scalar")] f64),
    /// A one-dimensional series
    Series(#[serde(with = "json_floats")] Vec<f64>),
    /// An N-dimensional array stored row-major
    Grid {
        shape: Vec<usize>,
        #[serde(with = "json_floats")]
        values: Vec<f64>,
    },
    /// Several items produced together, e.g. an amplitude/phase pair
    Tuple(Vec<DataItem>),
}

#[derive(Deserialize)]
#[serde(rename = "DataValue")]
enum RawDataValue {
    Scalar(#[serde(with = "json_floats::scalar")] f64),
    Series(#[serde(with = "json_floats")] Vec<f64>),
    Grid {
        shape: Vec<usize>,
        #[serde(with = "json_floats")]
        values: Vec<f64>,
    },
    Tuple(Vec<DataItem>),
}

impl TryFrom<RawDataValue> for DataValue {
    type Error = String;

    fn try_from(raw: RawDataValue) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawDataValue::Scalar(v) => DataValue::Scalar(v),
            RawDataValue::Series(values) => DataValue::Series(values),
            RawDataValue::Grid { shape, values } => {
                let expected = shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d));
                if expected != Some(values.len()) {
                    return Err(format!(
                        "grid of shape {shape:?} holds {} values",
                        values.len()
                    ));
                }
                DataValue::Grid { shape, values }
            }
            RawDataValue::Tuple(items) => DataValue::Tuple(items),
        })
    }
}

impl Default for DataValue {
    fn default() -> Self {
        DataValue::Series(Vec::new())
    }
}

impl DataValue {
    /// Bitwise comparison of the payload, see [`DataItem::is_identical`]
    pub fn is_identical(&self, other: &DataValue) -> bool {
        match (self, other) {
            (DataValue::Scalar(a), DataValue::Scalar(b)) => a.to_bits() == b.to_bits(),
            (DataValue::Series(a), DataValue::Series(b)) => same_bits(a, b),
            (
                DataValue::Grid { shape: sa, values: va },
                DataValue::Grid { shape: sb, values: vb },
            ) => sa == sb && same_bits(va, vb),
            (DataValue::Tuple(a), DataValue::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_identical(y))
            }
            _ => false,
        }
    }

    /// Number of array dimensions (0 for scalars and tuples)
    pub fn ndim(&self) -> usize {
        match self {
            DataValue::Scalar(_) | DataValue::Tuple(_) => 0,
            DataValue::Series(_) => 1,
            DataValue::Grid { shape, .. } => shape.len(),
        }
    }

    /// Shape of the payload, numpy style
    pub fn shape(&self) -> Vec<usize> {
        match self {
            DataValue::Scalar(_) => Vec::new(),
            DataValue::Series(v) => vec![v.len()],
            DataValue::Grid { shape, .. } => shape.clone(),
            DataValue::Tuple(items) => vec![items.len()],
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            DataValue::Scalar(_) => 1,
            DataValue::Series(v) => v.len(),
            DataValue::Grid { values, .. } => values.len(),
            DataValue::Tuple(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat view of the numbers, `None` for tuples
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            DataValue::Scalar(v) => Some(std::slice::from_ref(v)),
            DataValue::Series(v) => Some(v),
            DataValue::Grid { values, .. } => Some(values),
            DataValue::Tuple(_) => None,
        }
    }
}

/// A materialized value held in the workspace, with provenance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataItem {
    /// Generating variable name (empty for anonymous derived values)
    #[serde(default)]
    pub name: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Label of the source the item was read from
    #[serde(default)]
    pub source: String,
    /// Physical units
    #[serde(default)]
    pub units: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// User-editable comment
    #[serde(default)]
    pub comment: String,
    /// Axes of the payload
    #[serde(default)]
    pub dims: Vec<Dimension>,
    /// Index into `dims` of the time axis
    #[serde(default)]
    pub order: usize,
    pub value: DataValue,
}

impl DataItem {
    /// A 1-D series
    pub fn series(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            value: DataValue::Series(values),
            ..Default::default()
        }
    }

    /// A single number
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: DataValue::Scalar(value),
            ..Default::default()
        }
    }

    /// A row-major N-D array; `None` when the shape does not match the data
    pub fn grid(name: impl Into<String>, shape: Vec<usize>, values: Vec<f64>) -> Option<Self> {
        if shape.iter().product::<usize>() != values.len() {
            return None;
        }
        Some(Self {
            name: name.into(),
            value: DataValue::Grid { shape, values },
            ..Default::default()
        })
    }

    /// A group of items produced together
    pub fn tuple(name: impl Into<String>, items: Vec<DataItem>) -> Self {
        Self {
            name: name.into(),
            value: DataValue::Tuple(items),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_dimension(mut self, dim: Dimension) -> Self {
        self.dims.push(dim);
        self
    }

    /// Attach a time axis and make it the ordering dimension
    pub fn with_time(mut self, units: impl Into<String>, data: Vec<f64>) -> Self {
        self.order = self.dims.len();
        self.dims
            .push(Dimension::new("time").with_units(units).with_data(data));
        self
    }

    /// Equality that treats a NaN sample as equal to the same NaN.
    ///
    /// Floats are compared bit for bit, so `0.0` and `-0.0` differ.
    pub fn is_identical(&self, other: &DataItem) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.source == other.source
            && self.units == other.units
            && self.description == other.description
            && self.comment == other.comment
            && self.order == other.order
            && self.dims.len() == other.dims.len()
            && self.dims.iter().zip(&other.dims).all(|(a, b)| a.is_identical(b))
            && self.value.is_identical(&other.value)
    }

    /// Label for legends: the label, or the name when no label is set
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// The ordering (time) axis, if any
    pub fn time_dim(&self) -> Option<&Dimension> {
        self.dims.get(self.order)
    }

    /// Coordinates of the ordering axis, if known
    pub fn time(&self) -> Option<&[f64]> {
        self.time_dim().and_then(|d| d.data.as_deref())
    }

    /// Flat numeric view of the payload
    pub fn values(&self) -> Option<&[f64]> {
        self.value.as_slice()
    }
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Serde helpers that keep non-finite floats intact in JSON.
pub mod json_floats {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    fn to_repr(v: f64) -> Repr {
        if v.is_finite() {
            Repr::Finite(v)
        } else if v.is_nan() {
            Repr::Special("NaN".to_string())
        } else if v > 0.0 {
            Repr::Special("inf".to_string())
        } else {
            Repr::Special("-inf".to_string())
        }
    }

    fn from_repr<E: serde::de::Error>(repr: Repr) -> Result<f64, E> {
        match repr {
            Repr::Finite(v) => Ok(v),
            Repr::Special(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(E::custom(format!("invalid float literal {other:?}"))),
            },
        }
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| to_repr(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)?
            .into_iter()
            .map(from_repr)
            .collect()
    }

    pub mod scalar {
        use super::*;

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            to_repr(*value).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            from_repr(Repr::deserialize(deserializer)?)
        }
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            values: &Option<Vec<f64>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match values {
                Some(values) => serializer.serialize_some(
                    &values.iter().map(|&v| to_repr(v)).collect::<Vec<_>>(),
                ),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<f64>>, D::Error> {
            match Option::<Vec<Repr>>::deserialize(deserializer)? {
                Some(reprs) => reprs
                    .into_iter()
                    .map(from_repr)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some),
                None => Ok(None),
            }
        }
    }
}
