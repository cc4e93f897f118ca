//! Element-wise arithmetic on data items
//!
//! Arrays combine with arrays of the same shape, and with scalars of any
//! kind. The result is a fresh item: its label records the expression, its
//! axes come from the first array operand and its units follow the
//! operator.

use super::{shape_text, AnalysisError};
use crate::types::{DataItem, DataValue};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn units(self, lhs: &str, rhs: &str) -> String {
        match self {
            BinaryOp::Add | BinaryOp::Sub => {
                if lhs.is_empty() {
                    rhs.to_string()
                } else if rhs.is_empty() || lhs == rhs {
                    lhs.to_string()
                } else {
                    String::new()
                }
            }
            BinaryOp::Mul => match (lhs.is_empty(), rhs.is_empty()) {
                (true, _) => rhs.to_string(),
                (_, true) => lhs.to_string(),
                _ => format!("{lhs}*{rhs}"),
            },
            BinaryOp::Div => match (lhs.is_empty(), rhs.is_empty()) {
                (_, true) => lhs.to_string(),
                (true, false) => format!("1/{rhs}"),
                _ => format!("{lhs}/{rhs}"),
            },
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of a binary operation
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Item(&'a DataItem),
    Number(f64),
}

impl Operand<'_> {
    fn label(&self) -> String {
        match self {
            Operand::Item(item) => item.display_label().to_string(),
            Operand::Number(n) => n.to_string(),
        }
    }

    fn units(&self) -> &str {
        match self {
            Operand::Item(item) => &item.units,
            Operand::Number(_) => "",
        }
    }

    fn value(&self) -> Result<Payload<'_>, AnalysisError> {
        match self {
            Operand::Number(n) => Ok(Payload::Scalar(*n)),
            Operand::Item(item) => match &item.value {
                DataValue::Scalar(v) => Ok(Payload::Scalar(*v)),
                DataValue::Series(values) => Ok(Payload::Array(item, vec![values.len()], values)),
                DataValue::Grid { shape, values } => Ok(Payload::Array(item, shape.clone(), values)),
                DataValue::Tuple(_) => Err(AnalysisError::Tuple("arithmetic")),
            },
        }
    }
}

enum Payload<'a> {
    Scalar(f64),
    Array(&'a DataItem, Vec<usize>, &'a [f64]),
}

/// Apply `op` element-wise
pub fn binary(op: BinaryOp, lhs: Operand<'_>, rhs: Operand<'_>) -> Result<DataItem, AnalysisError> {
    let label = format!("({} {} {})", lhs.label(), op, rhs.label());
    let units = op.units(lhs.units(), rhs.units());

    let (template, value) = match (lhs.value()?, rhs.value()?) {
        (Payload::Scalar(a), Payload::Scalar(b)) => (None, DataValue::Scalar(op.apply(a, b))),
        (Payload::Array(item, shape, values), Payload::Scalar(b)) => (
            Some(item),
            array_value(shape, values.iter().map(|&a| op.apply(a, b)).collect()),
        ),
        (Payload::Scalar(a), Payload::Array(item, shape, values)) => (
            Some(item),
            array_value(shape, values.iter().map(|&b| op.apply(a, b)).collect()),
        ),
        (Payload::Array(item, lshape, lvalues), Payload::Array(_, rshape, rvalues)) => {
            if lshape != rshape {
                return Err(AnalysisError::Shape(shape_text(&lshape), shape_text(&rshape)));
            }
            let values = lvalues
                .iter()
                .zip(rvalues)
                .map(|(&a, &b)| op.apply(a, b))
                .collect();
            (Some(item), array_value(lshape, values))
        }
    };

    Ok(derived(template, label, units, value))
}

/// Element-wise functions of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Sqrt,
    Exp,
    Ln,
    Log10,
    Sin,
    Cos,
    Tan,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Abs => "abs",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Log10 => "log10",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Log10 => x.log10(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
        }
    }

    fn keeps_units(self) -> bool {
        matches!(self, UnaryOp::Neg | UnaryOp::Abs)
    }
}

/// Apply `op` to every element
pub fn unary(op: UnaryOp, item: &DataItem) -> Result<DataItem, AnalysisError> {
    let value = match &item.value {
        DataValue::Scalar(v) => DataValue::Scalar(op.apply(*v)),
        DataValue::Series(values) => DataValue::Series(values.iter().map(|&v| op.apply(v)).collect()),
        DataValue::Grid { shape, values } => DataValue::Grid {
            shape: shape.clone(),
            values: values.iter().map(|&v| op.apply(v)).collect(),
        },
        DataValue::Tuple(_) => return Err(AnalysisError::Tuple(op.name())),
    };
    let label = match op {
        UnaryOp::Neg => format!("-{}", item.display_label()),
        _ => format!("{}({})", op.name(), item.display_label()),
    };
    let units = if op.keeps_units() {
        item.units.clone()
    } else {
        String::new()
    };
    let template = (item.value.ndim() > 0).then_some(item);
    Ok(derived(template, label, units, value))
}

fn array_value(shape: Vec<usize>, values: Vec<f64>) -> DataValue {
    if shape.len() == 1 {
        DataValue::Series(values)
    } else {
        DataValue::Grid { shape, values }
    }
}

fn derived(template: Option<&DataItem>, label: String, units: String, value: DataValue) -> DataItem {
    let mut item = DataItem {
        label,
        units,
        value,
        ..Default::default()
    };
    if let Some(template) = template {
        item.source = template.source.clone();
        item.dims = template.dims.clone();
        item.order = template.order;
    }
    item
}
