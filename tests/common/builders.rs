//! Test data builders for creating test objects

use xpad_rs::{DataItem, MemorySourceBuilder, SourceNode};

/// Builder for time traces
pub struct TraceBuilder {
    name: String,
    values: Vec<f64>,
    step: f64,
    units: String,
    time_units: String,
}

impl TraceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: vec![0.0, 1.0, 2.0, 3.0],
            step: 0.1,
            units: String::new(),
            time_units: "s".to_string(),
        }
    }

    pub fn values(mut self, values: &[f64]) -> Self {
        self.values = values.to_vec();
        self
    }

    /// Samples of `f(t)` for `n` points spaced by the current step
    pub fn sampled(mut self, n: usize, f: impl Fn(f64) -> f64) -> Self {
        let step = self.step;
        self.values = (0..n).map(|i| f(i as f64 * step)).collect();
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn time_units(mut self, units: &str) -> Self {
        self.time_units = units.to_string();
        self
    }

    pub fn build(self) -> DataItem {
        let time = (0..self.values.len()).map(|i| i as f64 * self.step).collect();
        DataItem::series(self.name, self.values)
            .with_units(self.units)
            .with_time(self.time_units, time)
    }
}

/// Builder for an in-memory shot source with one item per variable
pub struct ShotBuilder {
    inner: MemorySourceBuilder,
}

impl ShotBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            inner: MemorySourceBuilder::new(label),
        }
    }

    /// Serve `item` for `variable` under every selector
    pub fn variable(mut self, variable: &str, item: DataItem) -> Self {
        self.inner = self.inner.item(variable, "", item);
        self
    }

    /// Serve `item` for `variable` only under `selector`
    pub fn variable_at(mut self, variable: &str, selector: &str, item: DataItem) -> Self {
        self.inner = self.inner.item(variable, selector, item);
        self
    }

    pub fn child(mut self, child: SourceNode) -> Self {
        self.inner = self.inner.child(child);
        self
    }

    pub fn build(self) -> SourceNode {
        self.inner.build().expect("memory source builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_builder() {
        let item = TraceBuilder::new("ip").values(&[1.0, 2.0]).step(0.5).build();
        assert_eq!(item.name, "ip");
        assert_eq!(item.time(), Some(&[0.0, 0.5][..]));
    }
}
