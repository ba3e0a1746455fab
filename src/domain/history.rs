// ============================================================
// Layer 3 — Training History
// ============================================================
// Per-epoch metric series captured by the training loop, keyed
// by metric name ("loss", "accuracy", "val_loss", ...). Series
// are typed; only float series survive persistence.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum MetricSeries {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        match self {
            MetricSeries::Float(v) => v.len(),
            MetricSeries::Int(v)   => v.len(),
            MetricSeries::Text(v)  => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    metrics: BTreeMap<String, MetricSeries>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch value to a float series.
    pub fn push_float(&mut self, name: &str, value: f64) {
        match self.metrics.get_mut(name) {
            Some(MetricSeries::Float(values)) => values.push(value),
            // a differently typed series under the same name is replaced
            _ => {
                self.metrics.insert(name.to_string(), MetricSeries::Float(vec![value]));
            }
        }
    }

    /// Append one epoch value to an integer series.
    pub fn push_int(&mut self, name: &str, value: i64) {
        match self.metrics.get_mut(name) {
            Some(MetricSeries::Int(values)) => values.push(value),
            _ => {
                self.metrics.insert(name.to_string(), MetricSeries::Int(vec![value]));
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, series: MetricSeries) {
        self.metrics.insert(name.into(), series);
    }

    pub fn get(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.get(name)
    }

    /// Float series of a metric, if it is one.
    pub fn floats(&self, name: &str) -> Option<&[f64]> {
        match self.metrics.get(name) {
            Some(MetricSeries::Float(values)) => Some(values),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricSeries)> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
