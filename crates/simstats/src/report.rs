use std::collections::HashMap;
use std::fmt;

/// Value of a single statistics entry
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// Integer count, e.g. `system.cpu.numCycles 52341`
    Int(i64),
    /// Floating point quantity, e.g. `sim_seconds 0.000052`
    Float(f64),
    /// Token that is not a number, stored as written
    Text(String),
}

impl MetricValue {
    /// Coerce a value token.
    ///
    /// Integer parsing is only attempted when the token has no decimal point
    /// and no exponent marker. Anything that then fails float parsing is kept
    /// as text.
    pub fn parse(token: &str) -> Self {
        let looks_integral = !token.contains(&['.', 'e', 'E'][..]);
        if looks_integral {
            if let Ok(v) = token.parse::<i64>() {
                return MetricValue::Int(v);
            }
        }
        match token.parse::<f64>() {
            Ok(v) => MetricValue::Float(v),
            Err(_) => MetricValue::Text(token.to_string()),
        }
    }

    /// Numeric view of the value; `None` for text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, MetricValue::Text(_))
    }
}

// Reports carry `nan` rates, so two NaN floats compare equal here
impl PartialEq for MetricValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetricValue::Int(a), MetricValue::Int(b)) => a == b,
            (MetricValue::Float(a), MetricValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (MetricValue::Text(a), MetricValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// Immutable set of statistics parsed from one report.
///
/// Built once by [`crate::StatsParser`]; there is no API to change entries
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    source: String,
    entries: HashMap<String, MetricValue>,
}

impl MetricReport {
    pub(crate) fn new(source: String, entries: HashMap<String, MetricValue>) -> Self {
        Self { source, entries }
    }

    /// Path or identifier the report was read from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries.get(key)
    }

    /// Numeric value of `key`; `None` when absent or stored as text
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetricValue::as_f64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
