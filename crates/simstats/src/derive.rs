use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::report::{MetricReport, MetricValue};
use crate::rules::{Combine, Operand, Rule, RuleTable};

/// External inputs to a derivation, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: HashMap<String, f64>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Merge `other` into this set; `other` wins on conflicts
    pub fn extend(&mut self, other: Params) {
        self.values.extend(other.values);
    }
}

/// How a derived value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// All inputs were present and the arithmetic was defined
    Computed,
    /// An input key or parameter was missing; the default was used
    KeyAbsent,
    /// An input key was present but held text; the default was used
    NonNumeric,
    /// Division by zero or a non-finite result; the default was used
    Undefined,
}

impl Resolution {
    pub fn is_computed(self) -> bool {
        self == Resolution::Computed
    }

    /// Keep the first failure that is more than a missing key
    fn or(self, other: Resolution) -> Resolution {
        match self {
            Resolution::KeyAbsent => other,
            _ => self,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resolution::Computed => "computed",
            Resolution::KeyAbsent => "key absent",
            Resolution::NonNumeric => "non-numeric",
            Resolution::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedValue {
    pub name: String,
    /// Computed value, or the rule default when not computed. Always finite.
    pub value: f64,
    pub resolution: Resolution,
}

/// Derived metrics for one report, one field per rule in table order
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    source: String,
    values: Vec<DerivedValue>,
}

impl DerivedMetrics {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Value of field `name` (default included); `None` for unknown fields
    pub fn get(&self, name: &str) -> Option<f64> {
        self.field(name).map(|v| v.value)
    }

    /// Value of field `name` only if it was actually computed
    pub fn computed(&self, name: &str) -> Option<f64> {
        self.field(name)
            .filter(|v| v.resolution.is_computed())
            .map(|v| v.value)
    }

    pub fn field(&self, name: &str) -> Option<&DerivedValue> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DerivedValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of fields that fell back to their default
    pub fn defaulted(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|v| !v.resolution.is_computed())
            .map(|v| v.name.as_str())
    }

    /// True when every field was computed from its inputs
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.resolution.is_computed())
    }
}

/// Applies a [`RuleTable`] to reports.
///
/// Derivation is a pure function of the report, the table and the
/// parameters: no I/O and no state carried between reports.
pub struct MetricsDeriver<'a> {
    table: &'a RuleTable,
}

impl<'a> MetricsDeriver<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    pub fn derive(&self, report: &MetricReport, params: &Params) -> DerivedMetrics {
        let mut values: Vec<DerivedValue> = Vec::with_capacity(self.table.len());

        for rule in self.table.rules() {
            let ctx = Context {
                report,
                params,
                earlier: &values,
            };
            let derived = ctx.evaluate(rule);
            if !derived.resolution.is_computed() {
                debug!(
                    "{}: {} {}, using default {}",
                    report.source(),
                    rule.name,
                    derived.resolution,
                    rule.default
                );
            }
            values.push(derived);
        }

        DerivedMetrics {
            source: report.source().to_string(),
            values,
        }
    }
}

struct Context<'a> {
    report: &'a MetricReport,
    params: &'a Params,
    earlier: &'a [DerivedValue],
}

impl Context<'_> {
    fn evaluate(&self, rule: &Rule) -> DerivedValue {
        let (value, resolution) = match self.combine(&rule.combine) {
            Ok(v) if v.is_finite() => (rule.bound.apply(v), Resolution::Computed),
            Ok(_) => (rule.default, Resolution::Undefined),
            Err(resolution) => (rule.default, resolution),
        };
        DerivedValue {
            name: rule.name.clone(),
            value,
            resolution,
        }
    }

    fn combine(&self, combine: &Combine) -> Result<f64, Resolution> {
        match combine {
            Combine::Value(a) => self.operand(a),
            Combine::Ratio(a, b) => {
                let (a, b) = (self.operand(a)?, self.operand(b)?);
                if b == 0.0 {
                    return Err(Resolution::Undefined);
                }
                Ok(a / b)
            }
            Combine::NonZeroRatio(a, b) => {
                let (a, b) = (self.operand(a)?, self.operand(b)?);
                if a == 0.0 || b == 0.0 {
                    return Err(Resolution::Undefined);
                }
                Ok(a / b)
            }
            Combine::Difference(a, b) => Ok(self.operand(a)? - self.operand(b)?),
            Combine::Product(a, b) => Ok(self.operand(a)? * self.operand(b)?),
            Combine::Reciprocal(a) => {
                let a = self.operand(a)?;
                if a == 0.0 {
                    return Err(Resolution::Undefined);
                }
                Ok(1.0 / a)
            }
            Combine::Scaled(a, k) => Ok(self.operand(a)? * k),
            // The first defined alternative wins; an absent one defers to
            // the next, otherwise its failure is reported
            Combine::FirstOf(alternatives) => {
                let mut failure = Resolution::KeyAbsent;
                for alternative in alternatives {
                    match self.combine(alternative) {
                        Ok(v) if v.is_finite() => return Ok(v),
                        Ok(_) => failure = failure.or(Resolution::Undefined),
                        Err(resolution) => failure = failure.or(resolution),
                    }
                }
                Err(failure)
            }
        }
    }

    fn operand(&self, operand: &Operand) -> Result<f64, Resolution> {
        match operand {
            Operand::Stat(key) => match self.report.get(key) {
                Some(MetricValue::Text(_)) => Err(Resolution::NonNumeric),
                Some(value) => value.as_f64().ok_or(Resolution::NonNumeric),
                None => Err(Resolution::KeyAbsent),
            },
            Operand::Param(name) => self.params.get(name).ok_or(Resolution::KeyAbsent),
            // Forward references and defaulted fields count as missing
            Operand::Derived(name) => self
                .earlier
                .iter()
                .rev()
                .find(|v| &v.name == name)
                .filter(|v| v.resolution.is_computed())
                .map(|v| v.value)
                .ok_or(Resolution::KeyAbsent),
            Operand::Const(v) => Ok(*v),
            Operand::FirstOf(candidates) => {
                let mut failure = Resolution::KeyAbsent;
                for candidate in candidates {
                    match self.operand(candidate) {
                        Ok(v) => return Ok(v),
                        Err(Resolution::NonNumeric) => failure = Resolution::NonNumeric,
                        Err(_) => {}
                    }
                }
                Err(failure)
            }
        }
    }
}
