use std::collections::HashMap;

use crate::derive::DerivedMetrics;
use crate::rules::fields;

/// Performance of one record relative to the batch baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relative {
    /// `baseline.cycles / cycles`
    pub speedup: f64,
    /// `ipc / baseline.ipc`
    pub throughput_gain: f64,
}

/// Sentinel for a relative value that cannot be computed
pub const UNDEFINED_RELATIVE: f64 = 0.0;

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 && (n / d).is_finite() => n / d,
        _ => UNDEFINED_RELATIVE,
    }
}

/// Compare every record against the first one.
///
/// Only computed values take part; a defaulted `cycles` or `ipc` on either
/// side yields [`UNDEFINED_RELATIVE`].
pub fn compare_to_baseline(records: &[DerivedMetrics]) -> Vec<Relative> {
    compare_by_group(records.iter().map(|record| ("", record)))
}

/// Compare every record against the first record of its group, so runs of
/// unrelated experiments in one batch are not measured against each other
pub fn compare_by_group<'a, I>(records: I) -> Vec<Relative>
where
    I: IntoIterator<Item = (&'a str, &'a DerivedMetrics)>,
{
    let mut baselines: HashMap<&str, (Option<f64>, Option<f64>)> = HashMap::new();

    records
        .into_iter()
        .map(|(group, record)| {
            let (base_cycles, base_ipc) = *baselines.entry(group).or_insert_with(|| {
                (record.computed(fields::CYCLES), record.computed(fields::IPC))
            });
            Relative {
                speedup: ratio(base_cycles, record.computed(fields::CYCLES)),
                throughput_gain: ratio(record.computed(fields::IPC), base_ipc),
            }
        })
        .collect()
}
