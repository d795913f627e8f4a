use std::fmt;

use crate::derive::Params;
use crate::rules::params;

/// Frequency/voltage pair a run was simulated at
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    pub name: String,
    pub frequency_hz: f64,
    pub voltage: f64,
}

/// Built-in operating points: (name, frequency in Hz, voltage in V)
pub const OPERATING_POINTS: [(&str, f64, f64); 4] = [
    ("low_power", 100e6, 0.6),
    ("balanced", 200e6, 0.75),
    ("high_perf", 350e6, 0.9),
    ("max_perf", 500e6, 1.0),
];

pub const DEFAULT_OPERATING_POINT: &str = "balanced";

impl OperatingPoint {
    pub fn new(name: &str, frequency_hz: f64, voltage: f64) -> Self {
        Self {
            name: name.to_string(),
            frequency_hz,
            voltage,
        }
    }

    /// Look up a built-in operating point
    pub fn preset(name: &str) -> Option<Self> {
        OPERATING_POINTS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(n, f, v)| Self::new(n, *f, *v))
    }

    /// Built-in operating point, or `balanced` for unknown names
    pub fn preset_or_default(name: &str) -> Self {
        Self::preset(name).unwrap_or_else(|| {
            log::warn!(
                "Unknown operating point '{}', using '{}'",
                name,
                DEFAULT_OPERATING_POINT
            );
            let (n, f, v) = OPERATING_POINTS[1];
            Self::new(n, f, v)
        })
    }

    pub fn frequency_mhz(&self) -> f64 {
        self.frequency_hz / 1e6
    }
}

impl fmt::Display for OperatingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0} MHz, {:.2} V)",
            self.name,
            self.frequency_mhz(),
            self.voltage
        )
    }
}

/// Power estimate for one operating point, in watts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerEstimate {
    pub dynamic_w: f64,
    pub static_w: f64,
    pub total_w: f64,
}

impl PowerEstimate {
    /// Parameters consumed by the power and energy rules of
    /// [`crate::RuleTable::standard`]
    pub fn to_params(&self) -> Params {
        Params::new()
            .with(params::DYNAMIC_POWER_W, self.dynamic_w)
            .with(params::STATIC_POWER_W, self.static_w)
            .with(params::TOTAL_POWER_W, self.total_w)
    }
}

/// First-order CMOS power model.
///
/// `dynamic = C * V^2 * f * activity`, `static = static_base * V^1.5`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    /// Switched capacitance in farads
    pub capacitance_f: f64,
    /// Fraction of the capacitance switching each cycle
    pub activity: f64,
    /// Static power at 1 V, in watts
    pub static_base_w: f64,
}

impl Default for PowerModel {
    fn default() -> Self {
        Self {
            capacitance_f: 50e-12,
            activity: 0.5,
            static_base_w: 0.003,
        }
    }
}

impl PowerModel {
    pub fn estimate(&self, point: &OperatingPoint) -> PowerEstimate {
        let dynamic_w =
            self.capacitance_f * point.voltage.powi(2) * point.frequency_hz * self.activity;
        let static_w = self.static_base_w * point.voltage.powf(1.5);
        PowerEstimate {
            dynamic_w,
            static_w,
            total_w: dynamic_w + static_w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[rstest]
    #[case("low_power", 100e6, 0.6)]
    #[case("balanced", 200e6, 0.75)]
    #[case("high_perf", 350e6, 0.9)]
    #[case("max_perf", 500e6, 1.0)]
    fn test_presets(#[case] name: &str, #[case] freq: f64, #[case] voltage: f64) {
        let point = OperatingPoint::preset(name).unwrap();
        assert_eq!(point.frequency_hz, freq);
        assert_eq!(point.voltage, voltage);
    }

    #[test]
    fn test_unknown_point_falls_back_to_balanced() {
        assert!(OperatingPoint::preset("turbo").is_none());
        let point = OperatingPoint::preset_or_default("turbo");
        assert_eq!(point.name, DEFAULT_OPERATING_POINT);
        assert_eq!(point.frequency_mhz(), 200.0);
    }

    #[test]
    fn test_max_perf_power() {
        let point = OperatingPoint::preset("max_perf").unwrap();
        let power = PowerModel::default().estimate(&point);

        // 50 pF * 1 V^2 * 500 MHz * 0.5
        assert!(close(power.dynamic_w, 0.0125));
        assert!(close(power.static_w, 0.003));
        assert!(close(power.total_w, 0.0155));
    }

    #[test]
    fn test_power_grows_with_operating_point() {
        let model = PowerModel::default();
        let totals: Vec<f64> = OPERATING_POINTS
            .iter()
            .map(|(n, f, v)| model.estimate(&OperatingPoint::new(n, *f, *v)).total_w)
            .collect();
        assert!(totals.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_estimate_to_params() {
        let estimate = PowerEstimate {
            dynamic_w: 1.0,
            static_w: 0.5,
            total_w: 1.5,
        };
        let p = estimate.to_params();
        assert_eq!(p.get(params::DYNAMIC_POWER_W), Some(1.0));
        assert_eq!(p.get(params::STATIC_POWER_W), Some(0.5));
        assert_eq!(p.get(params::TOTAL_POWER_W), Some(1.5));
    }

    #[test]
    fn test_display() {
        let point = OperatingPoint::preset("high_perf").unwrap();
        assert_eq!(point.to_string(), "high_perf (350 MHz, 0.90 V)");
    }
}
