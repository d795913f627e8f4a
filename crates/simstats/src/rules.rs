//! Derivation rules: how each derived metric is computed from report
//! entries, external parameters and earlier derived metrics.

/// Names of the fields produced by [`RuleTable::standard`]
pub mod fields {
    pub const SIM_SECONDS: &str = "sim_seconds";
    pub const SIM_INSTS: &str = "sim_insts";
    pub const CYCLES: &str = "cycles";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const IPC: &str = "ipc";
    pub const CPI: &str = "cpi";
    pub const ICACHE_HIT_RATE: &str = "icache_hit_rate";
    pub const DCACHE_HIT_RATE: &str = "dcache_hit_rate";
    pub const L2CACHE_HIT_RATE: &str = "l2cache_hit_rate";
    pub const DTLB_MISS_RATE: &str = "dtlb_miss_rate";
    pub const ITLB_MISS_RATE: &str = "itlb_miss_rate";
    pub const BRANCH_MISPREDICT_RATE: &str = "branch_mispredict_rate";
    pub const BRANCH_ACCURACY: &str = "branch_accuracy";
    pub const DYNAMIC_POWER_W: &str = "dynamic_power_w";
    pub const STATIC_POWER_W: &str = "static_power_w";
    pub const TOTAL_POWER_W: &str = "total_power_w";
    pub const ENERGY_J: &str = "energy_j";
    pub const ENERGY_PER_INST_J: &str = "energy_per_inst_j";
    pub const EFFICIENCY: &str = "efficiency";
}

/// Names of the external parameters read by [`RuleTable::standard`]
pub mod params {
    pub const DYNAMIC_POWER_W: &str = "dynamic_power_w";
    pub const STATIC_POWER_W: &str = "static_power_w";
    pub const TOTAL_POWER_W: &str = "total_power_w";
    pub const WORKLOAD_SIZE: &str = "workload_size";
}

/// Input of a combining function
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Numeric report entry
    Stat(String),
    /// Value supplied by the caller, e.g. power of an operating point
    Param(String),
    /// Result of a rule that appears earlier in the same table
    Derived(String),
    Const(f64),
    /// First operand that resolves; lists keys renamed between simulator
    /// versions
    FirstOf(Vec<Operand>),
}

impl Operand {
    pub fn stat(key: &str) -> Self {
        Operand::Stat(key.to_string())
    }

    pub fn param(name: &str) -> Self {
        Operand::Param(name.to_string())
    }

    pub fn derived(name: &str) -> Self {
        Operand::Derived(name.to_string())
    }

    /// Alias list of report keys, tried in order
    pub fn stats(keys: &[&str]) -> Self {
        Operand::FirstOf(keys.iter().map(|k| Operand::stat(k)).collect())
    }
}

/// Combining function of a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Combine {
    /// Operand taken as is
    Value(Operand),
    /// `a / b`; undefined when `b` is zero
    Ratio(Operand, Operand),
    /// `a / b`; undefined when either side is zero
    NonZeroRatio(Operand, Operand),
    /// `a - b`
    Difference(Operand, Operand),
    /// `a * b`
    Product(Operand, Operand),
    /// `1 / a`; undefined when `a` is zero
    Reciprocal(Operand),
    /// `a * k`
    Scaled(Operand, f64),
    /// First alternative that resolves to a finite value
    FirstOf(Vec<Combine>),
}

/// Range a computed value is clamped into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Free,
    NonNegative,
    /// Clamped to `[0, 1]`
    Probability,
}

impl Bound {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Bound::Free => value,
            Bound::NonNegative => value.max(0.0),
            Bound::Probability => value.clamp(0.0, 1.0),
        }
    }
}

/// One derived metric: its name, how to compute it, and the sentinel used
/// when it cannot be computed
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub combine: Combine,
    pub default: f64,
    pub bound: Bound,
}

impl Rule {
    pub fn new(name: &str, combine: Combine) -> Self {
        Self {
            name: name.to_string(),
            combine,
            default: 0.0,
            bound: Bound::Free,
        }
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Shorthand for a rule clamped to `[0, 1]`
    pub fn probability(name: &str, combine: Combine) -> Self {
        Self::new(name, combine).with_bound(Bound::Probability)
    }

    /// Shorthand for a rule clamped at zero
    pub fn non_negative(name: &str, combine: Combine) -> Self {
        Self::new(name, combine).with_bound(Bound::NonNegative)
    }
}

/// Hit rate of the cache at `prefix`: `1 - miss rate`, else
/// `hits / accesses` for reports that only carry the counters
fn hit_rate(prefix: &str) -> Combine {
    let key = |stat: &str| format!("{}.{}::total", prefix, stat);
    Combine::FirstOf(vec![
        Combine::Difference(
            Operand::Const(1.0),
            Operand::FirstOf(vec![
                Operand::Stat(key("overall_miss_rate")),
                Operand::Stat(key("overallMissRate")),
            ]),
        ),
        Combine::Ratio(
            Operand::FirstOf(vec![
                Operand::Stat(key("overall_hits")),
                Operand::Stat(key("overallHits")),
            ]),
            Operand::FirstOf(vec![
                Operand::Stat(key("overall_accesses")),
                Operand::Stat(key("overallAccesses")),
            ]),
        ),
    ])
}

/// Ordered list of rules. Rules are evaluated in order, so a
/// [`Operand::Derived`] reference only sees rules listed before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Field names in evaluation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules covering run totals, IPC/CPI, cache and TLB rates, branch
    /// prediction, and the power/energy model.
    pub fn standard() -> Self {
        use Combine::*;
        use Operand::Const;

        let mut table = Self::new();
        table
            .push(Rule::non_negative(
                fields::SIM_SECONDS,
                Value(Operand::stats(&["sim_seconds", "simSeconds"])),
            ))
            .push(Rule::non_negative(
                fields::SIM_INSTS,
                Value(Operand::stats(&["sim_insts", "simInsts"])),
            ))
            .push(Rule::non_negative(
                fields::CYCLES,
                Value(Operand::stats(&["system.cpu.numCycles"])),
            ))
            .push(Rule::non_negative(
                fields::INSTRUCTIONS,
                Value(Operand::stats(&[
                    "system.cpu.numInsts",
                    "system.cpu.commitStats0.committedInsts",
                    "system.cpu.committedInsts",
                    "system.cpu.committedInsts::total",
                ])),
            ))
            .push(Rule::non_negative(
                fields::IPC,
                NonZeroRatio(
                    Operand::derived(fields::INSTRUCTIONS),
                    Operand::derived(fields::CYCLES),
                ),
            ))
            .push(Rule::non_negative(
                fields::CPI,
                NonZeroRatio(
                    Operand::derived(fields::CYCLES),
                    Operand::derived(fields::INSTRUCTIONS),
                ),
            ))
            .push(Rule::probability(
                fields::ICACHE_HIT_RATE,
                hit_rate("system.cpu.icache"),
            ))
            .push(Rule::probability(
                fields::DCACHE_HIT_RATE,
                hit_rate("system.cpu.dcache"),
            ))
            .push(Rule::probability(
                fields::L2CACHE_HIT_RATE,
                FirstOf(vec![hit_rate("system.l2cache"), hit_rate("system.l2")]),
            ))
            .push(Rule::probability(
                fields::DTLB_MISS_RATE,
                Ratio(
                    Operand::stats(&["system.cpu.dtb.misses", "system.cpu.mmu.dtb.misses"]),
                    Operand::stats(&["system.cpu.dtb.accesses", "system.cpu.mmu.dtb.accesses"]),
                ),
            ))
            .push(Rule::probability(
                fields::ITLB_MISS_RATE,
                Ratio(
                    Operand::stats(&["system.cpu.itb.misses", "system.cpu.mmu.itb.misses"]),
                    Operand::stats(&["system.cpu.itb.accesses", "system.cpu.mmu.itb.accesses"]),
                ),
            ))
            .push(Rule::probability(
                fields::BRANCH_MISPREDICT_RATE,
                Ratio(
                    Operand::stats(&[
                        "system.cpu.branchPred.condIncorrect",
                        "system.cpu.branchPred.condIncorrect::total",
                    ]),
                    Operand::stats(&[
                        "system.cpu.branchPred.condPredicted",
                        "system.cpu.branchPred.condPredicted::total",
                    ]),
                ),
            ))
            .push(Rule::probability(
                fields::BRANCH_ACCURACY,
                Difference(
                    Const(1.0),
                    Operand::derived(fields::BRANCH_MISPREDICT_RATE),
                ),
            ))
            .push(Rule::non_negative(
                fields::DYNAMIC_POWER_W,
                Value(Operand::param(params::DYNAMIC_POWER_W)),
            ))
            .push(Rule::non_negative(
                fields::STATIC_POWER_W,
                Value(Operand::param(params::STATIC_POWER_W)),
            ))
            .push(Rule::non_negative(
                fields::TOTAL_POWER_W,
                Value(Operand::param(params::TOTAL_POWER_W)),
            ))
            .push(Rule::non_negative(
                fields::ENERGY_J,
                Product(
                    Operand::derived(fields::TOTAL_POWER_W),
                    Operand::derived(fields::SIM_SECONDS),
                ),
            ))
            .push(Rule::non_negative(
                fields::ENERGY_PER_INST_J,
                Ratio(
                    Operand::derived(fields::ENERGY_J),
                    Operand::derived(fields::SIM_INSTS),
                ),
            ))
            .push(Rule::non_negative(
                fields::EFFICIENCY,
                Ratio(
                    Operand::FirstOf(vec![
                        Operand::param(params::WORKLOAD_SIZE),
                        Operand::derived(fields::SIM_INSTS),
                    ]),
                    Operand::derived(fields::ENERGY_J),
                ),
            ));
        table
    }
}
