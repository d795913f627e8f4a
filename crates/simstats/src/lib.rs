//! # Simstats
//!
//! A crate for turning the flat statistics report written by a
//! cycle-accurate architecture simulator into typed metrics and derived
//! performance and energy figures.
//!
//! Reports are plain text with one `key value [trailing text]` entry per
//! line. [`StatsParser`] reads them into an immutable [`MetricReport`], and
//! [`MetricsDeriver`] applies a [`RuleTable`] to a report to produce
//! [`DerivedMetrics`]: IPC/CPI, cache hit rates, TLB miss rates, branch
//! accuracy, power, energy and efficiency.
//!
//! Missing keys, text values and undefined arithmetic never fail a
//! derivation; the affected field takes its rule's default and is tagged
//! with a [`Resolution`] so partial records stay distinguishable.
//!
//! # Examples
//!
//! ```
//! use simstats::{fields, MetricsDeriver, Params, RuleTable, StatsParser};
//!
//! let report = StatsParser::new().parse_str(
//!     "example",
//!     "system.cpu.numInsts 1000\nsystem.cpu.numCycles 500\n",
//! );
//! let table = RuleTable::standard();
//! let metrics = MetricsDeriver::new(&table).derive(&report, &Params::new());
//!
//! assert_eq!(metrics.get(fields::IPC), Some(2.0));
//! // No miss rate in the report: the hit rate falls back to its default
//! assert_eq!(metrics.computed(fields::DCACHE_HIT_RATE), None);
//! ```

pub mod comparison;
pub mod cores;
pub mod derive;
pub mod error;
pub mod parser;
pub mod power;
pub mod report;
pub mod rules;

pub use comparison::{compare_by_group, compare_to_baseline, Relative};
pub use cores::{per_cpu_ipc, CpuIpc};
pub use derive::{DerivedMetrics, DerivedValue, MetricsDeriver, Params, Resolution};
pub use error::{Error, Result};
pub use parser::StatsParser;
pub use power::{OperatingPoint, PowerEstimate, PowerModel};
pub use report::{MetricReport, MetricValue};
pub use rules::{fields, params, Bound, Combine, Operand, Rule, RuleTable};
