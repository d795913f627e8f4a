use std::collections::BTreeMap;

use crate::report::MetricReport;

/// Instruction and cycle counts of one core in a multi-core report
#[derive(Debug, Clone, PartialEq)]
pub struct CpuIpc {
    pub cpu: usize,
    pub instructions: Option<f64>,
    pub cycles: Option<f64>,
}

impl CpuIpc {
    /// `None` when either count is missing or cycles are zero
    pub fn ipc(&self) -> Option<f64> {
        match (self.instructions, self.cycles) {
            (Some(i), Some(c)) if c != 0.0 => Some(i / c),
            _ => None,
        }
    }
}

enum Counter {
    Cycles,
    Instructions,
}

/// Split `system.cpu<N>.<rest>` into the core index and the counter kind
fn classify(key: &str) -> Option<(usize, Counter)> {
    let rest = key.strip_prefix("system.cpu")?;
    let digits = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 || !rest[digits..].starts_with('.') {
        return None;
    }
    let cpu = rest[..digits].parse().ok()?;
    let name = rest[digits + 1..].trim_end_matches("::total");

    if name.ends_with("numCycles") {
        Some((cpu, Counter::Cycles))
    } else if name.ends_with("numInsts") || name.ends_with("committedInsts") {
        Some((cpu, Counter::Instructions))
    } else {
        None
    }
}

/// Candidate key for a counter; shallower keys win, then lexical order
#[derive(Default)]
struct Pick<'a> {
    key: Option<&'a str>,
    value: Option<f64>,
}

impl<'a> Pick<'a> {
    fn offer(&mut self, key: &'a str, value: f64) {
        let rank = |k: &str| (k.matches('.').count(), k.to_string());
        let better = match self.key {
            None => true,
            Some(current) => rank(key) < rank(current),
        };
        if better {
            self.key = Some(key);
            self.value = Some(value);
        }
    }
}

/// Per-core counts for reports with numbered cores (`system.cpu0`,
/// `system.cpu1`, ...), sorted by core index. Single-core reports that use
/// plain `system.cpu` produce an empty list.
pub fn per_cpu_ipc(report: &MetricReport) -> Vec<CpuIpc> {
    let mut cores: BTreeMap<usize, (Pick, Pick)> = BTreeMap::new();

    for (key, value) in report.iter() {
        let Some(value) = value.as_f64() else {
            continue;
        };
        let Some((cpu, counter)) = classify(key) else {
            continue;
        };
        let (cycles, insts) = cores.entry(cpu).or_default();
        match counter {
            Counter::Cycles => cycles.offer(key, value),
            Counter::Instructions => insts.offer(key, value),
        }
    }

    cores
        .into_iter()
        .map(|(cpu, (cycles, insts))| CpuIpc {
            cpu,
            instructions: insts.value,
            cycles: cycles.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatsParser;

    fn cores(text: &str) -> Vec<CpuIpc> {
        per_cpu_ipc(&StatsParser::new().parse_str("test", text))
    }

    #[test]
    fn test_two_cores() {
        let result = cores(
            "system.cpu0.numCycles 1000\n\
             system.cpu0.committedInsts 1500\n\
             system.cpu1.numCycles 1000\n\
             system.cpu1.exec_context.thread_0.numInsts 500\n",
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].cpu, 0);
        assert_eq!(result[0].ipc(), Some(1.5));
        assert_eq!(result[1].cpu, 1);
        assert_eq!(result[1].ipc(), Some(0.5));
    }

    #[test]
    fn test_missing_counter() {
        let result = cores("system.cpu3.numCycles 100\n");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].cpu, 3);
        assert_eq!(result[0].instructions, None);
        assert_eq!(result[0].ipc(), None);
    }

    #[test]
    fn test_zero_cycles_has_no_ipc() {
        let result = cores("system.cpu0.numCycles 0\nsystem.cpu0.numInsts 10\n");
        assert_eq!(result[0].ipc(), None);
    }

    #[test]
    fn test_shallow_key_preferred() {
        let result = cores(
            "system.cpu0.numCycles 100\n\
             system.cpu0.commit.committedInsts 70\n\
             system.cpu0.committedInsts 50\n",
        );
        assert_eq!(result[0].instructions, Some(50.0));
    }

    #[test]
    fn test_unnumbered_and_unrelated_keys_ignored() {
        let result = cores(
            "system.cpu.numCycles 100\n\
             system.cpu.numInsts 50\n\
             system.cpu_clk_domain.clock 1000\n\
             system.cpu0.dcache.overall_misses::total 12\n",
        );
        assert!(result.is_empty());
    }
}
