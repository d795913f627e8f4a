use std::fmt::{self, Write};

use simstats::{compare_by_group, fields, DerivedMetrics, Relative};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::batch::{AnalyzedReport, BatchOutcome};

pub fn format_time() -> String {
    if let Ok(now) = OffsetDateTime::now_local() {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        now.format(&format)
            .unwrap_or_else(|_| "0000-00-00 00:00:00".to_string())
    } else {
        "0000-00-00 00:00:00".to_string()
    }
}

fn value_or_na(derived: &DerivedMetrics, name: &str, scale: f64, precision: usize) -> String {
    match derived.computed(name) {
        Some(v) => format!("{:.*}", precision, v * scale),
        None => "n/a".to_string(),
    }
}

/// Render the console summary of a batch
pub fn render(outcome: &BatchOutcome, generated_at: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, outcome, generated_at)?;
    Ok(out)
}

fn write_summary(out: &mut String, outcome: &BatchOutcome, generated_at: &str) -> fmt::Result {
    let rule = "=".repeat(70);

    writeln!(out, "{}", rule)?;
    writeln!(out, "SIMULATION STATISTICS SUMMARY ({})", generated_at)?;
    writeln!(out, "{}", rule)?;

    let relative = compare_by_group(
        outcome
            .reports
            .iter()
            .map(|r| (r.group.as_str(), &r.derived)),
    );

    for (report, rel) in outcome.reports.iter().zip(&relative) {
        write_report(out, report, rel)?;
    }

    if !outcome.failures.is_empty() {
        writeln!(out, "\nFAILED REPORTS")?;
        writeln!(out, "{}", "-".repeat(50))?;
        for failure in &outcome.failures {
            writeln!(out, "   {}: {}", failure.label, failure.error)?;
        }
    }

    writeln!(out, "\n{}", rule)?;
    writeln!(
        out,
        "{} report(s) processed, {} failed",
        outcome.reports.len(),
        outcome.failures.len()
    )
}

fn write_report(out: &mut String, report: &AnalyzedReport, rel: &Relative) -> fmt::Result {
    let d = &report.derived;
    writeln!(out, "\n{}", report.label)?;
    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(out, "   Source:          {}", report.source)?;
    if !report.group.is_empty() {
        writeln!(out, "   Group:           {}", report.group)?;
    }
    writeln!(out, "   Operating point: {}", report.operating_point)?;
    writeln!(out, "   Instructions:    {}", value_or_na(d, fields::INSTRUCTIONS, 1.0, 0))?;
    writeln!(out, "   Cycles:          {}", value_or_na(d, fields::CYCLES, 1.0, 0))?;
    writeln!(out, "   IPC:             {}", value_or_na(d, fields::IPC, 1.0, 4))?;
    writeln!(out, "   CPI:             {}", value_or_na(d, fields::CPI, 1.0, 4))?;
    writeln!(out, "   I-Cache hit (%): {}", value_or_na(d, fields::ICACHE_HIT_RATE, 100.0, 2))?;
    writeln!(out, "   D-Cache hit (%): {}", value_or_na(d, fields::DCACHE_HIT_RATE, 100.0, 2))?;
    writeln!(out, "   L2 hit (%):      {}", value_or_na(d, fields::L2CACHE_HIT_RATE, 100.0, 2))?;
    writeln!(out, "   Branch acc (%):  {}", value_or_na(d, fields::BRANCH_ACCURACY, 100.0, 2))?;
    writeln!(out, "   Power (mW):      {}", value_or_na(d, fields::TOTAL_POWER_W, 1e3, 2))?;
    writeln!(out, "   Energy (mJ):     {}", value_or_na(d, fields::ENERGY_J, 1e3, 4))?;
    writeln!(out, "   Energy/inst (pJ): {}", value_or_na(d, fields::ENERGY_PER_INST_J, 1e12, 3))?;
    writeln!(out, "   Speedup:         {:.2}x", rel.speedup)?;
    writeln!(out, "   Throughput gain: {:.2}x", rel.throughput_gain)?;

    for core in &report.cores {
        match core.ipc() {
            Some(ipc) => writeln!(out, "   CPU{}: IPC={:.4}", core.cpu, ipc)?,
            None => writeln!(out, "   CPU{}: missing data", core.cpu)?,
        }
    }

    let defaulted: Vec<_> = d.defaulted().collect();
    if !defaulted.is_empty() {
        writeln!(out, "   Defaulted:       {}", defaulted.join(", "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::{TempDir, RUN};
    use crate::batch::{BatchAnalyzer, ReportInput};
    use simstats::RuleTable;

    #[test]
    fn test_render_summary() {
        let tmp = TempDir::new("summary");
        let multi = "system.cpu0.numCycles 100\nsystem.cpu0.numInsts 50\nsystem.cpu1.numCycles 100\n";
        let inputs = vec![
            ReportInput::from_path(tmp.write_stats("m5out_max_perf", RUN)),
            ReportInput::from_path(tmp.write_stats("multi", multi)),
            ReportInput::from_path(tmp.0.join("lost/stats.txt")),
        ];
        let outcome = BatchAnalyzer::new(RuleTable::standard()).analyze(&inputs);

        let text = render(&outcome, "2026-10-19 12:00:00").unwrap();

        assert!(text.contains("SIMULATION STATISTICS SUMMARY (2026-10-19 12:00:00)"));
        assert!(text.contains("   Operating point: max_perf (500 MHz, 1.00 V)"));
        assert!(text.contains("   IPC:             2.0000"));
        assert!(text.contains("   D-Cache hit (%): 75.00"));
        assert!(text.contains("   I-Cache hit (%): n/a"));
        assert!(text.contains("   CPU0: IPC=0.5000"));
        assert!(text.contains("   CPU1: missing data"));
        assert!(text.contains("FAILED REPORTS"));
        assert!(text.contains("   lost: report not found:"));
        assert!(text.contains("2 report(s) processed, 1 failed"));
    }
}
