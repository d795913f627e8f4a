use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use simstats::{
    per_cpu_ipc, CpuIpc, DerivedMetrics, MetricsDeriver, OperatingPoint, Params, PowerModel,
    RuleTable, StatsParser,
};

/// File name the simulator writes its statistics to
pub const STATS_FILE_NAME: &str = "stats.txt";

/// One report to analyze
#[derive(Debug, Clone, PartialEq)]
pub struct ReportInput {
    pub label: String,
    /// Reports of one group are compared against the first of them
    pub group: String,
    pub path: PathBuf,
}

impl ReportInput {
    /// Parse `label=path`, or a bare path labelled by its parent directory
    pub fn from_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((label, path)) if !label.is_empty() && !path.is_empty() => {
                let path = PathBuf::from(path);
                Self {
                    label: label.to_string(),
                    group: group_of(&path),
                    path,
                }
            }
            _ => Self::from_path(PathBuf::from(arg)),
        }
    }

    pub fn from_path(path: PathBuf) -> Self {
        let label = path
            .parent()
            .and_then(|p| p.file_name())
            .or_else(|| path.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            label,
            group: group_of(&path),
            path,
        }
    }
}

/// Name of the directory holding the run directory, e.g. `superscalar` for
/// `results/superscalar/width_2/stats.txt`; empty when there is none
fn group_of(path: &Path) -> String {
    path.parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Find every `stats.txt` below `dir`, sorted by path.
///
/// Symlinks are not followed. Subdirectories that cannot be read are
/// skipped with a warning; only an unreadable `dir` is an error.
pub fn discover(dir: &Path) -> Result<Vec<ReportInput>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read results directory: {}", dir.display()))?;
    let mut found = Vec::new();
    walk(dir, entries, &mut found);
    found.sort();
    Ok(found.into_iter().map(ReportInput::from_path).collect())
}

fn walk(dir: &Path, entries: fs::ReadDir, found: &mut Vec<PathBuf>) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to list {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() {
            match fs::read_dir(&path) {
                Ok(sub) => walk(&path, sub, found),
                Err(e) => warn!("Skipping unreadable directory {}: {}", path.display(), e),
            }
        } else if file_type.is_symlink() {
            debug!("Not following symlink {}", path.display());
        } else if entry.file_name() == STATS_FILE_NAME {
            found.push(path);
        }
    }
}

/// Derived results for one successfully processed report
#[derive(Debug, Clone)]
pub struct AnalyzedReport {
    pub label: String,
    pub group: String,
    pub source: String,
    pub operating_point: OperatingPoint,
    pub derived: DerivedMetrics,
    pub cores: Vec<CpuIpc>,
}

/// A report that could not be processed
#[derive(Debug)]
pub struct UnitFailure {
    pub label: String,
    pub error: simstats::Error,
}

/// Results of a batch: successful reports in input order and the failures
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<AnalyzedReport>,
    pub failures: Vec<UnitFailure>,
}

/// Runs parse and derive over a batch of reports.
///
/// Each report is independent; a failure is recorded for that report and
/// the batch moves on.
pub struct BatchAnalyzer {
    parser: StatsParser,
    table: RuleTable,
    model: PowerModel,
    operating_point: Option<String>,
    workload_size: Option<f64>,
}

impl BatchAnalyzer {
    pub fn new(table: RuleTable) -> Self {
        Self {
            parser: StatsParser::new(),
            table,
            model: PowerModel::default(),
            operating_point: None,
            workload_size: None,
        }
    }

    /// Use this operating point for every report instead of inferring it
    /// from the label
    pub fn with_operating_point(mut self, name: Option<String>) -> Self {
        self.operating_point = name;
        self
    }

    pub fn with_workload_size(mut self, size: Option<f64>) -> Self {
        self.workload_size = size;
        self
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Operating point for a report: the configured one, else a preset
    /// named in the label (e.g. `m5out_low_power`), else `balanced`
    pub fn operating_point_for(&self, label: &str) -> OperatingPoint {
        if let Some(name) = &self.operating_point {
            return OperatingPoint::preset_or_default(name);
        }
        simstats::power::OPERATING_POINTS
            .iter()
            .find(|(name, _, _)| label.contains(name))
            .and_then(|(name, _, _)| OperatingPoint::preset(name))
            .unwrap_or_else(|| {
                OperatingPoint::preset_or_default(simstats::power::DEFAULT_OPERATING_POINT)
            })
    }

    fn params_for(&self, point: &OperatingPoint) -> Params {
        let mut params = self.model.estimate(point).to_params();
        if let Some(size) = self.workload_size {
            params.set(simstats::params::WORKLOAD_SIZE, size);
        }
        params
    }

    pub fn analyze_one(&self, input: &ReportInput) -> simstats::Result<AnalyzedReport> {
        let report = self.parser.parse_file(&input.path)?;
        let operating_point = self.operating_point_for(&input.label);
        let params = self.params_for(&operating_point);
        let derived = MetricsDeriver::new(&self.table).derive(&report, &params);

        info!(
            "{}: {} of {} fields computed at {}",
            input.label,
            derived.len() - derived.defaulted().count(),
            derived.len(),
            operating_point
        );

        Ok(AnalyzedReport {
            label: input.label.clone(),
            group: input.group.clone(),
            source: report.source().to_string(),
            operating_point,
            cores: per_cpu_ipc(&report),
            derived,
        })
    }

    pub fn analyze(&self, inputs: &[ReportInput]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for input in inputs {
            match self.analyze_one(input) {
                Ok(report) => outcome.reports.push(report),
                Err(e) => {
                    error!("{}: {}", input.label, e);
                    outcome.failures.push(UnitFailure {
                        label: input.label.clone(),
                        error: e,
                    });
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use simstats::fields;

    /// Scratch directory removed on drop
    pub(crate) struct TempDir(pub PathBuf);

    impl TempDir {
        pub(crate) fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "stats-analysis-{}-{}",
                name,
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        pub(crate) fn write_stats(&self, subdir: &str, text: &str) -> PathBuf {
            let dir = self.0.join(subdir);
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(STATS_FILE_NAME);
            fs::write(&path, text).unwrap();
            path
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    pub(crate) const RUN: &str = "\
sim_seconds 0.001
sim_insts 2000
system.cpu.numCycles 1000
system.cpu.numInsts 2000
system.cpu.dcache.overall_miss_rate::total 0.25
";

    #[test]
    fn test_input_from_arg() {
        let input = ReportInput::from_arg("pipeline=results/pipeline/stats.txt");
        assert_eq!(input.label, "pipeline");
        assert_eq!(input.group, "results");
        assert_eq!(input.path, PathBuf::from("results/pipeline/stats.txt"));

        let input = ReportInput::from_arg("results/smt/m5out_low_power/stats.txt");
        assert_eq!(input.label, "m5out_low_power");
        assert_eq!(input.group, "smt");

        let input = ReportInput::from_arg("stats.txt");
        assert_eq!(input.label, "stats");
        assert_eq!(input.group, "");
    }

    #[test]
    fn test_discover_finds_nested_reports() {
        let tmp = TempDir::new("discover");
        tmp.write_stats("superscalar/width_2", RUN);
        tmp.write_stats("superscalar/width_1", RUN);
        tmp.write_stats("pipeline", RUN);
        fs::write(tmp.0.join("notes.txt"), "x").unwrap();

        let inputs = discover(&tmp.0).unwrap();
        let labels: Vec<_> = inputs.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["pipeline", "width_1", "width_2"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_does_not_follow_symlinks() {
        let tmp = TempDir::new("discover-symlink");
        let report = tmp.write_stats("good", RUN);
        std::os::unix::fs::symlink(&tmp.0, tmp.0.join("loop")).unwrap();
        std::os::unix::fs::symlink(&report, tmp.0.join(STATS_FILE_NAME)).unwrap();

        let inputs = discover(&tmp.0).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].path, report);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new("discover-locked");
        let report = tmp.write_stats("good", RUN);
        let locked = tmp.0.join("locked");
        tmp.write_stats("locked/run", RUN);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still read the locked directory
        let readable = fs::read_dir(&locked).is_ok();
        let result = discover(&tmp.0);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let paths: Vec<_> = result.unwrap().into_iter().map(|i| i.path).collect();
        assert!(paths.contains(&report));
        assert_eq!(paths.len(), if readable { 2 } else { 1 });
    }

    #[test]
    fn test_discover_missing_dir_errors() {
        let result = discover(Path::new("/nonexistent/stats-analysis"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read results directory"));
    }

    #[test]
    fn test_operating_point_inference() {
        let analyzer = BatchAnalyzer::new(RuleTable::standard());
        assert_eq!(analyzer.operating_point_for("m5out_high_perf").name, "high_perf");
        assert_eq!(analyzer.operating_point_for("pipeline").name, "balanced");

        let analyzer = analyzer.with_operating_point(Some("max_perf".to_string()));
        assert_eq!(analyzer.operating_point_for("m5out_low_power").name, "max_perf");
    }

    #[test]
    fn test_failure_does_not_affect_other_units() {
        let tmp = TempDir::new("batch");
        let good = tmp.write_stats("m5out_low_power", RUN);
        let inputs = vec![
            ReportInput::from_path(tmp.0.join("missing/stats.txt")),
            ReportInput::from_path(good),
        ];

        let outcome = BatchAnalyzer::new(RuleTable::standard()).analyze(&inputs);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].label, "missing");
        assert!(matches!(
            outcome.failures[0].error,
            simstats::Error::ReportNotFound(_)
        ));

        assert_eq!(outcome.reports.len(), 1);
        let report = &outcome.reports[0];
        assert_eq!(report.label, "m5out_low_power");
        assert_eq!(report.operating_point.name, "low_power");
        assert_eq!(report.derived.get(fields::IPC), Some(2.0));
        assert_eq!(report.derived.get(fields::DCACHE_HIT_RATE), Some(0.75));
        assert!(report.derived.computed(fields::ENERGY_J).unwrap() > 0.0);
    }

    #[test]
    fn test_workload_size_param() {
        let tmp = TempDir::new("workload");
        let path = tmp.write_stats("run", RUN);
        let analyzer = BatchAnalyzer::new(RuleTable::standard()).with_workload_size(Some(4000.0));
        let report = analyzer.analyze_one(&ReportInput::from_path(path)).unwrap();

        let energy = report.derived.get(fields::ENERGY_J).unwrap();
        assert_eq!(report.derived.get(fields::EFFICIENCY), Some(4000.0 / energy));
    }

    #[test]
    fn test_failures_are_logged() {
        testing_logger::setup();

        let analyzer = BatchAnalyzer::new(RuleTable::standard());
        let input = ReportInput {
            label: "gone".to_string(),
            group: String::new(),
            path: PathBuf::from("/nonexistent/stats.txt"),
        };
        analyzer.analyze(&[input]);

        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert_eq!(captured_logs[0].level, log::Level::Error);
            assert_eq!(
                captured_logs[0].body,
                "gone: report not found: /nonexistent/stats.txt"
            );
        });
    }
}
