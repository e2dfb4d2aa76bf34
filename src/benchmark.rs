//! Benchmarking and experimentation module.
//!
//! Runs the selected solvers over every dataset of a directory, persists one
//! summary per run and aggregates the results per solver.

use crate::error::{Result, WdpError};
use crate::harness::{RunHarness, Timeout};
use crate::instance::AuctionInstance;
use crate::solver::{Solver, SolverConfig, SolverKind};
use crate::summary::{RunSummary, SummaryStore};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Aggregated statistics for a solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub solver: String,
    /// Number of recorded runs
    pub num_runs: usize,
    pub mean_profit: f64,
    pub median_profit: f64,
    pub min_profit: f64,
    pub max_profit: f64,
    pub total_profit: f64,
    /// Total time in seconds
    pub total_time: f64,
    pub mean_time: f64,
    /// Runtime percentiles
    pub p80_time: f64,
    pub p90_time: f64,
    pub p95_time: f64,
    pub p99_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Solvers to run, in order
    pub solvers: Vec<SolverKind>,
    /// Budget of each run
    pub timeout: Timeout,
    /// Runs per solver and dataset
    pub repeats: usize,
    /// Directory of the summary files
    pub output_dir: PathBuf,
    pub solver: SolverConfig,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl BenchmarkConfig {
    pub fn new(solvers: Vec<SolverKind>, timeout: Timeout, output_dir: impl Into<PathBuf>) -> Self {
        BenchmarkConfig {
            solvers,
            timeout,
            repeats: 1,
            output_dir: output_dir.into(),
            solver: SolverConfig::default(),
            show_progress: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.solvers.is_empty() {
            return Err(WdpError::config("no solver requested"));
        }
        if self.repeats == 0 {
            return Err(WdpError::config("repeat count must be at least 1"));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(WdpError::config(format!(
                "output path {} exists and is not a directory",
                self.output_dir.display()
            )));
        }
        self.solver.aco.validate()
    }
}

/// A bid file found under the dataset directory
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Every file under `dir`, recursively, smallest first
pub fn discover_datasets<P: AsRef<Path>>(dir: P) -> Result<Vec<DatasetInfo>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(WdpError::config(format!(
            "dataset directory {} does not exist",
            dir.display()
        )));
    }

    let mut datasets = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                pending.push(path);
            } else if metadata.is_file() {
                datasets.push(DatasetInfo {
                    name: entry.file_name().to_string_lossy().to_string(),
                    path,
                    size: metadata.len(),
                });
            }
        }
    }

    datasets.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.path.cmp(&b.path)));
    Ok(datasets)
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    store: SummaryStore,
    results: Vec<RunSummary>,
    skipped: Vec<PathBuf>,
}

impl Benchmark {
    /// Validate the configuration and open the output directory
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        config.validate()?;
        let store = SummaryStore::new(&config.output_dir)?;
        Ok(Benchmark {
            config,
            store,
            results: Vec::new(),
            skipped: Vec::new(),
        })
    }

    /// Run every solver on every dataset under `dir`.
    ///
    /// A dataset that cannot be read or parsed is logged and skipped. Returns the
    /// number of datasets processed.
    pub fn run_on_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let datasets = discover_datasets(dir)?;
        log::info!("Found {} datasets", datasets.len());

        let bar = if self.config.show_progress {
            let bar = ProgressBar::new(datasets.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut processed = 0;
        for dataset in &datasets {
            bar.set_message(dataset.name.clone());
            log::info!("Started work on {} ...", dataset.name);

            let instance = match AuctionInstance::from_file(&dataset.path) {
                Ok(instance) => instance,
                Err(e) if e.is_dataset_scoped() => {
                    log::warn!("Skipping {}: {}", dataset.path.display(), e);
                    self.skipped.push(dataset.path.clone());
                    bar.inc(1);
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.run_dataset(Arc::new(instance))?;
            processed += 1;
            bar.inc(1);
        }

        bar.finish_with_message("done");
        Ok(processed)
    }

    /// Run every configured solver `repeats` times on one instance.
    ///
    /// A backend failure only drops the affected run.
    pub fn run_dataset(&mut self, instance: Arc<AuctionInstance>) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::new();

        for &kind in &self.config.solvers {
            for repeat in 0..self.config.repeats {
                let mut solver_config = self.config.solver.clone();
                solver_config.aco.seed = solver_config.aco.seed.wrapping_add(repeat as u64);

                let solver = Solver::build(kind, instance.clone(), &solver_config)?;
                let mut harness = RunHarness::new(solver, &instance, self.config.timeout);

                log::info!("Solving {} with {} (run {}) ...", instance.name, kind, repeat + 1);
                match harness.run() {
                    Ok(_) => {}
                    Err(WdpError::Solver(message)) => {
                        log::error!("{} failed on {}: {}", kind, instance.name, message);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
                harness.log_summary();

                let summary = harness.summary();
                self.store.append(&summary)?;
                summaries.push(summary);
            }
        }

        self.results.extend(summaries.iter().cloned());
        Ok(summaries)
    }

    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        compute_statistics(&self.results)
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_statistics_csv(&self.compute_statistics(), path)
    }

    /// Export every run to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_runs_csv(&self.results, path)
    }

    pub fn generate_report(&self) -> String {
        render_report(&self.compute_statistics(), &self.results)
    }

    pub fn results(&self) -> &[RunSummary] {
        &self.results
    }

    /// Datasets skipped because they could not be loaded
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn store(&self) -> &SummaryStore {
        &self.store
    }
}

/// One CSV row per run; colony-only columns stay empty for the other solvers
#[derive(Serialize)]
struct RunRow<'a> {
    solver: &'a str,
    name: &'a str,
    status: &'a str,
    nr_items: usize,
    nr_orders: usize,
    profit: f64,
    feasible_profit: Option<f64>,
    epochs: Option<usize>,
    delta_time: f64,
    timeout: f64,
}

pub fn write_runs_csv<P: AsRef<Path>>(runs: &[RunSummary], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for run in runs {
        writer.serialize(RunRow {
            solver: &run.solver,
            name: &run.name,
            status: &run.status,
            nr_items: run.nr_items,
            nr_orders: run.nr_orders,
            profit: run.profit,
            feasible_profit: run.feasible_profit,
            epochs: run.epochs,
            delta_time: run.delta_time,
            timeout: run.timeout,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-solver statistics, best mean profit first
pub fn compute_statistics(runs: &[RunSummary]) -> Vec<AlgorithmStatistics> {
    let mut by_solver: BTreeMap<&str, Vec<&RunSummary>> = BTreeMap::new();
    for run in runs {
        by_solver.entry(run.solver.as_str()).or_default().push(run);
    }

    let mut statistics: Vec<AlgorithmStatistics> = by_solver
        .into_iter()
        .map(|(solver, runs)| {
            let profits: Vec<f64> = runs.iter().map(|r| r.profit).collect();
            let times: Vec<f64> = runs.iter().map(|r| r.delta_time).collect();
            let mut time_data = Data::new(times.clone());

            AlgorithmStatistics {
                solver: solver.to_string(),
                num_runs: runs.len(),
                mean_profit: profits.iter().mean(),
                median_profit: Data::new(profits.clone()).median(),
                min_profit: profits.iter().copied().fold(f64::INFINITY, f64::min),
                max_profit: profits.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                total_profit: profits.iter().sum(),
                total_time: times.iter().sum(),
                mean_time: times.iter().mean(),
                p80_time: time_data.percentile(80),
                p90_time: time_data.percentile(90),
                p95_time: time_data.percentile(95),
                p99_time: time_data.percentile(99),
            }
        })
        .collect();

    statistics.sort_by(|a, b| {
        b.mean_profit
            .total_cmp(&a.mean_profit)
            .then_with(|| a.solver.cmp(&b.solver))
    });
    statistics
}

pub fn write_statistics_csv<P: AsRef<Path>>(stats: &[AlgorithmStatistics], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

/// Plain-text summary report
pub fn render_report(stats: &[AlgorithmStatistics], runs: &[RunSummary]) -> String {
    let mut report = String::new();

    report.push_str("========================================\n");
    report.push_str("   Winner Determination Benchmark Report\n");
    report.push_str("========================================\n\n");

    report.push_str("Solver Performance Summary:\n");
    report.push_str("-".repeat(96).as_str());
    report.push('\n');
    report.push_str(&format!(
        "{:<25} {:>6} {:>12} {:>12} {:>12} {:>12} {:>10}\n",
        "Solver", "Runs", "Mean", "Median", "Total", "Total Time", "p95 Time"
    ));
    report.push_str("-".repeat(96).as_str());
    report.push('\n');

    for stat in stats {
        report.push_str(&format!(
            "{:<25} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>10.4}\n",
            stat.solver,
            stat.num_runs,
            stat.mean_profit,
            stat.median_profit,
            stat.total_profit,
            stat.total_time,
            stat.p95_time
        ));
    }

    report.push_str("-".repeat(96).as_str());
    report.push('\n');

    report.push_str("\nBest Profit per Dataset:\n");
    let mut best: BTreeMap<&str, &RunSummary> = BTreeMap::new();
    for run in runs {
        let entry = best.entry(run.file_path.as_str()).or_insert(run);
        if run.profit > entry.profit {
            *entry = run;
        }
    }
    for (dataset, run) in &best {
        report.push_str(&format!("  {}: {:.2} ({})\n", dataset, run.profit, run.solver));
    }

    report
}
