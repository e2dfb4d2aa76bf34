//! Winner Determination Solver - Command Line Interface
//!
//! Runs greedy, ant colony and exact solvers over combinatorial auction datasets.

use clap::{Args, Parser, Subcommand, ValueEnum};
use wdp_solver::benchmark::{
    compute_statistics, render_report, write_runs_csv, write_statistics_csv, Benchmark, BenchmarkConfig,
};
use wdp_solver::error::{Result, WdpError};
use wdp_solver::exact::{default_model_name, write_lp_file, write_mps_file};
use wdp_solver::harness::{RefineStep, RunHarness, Timeout};
use wdp_solver::heuristics::aco::ACOConfig;
use wdp_solver::instance::AuctionInstance;
use wdp_solver::solver::{Solver, SolverConfig, SolverKind};
use wdp_solver::summary::{markdown_table, RunSummary, SummaryStore};
use wdp_solver::visualization::Visualizer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "wdp-solver")]
#[command(version = "1.0")]
#[command(about = "Winner determination for combinatorial auctions")]
struct Cli {
    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Ant colony and exact solver parameters
#[derive(Args, Clone)]
struct SolverArgs {
    /// Number of ants
    #[arg(long, default_value = "1000")]
    ants: usize,

    /// Fraction of pheromone lost per epoch
    #[arg(long, default_value = "0.9")]
    decay: f64,

    /// Exponent of the masked pheromone
    #[arg(long, default_value = "0.5")]
    pheromone_power: f64,

    /// Weight of the average item price
    #[arg(long, default_value = "0.5")]
    greedy_power: f64,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Build ants on a single thread
    #[arg(long)]
    sequential: bool,

    /// Start the exact solver without a greedy packing
    #[arg(long)]
    no_warm_start: bool,
}

impl SolverArgs {
    fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            aco: ACOConfig {
                ant_count: self.ants,
                pheromone_decay: self.decay,
                pheromone_power: self.pheromone_power,
                greedy_power: self.greedy_power,
                seed: self.seed,
                parallel: !self.sequential,
            },
            warm_start: !self.no_warm_start,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run solvers over every dataset of a directory
    Run {
        /// Solver names or aliases, or ALL
        #[arg(short, long, num_args = 1.., required = true)]
        solver: Vec<String>,

        /// Dataset directory
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Time budget per run, in seconds
        #[arg(short, long)]
        timeout: Option<String>,

        /// Runs per solver and dataset
        #[arg(short, long, default_value = "1")]
        repeats: usize,

        /// Directory of the summary files
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        #[command(flatten)]
        solver_args: SolverArgs,
    },

    /// Solve a single dataset
    Solve {
        /// Bid file
        #[arg(short, long)]
        instance: PathBuf,

        /// Solver name or alias
        #[arg(short, long, default_value = "aco")]
        solver: String,

        /// Time budget, in seconds
        #[arg(short, long)]
        timeout: Option<String>,

        /// Append the run summary to this directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the solution as JSON
        #[arg(long)]
        solution: Option<PathBuf>,

        #[command(flatten)]
        solver_args: SolverArgs,
    },

    /// Print instance statistics
    Analyze {
        /// Bid file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Markdown table, statistics and report of summary files
    Report {
        /// Summary file or directory of summary files
        #[arg(short, long, default_value = "results")]
        summary: PathBuf,

        /// Markdown destination
        #[arg(short, long, default_value = "results.md")]
        output: PathBuf,

        /// Also write per-solver statistics as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Also write one CSV row per run
        #[arg(long)]
        runs: Option<PathBuf>,
    },

    /// Draw charts of a directory of summary files
    Plot {
        /// Directory of summary files
        #[arg(short, long, default_value = "results")]
        summary: PathBuf,

        /// Chart directory
        #[arg(short, long, default_value = "plots")]
        output: PathBuf,

        /// Also render PNG files
        #[arg(long)]
        png: bool,
    },

    /// Write the integer program of a dataset as LP and MPS files
    Export {
        /// Bid file
        #[arg(short, long)]
        instance: PathBuf,

        /// Model directory
        #[arg(short, long, default_value = "models")]
        output: PathBuf,

        /// Model name, `model_<timestamp>` by default
        #[arg(short, long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.as_filter()),
    )
    .init();

    if let Err(e) = execute(cli.command) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run { solver, data, timeout, repeats, output, no_progress, solver_args } => {
            run_batch(&solver, &data, timeout.as_deref(), repeats, output, !no_progress, &solver_args)
        }
        Commands::Solve { instance, solver, timeout, output, solution, solver_args } => {
            solve_instance(&instance, &solver, timeout.as_deref(), output, solution, &solver_args)
        }
        Commands::Analyze { instance } => analyze_instance(&instance),
        Commands::Report { summary, output, csv, runs } => write_report(&summary, &output, csv, runs),
        Commands::Plot { summary, output, png } => plot_summaries(&summary, &output, png),
        Commands::Export { instance, output, name } => {
            let instance = AuctionInstance::from_file(&instance)?;
            let name = name.unwrap_or_else(default_model_name);
            let lp = write_lp_file(&instance, &output, Some(&name))?;
            let mps = write_mps_file(&instance, &output, Some(&name))?;
            println!("Model written to {:?} and {:?}", lp, mps);
            Ok(())
        }
    }
}

fn parse_timeout(timeout: Option<&str>) -> Result<Timeout> {
    match timeout {
        Some(text) => Timeout::parse(text),
        None => Timeout::from_secs_f64(None),
    }
}

fn run_batch(
    names: &[String],
    data: &Path,
    timeout: Option<&str>,
    repeats: usize,
    output: PathBuf,
    show_progress: bool,
    solver_args: &SolverArgs,
) -> Result<()> {
    // everything is validated before the first dataset is touched
    let solvers = SolverKind::resolve(names)?;
    let timeout = parse_timeout(timeout)?;

    let mut config = BenchmarkConfig::new(solvers, timeout, output.clone());
    config.repeats = repeats;
    config.solver = solver_args.solver_config();
    config.show_progress = show_progress;

    let mut benchmark = Benchmark::new(config)?;
    let processed = benchmark.run_on_directory(data)?;
    println!("\nProcessed {} datasets ({} skipped)", processed, benchmark.skipped().len());

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let runs_path = output.join("runs.csv");
    benchmark.export_to_csv(&runs_path)?;
    println!("Runs exported to {:?}", runs_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);
    Ok(())
}

fn solve_instance(
    path: &Path,
    name: &str,
    timeout: Option<&str>,
    output: Option<PathBuf>,
    solution_path: Option<PathBuf>,
    solver_args: &SolverArgs,
) -> Result<()> {
    let kind: SolverKind = name.parse()?;
    let timeout = parse_timeout(timeout)?;
    let store = output.map(SummaryStore::new).transpose()?;

    println!("Loading instance from {:?}...", path);
    let instance = Arc::new(AuctionInstance::from_file(path)?);
    println!("{}", instance.statistics());

    let solver = Solver::build(kind, instance.clone(), &solver_args.solver_config())?;
    let mut harness = RunHarness::new(solver, &instance, timeout);

    println!("\nSolving with {}...", kind);
    harness.run()?;
    harness.log_summary();

    let solution = harness.solver().solution();
    println!("\n{}", solution);

    if let Some(store) = store {
        store.append(&harness.summary())?;
        println!("Summary appended to {:?}", store.path_for(kind.name()));
    }
    if let Some(path) = solution_path {
        std::fs::write(&path, serde_json::to_string_pretty(&solution)?)?;
        println!("Solution saved to {:?}", path);
    }
    Ok(())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let instance = AuctionInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let by_item = instance.bids_by_item();
    let most_contested = by_item
        .iter()
        .enumerate()
        .max_by_key(|(_, bids)| bids.len())
        .map(|(item, bids)| (instance.item_name(item), bids.len()));
    if let Some((item, count)) = most_contested {
        println!("\nMost contested item: {} ({} bids)", item, count);
    }

    Ok(())
}

fn load_summaries(path: &Path) -> Result<Vec<RunSummary>> {
    if path.is_dir() {
        Ok(SummaryStore::load_dir(path)?.into_values().flatten().collect())
    } else {
        Ok(SummaryStore::load(path)?.models)
    }
}

fn write_report(
    summary: &Path,
    output: &Path,
    csv: Option<PathBuf>,
    runs_csv: Option<PathBuf>,
) -> Result<()> {
    if !summary.exists() {
        return Err(WdpError::config(format!("{} does not exist", summary.display())));
    }
    let runs = load_summaries(summary)?;

    std::fs::write(output, markdown_table(&runs))?;
    println!("Markdown table written to {:?}", output);

    let stats = compute_statistics(&runs);
    if let Some(path) = csv {
        write_statistics_csv(&stats, &path)?;
        println!("Statistics exported to {:?}", path);
    }
    if let Some(path) = runs_csv {
        write_runs_csv(&runs, &path)?;
        println!("Runs exported to {:?}", path);
    }
    println!("\n{}", render_report(&stats, &runs));
    Ok(())
}

fn plot_summaries(summary: &Path, output: &Path, png: bool) -> Result<()> {
    if output.exists() && !output.is_dir() {
        return Err(WdpError::config(format!(
            "output path {} exists and is not a directory",
            output.display()
        )));
    }
    std::fs::create_dir_all(output)?;

    let runs = load_summaries(summary)?;
    let stats = compute_statistics(&runs);
    let viz = Visualizer::new();

    let charts = [
        ("total_profit", viz.profit_chart(&stats)),
        ("mean_vs_median", viz.mean_median_chart(&stats)),
        ("min_max", viz.min_max_chart(&stats)),
        ("total_time", viz.time_chart(&stats)),
        ("time_percentiles", viz.percentile_chart(&stats)),
        ("data_distribution", viz.distribution_chart(&runs)),
    ];

    for (name, svg) in &charts {
        let svg_path = output.join(format!("{}.svg", name));
        viz.save_svg(svg, &svg_path)?;
        println!("Chart saved to {:?}", svg_path);

        if png {
            let png_path = output.join(format!("{}.png", name));
            match viz.save_png(svg, &png_path) {
                Ok(()) => println!("PNG saved to {:?}", png_path),
                Err(e) => log::warn!("PNG conversion failed for {}: {}", name, e),
            }
        }
    }
    Ok(())
}
