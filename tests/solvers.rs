use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use wdp_solver::benchmark::{Benchmark, BenchmarkConfig};
use wdp_solver::harness::{RefineStep, RunHarness, RunStatus, Timeout};
use wdp_solver::heuristics::{ACOConfig, AntColonyOptimization, ConstructionHeuristic, GreedyHeuristic, RankingKey};
use wdp_solver::instance::AuctionInstance;
use wdp_solver::solver::{Solver, SolverConfig, SolverKind};
use wdp_solver::summary::SummaryStore;

const SCENARIO: &str = "4 6\n5 b c\n12 a b c\n8 a c\n8 a\n8 x c\n8 x\n";

const INDEXED: &str = "items 5 bids 7 #\n\
0# 6 i1 i2\n\
1# 4 i3\n\
2# 9 i1 i4\n\
3# 3 i5\n\
4# 7 i2 i3 i5\n\
5# 2 i4\n\
6# 5 i5 i1\n";

fn brute_force(instance: &AuctionInstance) -> f64 {
    let n = instance.num_bids();
    (0u32..(1 << n))
        .filter_map(|mask| {
            let mut claimed = HashSet::new();
            let mut profit = 0.0;
            for bid in instance.bids.iter().filter(|b| mask & (1 << b.id) != 0) {
                if !bid.items.iter().all(|&i| claimed.insert(i)) {
                    return None;
                }
                profit += bid.price;
            }
            Some(profit)
        })
        .fold(0.0, f64::max)
}

fn write_dataset(dir: &std::path::Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn greedy_profits_never_exceed_optimum() {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in [("scenario.txt", SCENARIO), ("indexed.txt", INDEXED)] {
        let instance = AuctionInstance::from_file(write_dataset(dir.path(), name, text)).unwrap();
        let optimum = brute_force(&instance);

        for key in RankingKey::ALL {
            let solution = GreedyHeuristic::new(key).construct(&instance);
            assert!(solution.feasible);
            assert!(solution.profit <= optimum + 1e-9, "{:?} on {}", key, name);
        }
    }
}

#[test]
fn indexed_dataset_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let instance = AuctionInstance::from_file(write_dataset(dir.path(), "indexed.txt", INDEXED)).unwrap();
    assert_eq!(instance.num_bids(), 7);
    assert_eq!(instance.num_items(), 5);
    assert_eq!(brute_force(&instance), 16.0);
}

#[test]
fn colony_feasible_profit_never_exceeds_optimum() {
    let dir = tempfile::tempdir().unwrap();
    let instance = AuctionInstance::from_file(write_dataset(dir.path(), "indexed.txt", INDEXED)).unwrap();
    let optimum = brute_force(&instance);

    let config = ACOConfig {
        ant_count: 50,
        seed: 3,
        ..Default::default()
    };
    let mut aco = AntColonyOptimization::new(&instance, config).unwrap();
    for _ in 0..20 {
        aco.step();
        assert!(aco.feasible_profit() <= optimum + 1e-9);
        assert!(aco.profit() >= aco.feasible_profit());
    }
}

#[test]
fn colony_run_is_reproducible() {
    let instance = Arc::new(AuctionInstance::from_bundles(
        "shared",
        vec![
            (vec!["a", "b"], 10.0),
            (vec!["b", "c"], 12.0),
            (vec!["c"], 5.0),
            (vec!["d"], 3.0),
        ],
    )
    .unwrap());

    let run = |parallel: bool| {
        let mut config = SolverConfig::default();
        config.aco.ant_count = 30;
        config.aco.greedy_power = 0.0;
        config.aco.parallel = parallel;
        let solver = Solver::build(SolverKind::AntColony, instance.clone(), &config).unwrap();
        let mut harness = RunHarness::new(solver, &instance, Timeout::parse("10").unwrap());
        let outcome = harness.run().unwrap();
        assert_eq!(outcome.status, RunStatus::Finished);
        (outcome.steps, harness.solver().solution().accepted)
    };

    assert_eq!(run(true), run(false));
}

#[test]
fn batch_run_writes_one_file_per_solver() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(data.join("cast")).unwrap();
    write_dataset(&data, "scenario.txt", SCENARIO);
    write_dataset(&data.join("cast"), "indexed.txt", INDEXED);

    let solvers = SolverKind::resolve(&["g_items", "g_big", "g_avg"]).unwrap();
    let mut config = BenchmarkConfig::new(solvers, Timeout::parse("2").unwrap(), dir.path().join("out"));
    config.show_progress = false;

    let mut benchmark = Benchmark::new(config).unwrap();
    assert_eq!(benchmark.run_on_directory(&data).unwrap(), 2);

    let summaries = SummaryStore::load_dir(dir.path().join("out")).unwrap();
    assert_eq!(summaries.len(), 3);
    for runs in summaries.values() {
        assert_eq!(runs.len(), 2);
        // smaller file first
        assert_eq!(runs[0].name, "scenario.txt");
        assert!(runs.iter().all(|r| r.status == "Finished" && r.timeout == 2.0));
    }

    let stats = benchmark.compute_statistics();
    assert_eq!(stats.len(), 3);
    assert!(benchmark.generate_report().contains("GreedyBigBet"));
}
