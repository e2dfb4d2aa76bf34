//! Winner Determination Solver Library
//!
//! Computes high-value, conflict-free sets of bids in combinatorial auctions: each bid
//! requests an exclusive bundle of items at a price, and no item may be won twice.
//!
//! # Features
//!
//! - Three greedy construction heuristics (by price, item count, average item price)
//! - Ant Colony Optimization with an elitist pheromone trail
//! - Exact integer program solved with Gurobi, exportable as an LP file
//! - Time-budgeted run harness, batch benchmarking, summaries and charts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wdp_solver::harness::{RefineStep, RunHarness, Timeout};
//! use wdp_solver::instance::AuctionInstance;
//! use wdp_solver::solver::{Solver, SolverConfig, SolverKind};
//!
//! let instance = Arc::new(AuctionInstance::from_file("arbitrary_40.txt").unwrap());
//! let solver = Solver::build(SolverKind::AntColony, instance.clone(), &SolverConfig::default()).unwrap();
//!
//! let mut harness = RunHarness::new(solver, &instance, Timeout::parse("5").unwrap());
//! harness.run().unwrap();
//!
//! println!("{}", harness.solver().solution());
//! ```

pub mod benchmark;
pub mod conflict;
pub mod error;
pub mod exact;
pub mod harness;
pub mod heuristics;
pub mod instance;
pub mod solution;
pub mod solver;
pub mod summary;
pub mod visualization;

pub use error::{Result, WdpError};
pub use instance::{AuctionInstance, Bid};
pub use solution::Solution;
