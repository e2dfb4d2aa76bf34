//! Solver registry.
//!
//! [`SolverKind`] is the tag users pick on the command line; [`Solver`] is the built
//! variant the [`RunHarness`](crate::harness::RunHarness) drives through [`RefineStep`].

use crate::error::{Result, WdpError};
use crate::exact::{ExactConfig, ExactResult, GurobiSolver};
use crate::harness::RefineStep;
use crate::heuristics::aco::{ACOConfig, AntColonyOptimization};
use crate::heuristics::construction::{ConstructionHeuristic, GreedyHeuristic, RankingKey};
use crate::instance::AuctionInstance;
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverKind {
    GreedyNumberOfItems,
    GreedyBigBet,
    GreedyAverageItemsPrice,
    AntColony,
    Exact,
}

impl SolverKind {
    pub const ALL: [SolverKind; 5] = [
        SolverKind::GreedyNumberOfItems,
        SolverKind::GreedyBigBet,
        SolverKind::GreedyAverageItemsPrice,
        SolverKind::AntColony,
        SolverKind::Exact,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::GreedyNumberOfItems => "GreedyNumberOfItems",
            SolverKind::GreedyBigBet => "GreedyBigBet",
            SolverKind::GreedyAverageItemsPrice => "GreedyAverageItemsPrice",
            SolverKind::AntColony => "AntColony",
            SolverKind::Exact => "Exact",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            SolverKind::GreedyNumberOfItems => "g_items",
            SolverKind::GreedyBigBet => "g_big",
            SolverKind::GreedyAverageItemsPrice => "g_avg",
            SolverKind::AntColony => "aco",
            SolverKind::Exact => "lp",
        }
    }

    pub fn ranking_key(&self) -> Option<RankingKey> {
        match self {
            SolverKind::GreedyNumberOfItems => Some(RankingKey::ByItemCount),
            SolverKind::GreedyBigBet => Some(RankingKey::ByPrice),
            SolverKind::GreedyAverageItemsPrice => Some(RankingKey::ByAverageItemPrice),
            SolverKind::AntColony | SolverKind::Exact => None,
        }
    }

    /// Resolve user supplied names; `ALL` expands to every solver.
    ///
    /// Any unknown name fails the whole request. Duplicates are dropped, first
    /// occurrence wins.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<SolverKind>> {
        let mut kinds = Vec::new();
        for name in names {
            let name = name.as_ref();
            let expanded: Vec<SolverKind> = if name.trim().eq_ignore_ascii_case("all") {
                Self::ALL.to_vec()
            } else {
                vec![name.parse()?]
            };
            for kind in expanded {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        if kinds.is_empty() {
            return Err(WdpError::config("no solver requested"));
        }
        Ok(kinds)
    }
}

impl FromStr for SolverKind {
    type Err = WdpError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s) || k.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                WdpError::config(format!(
                    "unknown solver '{}' (expected one of {}, or ALL)",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parameters of every solver family
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub aco: ACOConfig,
    pub exact: ExactConfig,
    /// Seed the exact backend with the average-item-price greedy packing
    pub warm_start: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            aco: ACOConfig::default(),
            exact: ExactConfig::default(),
            warm_start: true,
        }
    }
}

/// A solver bound to one instance
pub enum Solver {
    Greedy {
        heuristic: GreedyHeuristic,
        instance: Arc<AuctionInstance>,
        solution: Option<Solution>,
    },
    AntColony {
        engine: Box<AntColonyOptimization>,
    },
    Exact {
        backend: GurobiSolver,
        instance: Arc<AuctionInstance>,
        result: Option<ExactResult>,
    },
}

impl Solver {
    pub fn build(
        kind: SolverKind,
        instance: Arc<AuctionInstance>,
        config: &SolverConfig,
    ) -> Result<Self> {
        let solver = match kind {
            SolverKind::GreedyNumberOfItems
            | SolverKind::GreedyBigBet
            | SolverKind::GreedyAverageItemsPrice => Solver::Greedy {
                heuristic: GreedyHeuristic::new(
                    kind.ranking_key().unwrap_or(RankingKey::ByPrice),
                ),
                instance,
                solution: None,
            },
            SolverKind::AntColony => Solver::AntColony {
                engine: Box::new(AntColonyOptimization::new(&instance, config.aco.clone())?),
            },
            SolverKind::Exact => {
                let mut exact = config.exact.clone();
                if config.warm_start && exact.warm_start.is_none() {
                    let packing = GreedyHeuristic::by_average_item_price().construct(&instance);
                    log::debug!("Warm start with {} bids, profit {}", packing.accepted.len(), packing.profit);
                    exact.warm_start = Some(packing.accepted);
                }
                Solver::Exact {
                    backend: GurobiSolver::new(exact),
                    instance,
                    result: None,
                }
            }
        };
        Ok(solver)
    }

    pub fn kind(&self) -> SolverKind {
        match self {
            Solver::Greedy { heuristic, .. } => match heuristic.key {
                RankingKey::ByPrice => SolverKind::GreedyBigBet,
                RankingKey::ByItemCount => SolverKind::GreedyNumberOfItems,
                RankingKey::ByAverageItemPrice => SolverKind::GreedyAverageItemsPrice,
            },
            Solver::AntColony { .. } => SolverKind::AntColony,
            Solver::Exact { .. } => SolverKind::Exact,
        }
    }

    pub fn exact_result(&self) -> Option<&ExactResult> {
        match self {
            Solver::Exact { result, .. } => result.as_ref(),
            _ => None,
        }
    }
}

impl RefineStep for Solver {
    fn name(&self) -> &str {
        self.kind().name()
    }

    fn refine(&mut self, remaining: Duration) -> Result<bool> {
        match self {
            Solver::Greedy {
                heuristic,
                instance,
                solution,
            } => {
                if solution.is_none() {
                    *solution = Some(heuristic.construct(instance));
                }
                Ok(false)
            }
            Solver::AntColony { engine } => Ok(engine.step().progress),
            Solver::Exact {
                backend,
                instance,
                result,
            } => {
                if result.is_none() {
                    backend.config.time_limit = remaining.as_secs_f64();
                    *result = Some(backend.solve(instance)?);
                }
                Ok(false)
            }
        }
    }

    fn profit(&self) -> f64 {
        match self {
            Solver::Greedy { solution, .. } => solution.as_ref().map_or(0.0, |s| s.profit),
            Solver::AntColony { engine } => engine.profit(),
            Solver::Exact { result, .. } => result.as_ref().map_or(0.0, |r| r.solution.profit),
        }
    }

    fn feasible_profit(&self) -> Option<f64> {
        match self {
            Solver::AntColony { engine } => Some(engine.feasible_profit()),
            _ => None,
        }
    }

    fn native_status(&self) -> Option<String> {
        self.exact_result().map(|r| r.status.clone())
    }

    fn solution(&self) -> Solution {
        match self {
            Solver::Greedy { solution, .. } => solution.clone().unwrap_or_default(),
            Solver::AntColony { engine } => engine.best_solution(),
            Solver::Exact { result, .. } => result
                .as_ref()
                .map(|r| r.solution.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{RunHarness, RunStatus, Timeout};
    use crate::instance::tests::scenario_instance;

    #[test]
    fn test_names_and_aliases() {
        assert_eq!("GreedyBigBet".parse::<SolverKind>().unwrap(), SolverKind::GreedyBigBet);
        assert_eq!("G_AVG".parse::<SolverKind>().unwrap(), SolverKind::GreedyAverageItemsPrice);
        assert_eq!(" aco ".parse::<SolverKind>().unwrap(), SolverKind::AntColony);
        assert_eq!("lp".parse::<SolverKind>().unwrap(), SolverKind::Exact);
        for kind in SolverKind::ALL {
            assert_eq!(kind.name().parse::<SolverKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_resolve() {
        assert_eq!(SolverKind::resolve(&["ALL"]).unwrap().len(), 5);
        assert_eq!(
            SolverKind::resolve(&["g_big", "GreedyBigBet", "aco"]).unwrap(),
            vec![SolverKind::GreedyBigBet, SolverKind::AntColony]
        );
        assert!(matches!(
            SolverKind::resolve(&["g_big", "simplex"]),
            Err(WdpError::Config(_))
        ));
        assert!(SolverKind::resolve::<&str>(&[]).is_err());
    }

    #[test]
    fn test_greedy_through_harness() {
        let instance = Arc::new(scenario_instance());
        let solver =
            Solver::build(SolverKind::GreedyBigBet, instance.clone(), &SolverConfig::default())
                .unwrap();
        let mut harness = RunHarness::new(solver, &instance, Timeout::parse("5").unwrap());

        let outcome = harness.run().unwrap();
        assert_eq!(outcome.status, RunStatus::Finished);
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.profit, 20.0);

        let summary = harness.summary();
        assert_eq!(summary.solver, "GreedyBigBet");
        assert_eq!(summary.status, "Finished");
        assert_eq!(harness.solver().solution().accepted, vec![1, 5]);
    }

    #[test]
    fn test_ant_colony_through_harness() {
        let instance = Arc::new(scenario_instance());
        let config = SolverConfig {
            aco: ACOConfig {
                ant_count: 10,
                greedy_power: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let solver = Solver::build(SolverKind::AntColony, instance.clone(), &config).unwrap();
        let mut harness = RunHarness::new(solver, &instance, Timeout::parse("5").unwrap());

        // without the greedy term the colony runs out of candidates quickly
        let outcome = harness.run().unwrap();
        assert_eq!(outcome.status, RunStatus::Finished);
        assert!(outcome.steps <= instance.num_bids() + 1);

        let summary = harness.summary();
        assert_eq!(summary.epochs, Some(outcome.steps));
        assert_eq!(summary.feasible_profit, Some(summary.profit));
        assert!(summary.profit <= 21.0);
    }

    #[test]
    fn test_exact_is_seeded_with_greedy_packing() {
        let instance = Arc::new(scenario_instance());
        let warm_start = |config: &SolverConfig| {
            match Solver::build(SolverKind::Exact, instance.clone(), config).unwrap() {
                Solver::Exact { backend, .. } => backend.config.warm_start,
                _ => panic!("expected the exact variant"),
            }
        };

        assert_eq!(warm_start(&SolverConfig::default()), Some(vec![3, 5, 0]));

        let cold = SolverConfig {
            warm_start: false,
            ..Default::default()
        };
        assert_eq!(warm_start(&cold), None);

        let mut given = SolverConfig::default();
        given.exact.warm_start = Some(vec![1]);
        assert_eq!(warm_start(&given), Some(vec![1]));
    }

    #[test]
    fn test_invalid_aco_config_fails_build() {
        let config = SolverConfig {
            aco: ACOConfig {
                ant_count: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = Solver::build(SolverKind::AntColony, Arc::new(scenario_instance()), &config);
        assert!(matches!(result, Err(WdpError::Config(_))));
    }
}
