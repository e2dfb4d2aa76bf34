//! Ant Colony Optimization for the WDP.
//!
//! Bids are ranked once by average item price; that order is frozen for the run and
//! a bid's position in it is the key of its pheromone entry. Every epoch each ant
//! appends exactly one bid to its own trajectory, drawn with probability proportional to
//!
//! ```text
//! d[i] = masked_pheromone[i] ^ pheromone_power + average_item_price[i] * greedy_power
//! ```
//!
//! where the pheromone term is zeroed for bids conflicting with the ant's trajectory but
//! the greedy term is not. Conflicting bids can therefore be drawn whenever
//! `greedy_power > 0`, so an ant's raw fitness is only an optimistic figure; the
//! profit of its longest conflict-free prefix is tracked next to it.
//!
//! After all ants moved, the best ant's newly appended bid is reinforced by the best
//! fitness, the trail is normalized to sum to one and then evaporated.

use crate::conflict::{has_conflict, AcceptedSet};
use crate::error::{Result, WdpError};
use crate::instance::{AuctionInstance, Bid};
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Reverse;

/// ACO configuration parameters
#[derive(Debug, Clone)]
pub struct ACOConfig {
    /// Number of ants
    pub ant_count: usize,
    /// Fraction of pheromone lost each epoch, in [0, 1]
    pub pheromone_decay: f64,
    /// Exponent applied to the masked pheromone
    pub pheromone_power: f64,
    /// Weight of the average item price
    pub greedy_power: f64,
    /// Random seed
    pub seed: u64,
    /// Build the ants' moves on the rayon pool
    pub parallel: bool,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            ant_count: 1000,
            pheromone_decay: 0.9,
            pheromone_power: 0.5,
            greedy_power: 0.5,
            seed: 42,
            parallel: true,
        }
    }
}

impl ACOConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ant_count == 0 {
            return Err(WdpError::config("ant count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.pheromone_decay) {
            return Err(WdpError::config(format!(
                "pheromone decay must lie in [0, 1], got {}",
                self.pheromone_decay
            )));
        }
        if !(self.pheromone_power >= 0.0 && self.pheromone_power.is_finite()) {
            return Err(WdpError::config(format!(
                "pheromone power must be a finite value >= 0, got {}",
                self.pheromone_power
            )));
        }
        if !(self.greedy_power >= 0.0 && self.greedy_power.is_finite()) {
            return Err(WdpError::config(format!(
                "greedy power must be a finite value >= 0, got {}",
                self.greedy_power
            )));
        }
        Ok(())
    }
}

/// A bid together with its price per item
#[derive(Debug, Clone)]
pub struct EnhancedBid {
    pub bid: Bid,
    pub average_item_price: f64,
}

/// Bids sorted by descending average item price, ties in insertion order
pub fn enhance_bids(instance: &AuctionInstance) -> Vec<EnhancedBid> {
    let mut enhanced: Vec<EnhancedBid> = instance
        .bids
        .iter()
        .map(|bid| EnhancedBid {
            average_item_price: bid.average_item_price(),
            bid: bid.clone(),
        })
        .collect();
    enhanced.sort_by_key(|e| Reverse(OrderedFloat(e.average_item_price)));
    enhanced
}

/// Per-bid desirability, indexed like the enhanced bid list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PheromoneTrail {
    values: Vec<f64>,
}

impl PheromoneTrail {
    /// One entry of 1.0 per bid
    pub fn new(len: usize) -> Self {
        PheromoneTrail { values: vec![1.0; len] }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        PheromoneTrail { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reinforce(&mut self, index: usize, amount: f64) {
        self.values[index] += amount;
    }

    /// Rescale so the entries sum to one; an all-zero trail is left untouched
    pub fn normalize(&mut self) {
        let total: f64 = self.values.iter().sum();
        if total > 0.0 && total.is_finite() {
            for value in &mut self.values {
                *value /= total;
            }
        }
    }

    pub fn evaporate(&mut self, decay: f64) {
        let keep = 1.0 - decay;
        for value in &mut self.values {
            *value *= keep;
        }
    }
}

/// Outcome of one ant's move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntStep {
    /// At least one candidate had non-zero masked pheromone
    pub progress: bool,
    /// Enhanced index of the bid appended this epoch
    pub appended: Option<usize>,
}

/// One trajectory; it only grows over the run
#[derive(Debug, Clone)]
pub struct Ant {
    /// Member keys are enhanced bid indices
    accepted: AcceptedSet,
    rng: ChaCha8Rng,
}

impl Ant {
    /// Ant with its own random stream derived from `seed`
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Ant {
            accepted: AcceptedSet::new(),
            rng,
        }
    }

    pub fn accepted(&self) -> &AcceptedSet {
        &self.accepted
    }

    /// Raw sum of chosen prices, conflicts included
    pub fn fitness(&self) -> f64 {
        self.accepted.profit()
    }

    pub fn feasible_profit(&self) -> f64 {
        self.accepted.feasible_profit()
    }

    /// Draw and append one bid according to the shared trail
    pub fn construct_step(
        &mut self,
        bids: &[EnhancedBid],
        trail: &[f64],
        config: &ACOConfig,
    ) -> AntStep {
        let mut progress = false;
        let mut weights = Vec::with_capacity(bids.len());

        for (candidate, &pheromone) in bids.iter().zip(trail) {
            let masked = if has_conflict(&candidate.bid.items, &self.accepted) {
                0.0
            } else {
                pheromone
            };
            if masked != 0.0 {
                progress = true;
            }
            // the greedy term is deliberately left unmasked
            weights.push(
                masked.powf(config.pheromone_power)
                    + candidate.average_item_price * config.greedy_power,
            );
        }

        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return AntStep {
                progress: false,
                appended: None,
            };
        }

        let distribution = match WeightedIndex::new(weights.iter().map(|w| w / total)) {
            Ok(distribution) => distribution,
            Err(_) => {
                return AntStep {
                    progress: false,
                    appended: None,
                }
            }
        };
        let index = distribution.sample(&mut self.rng);
        self.accepted.push(index, &bids[index].bid);

        AntStep {
            progress,
            appended: Some(index),
        }
    }
}

/// Mutable colony state threaded through [`step_epoch`]
#[derive(Debug, Clone, Default)]
pub struct ColonyState {
    pub trail: PheromoneTrail,
    pub ants: Vec<Ant>,
    pub epoch: usize,
}

impl ColonyState {
    pub fn new(num_bids: usize, config: &ACOConfig) -> Self {
        ColonyState {
            trail: PheromoneTrail::new(num_bids),
            ants: (0..config.ant_count)
                .map(|i| Ant::new(config.seed, i as u64))
                .collect(),
            epoch: 0,
        }
    }

    /// Index of the first ant with maximum raw fitness
    pub fn best_ant(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, ant) in self.ants.iter().enumerate() {
            let fitness = ant.fitness();
            if best.map_or(true, |(_, b)| fitness > b) {
                best = Some((index, fitness));
            }
        }
        best.map(|(index, _)| index)
    }
}

/// What happened during one epoch
#[derive(Debug, Clone)]
pub struct EpochReport {
    /// Logical OR of the ants' progress flags
    pub progress: bool,
    pub best_ant: Option<usize>,
    pub best_fitness: f64,
    /// Trail entry that received the reinforcement
    pub reinforced: Option<usize>,
    /// Per-ant appended bid
    pub appended: Vec<Option<usize>>,
}

/// Advance the colony by one epoch.
///
/// Ants only read the trail while building their move, so that phase runs in
/// parallel when requested; the trail update afterwards happens exactly once.
pub fn step_epoch(
    mut state: ColonyState,
    bids: &[EnhancedBid],
    config: &ACOConfig,
) -> (ColonyState, EpochReport) {
    let trail = state.trail.values();
    let steps: Vec<AntStep> = if config.parallel {
        state
            .ants
            .par_iter_mut()
            .map(|ant| ant.construct_step(bids, trail, config))
            .collect()
    } else {
        state
            .ants
            .iter_mut()
            .map(|ant| ant.construct_step(bids, trail, config))
            .collect()
    };

    let best_ant = state.best_ant();
    let best_fitness = best_ant.map_or(0.0, |i| state.ants[i].fitness());
    let reinforced = best_ant.and_then(|i| steps[i].appended);

    if let Some(index) = reinforced {
        state.trail.reinforce(index, best_fitness);
    }
    state.trail.normalize();
    state.trail.evaporate(config.pheromone_decay);
    state.epoch += 1;

    let report = EpochReport {
        progress: steps.iter().any(|s| s.progress),
        best_ant,
        best_fitness,
        reinforced,
        appended: steps.iter().map(|s| s.appended).collect(),
    };
    (state, report)
}

/// Ant Colony Optimization solver
pub struct AntColonyOptimization {
    config: ACOConfig,
    bids: Vec<EnhancedBid>,
    state: ColonyState,
}

impl AntColonyOptimization {
    pub fn new(instance: &AuctionInstance, config: ACOConfig) -> Result<Self> {
        config.validate()?;
        let bids = enhance_bids(instance);
        let state = ColonyState::new(bids.len(), &config);

        Ok(AntColonyOptimization {
            config,
            bids,
            state,
        })
    }

    /// Run one epoch
    pub fn step(&mut self) -> EpochReport {
        let state = std::mem::take(&mut self.state);
        let (state, report) = step_epoch(state, &self.bids, &self.config);
        self.state = state;

        log::debug!(
            "ACO epoch {}: best fitness {:.2}, reinforced {:?}, progress {}",
            self.state.epoch,
            report.best_fitness,
            report.reinforced,
            report.progress
        );
        report
    }

    /// Maximum raw fitness over all ants
    pub fn profit(&self) -> f64 {
        self.state
            .ants
            .iter()
            .map(Ant::fitness)
            .fold(0.0, f64::max)
    }

    /// Maximum conflict-free prefix profit over all ants
    pub fn feasible_profit(&self) -> f64 {
        self.state
            .ants
            .iter()
            .map(Ant::feasible_profit)
            .fold(0.0, f64::max)
    }

    /// Trajectory of the ant with the highest raw fitness, as bid ids
    pub fn best_solution(&self) -> Solution {
        let mut solution = match self.state.best_ant() {
            Some(index) => {
                let ant = &self.state.ants[index];
                let mut solution = Solution::from_accepted(ant.accepted(), "AntColony");
                solution.accepted = ant
                    .accepted()
                    .members()
                    .iter()
                    .map(|&k| self.bids[k].bid.id)
                    .collect();
                solution
            }
            None => Solution {
                algorithm: "AntColony".to_string(),
                ..Solution::new()
            },
        };
        solution.iterations = Some(self.state.epoch);
        solution
    }

    pub fn config(&self) -> &ACOConfig {
        &self.config
    }

    pub fn trail(&self) -> &PheromoneTrail {
        &self.state.trail
    }

    pub fn enhanced_bids(&self) -> &[EnhancedBid] {
        &self.bids
    }

    pub fn ants(&self) -> &[Ant] {
        &self.state.ants
    }

    pub fn epochs(&self) -> usize {
        self.state.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::tests::random_instance;
    use crate::instance::tests::{brute_force_optimum, scenario_instance};
    use approx::assert_relative_eq;

    fn config(ant_count: usize, greedy_power: f64) -> ACOConfig {
        ACOConfig {
            ant_count,
            greedy_power,
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_trail_shape() {
        let instance = scenario_instance();
        let aco = AntColonyOptimization::new(&instance, config(3, 0.5)).unwrap();

        assert_eq!(aco.trail().len(), instance.num_bids());
        assert!(aco.trail().values().iter().all(|&v| v == 1.0));

        let order: Vec<usize> = aco.enhanced_bids().iter().map(|e| e.bid.id).collect();
        assert_eq!(order, vec![3, 5, 1, 2, 4, 0]);
        assert!(aco
            .enhanced_bids()
            .windows(2)
            .all(|w| w[0].average_item_price >= w[1].average_item_price));
    }

    #[test]
    fn test_trail_shape_is_stable_across_epochs() {
        let instance = random_instance(5, 30, 10);
        let mut aco = AntColonyOptimization::new(&instance, config(4, 0.5)).unwrap();
        let before: Vec<usize> = aco.enhanced_bids().iter().map(|e| e.bid.id).collect();
        for _ in 0..5 {
            aco.step();
            assert_eq!(aco.trail().len(), 30);
        }
        let after: Vec<usize> = aco.enhanced_bids().iter().map(|e| e.bid.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_evaporation_is_monotonic() {
        let decay = 0.25;
        let mut trail = PheromoneTrail::from_values(vec![0.2, 0.3, 0.5]);
        for _ in 0..5 {
            let before = trail.values().to_vec();
            trail.evaporate(decay);
            for (old, new) in before.iter().zip(trail.values()) {
                assert!(new < old);
                assert_relative_eq!(*new, old * (1.0 - decay));
            }
        }
    }

    #[test]
    fn test_trail_update_sums_to_remaining_fraction() {
        let instance = scenario_instance();
        let mut aco = AntColonyOptimization::new(&instance, config(5, 0.5)).unwrap();
        aco.step();
        let total: f64 = aco.trail().values().iter().sum();
        assert_relative_eq!(total, 1.0 - aco.config().pheromone_decay, epsilon = 1e-12);
    }

    #[test]
    fn test_single_ant_pure_exploitation_reinforces_its_own_bid() {
        let instance = random_instance(11, 25, 8);
        let mut aco = AntColonyOptimization::new(&instance, config(1, 0.0)).unwrap();

        for _ in 0..10 {
            let report = aco.step();
            assert_eq!(report.reinforced, report.appended[0]);
            if !report.progress {
                break;
            }
        }
        // without the greedy term conflicting bids are never drawn
        assert!(aco.best_solution().feasible);
    }

    #[test]
    fn test_degenerate_epoch_reports_no_progress() {
        let instance =
            AuctionInstance::from_bundles("shared", vec![(vec!["a"], 10.0), (vec!["a", "b"], 18.0)])
                .unwrap();
        let mut aco = AntColonyOptimization::new(&instance, config(2, 0.0)).unwrap();

        let first = aco.step();
        assert!(first.progress);
        assert!(first.appended.iter().all(Option::is_some));

        // every candidate now conflicts and the greedy term is off: all weights are zero
        let second = aco.step();
        assert!(!second.progress);
        assert!(second.appended.iter().all(Option::is_none));
        assert_eq!(second.reinforced, None);
        assert_eq!(aco.profit(), aco.feasible_profit());
    }

    #[test]
    fn test_raw_fitness_can_exceed_feasible_profit() {
        // both bids share item "a": any second draw conflicts
        let instance =
            AuctionInstance::from_bundles("shared", vec![(vec!["a"], 10.0), (vec!["a", "b"], 18.0)])
                .unwrap();
        let mut aco = AntColonyOptimization::new(&instance, config(3, 1000.0)).unwrap();

        aco.step();
        let report = aco.step();
        assert!(!report.progress);
        assert!(report.appended.iter().all(Option::is_some));

        for ant in aco.ants() {
            assert!(ant.fitness() > ant.feasible_profit());
            assert!(!ant.accepted().is_feasible());
        }
        assert!(aco.profit() >= 20.0);
        assert!(aco.feasible_profit() <= 18.0);
        assert!(!aco.best_solution().feasible);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let instance = random_instance(3, 40, 12);
        let sequential = ACOConfig {
            ant_count: 16,
            seed: 9,
            parallel: false,
            ..Default::default()
        };
        let parallel = ACOConfig {
            parallel: true,
            ..sequential.clone()
        };

        let mut a = AntColonyOptimization::new(&instance, sequential).unwrap();
        let mut b = AntColonyOptimization::new(&instance, parallel).unwrap();
        for _ in 0..6 {
            a.step();
            b.step();
        }
        assert_eq!(a.profit(), b.profit());
        assert_eq!(a.trail(), b.trail());
        assert_eq!(a.best_solution().accepted, b.best_solution().accepted);
    }

    #[test]
    fn test_feasible_profit_never_exceeds_optimum() {
        for seed in 0..4 {
            let instance = random_instance(seed, 10, 6);
            let optimum = brute_force_optimum(&instance);
            let mut aco = AntColonyOptimization::new(&instance, config(8, 0.5)).unwrap();
            for _ in 0..8 {
                aco.step();
            }
            assert!(aco.feasible_profit() <= optimum + 1e-9);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let instance = scenario_instance();
        for bad in [
            config(0, 0.5),
            ACOConfig { pheromone_decay: 1.5, ..config(1, 0.5) },
            ACOConfig { pheromone_power: -1.0, ..config(1, 0.5) },
            config(1, f64::NAN),
        ] {
            assert!(matches!(
                AntColonyOptimization::new(&instance, bad),
                Err(WdpError::Config(_))
            ));
        }
    }
}
