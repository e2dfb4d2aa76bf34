//! Solution representation for the winner determination problem.
//!
//! A solution is the ordered list of winning bid ids together with its raw profit,
//! the profit of its longest conflict-free prefix and a feasibility flag.

use crate::conflict::AcceptedSet;
use crate::instance::AuctionInstance;
use serde::{Deserialize, Serialize};

/// Represents a solution to the WDP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Accepted bid ids, in acceptance order
    pub accepted: Vec<usize>,
    /// Raw sum of accepted bid prices
    pub profit: f64,
    /// Profit of the longest conflict-free prefix of `accepted`
    pub feasible_profit: f64,
    /// Whether no two accepted bids share an item
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (epochs) if applicable
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            accepted: Vec::new(),
            profit: 0.0,
            feasible_profit: 0.0,
            feasible: true,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from an accepted set whose member keys are bid ids
    pub fn from_accepted(accepted: &AcceptedSet, algorithm: &str) -> Self {
        Solution {
            accepted: accepted.members().to_vec(),
            profit: accepted.profit(),
            feasible_profit: accepted.feasible_profit(),
            feasible: accepted.is_feasible(),
            algorithm: algorithm.to_string(),
            ..Self::new()
        }
    }

    /// Create a solution from a list of bid ids, re-checking conflicts
    pub fn from_bids(instance: &AuctionInstance, bids: Vec<usize>, algorithm: &str) -> Self {
        let mut accepted = AcceptedSet::new();
        for &id in &bids {
            accepted.push(id, &instance.bids[id]);
        }
        Self::from_accepted(&accepted, algorithm)
    }

    /// Recompute profit and feasibility against the instance
    pub fn validate(&mut self, instance: &AuctionInstance) {
        let checked = Self::from_bids(instance, self.accepted.clone(), &self.algorithm);
        self.profit = checked.profit;
        self.feasible_profit = checked.feasible_profit;
        self.feasible = checked.feasible;
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Profit: {:.2}", self.profit)?;
        if !self.feasible {
            writeln!(f, "  Feasible profit: {:.2}", self.feasible_profit)?;
        }
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        write!(f, "  Accepted bids: {:?}", self.accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::scenario_instance;

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.accepted.is_empty());
        assert!(sol.feasible);
        assert_eq!(sol.profit, 0.0);
    }

    #[test]
    fn test_from_bids_detects_conflict() {
        let instance = scenario_instance();
        let ok = Solution::from_bids(&instance, vec![1, 5], "test");
        assert!(ok.feasible);
        assert_eq!(ok.profit, 20.0);

        let mut bad = Solution::from_bids(&instance, vec![1, 3, 5], "test");
        assert!(!bad.feasible);
        assert_eq!(bad.profit, 28.0);
        assert_eq!(bad.feasible_profit, 12.0);

        bad.accepted = vec![3, 5];
        bad.validate(&instance);
        assert!(bad.feasible);
        assert_eq!(bad.profit, 16.0);
    }
}
