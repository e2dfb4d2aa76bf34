use crate::conflict::AcceptedSet;
use crate::instance::{AuctionInstance, Bid};
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &AuctionInstance) -> Solution;
    fn name(&self) -> &str;
}

/// Descending ranking key used to order bids before the greedy pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingKey {
    /// Offered price
    ByPrice,
    /// Number of requested items
    ByItemCount,
    /// Price divided by the number of requested items
    ByAverageItemPrice,
}

impl RankingKey {
    pub const ALL: [RankingKey; 3] = [
        RankingKey::ByPrice,
        RankingKey::ByItemCount,
        RankingKey::ByAverageItemPrice,
    ];

    #[inline]
    pub fn key(&self, bid: &Bid) -> f64 {
        match self {
            RankingKey::ByPrice => bid.price,
            RankingKey::ByItemCount => bid.items.len() as f64,
            RankingKey::ByAverageItemPrice => bid.average_item_price(),
        }
    }
}

/// Greedy packing heuristic
///
/// Visits bids by descending ranking key (ties keep insertion order) and accepts
/// every bid that does not conflict with the bids accepted so far. No backtracking:
/// the result is a maximal, not maximum, packing.
#[derive(Debug, Clone)]
pub struct GreedyHeuristic {
    pub key: RankingKey,
}

impl GreedyHeuristic {
    pub fn new(key: RankingKey) -> Self {
        GreedyHeuristic { key }
    }

    pub fn by_price() -> Self {
        Self::new(RankingKey::ByPrice)
    }

    pub fn by_item_count() -> Self {
        Self::new(RankingKey::ByItemCount)
    }

    pub fn by_average_item_price() -> Self {
        Self::new(RankingKey::ByAverageItemPrice)
    }

    /// Bid ids in visiting order
    pub fn ranking(&self, instance: &AuctionInstance) -> Vec<usize> {
        let mut order: Vec<usize> = (0..instance.bids.len()).collect();
        // sort_by_key is stable
        order.sort_by_key(|&i| Reverse(OrderedFloat(self.key.key(&instance.bids[i]))));
        order
    }

    /// Run the greedy pass and return the accepted set
    pub fn pack(&self, instance: &AuctionInstance) -> AcceptedSet {
        let mut accepted = AcceptedSet::new();
        for id in self.ranking(instance) {
            let bid = &instance.bids[id];
            if accepted.try_accept(bid) {
                log::trace!("{}: accepted bid {} ({:.2})", self.name(), id, bid.price);
            }
        }
        accepted
    }
}

impl ConstructionHeuristic for GreedyHeuristic {
    fn construct(&self, instance: &AuctionInstance) -> Solution {
        let start = std::time::Instant::now();
        let accepted = self.pack(instance);

        let mut solution = Solution::from_accepted(&accepted, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        match self.key {
            RankingKey::ByPrice => "GreedyBigBet",
            RankingKey::ByItemCount => "GreedyNumberOfItems",
            RankingKey::ByAverageItemPrice => "GreedyAverageItemsPrice",
        }
    }
}
