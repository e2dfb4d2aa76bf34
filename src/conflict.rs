//! Conflict model shared by every solver.
//!
//! Two bids conflict when they request at least one common item. An [`AcceptedSet`]
//! keeps the union of its members' items in a [`ClaimedItems`] cache so a conflict
//! check costs `O(|candidate items|)` instead of a scan over all accepted bundles.

use crate::instance::{Bid, ItemId};
use std::collections::HashSet;

/// Incrementally maintained union of the items claimed by accepted bids
#[derive(Debug, Clone, Default)]
pub struct ClaimedItems {
    items: HashSet<ItemId>,
}

impl ClaimedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff any of `items` is already claimed
    #[inline]
    pub fn contains_any(&self, items: &[ItemId]) -> bool {
        items.iter().any(|item| self.items.contains(item))
    }

    pub fn claim(&mut self, items: &[ItemId]) {
        self.items.extend(items.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered sequence of accepted bids with its claimed-items cache.
///
/// Greedy heuristics only ever call [`AcceptedSet::try_accept`], which keeps the set
/// conflict-free. Ants use [`AcceptedSet::push`], which appends unconditionally; the set
/// then tracks the profit of its longest conflict-free prefix separately from the raw sum.
#[derive(Debug, Clone, Default)]
pub struct AcceptedSet {
    members: Vec<usize>,
    claimed: ClaimedItems,
    profit: f64,
    feasible_profit: f64,
    conflicted: bool,
}

impl AcceptedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `bid` iff it does not conflict with the current members
    pub fn try_accept(&mut self, bid: &Bid) -> bool {
        if self.claimed.contains_any(&bid.items) {
            return false;
        }
        self.push(bid.id, bid);
        true
    }

    /// Append `bid` under the member key `key` without rejecting conflicts
    pub fn push(&mut self, key: usize, bid: &Bid) {
        if !self.conflicted && self.claimed.contains_any(&bid.items) {
            self.conflicted = true;
        }
        if !self.conflicted {
            self.feasible_profit += bid.price;
        }
        self.claimed.claim(&bid.items);
        self.members.push(key);
        self.profit += bid.price;
    }

    /// Member keys in acceptance order
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn claimed(&self) -> &ClaimedItems {
        &self.claimed
    }

    /// Raw sum of member prices
    pub fn profit(&self) -> f64 {
        self.profit
    }

    /// Sum of prices of the longest conflict-free prefix of the members
    pub fn feasible_profit(&self) -> f64 {
        self.feasible_profit
    }

    /// True iff no two members share an item
    pub fn is_feasible(&self) -> bool {
        !self.conflicted
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// True iff `candidate_items` intersects the items already claimed by `accepted`
#[inline]
pub fn has_conflict(candidate_items: &[ItemId], accepted: &AcceptedSet) -> bool {
    accepted.claimed.contains_any(candidate_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(id: usize, items: &[ItemId], price: f64) -> Bid {
        Bid::new(id, items.to_vec(), price)
    }

    #[test]
    fn test_has_conflict() {
        let mut accepted = AcceptedSet::new();
        assert!(!has_conflict(&[0, 1], &accepted));

        assert!(accepted.try_accept(&bid(0, &[0, 1], 3.0)));
        assert!(has_conflict(&[1, 5], &accepted));
        assert!(!has_conflict(&[2, 3], &accepted));
        assert!(!has_conflict(&[], &accepted));
    }

    #[test]
    fn test_try_accept_rejects_overlap() {
        let mut accepted = AcceptedSet::new();
        assert!(accepted.try_accept(&bid(0, &[0, 1], 3.0)));
        assert!(!accepted.try_accept(&bid(1, &[1], 10.0)));
        assert!(accepted.try_accept(&bid(2, &[2], 4.0)));

        assert_eq!(accepted.members(), &[0, 2]);
        assert_eq!(accepted.profit(), 7.0);
        assert_eq!(accepted.claimed().len(), 3);
        assert!(accepted.is_feasible());
    }

    #[test]
    fn test_push_tracks_feasible_prefix() {
        let mut accepted = AcceptedSet::new();
        accepted.push(0, &bid(0, &[0], 5.0));
        accepted.push(1, &bid(1, &[1], 2.0));
        accepted.push(2, &bid(2, &[0, 2], 7.0));
        accepted.push(3, &bid(3, &[3], 1.0));

        assert_eq!(accepted.profit(), 15.0);
        // the prefix stops at the first conflicting member
        assert_eq!(accepted.feasible_profit(), 7.0);
        assert!(!accepted.is_feasible());
        assert_eq!(accepted.len(), 4);
    }
}
