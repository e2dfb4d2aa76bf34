//! Heuristics module for the WDP.
//!
//! This module exports the greedy construction heuristics and the ant colony.

pub mod aco;
pub mod construction;

pub use aco::*;
pub use construction::*;
