//! Module for parsing and representing combinatorial auction instances.
//!
//! A bid file holds one header line (item and bid counts) followed by one bid per line:
//! `price item1 item2 ...`. When the header ends with `#`, every data line starts with an
//! index token terminated by `#` which is discarded before parsing.

use crate::error::{Result, WdpError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Dense identifier of an item, assigned in first-appearance order
pub type ItemId = usize;

/// A request for an exclusive bundle of items at a fixed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Position of the bid in the instance (0-indexed)
    pub id: usize,
    /// Requested items, without duplicates, in bundle order
    pub items: Vec<ItemId>,
    /// Offered price (non-negative)
    pub price: f64,
}

impl Bid {
    pub fn new(id: usize, items: Vec<ItemId>, price: f64) -> Self {
        Bid { id, items, price }
    }

    /// Price per requested item
    #[inline]
    pub fn average_item_price(&self) -> f64 {
        self.price / self.items.len() as f64
    }
}

/// Represents a complete auction instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionInstance {
    /// Name of the instance (file name for loaded datasets)
    pub name: String,
    /// Originating dataset path, empty for in-memory instances
    pub path: PathBuf,
    /// Item names indexed by `ItemId`
    pub items: Vec<String>,
    /// All bids, in insertion order
    pub bids: Vec<Bid>,
}

/// Accumulates bids with mapping semantics: a repeated bundle keeps its first
/// position and takes the most recent price.
#[derive(Default)]
struct BidBuilder {
    items: Vec<String>,
    item_ids: HashMap<String, ItemId>,
    bundles: HashMap<Vec<ItemId>, usize>,
    bids: Vec<Bid>,
}

impl BidBuilder {
    fn intern(&mut self, item: &str) -> ItemId {
        if let Some(&id) = self.item_ids.get(item) {
            return id;
        }
        let id = self.items.len();
        self.items.push(item.to_string());
        self.item_ids.insert(item.to_string(), id);
        id
    }

    fn push<S: AsRef<str>>(&mut self, bundle: &[S], price: f64) -> std::result::Result<(), String> {
        if !price.is_finite() || price < 0.0 {
            return Err(format!("invalid price {}", price));
        }
        if bundle.is_empty() {
            return Err("bid has no items".to_string());
        }

        let key: Vec<ItemId> = bundle.iter().map(|item| self.intern(item.as_ref())).collect();

        if let Some(&position) = self.bundles.get(&key) {
            self.bids[position].price = price;
            return Ok(());
        }

        let mut items = Vec::with_capacity(key.len());
        for &item in &key {
            if !items.contains(&item) {
                items.push(item);
            }
        }

        let id = self.bids.len();
        self.bundles.insert(key, id);
        self.bids.push(Bid::new(id, items, price));
        Ok(())
    }

    fn finish(self, name: String, path: PathBuf) -> AuctionInstance {
        AuctionInstance {
            name,
            path,
            items: self.items,
            bids: self.bids,
        }
    }
}

impl AuctionInstance {
    /// Parse an auction instance from a bid file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse an auction instance from any buffered reader; `path` only labels errors
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let parse_error = |line: usize, message: String| WdpError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut builder = BidBuilder::default();
        let mut indexed = false;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = number + 1;

            // The header only carries counts; its trailing marker selects the line variant.
            if number == 0 {
                indexed = line.trim_end().ends_with('#');
                continue;
            }

            let mut data = line.trim();
            if data.is_empty() {
                continue;
            }

            if indexed {
                data = match data.split_once('#') {
                    Some((_, rest)) => rest.trim(),
                    None => {
                        return Err(parse_error(line_number, "missing '#' after bid index".to_string()));
                    }
                };
            }

            let mut tokens = data.split_whitespace();
            let price_token = tokens
                .next()
                .ok_or_else(|| parse_error(line_number, "missing price".to_string()))?;
            let price: f64 = price_token
                .parse()
                .map_err(|_| parse_error(line_number, format!("invalid price '{}'", price_token)))?;
            let bundle: Vec<&str> = tokens.collect();

            builder
                .push(bundle.as_slice(), price)
                .map_err(|message| parse_error(line_number, message))?;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(builder.finish(name, path.to_path_buf()))
    }

    /// Build an instance from already-parsed `(bundle, price)` pairs
    pub fn from_bundles<I, B, S>(name: &str, bundles: I) -> Result<Self>
    where
        I: IntoIterator<Item = (B, f64)>,
        B: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut builder = BidBuilder::default();
        for (position, (bundle, price)) in bundles.into_iter().enumerate() {
            builder.push(bundle.as_ref(), price).map_err(|message| {
                WdpError::config(format!("bundle #{} of {}: {}", position, name, message))
            })?;
        }
        Ok(builder.finish(name.to_string(), PathBuf::new()))
    }

    /// Number of distinct items
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Number of distinct bids (orders)
    pub fn num_bids(&self) -> usize {
        self.bids.len()
    }

    /// All item ids referenced by at least one bid
    pub fn all_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        0..self.items.len()
    }

    pub fn item_name(&self, item: ItemId) -> &str {
        &self.items[item]
    }

    /// Bid positions grouped by the items they request
    pub fn bids_by_item(&self) -> Vec<Vec<usize>> {
        let mut by_item = vec![Vec::new(); self.items.len()];
        for bid in &self.bids {
            for &item in &bid.items {
                by_item[item].push(bid.id);
            }
        }
        by_item
    }

    /// Human-readable bundle of a bid, e.g. `(a, b, c)`
    pub fn bundle_label(&self, bid: &Bid) -> String {
        let names: Vec<&str> = bid.items.iter().map(|&i| self.item_name(i)).collect();
        format!("({})", names.join(", "))
    }

    /// Dataset path as recorded in run summaries
    pub fn file_path(&self) -> String {
        if self.path.as_os_str().is_empty() {
            self.name.clone()
        } else {
            self.path.to_string_lossy().to_string()
        }
    }

    /// Get instance statistics
    pub fn statistics(&self) -> InstanceStatistics {
        let sizes: Vec<usize> = self.bids.iter().map(|b| b.items.len()).collect();
        let prices: Vec<f64> = self.bids.iter().map(|b| b.price).collect();
        let n = self.bids.len().max(1) as f64;

        InstanceStatistics {
            name: self.name.clone(),
            num_items: self.num_items(),
            num_bids: self.num_bids(),
            min_bundle: sizes.iter().copied().min().unwrap_or(0),
            max_bundle: sizes.iter().copied().max().unwrap_or(0),
            avg_bundle: sizes.iter().sum::<usize>() as f64 / n,
            min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_price: prices.iter().copied().fold(0.0, f64::max),
            avg_price: prices.iter().sum::<f64>() / n,
            total_price: prices.iter().sum(),
        }
    }
}

/// Instance statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_items: usize,
    pub num_bids: usize,
    pub min_bundle: usize,
    pub max_bundle: usize,
    pub avg_bundle: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub total_price: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Items: {}", self.num_items)?;
        writeln!(f, "  Bids: {}", self.num_bids)?;
        writeln!(
            f,
            "  Bundle size: min {} / avg {:.2} / max {}",
            self.min_bundle, self.avg_bundle, self.max_bundle
        )?;
        writeln!(
            f,
            "  Price: min {:.2} / avg {:.2} / max {:.2}",
            if self.num_bids == 0 { 0.0 } else { self.min_price },
            self.avg_price,
            self.max_price
        )?;
        write!(f, "  Sum of all prices: {:.2}", self.total_price)
    }
}
