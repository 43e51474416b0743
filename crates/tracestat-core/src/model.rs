//! Execution model types.
//!
//! The `ExecutionModel` is the artifact written by `tracestat parse` and read
//! by `tracestat compute`. Addresses are native integers here and only become
//! decimal strings in JSON.

use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A guest code address.
pub type Address = u64;

/// Mnemonic occurrence counts, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram(IndexMap<String, u64>);

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `mnemonic`.
    pub fn add(&mut self, mnemonic: &str, count: u64) {
        match self.0.get_mut(mnemonic) {
            Some(existing) => *existing += count,
            None => {
                self.0.insert(mnemonic.to_string(), count);
            }
        }
    }

    /// Like [`Histogram::add`], but returns `None` and leaves the histogram
    /// untouched when the count would overflow.
    pub fn checked_add(&mut self, mnemonic: &str, count: u64) -> Option<u64> {
        match self.0.get_mut(mnemonic) {
            Some(existing) => {
                *existing = existing.checked_add(count)?;
                Some(*existing)
            }
            None => {
                self.0.insert(mnemonic.to_string(), count);
                Some(count)
            }
        }
    }

    pub fn get(&self, mnemonic: &str) -> u64 {
        self.0.get(mnemonic).copied().unwrap_or(0)
    }

    /// Sum of every count.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Sum of every count, `None` on overflow.
    pub fn checked_total(&self) -> Option<u64> {
        self.0
            .values()
            .try_fold(0u64, |total, &count| total.checked_add(count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(mnemonic, &count)| (mnemonic.as_str(), count))
    }
}

impl<'a> FromIterator<(&'a str, u64)> for Histogram {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for (mnemonic, count) in iter {
            histogram.add(mnemonic, count);
        }
        histogram
    }
}

/// A block observed as a call or branch target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Symbol name of the target, empty when the trace carried none.
    pub name: String,
    /// Number of times the block was entered.
    pub count: u64,
}

/// Basic blocks and call-site counts reconstructed from one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionModel {
    /// Per-execution histogram of each block, keyed by its first instruction.
    pub blocks: IndexMap<Address, Histogram>,
    /// Invocation counts, keyed by target block address.
    pub calls: IndexMap<Address, CallSite>,
}

impl ExecutionModel {
    /// Total instructions across all block histograms, unweighted.
    pub fn block_instructions(&self) -> u64 {
        self.blocks.values().map(Histogram::total).sum()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
