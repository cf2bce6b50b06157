//! Block production share of the miners behind out-of-order transactions.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::models::{AnomalyRecord, MinerAttribution};

/// Running per-miner block counts over the range spanned by an anomaly set.
///
/// The tally is fed one block producer at a time, in ascending block order,
/// and finished into the attribution rows.
#[derive(Debug, Clone)]
pub struct AttributionTally {
    start: u64,
    end: u64,
    entries: Vec<MinerAttribution>,
    index: HashMap<Address, usize>,
}

impl AttributionTally {
    /// Set up one zeroed entry per distinct miner, in order of first appearance.
    ///
    /// # Returns
    /// `None` for an empty anomaly set: there is no range to scan.
    pub fn from_anomalies(anomalies: &[AnomalyRecord]) -> Option<Self> {
        let start = anomalies.iter().map(|a| a.block_number).min()?;
        let end = anomalies.iter().map(|a| a.block_number).max()?;

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for anomaly in anomalies {
            index.entry(anomaly.miner).or_insert_with(|| {
                entries.push(MinerAttribution::new(anomaly.miner, anomaly.miner_name.clone()));
                entries.len() - 1
            });
        }

        Some(Self {
            start,
            end,
            entries,
            index,
        })
    }

    /// Block numbers to scan, both ends included.
    pub fn block_range(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Number of transitions in the range. One less than the inclusive span.
    pub fn total_blocks(&self) -> u64 {
        self.end - self.start
    }

    /// Credit a scanned block to its producer if that producer is tracked.
    ///
    /// # Returns
    /// Whether the block was credited.
    pub fn record_block(&mut self, miner: &Address) -> bool {
        let Some(&slot) = self.index.get(miner) else {
            return false;
        };

        let total_blocks = self.total_blocks();
        let block_range = format!("{} - {}", self.start, self.end);
        let entry = &mut self.entries[slot];
        entry.block_range = Some(block_range);
        entry.total_blocks = total_blocks;
        entry.mined_blocks += 1;
        entry.pct = rounded_pct(entry.mined_blocks, total_blocks);
        true
    }

    /// The attribution rows, in order of first appearance in the anomaly set.
    pub fn finish(self) -> Vec<MinerAttribution> {
        self.entries
    }
}

/// `round(part / whole * 100)`, halves away from zero. Zero when `whole` is zero.
pub fn rounded_pct(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u128::from(part), u128::from(whole));
    ((part * 200 + whole) / (whole * 2)) as u64
}
