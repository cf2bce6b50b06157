//! Chain data and result models shared by the classifier and the aggregator.

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A mined transaction as returned by the chain data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: B256,
    pub block_number: u64,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub nonce: u64,
    pub transaction_index: u64,
    /// Gas price in wei.
    pub gas_price: U256,
}

/// The parts of a transaction receipt the classifier needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainReceipt {
    pub status: bool,
    pub log_count: usize,
}

/// Transactions of a block, either as identifiers or as full objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockTransactions {
    Hashes(Vec<B256>),
    Full(Vec<ChainTransaction>),
}

impl BlockTransactions {
    /// Full transaction objects, if the block was fetched with them.
    pub fn as_full(&self) -> Option<&[ChainTransaction]> {
        match self {
            BlockTransactions::Full(txs) => Some(txs),
            BlockTransactions::Hashes(_) => None,
        }
    }
}

/// A block with its producer and transactions in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub miner: Address,
    pub transactions: BlockTransactions,
}

/// A transaction that landed earlier in its block than its gas price predicts.
///
/// Field order is the column order of the tabular output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub tx_hash: B256,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub tx_nonce: u64,
    pub tx_index: u64,
    pub n_txs_with_higher_gas_price: u64,
    pub tx_status: bool,
    pub gas_price_gwei: Decimal,
    pub logs_number: usize,
    pub miner: Address,
    pub miner_name: String,
    pub txs_per_block: usize,
    pub block_max_gas_price_gwei: Decimal,
    pub block_min_gas_price_gwei: Decimal,
}

impl AnomalyRecord {
    /// Successful, ahead of cheaper-positioned siblings, and emitted more than one log.
    pub fn is_out_of_order(&self) -> bool {
        self.tx_status && self.tx_index < self.n_txs_with_higher_gas_price && self.logs_number > 1
    }
}

/// Share of the scanned block range produced by one miner.
///
/// Field order is the column order of the tabular output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerAttribution {
    pub miner: Address,
    pub miner_name: String,
    /// `"{start} - {end}"`, unset until the miner is seen in the range.
    pub block_range: Option<String>,
    /// `end - start`: block transitions, one less than the inclusive span.
    pub total_blocks: u64,
    pub mined_blocks: u64,
    pub pct: u64,
}

impl MinerAttribution {
    pub fn new(miner: Address, miner_name: impl Into<String>) -> Self {
        Self {
            miner,
            miner_name: miner_name.into(),
            block_range: None,
            total_blocks: 0,
            mined_blocks: 0,
            pct: 0,
        }
    }
}
