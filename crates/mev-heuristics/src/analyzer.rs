//! Transaction analyzer for out-of-order inclusion.

use crate::detectors::{profile_block, wei_to_gwei};
use crate::directory::MinerDirectory;
use crate::error::{HeuristicsError, HeuristicsResult};
use crate::models::{AnomalyRecord, ChainBlock, ChainReceipt, ChainTransaction};

/// Analyzer comparing a transaction's position with its block's gas prices.
pub struct TransactionAnalyzer;

impl TransactionAnalyzer {
    /// Build the anomaly record for a transaction, whether or not it qualifies.
    ///
    /// # Arguments
    /// * `tx` - The transaction to analyze
    /// * `receipt` - Its receipt
    /// * `block` - The containing block, with full transaction objects
    /// * `directory` - Known miner names
    pub fn analyze(
        tx: &ChainTransaction,
        receipt: &ChainReceipt,
        block: &ChainBlock,
        directory: &MinerDirectory,
    ) -> HeuristicsResult<AnomalyRecord> {
        if tx.block_number != block.number {
            return Err(HeuristicsError::BlockMismatch {
                hash: tx.hash,
                claimed: tx.block_number,
                actual: block.number,
            });
        }

        let block_txs = block
            .transactions
            .as_full()
            .ok_or(HeuristicsError::HashesOnly(block.number))?;
        if block_txs.is_empty() {
            return Err(HeuristicsError::MissingTransactions(block.number));
        }
        // The block fetched by number may not be the one the transaction landed in.
        let included = usize::try_from(tx.transaction_index)
            .ok()
            .and_then(|index| block_txs.get(index))
            .is_some_and(|sibling| sibling.hash == tx.hash);
        if !included {
            return Err(HeuristicsError::NotInBlock {
                hash: tx.hash,
                block: block.number,
            });
        }

        let gas_price_gwei = wei_to_gwei(tx.hash, tx.gas_price)?;
        let profile = profile_block(gas_price_gwei, block_txs)?
            .ok_or(HeuristicsError::MissingTransactions(block.number))?;

        Ok(AnomalyRecord {
            tx_hash: tx.hash,
            block_number: tx.block_number,
            from: tx.from,
            to: tx.to,
            tx_nonce: tx.nonce,
            tx_index: tx.transaction_index,
            n_txs_with_higher_gas_price: profile.higher_count,
            tx_status: receipt.status,
            gas_price_gwei,
            logs_number: receipt.log_count,
            miner: block.miner,
            miner_name: directory.name_for(&block.miner).to_string(),
            txs_per_block: block_txs.len(),
            block_max_gas_price_gwei: profile.max_gwei,
            block_min_gas_price_gwei: profile.min_gwei,
        })
    }

    /// Analyze a transaction and keep the record only if it was included out of order.
    pub fn classify(
        tx: &ChainTransaction,
        receipt: &ChainReceipt,
        block: &ChainBlock,
        directory: &MinerDirectory,
    ) -> HeuristicsResult<Option<AnomalyRecord>> {
        let record = Self::analyze(tx, receipt, block, directory)?;
        Ok(record.is_out_of_order().then_some(record))
    }
}
