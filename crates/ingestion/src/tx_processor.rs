//! Per-transaction fetch and classification loop.

use alloy::primitives::B256;
use mev_order_heuristics::{
    AnomalyRecord, ChainBlock, HeuristicsError, MinerDirectory, TransactionAnalyzer,
};
use mev_order_telemetry::{audit, Metrics};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::input::TransactionRecord;
use crate::source::{ChainDataSource, ChainError, ChainResult};

/// Full blocks kept around for transactions that share a block.
pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 64;

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Classify(#[from] HeuristicsError),
}

impl ItemError {
    fn is_recoverable(&self) -> bool {
        match self {
            ItemError::Chain(e) => e.is_recoverable(),
            ItemError::Classify(_) => true,
        }
    }
}

/// Fetches each input transaction with its receipt and block, and keeps the
/// ones included out of gas price order.
pub struct TransactionProcessor<'a, S: ChainDataSource + ?Sized> {
    source: &'a S,
    directory: &'a MinerDirectory,
    metrics: Metrics,
    sample_output_path: Option<PathBuf>,
    block_cache: HashMap<u64, Arc<ChainBlock>>,
    cache_order: VecDeque<u64>,
    block_cache_size: usize,
}

impl<'a, S: ChainDataSource + ?Sized> TransactionProcessor<'a, S> {
    /// Create a new transaction processor.
    ///
    /// # Arguments
    /// * `source` - Chain data source
    /// * `directory` - Known miner names
    /// * `metrics` - Metrics collector
    pub fn new(source: &'a S, directory: &'a MinerDirectory, metrics: Metrics) -> Self {
        Self {
            source,
            directory,
            metrics,
            sample_output_path: None,
            block_cache: HashMap::new(),
            cache_order: VecDeque::new(),
            block_cache_size: DEFAULT_BLOCK_CACHE_SIZE,
        }
    }

    /// Append every detected anomaly to an audit file.
    pub fn with_sample_output(mut self, path: Option<PathBuf>) -> Self {
        self.sample_output_path = path;
        self
    }

    /// Number of full blocks to keep cached; zero disables caching.
    pub fn with_block_cache_size(mut self, size: usize) -> Self {
        self.block_cache_size = size;
        self
    }

    /// Classify every record in input order.
    ///
    /// Missing or malformed chain data skips the record; a lost connection
    /// aborts the batch with the failing item named in the error.
    pub async fn process_all(
        &mut self,
        records: &[TransactionRecord],
    ) -> anyhow::Result<Vec<AnomalyRecord>> {
        info!("Classifying {} transactions", records.len());

        let mut anomalies = Vec::new();
        for (position, record) in records.iter().enumerate() {
            if let Some(anomaly) = self.process_record(position, record).await? {
                anomalies.push(anomaly);
            }
        }

        info!(
            "Classified {} transactions: {} out of order, {} skipped",
            self.metrics.transactions_processed(),
            anomalies.len(),
            self.metrics.skipped()
        );
        Ok(anomalies)
    }

    /// Classify one record.
    ///
    /// # Returns
    /// The anomaly if the transaction qualifies; `None` if it does not or was skipped
    pub async fn process_record(
        &mut self,
        position: usize,
        record: &TransactionRecord,
    ) -> anyhow::Result<Option<AnomalyRecord>> {
        let hash = record.tx_hash;
        match self.fetch_and_classify(hash).await {
            Ok(anomaly) => {
                self.metrics.inc_transactions_processed();
                if let Some(ref anomaly) = anomaly {
                    self.metrics.inc_anomalies();
                    self.write_sample(anomaly);
                }
                Ok(anomaly)
            }
            Err(e) if e.is_recoverable() => {
                self.metrics.inc_skipped();
                warn!("Skipping transaction {} (item {}): {}", hash, position + 1, e);
                Ok(None)
            }
            Err(e) => {
                error!("Aborting at transaction {} (item {}): {}", hash, position + 1, e);
                Err(anyhow::Error::new(e)
                    .context(format!("while processing transaction {} (item {})", hash, position + 1)))
            }
        }
    }

    async fn fetch_and_classify(&mut self, hash: B256) -> Result<Option<AnomalyRecord>, ItemError> {
        let tx = self.source.get_transaction(hash).await?;
        let receipt = self.source.get_transaction_receipt(hash).await?;
        let block = self.full_block(tx.block_number).await?;

        let anomaly = TransactionAnalyzer::classify(&tx, &receipt, &block, self.directory)?;
        info!("{} / {}", tx.hash, tx.nonce);
        Ok(anomaly)
    }

    async fn full_block(&mut self, number: u64) -> ChainResult<Arc<ChainBlock>> {
        if let Some(block) = self.block_cache.get(&number) {
            debug!("Block {} served from cache", number);
            return Ok(Arc::clone(block));
        }

        let block = Arc::new(self.source.get_block(number, true).await?);
        if self.block_cache_size > 0 {
            if self.cache_order.len() >= self.block_cache_size {
                if let Some(evicted) = self.cache_order.pop_front() {
                    self.block_cache.remove(&evicted);
                }
            }
            self.cache_order.push_back(number);
            self.block_cache.insert(number, Arc::clone(&block));
        }
        Ok(block)
    }

    fn write_sample(&self, anomaly: &AnomalyRecord) {
        if let Err(e) = audit::write_audit_sample(self.sample_output_path.as_ref(), anomaly) {
            warn!("Failed to write audit sample: {}", e);
        }
    }
}
