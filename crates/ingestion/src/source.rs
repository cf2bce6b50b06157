//! Chain data source interface.
//!
//! The processor and the range scanner only talk to the chain through
//! [`ChainDataSource`], so a JSON-RPC node and an in-memory fixture are
//! interchangeable.

use alloy::primitives::B256;
use async_trait::async_trait;
use mev_order_heuristics::{ChainBlock, ChainReceipt, ChainTransaction};

/// Error type for chain data source operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed response for {entity}: {reason}")]
    Malformed { entity: String, reason: String },
    #[error("connection to chain source failed: {0}")]
    Connection(#[source] anyhow::Error),
}

impl ChainError {
    pub fn malformed(entity: impl Into<String>, reason: impl ToString) -> Self {
        ChainError::Malformed {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the batch can skip the affected item and continue.
    ///
    /// Losing the data source itself is never recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ChainError::Connection(_))
    }
}

/// Result type for chain data source operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Read access to mined chain data.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Get a mined transaction by hash.
    async fn get_transaction(&self, hash: B256) -> ChainResult<ChainTransaction>;

    /// Get the receipt of a mined transaction.
    async fn get_transaction_receipt(&self, hash: B256) -> ChainResult<ChainReceipt>;

    /// Get a block by number.
    ///
    /// # Arguments
    /// * `number` - The block number
    /// * `full_transactions` - Return full transaction objects instead of hashes
    async fn get_block(&self, number: u64, full_transactions: bool) -> ChainResult<ChainBlock>;
}
