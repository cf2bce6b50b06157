//! Errors raised while classifying a single transaction.

use alloy::primitives::{B256, U256};

/// Reasons a transaction cannot be classified against its block.
///
/// All variants are scoped to one transaction; callers skip the item and
/// carry on with the batch.
#[derive(Debug, thiserror::Error)]
pub enum HeuristicsError {
    #[error("block {0} has no transactions")]
    MissingTransactions(u64),
    #[error("block {0} was fetched without full transaction objects")]
    HashesOnly(u64),
    #[error("gas price {wei} wei of transaction {hash} is out of range")]
    GasPriceOutOfRange { hash: B256, wei: U256 },
    #[error("transaction {hash} claims block {claimed} but was checked against block {actual}")]
    BlockMismatch { hash: B256, claimed: u64, actual: u64 },
    #[error("transaction {hash} is not at its claimed position in block {block}")]
    NotInBlock { hash: B256, block: u64 },
}

/// Result type for heuristics operations.
pub type HeuristicsResult<T> = Result<T, HeuristicsError>;
