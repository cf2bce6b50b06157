//! Out-of-order inclusion heuristics and miner attribution.

pub mod analyzer;
pub mod attribution;
pub mod detectors;
pub mod directory;
pub mod error;
pub mod models;

pub use analyzer::TransactionAnalyzer;
pub use attribution::AttributionTally;
pub use directory::MinerDirectory;
pub use error::{HeuristicsError, HeuristicsResult};
pub use models::{
    AnomalyRecord, BlockTransactions, ChainBlock, ChainReceipt, ChainTransaction, MinerAttribution,
};
