//! Chain access and batch processing for the out-of-order scanner.

pub mod input;
pub mod output;
pub mod range_scanner;
pub mod rpc_client;
pub mod source;
pub mod tx_processor;

pub use input::{load_miner_directory, load_transaction_records, TransactionRecord};
pub use range_scanner::{aggregate, ScanOptions};
pub use rpc_client::{RpcClient, RpcOptions};
pub use source::{ChainDataSource, ChainError, ChainResult};
pub use tx_processor::TransactionProcessor;
