//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use mev_order_ingestion::{RpcOptions, ScanOptions};
use mev_order_telemetry::LogFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mev-order")]
#[command(version, about = "Find transactions included out of gas price order and the miners behind them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify input transactions and attribute the miners that included them
    Analyze {
        /// Transactions to analyze (.json array or .csv with a Txhash column)
        #[arg(long, default_value = "data/export.json")]
        input: PathBuf,

        /// Known miner names (.json array of {address, name} or .csv)
        #[arg(long, default_value = "data/miners.json")]
        miners: PathBuf,

        /// Cached full blocks shared by transactions of the same block
        #[arg(long, default_value_t = 64)]
        block_cache_size: usize,

        /// Append every detected anomaly as JSON to this file
        #[arg(long)]
        sample_output_path: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Recompute miner attribution from a saved anomalies CSV
    Attribute {
        /// A result_txs_*.csv file written by `analyze`
        #[arg(long)]
        anomalies: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Ethereum execution JSON-RPC URL
    #[arg(long, default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    /// Directory receiving the timestamped result files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_seconds: u64,

    /// Retries after a connection failure, with exponential backoff
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Block fetches in flight while attributing miners
    #[arg(long, default_value_t = 1)]
    pub scan_concurrency: usize,

    /// Log filter (e.g. "info", "mev_order_ingestion=debug")
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format: json or pretty
    #[arg(long, default_value = "json")]
    pub log_format: LogFormat,

    /// Write a Prometheus text snapshot of the run's metrics to this file
    #[arg(long)]
    pub metrics_output: Option<PathBuf>,
}

impl CommonArgs {
    pub fn rpc_options(&self) -> RpcOptions {
        RpcOptions {
            timeout: Duration::from_secs(self.timeout_seconds),
            max_retries: self.max_retries,
            ..RpcOptions::default()
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            concurrency: self.scan_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_defaults() {
        let cli = Cli::try_parse_from(["mev-order", "analyze"]).unwrap();
        let Commands::Analyze { input, block_cache_size, common, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(input, PathBuf::from("data/export.json"));
        assert_eq!(block_cache_size, 64);
        assert_eq!(common.log_format, LogFormat::Json);
        assert_eq!(common.rpc_options().timeout, Duration::from_secs(30));
        assert_eq!(common.scan_options().concurrency, 1);
    }

    #[test]
    fn test_attribute_requires_anomalies() {
        assert!(Cli::try_parse_from(["mev-order", "attribute"]).is_err());

        let cli = Cli::try_parse_from([
            "mev-order",
            "attribute",
            "--anomalies",
            "out/result_txs_1.csv",
            "--scan-concurrency",
            "8",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        let Commands::Attribute { anomalies, common } = cli.command else {
            panic!("expected attribute");
        };
        assert_eq!(anomalies, PathBuf::from("out/result_txs_1.csv"));
        assert_eq!(common.scan_options().concurrency, 8);
        assert_eq!(common.log_format, LogFormat::Pretty);
    }
}
