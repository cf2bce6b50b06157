//! CLI application for the out-of-order transaction scanner.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, CommonArgs};
use mev_order_heuristics::{AnomalyRecord, MinerAttribution, MinerDirectory};
use mev_order_ingestion::output::{self, ANOMALIES_PREFIX, MINERS_PREFIX};
use mev_order_ingestion::{
    aggregate, load_miner_directory, load_transaction_records, RpcClient, TransactionProcessor,
};
use mev_order_telemetry::{init_logging, Metrics};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            miners,
            block_cache_size,
            sample_output_path,
            common,
        } => {
            init_logging(common.log_level.as_deref(), common.log_format)?;
            run_analysis(&input, &miners, block_cache_size, sample_output_path, &common).await?;
        }
        Commands::Attribute { anomalies, common } => {
            init_logging(common.log_level.as_deref(), common.log_format)?;
            run_attribution(&anomalies, &common).await?;
        }
    }

    Ok(())
}

async fn run_analysis(
    input: &Path,
    miners: &Path,
    block_cache_size: usize,
    sample_output_path: Option<PathBuf>,
    common: &CommonArgs,
) -> anyhow::Result<()> {
    info!("Starting out-of-order transaction scan");

    let records = load_transaction_records(input)?;
    let directory = if miners.exists() {
        load_miner_directory(miners)?
    } else {
        warn!("Miner directory not found at {:?}, continuing without miner names", miners);
        MinerDirectory::default()
    };
    std::fs::create_dir_all(&common.output_dir)?;

    let metrics = Metrics::new()?;
    let client = RpcClient::connect(&common.rpc_url, common.rpc_options(), metrics.clone()).await?;

    in_session(&client, async {
        let mut processor = TransactionProcessor::new(&client, &directory, metrics.clone())
            .with_sample_output(sample_output_path)
            .with_block_cache_size(block_cache_size);
        let anomalies = processor.process_all(&records).await?;
        save_anomalies(&common.output_dir, &anomalies)?;

        let attributions = aggregate(&anomalies, &client, &common.scan_options(), &metrics).await?;
        save_attributions(&common.output_dir, &attributions)
    })
    .await?;

    finish(&metrics, common)
}

async fn run_attribution(anomalies_path: &Path, common: &CommonArgs) -> anyhow::Result<()> {
    info!("Recomputing miner attribution from {:?}", anomalies_path);

    let anomalies = output::read_anomalies(anomalies_path)?;
    std::fs::create_dir_all(&common.output_dir)?;

    let metrics = Metrics::new()?;
    let client = RpcClient::connect(&common.rpc_url, common.rpc_options(), metrics.clone()).await?;

    in_session(&client, async {
        let attributions = aggregate(&anomalies, &client, &common.scan_options(), &metrics).await?;
        save_attributions(&common.output_dir, &attributions)
    })
    .await?;

    finish(&metrics, common)
}

/// Run `work` against an open client and close the client whether or not it succeeded.
async fn in_session<T>(
    client: &RpcClient,
    work: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    let result = work.await;
    client.close();
    result
}

fn save_anomalies(output_dir: &Path, anomalies: &[AnomalyRecord]) -> anyhow::Result<()> {
    let path = output::timestamped_path(output_dir, ANOMALIES_PREFIX);
    output::write_csv(&path, anomalies)?;
    info!("Txs data is saved to disk to {:?}", path);
    Ok(())
}

fn save_attributions(output_dir: &Path, attributions: &[MinerAttribution]) -> anyhow::Result<()> {
    let path = output::timestamped_path(output_dir, MINERS_PREFIX);
    output::write_csv(&path, attributions)?;
    for attribution in attributions {
        info!(
            "Miner {} {:?}: {} of {} blocks ({}%)",
            attribution.miner,
            attribution.miner_name,
            attribution.mined_blocks,
            attribution.total_blocks,
            attribution.pct
        );
    }
    info!("Miners data is saved to disk to {:?}", path);
    Ok(())
}

fn finish(metrics: &Metrics, common: &CommonArgs) -> anyhow::Result<()> {
    info!(
        "Finished: {} transactions classified, {} anomalies, {} blocks scanned, {} items skipped",
        metrics.transactions_processed(),
        metrics.anomalies(),
        metrics.blocks_scanned(),
        metrics.skipped()
    );

    if let Some(ref path) = common.metrics_output {
        metrics.write_snapshot(path)?;
        info!("Wrote metrics snapshot to {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mev_order_ingestion::RpcOptions;

    fn offline_client() -> RpcClient {
        RpcClient::new("http://127.0.0.1:9", RpcOptions::default(), Metrics::new().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_session_closes_after_failure() {
        let client = offline_client();
        let result: anyhow::Result<()> =
            in_session(&client, async { Err(anyhow::anyhow!("sink unwritable")) }).await;

        assert_eq!(result.unwrap_err().to_string(), "sink unwritable");
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_session_closes_after_success() {
        let client = offline_client();
        let value = in_session(&client, async { Ok(7) }).await.unwrap();

        assert_eq!(value, 7);
        assert!(client.is_closed());
    }
}
