//! Miner attribution over the block range spanned by the anomaly set.

use futures::stream::{self, StreamExt};
use mev_order_heuristics::{AnomalyRecord, AttributionTally, MinerAttribution};
use mev_order_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::source::ChainDataSource;

/// Settings for the block range scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Block fetches kept in flight at once. `1` fetches strictly one by one.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Count, for every miner behind an anomaly, the blocks it produced between
/// the lowest and highest anomaly block.
///
/// Blocks are fetched header-only. With `concurrency > 1` several fetches
/// overlap, but the tally still consumes them in ascending block order.
///
/// # Arguments
/// * `anomalies` - The out-of-order transactions
/// * `source` - Chain data source
/// * `options` - Scan settings
/// * `metrics` - Metrics collector
pub async fn aggregate<S: ChainDataSource + ?Sized>(
    anomalies: &[AnomalyRecord],
    source: &S,
    options: &ScanOptions,
    metrics: &Metrics,
) -> anyhow::Result<Vec<MinerAttribution>> {
    let Some(mut tally) = AttributionTally::from_anomalies(anomalies) else {
        info!("No anomalies, skipping miner attribution");
        return Ok(Vec::new());
    };

    let range = tally.block_range();
    let (start, end) = (*range.start(), *range.end());
    info!("Scanning blocks {} - {} for miner attribution", start, end);

    let fetches = stream::iter(range)
        .map(|number| async move { (number, source.get_block(number, false).await) })
        .buffered(options.concurrency.max(1));
    futures::pin_mut!(fetches);

    while let Some((number, result)) = fetches.next().await {
        info!("Block {} out of range [{} - {}]", number, start, end);
        match result {
            Ok(block) => {
                metrics.inc_blocks_scanned();
                if tally.record_block(&block.miner) {
                    debug!("Block {} produced by tracked miner {}", number, block.miner);
                }
            }
            Err(e) if e.is_recoverable() => {
                metrics.inc_skipped();
                warn!("Skipping block {}: {}", number, e);
            }
            Err(e) => {
                error!("Aborting miner attribution at block {}: {}", number, e);
                return Err(anyhow::Error::new(e)
                    .context(format!("while scanning block {} of [{} - {}]", number, start, end)));
            }
        }
    }

    let attributions = tally.finish();
    info!(
        "Attributed {} miners over blocks {} - {}",
        attributions.len(),
        start,
        end
    );
    Ok(attributions)
}
