//! CSV result sinks.

use anyhow::Context;
use chrono::Utc;
use mev_order_heuristics::{AnomalyRecord, MinerAttribution};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of the anomaly result file.
pub const ANOMALIES_PREFIX: &str = "result_txs";
/// Prefix of the miner attribution result file.
pub const MINERS_PREFIX: &str = "result_miners";

/// A row type with a fixed column layout.
pub trait TabularRecord: Serialize {
    /// Header row, in field declaration order.
    const COLUMNS: &'static [&'static str];
}

impl TabularRecord for AnomalyRecord {
    const COLUMNS: &'static [&'static str] = &[
        "tx_hash",
        "block_number",
        "from",
        "to",
        "tx_nonce",
        "tx_index",
        "n_txs_with_higher_gas_price",
        "tx_status",
        "gas_price_gwei",
        "logs_number",
        "miner",
        "miner_name",
        "txs_per_block",
        "block_max_gas_price_gwei",
        "block_min_gas_price_gwei",
    ];
}

impl TabularRecord for MinerAttribution {
    const COLUMNS: &'static [&'static str] = &[
        "miner",
        "miner_name",
        "block_range",
        "total_blocks",
        "mined_blocks",
        "pct",
    ];
}

/// `<dir>/<prefix>_<unix millis>.csv`
pub fn timestamped_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}_{}.csv", prefix, Utc::now().timestamp_millis()))
}

/// Write rows to a CSV file. The header row is written even when `rows` is empty.
pub fn write_csv<T: TabularRecord, P: AsRef<Path>>(path: P, rows: &[T]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let write = || -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(T::COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    };
    write().with_context(|| format!("failed to write results to {:?}", path))?;

    info!("Saved {} rows to {:?}", rows.len(), path);
    Ok(())
}

/// Read anomaly rows back from a file produced by [`write_csv`].
pub fn read_anomalies<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<AnomalyRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {:?}", path))?;
    let rows = reader
        .deserialize::<AnomalyRecord>()
        .collect::<Result<Vec<_>, csv::Error>>()
        .with_context(|| format!("invalid anomaly file {:?}", path))?;

    info!("Loaded {} anomalies from {:?}", rows.len(), path);
    Ok(rows)
}
