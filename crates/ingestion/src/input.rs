//! Input feed and miner directory loading.

use alloy::primitives::{Address, B256};
use anyhow::Context;
use mev_order_heuristics::MinerDirectory;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Column names accepted for the transaction hash, in order of preference.
pub const HASH_FIELDS: [&str; 4] = ["txhash", "tx_hash", "hash", "transaction_hash"];

/// One input row: the hash to analyze plus every other column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub tx_hash: B256,
    pub fields: Map<String, Value>,
}

impl TransactionRecord {
    /// Split a row into its hash and passthrough fields.
    pub fn from_fields(mut fields: Map<String, Value>) -> anyhow::Result<Self> {
        let key = HASH_FIELDS
            .iter()
            .find_map(|wanted| {
                fields
                    .keys()
                    .find(|k| normalize_header(k) == *wanted)
                    .cloned()
            })
            .ok_or_else(|| anyhow::anyhow!("row has no transaction hash column"))?;

        let raw = fields.remove(&key).unwrap_or(Value::Null);
        let raw = raw
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("column {} is not a string", key))?;
        let tx_hash = B256::from_str(raw.trim())
            .with_context(|| format!("invalid transaction hash {:?}", raw))?;

        Ok(Self { tx_hash, fields })
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

/// Supported tabular input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(InputFormat::Json),
            Some("csv") => Ok(InputFormat::Csv),
            _ => Err(anyhow::anyhow!("unsupported input file {:?}, expected .json or .csv", path)),
        }
    }
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<Map<String, Value>>> {
    match InputFormat::from_path(path)? {
        InputFormat::Json => {
            let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
            let rows = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("{:?} is not a JSON array of objects", path))?;
            Ok(rows)
        }
        InputFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open {:?}", path))?;
            let headers = reader.headers()?.clone();
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record?;
                rows.push(
                    headers
                        .iter()
                        .zip(record.iter())
                        .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
                        .collect(),
                );
            }
            Ok(rows)
        }
    }
}

/// Load the transactions to analyze. Rows without a usable hash are skipped.
///
/// # Arguments
/// * `path` - A `.json` array of objects or a `.csv` file with a header row
pub fn load_transaction_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    let total = rows.len();

    let records: Vec<TransactionRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| match TransactionRecord::from_fields(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping input row {}: {:#}", i + 1, e);
                None
            }
        })
        .collect();

    info!("Loaded {} of {} input transactions from {:?}", records.len(), total, path);
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct MinerEntry {
    address: String,
    name: String,
}

/// Load known miner names from a `.json` array of `{address, name}` objects
/// or a `.csv` file with `address,name` headers.
pub fn load_miner_directory<P: AsRef<Path>>(path: P) -> anyhow::Result<MinerDirectory> {
    let path = path.as_ref();
    let entries: Vec<MinerEntry> = match InputFormat::from_path(path)? {
        InputFormat::Json => {
            let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid miner directory {:?}", path))?
        }
        InputFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open {:?}", path))?;
            reader
                .deserialize::<MinerEntry>()
                .collect::<Result<Vec<_>, csv::Error>>()
                .with_context(|| format!("invalid miner directory {:?}", path))?
        }
    };

    let parsed = entries.into_iter().filter_map(|entry| {
        match Address::from_str(entry.address.trim()) {
            Ok(address) => Some((address, entry.name)),
            Err(e) => {
                warn!("Skipping miner {:?} with address {:?}: {}", entry.name, entry.address, e);
                None
            }
        }
    });
    let directory = MinerDirectory::from_entries(parsed);

    info!("Loaded {} known miners from {:?}", directory.len(), path);
    Ok(directory)
}
