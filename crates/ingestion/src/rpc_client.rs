//! Ethereum JSON-RPC client backing [`ChainDataSource`].

use alloy::primitives::{Address, B256, U256, U64};
use async_trait::async_trait;
use mev_order_heuristics::{
    BlockTransactions, ChainBlock, ChainReceipt, ChainTransaction,
};
use mev_order_telemetry::Metrics;
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::source::{ChainDataSource, ChainError, ChainResult};

/// Transport settings for [`RpcClient`].
#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// Upper bound on a single HTTP round-trip.
    pub timeout: Duration,
    /// Extra attempts after a connection failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further attempt.
    pub retry_backoff: Duration,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Ethereum RPC client wrapper.
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    options: RpcOptions,
    metrics: Metrics,
    closed: AtomicBool,
}

impl RpcClient {
    /// Create a new RPC client without touching the network.
    ///
    /// # Arguments
    /// * `rpc_url` - HTTP/HTTPS JSON-RPC endpoint URL
    /// * `options` - Timeout and retry settings
    /// * `metrics` - Metrics collector
    pub fn new(rpc_url: &str, options: RpcOptions, metrics: Metrics) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            options,
            metrics,
            closed: AtomicBool::new(false),
        })
    }

    /// Create a client and check the node answers before any work starts.
    pub async fn connect(rpc_url: &str, options: RpcOptions, metrics: Metrics) -> anyhow::Result<Self> {
        let client = Self::new(rpc_url, options, metrics)?;
        let latest = client.get_latest_block_number().await?;
        info!("Connected to chain node at {} (latest block {})", rpc_url, latest);
        Ok(client)
    }

    /// End the session with the node. Later calls fail as connection faults.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Disconnected from chain node at {}", self.rpc_url);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn call_rpc(&self, operation: &str, method: &str, params: Value) -> ChainResult<Value> {
        if self.is_closed() {
            return Err(ChainError::Connection(anyhow::anyhow!(
                "session with {} is closed",
                self.rpc_url
            )));
        }

        let mut attempt = 0;
        loop {
            let start = Instant::now();
            let result = self.call_once(method, &params).await;
            self.metrics.observe_rpc_latency(operation, start.elapsed().as_secs_f64());

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    self.metrics.inc_rpc_errors();
                    if e.is_recoverable() || attempt >= self.options.max_retries {
                        return Err(e);
                    }
                    let backoff = self.options.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        method,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying RPC call: {}",
                        e
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    async fn call_once(&self, method: &str, params: &Value) -> ChainResult<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChainError::Connection(e.into()))?;

        if !response.status().is_success() {
            return Err(ChainError::Connection(anyhow::anyhow!(
                "RPC request failed with status: {}",
                response.status()
            )));
        }

        let mut result: Value = response
            .json()
            .await
            .map_err(|e| ChainError::malformed(method, e))?;

        if let Some(error) = result.get("error") {
            return Err(ChainError::malformed(method, format!("RPC error: {}", error)));
        }

        Ok(result.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Get the latest block number.
    pub async fn get_latest_block_number(&self) -> ChainResult<u64> {
        let result = self.call_rpc("get_block_number", "eth_blockNumber", json!([])).await?;
        let number: U64 = decode("latest block number", result)?
            .ok_or_else(|| ChainError::NotFound("latest block number".to_string()))?;
        debug!("Latest block number: {}", number);
        Ok(number.to::<u64>())
    }
}

#[async_trait]
impl ChainDataSource for RpcClient {
    async fn get_transaction(&self, hash: B256) -> ChainResult<ChainTransaction> {
        let entity = format!("transaction {}", hash);
        let result = self
            .call_rpc("get_transaction", "eth_getTransactionByHash", json!([hash]))
            .await?;
        let tx: RpcTransaction = decode(&entity, result)?.ok_or(ChainError::NotFound(entity))?;
        tx.into_chain()
    }

    async fn get_transaction_receipt(&self, hash: B256) -> ChainResult<ChainReceipt> {
        let entity = format!("receipt {}", hash);
        let result = self
            .call_rpc("get_transaction_receipt", "eth_getTransactionReceipt", json!([hash]))
            .await?;
        let receipt: RpcReceipt =
            decode(&entity, result)?.ok_or_else(|| ChainError::NotFound(entity.clone()))?;
        receipt.into_chain(&entity)
    }

    async fn get_block(&self, number: u64, full_transactions: bool) -> ChainResult<ChainBlock> {
        let entity = format!("block {}", number);
        let hex_block = format!("0x{:x}", number);
        let result = self
            .call_rpc("get_block", "eth_getBlockByNumber", json!([hex_block, full_transactions]))
            .await?;
        let block: RpcBlock =
            decode(&entity, result)?.ok_or_else(|| ChainError::NotFound(entity.clone()))?;
        debug!("Fetched block {}", number);
        block.into_chain(&entity)
    }
}

/// Decode a JSON-RPC result; `null` means the entity does not exist.
fn decode<T: DeserializeOwned>(entity: &str, value: Value) -> ChainResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ChainError::malformed(entity, e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: B256,
    block_number: Option<U64>,
    from: Address,
    to: Option<Address>,
    nonce: U64,
    transaction_index: Option<U64>,
    gas_price: Option<U256>,
}

impl RpcTransaction {
    fn into_chain(self) -> ChainResult<ChainTransaction> {
        let entity = || format!("transaction {}", self.hash);
        let block_number = self
            .block_number
            .ok_or_else(|| ChainError::malformed(entity(), "not mined yet"))?;
        let transaction_index = self
            .transaction_index
            .ok_or_else(|| ChainError::malformed(entity(), "missing transactionIndex"))?;
        let gas_price = self
            .gas_price
            .ok_or_else(|| ChainError::malformed(entity(), "missing gasPrice"))?;

        Ok(ChainTransaction {
            hash: self.hash,
            block_number: block_number.to::<u64>(),
            from: self.from,
            to: self.to,
            nonce: self.nonce.to::<u64>(),
            transaction_index: transaction_index.to::<u64>(),
            gas_price,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcReceipt {
    // Pre-Byzantium receipts carry a state root instead.
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<IgnoredAny>,
}

impl RpcReceipt {
    fn into_chain(self, entity: &str) -> ChainResult<ChainReceipt> {
        let status = self
            .status
            .ok_or_else(|| ChainError::malformed(entity, "missing status"))?;

        Ok(ChainReceipt {
            status: status == U64::from(1),
            log_count: self.logs.len(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcBlockTransactions {
    Full(Vec<RpcTransaction>),
    Hashes(Vec<B256>),
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: Option<U64>,
    miner: Address,
    transactions: RpcBlockTransactions,
}

impl RpcBlock {
    fn into_chain(self, entity: &str) -> ChainResult<ChainBlock> {
        let number = self
            .number
            .ok_or_else(|| ChainError::malformed(entity, "missing number"))?;

        let transactions = match self.transactions {
            RpcBlockTransactions::Hashes(hashes) => BlockTransactions::Hashes(hashes),
            RpcBlockTransactions::Full(txs) => BlockTransactions::Full(
                txs.into_iter()
                    .map(RpcTransaction::into_chain)
                    .collect::<ChainResult<Vec<_>>>()?,
            ),
        };

        Ok(ChainBlock {
            number: number.to::<u64>(),
            miner: self.miner,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_tx_json() -> Value {
        json!({
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "blockNumber": "0xb443",
            "from": "0xA1E4380A3B1f749673E270229993eE55F35663b4",
            "to": "0x5DF9B87991262F6BA471F09758CDE1c0FC1De734",
            "nonce": "0x0",
            "transactionIndex": "0x2",
            "gasPrice": "0x2d79883d2000",
            "input": "0x"
        })
    }

    #[test]
    fn test_decode_transaction() {
        let tx: RpcTransaction = decode("tx", sample_tx_json()).unwrap().unwrap();
        let tx = tx.into_chain().unwrap();

        assert_eq!(tx.block_number, 46147);
        assert_eq!(tx.transaction_index, 2);
        assert_eq!(tx.gas_price, U256::from(50_000_000_000_000u64));
        assert_eq!(
            tx.from,
            Address::from_str("0xa1e4380a3b1f749673e270229993ee55f35663b4").unwrap()
        );
    }

    #[test]
    fn test_pending_transaction_is_malformed() {
        let mut value = sample_tx_json();
        value["blockNumber"] = Value::Null;
        value["transactionIndex"] = Value::Null;
        let tx: RpcTransaction = decode("tx", value).unwrap().unwrap();
        assert!(matches!(tx.into_chain(), Err(ChainError::Malformed { .. })));
    }

    #[test]
    fn test_null_result_is_absent() {
        let decoded: Option<RpcTransaction> = decode("tx", Value::Null).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_receipt_counts_logs() {
        let value = json!({
            "status": "0x1",
            "logs": [{ "address": "0x00" }, { "address": "0x01" }, {}]
        });
        let receipt: RpcReceipt = decode("receipt", value).unwrap().unwrap();
        let receipt = receipt.into_chain("receipt").unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.log_count, 3);
    }

    #[test]
    fn test_receipt_without_status_is_malformed() {
        let value = json!({ "root": "0x00", "logs": [] });
        let receipt: RpcReceipt = decode("receipt", value).unwrap().unwrap();
        assert!(receipt.into_chain("receipt").is_err());
    }

    #[test]
    fn test_decode_full_and_header_blocks() {
        let full = json!({
            "number": "0xb443",
            "miner": "0xe6a7a1d47ff21b6321162aea7c6cb457d5476bca",
            "transactions": [sample_tx_json()]
        });
        let block: RpcBlock = decode("block", full).unwrap().unwrap();
        let block = block.into_chain("block").unwrap();
        assert_eq!(block.number, 46147);
        assert_eq!(block.transactions.as_full().map(|t| t.len()), Some(1));

        let header = json!({
            "number": "0xb443",
            "miner": "0xe6a7a1d47ff21b6321162aea7c6cb457d5476bca",
            "transactions": ["0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060"]
        });
        let block: RpcBlock = decode("block", header).unwrap().unwrap();
        let block = block.into_chain("block").unwrap();
        assert!(matches!(block.transactions, BlockTransactions::Hashes(ref h) if h.len() == 1));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result: ChainResult<Option<RpcBlock>> = decode("block", json!({ "miner": 7 }));
        assert!(matches!(result, Err(ChainError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_connection_fault() {
        let options = RpcOptions {
            timeout: Duration::from_millis(200),
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
        };
        let metrics = Metrics::new().unwrap();
        let client = RpcClient::new("http://127.0.0.1:9", options, metrics.clone()).unwrap();

        let err = client.get_block(1, false).await.unwrap_err();
        assert!(!err.is_recoverable());
        let text = metrics.gather().unwrap();
        assert!(text.contains("mev_order_rpc_errors_total 2"));
    }

    #[tokio::test]
    async fn test_closed_client_refuses_calls() {
        let metrics = Metrics::new().unwrap();
        let client = RpcClient::new("http://127.0.0.1:9", RpcOptions::default(), metrics.clone()).unwrap();
        assert!(!client.is_closed());

        client.close();
        client.close();
        assert!(client.is_closed());

        let err = client.get_transaction(B256::ZERO).await.unwrap_err();
        assert!(matches!(err, ChainError::Connection(_)));
        assert!(metrics.gather().unwrap().contains("mev_order_rpc_errors_total 0"));
    }
}
