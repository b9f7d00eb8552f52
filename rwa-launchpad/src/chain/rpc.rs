//! JSON-RPC client for the EVM chain.
//!
//! Exposes only the surface this crate uses: transaction/receipt lookup for
//! payment verification, `eth_call` for contract reads, and node-managed
//! `eth_sendTransaction` for the deployment and launch tooling (the node
//! holds the keys, exactly as the original hardhat signers did).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U64, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{LaunchpadError, Result};

/// Total timeout for RPC requests in seconds.
const RPC_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout for RPC requests in seconds.
const RPC_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash.
    pub hash: B256,
    /// Sender address.
    pub from: Address,
    /// Recipient; absent for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    /// Native value transferred, in wei.
    pub value: U256,
    /// Calldata.
    pub input: Bytes,
    /// Containing block, once mined.
    #[serde(default)]
    pub block_number: Option<U64>,
}

/// A transaction receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Execution status (`0x1` success); absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    /// Containing block.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// Gas consumed.
    #[serde(default)]
    pub gas_used: Option<U256>,
    /// Created contract address, for deployment transactions.
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Emitted logs.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    /// Whether execution succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(U64::from(1))
    }
}

/// A single log entry in a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; topic 0 is the event signature hash.
    pub topics: Vec<B256>,
    /// Non-indexed data.
    pub data: Bytes,
}

/// Request payload for `eth_sendTransaction`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Sending account; must be managed by the node.
    pub from: Address,
    /// Recipient; omit for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Native value in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Calldata or init code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

/// Chain RPC seam.
///
/// [`HttpRpc`] is the production adapter; tests substitute a scripted
/// double.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// Fetches a transaction by hash; `None` if the node does not know it.
    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<Transaction>>;

    /// Fetches a receipt by hash; `None` while the transaction is pending
    /// or unknown.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>>;

    /// Executes a read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Submits a transaction signed by a node-managed account.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;

    /// Lists node-managed accounts.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Fetches an account's native balance in wei.
    async fn balance(&self, address: Address) -> Result<U256>;

    /// Returns the chain id the node is serving.
    async fn chain_id(&self) -> Result<U64>;

    /// Polls for a receipt until one appears or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Rpc`] on timeout; transport errors
    /// propagate from the underlying lookups.
    async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TransactionReceipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LaunchpadError::Rpc(format!(
                    "timed out waiting for receipt of {hash}"
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC 2.0 adapter.
#[derive(Debug, Clone)]
pub struct HttpRpc {
    endpoint: String,
    client: Client,
    next_id: std::sync::Arc<AtomicU64>,
}

impl HttpRpc {
    /// Creates a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Http`] if client construction fails.
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(RPC_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(RPC_CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            endpoint: endpoint.to_owned(),
            client,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    #[instrument(skip(self, params), fields(method))]
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LaunchpadError::Rpc(format!("node returned HTTP {status}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| LaunchpadError::Rpc(format!("malformed JSON-RPC response: {e}")))?;

        if let Some(error) = body.error {
            return Err(LaunchpadError::Rpc(format!("{} (code {})", error.message, error.code)));
        }

        let result = body.result.unwrap_or(serde_json::Value::Null);
        debug!(method, "rpc call complete");
        serde_json::from_value(result)
            .map_err(|e| LaunchpadError::Rpc(format!("unexpected {method} result: {e}")))
    }
}

#[async_trait]
impl EvmRpc for HttpRpc {
    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<Transaction>> {
        self.request("eth_getTransactionByHash", serde_json::json!([hash])).await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        self.request("eth_getTransactionReceipt", serde_json::json!([hash])).await
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let call = serde_json::json!([{"to": to, "data": Bytes::from(data)}, "latest"]);
        let output: Bytes = self.request("eth_call", call).await?;
        Ok(output.to_vec())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        self.request("eth_sendTransaction", serde_json::json!([tx])).await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.request("eth_accounts", serde_json::json!([])).await
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.request("eth_getBalance", serde_json::json!([address, "latest"])).await
    }

    async fn chain_id(&self) -> Result<U64> {
        self.request("eth_chainId", serde_json::json!([])).await
    }
}

/// Scripted RPC double for tests.
///
/// Transactions, receipts, and call responses are registered up front;
/// anything unregistered behaves as unknown (`None`) or fails the call.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    pub struct MockRpc {
        transactions: Mutex<HashMap<B256, Transaction>>,
        receipts: Mutex<HashMap<B256, TransactionReceipt>>,
        calls: Mutex<HashMap<(Address, Vec<u8>), Vec<u8>>>,
        pub sent: Mutex<Vec<TransactionRequest>>,
        pub send_result: Mutex<Option<B256>>,
        pub accounts: Mutex<Vec<Address>>,
    }

    impl MockRpc {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_transaction(&self, tx: Transaction) {
            self.transactions.lock().unwrap().insert(tx.hash, tx);
        }

        pub fn insert_receipt(&self, receipt: TransactionReceipt) {
            self.receipts.lock().unwrap().insert(receipt.transaction_hash, receipt);
        }

        pub fn expect_call(&self, to: Address, data: Vec<u8>, response: Vec<u8>) {
            self.calls.lock().unwrap().insert((to, data), response);
        }
    }

    #[async_trait]
    impl EvmRpc for MockRpc {
        async fn transaction_by_hash(&self, hash: B256) -> Result<Option<Transaction>> {
            Ok(self.transactions.lock().unwrap().get(&hash).cloned())
        }

        async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
            Ok(self.receipts.lock().unwrap().get(&hash).cloned())
        }

        async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .get(&(to, data))
                .cloned()
                .ok_or_else(|| LaunchpadError::Rpc("execution reverted".to_owned()))
        }

        async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
            self.sent.lock().unwrap().push(tx);
            (*self.send_result.lock().unwrap())
                .ok_or_else(|| LaunchpadError::Rpc("no send result scripted".to_owned()))
        }

        async fn accounts(&self) -> Result<Vec<Address>> {
            Ok(self.accounts.lock().unwrap().clone())
        }

        async fn balance(&self, _address: Address) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn chain_id(&self) -> Result<U64> {
            Ok(U64::from(31_337))
        }
    }
}
