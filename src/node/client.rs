//!
//! JSON-RPC client for the node daemon.
//!
//! The daemon is the source of truth for blocks and transactions. This client issues one
//! HTTP request per call and performs no retries; callers decide how to react to an
//! [`RpcError`].

use super::types::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Remote procedure calls the scanning pipeline needs from the daemon.
#[async_trait]
pub trait NodeRpc: Send + Sync {
	async fn get_best_block_hash(&self) -> Result<String, RpcError>;

	async fn get_block(&self, hash: &str) -> Result<Block, RpcError>;

	async fn get_block_hash(&self, height: u64) -> Result<String, RpcError>;

	async fn get_block_count(&self) -> Result<u64, RpcError>;

	/// Fetch a transaction with verbose decoding. Requires `-txindex` on the daemon.
	async fn get_raw_transaction(&self, txid: &str) -> Result<RawTransaction, RpcError>;

	async fn validate_address(&self, address: &str) -> Result<bool, RpcError>;

	async fn get_raw_mempool(&self) -> Result<Vec<String>, RpcError>;

	/// Seconds the daemon has been running. Used as a liveness check.
	async fn uptime(&self) -> Result<u64, RpcError>;
}

/// HTTP JSON-RPC client for a bitcoind-family daemon
pub struct NodeRpcClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The daemon's RPC endpoint.
	rpc_url: String,
	/// Basic-auth credentials, if the daemon requires them.
	credentials: Option<(String, String)>,
	next_id: AtomicU64,
}

impl NodeRpcClient {
	/// Create a new node client.
	///
	/// # Arguments
	/// * `rpc_url` - The HTTP endpoint of the daemon.
	/// * `credentials` - Optional `(user, password)` pair for basic auth.
	/// * `timeout` - Per-request timeout. A timeout surfaces as [`RpcError::Http`].
	pub fn new(rpc_url: String, credentials: Option<(String, String)>, timeout: Duration) -> Self {
		let http_client = Client::builder()
			.timeout(timeout)
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			rpc_url,
			credentials,
			next_id: AtomicU64::new(0),
		}
	}

	/// Execute a single RPC call and deserialize its `result`.
	pub async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		params: Vec<Value>,
	) -> Result<T, RpcError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "1.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("RPC call {} #{}: {}", method, id, request_body["params"]);

		let mut request = self.http_client.post(&self.rpc_url).json(&request_body);
		if let Some((user, password)) = &self.credentials {
			request = request.basic_auth(user, Some(password));
		}

		let response = request.send().await?;
		let status = response.status();
		let body = response.bytes().await?;

		decode_envelope(method, status.as_u16(), &body)
	}
}

/// Decode a JSON-RPC response body.
///
/// Daemons report call errors with HTTP 500 and a regular envelope, so the body is parsed
/// before the status is considered.
pub fn decode_envelope<T: DeserializeOwned>(
	method: &str,
	status: u16,
	body: &[u8],
) -> Result<T, RpcError> {
	let envelope: RpcEnvelope = match serde_json::from_slice(body) {
		Ok(envelope) => envelope,
		Err(_) if !(200..300).contains(&status) => return Err(RpcError::Status(status)),
		Err(e) => return Err(RpcError::Json(e)),
	};

	if let Some(error) = envelope.error {
		return Err(RpcError::Rpc {
			code: error.code,
			message: error.message,
		});
	}

	if envelope.result.is_null() {
		return Err(RpcError::MissingResult(method.to_string()));
	}

	Ok(serde_json::from_value(envelope.result)?)
}

#[async_trait]
impl NodeRpc for NodeRpcClient {
	async fn get_best_block_hash(&self) -> Result<String, RpcError> {
		self.call("getbestblockhash", vec![]).await
	}

	async fn get_block(&self, hash: &str) -> Result<Block, RpcError> {
		self.call("getblock", vec![json!(hash)]).await
	}

	async fn get_block_hash(&self, height: u64) -> Result<String, RpcError> {
		self.call("getblockhash", vec![json!(height)]).await
	}

	async fn get_block_count(&self) -> Result<u64, RpcError> {
		self.call("getblockcount", vec![]).await
	}

	async fn get_raw_transaction(&self, txid: &str) -> Result<RawTransaction, RpcError> {
		self.call("getrawtransaction", vec![json!(txid), json!(1)])
			.await
	}

	async fn validate_address(&self, address: &str) -> Result<bool, RpcError> {
		let validation: AddressValidation =
			self.call("validateaddress", vec![json!(address)]).await?;
		Ok(validation.is_valid)
	}

	async fn get_raw_mempool(&self) -> Result<Vec<String>, RpcError> {
		self.call("getrawmempool", vec![]).await
	}

	async fn uptime(&self) -> Result<u64, RpcError> {
		self.call("uptime", vec![]).await
	}
}
