//! Abstraction for the Qtum node's read RPC. The HTTP client speaks plain JSON-RPC over reqwest.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::qtum_types::{
    Block, BlockHeader, DecodedRawTransaction, RawTransaction, TxOut, WalletTransaction,
};

/// Node error code for unknown transactions / invalid keys.
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

/// Timeout for establishing the HTTP connection to the node
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a complete request/response cycle
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// The node reports unknown wallet transactions with code -5.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == RPC_INVALID_ADDRESS_OR_KEY)
    }
}

/// Read-only Qtum RPC interface used by the transformers.
#[async_trait]
pub trait QtumRpcReadClient: Send + Sync {
    async fn get_block_count(&self) -> Result<u64, RpcError>;
    async fn get_block_hash(&self, height: u64) -> Result<String, RpcError>;
    async fn get_block_header(&self, hash: &str) -> Result<BlockHeader, RpcError>;
    async fn get_block(&self, hash: &str) -> Result<Block, RpcError>;
    /// Wallet-level lookup; fails with code -5 for transactions the wallet doesn't index.
    async fn get_transaction(&self, txid: &str) -> Result<WalletTransaction, RpcError>;
    async fn get_raw_transaction(
        &self,
        txid: &str,
        verbose: bool,
    ) -> Result<RawTransaction, RpcError>;
    async fn decode_raw_transaction(&self, hex: &str) -> Result<DecodedRawTransaction, RpcError>;
    async fn get_transaction_out(
        &self,
        txid: &str,
        vout: u32,
        include_mempool: bool,
    ) -> Result<Option<TxOut>, RpcError>;
}

/// HTTP/HTTPS JSON-RPC client for a Qtum node.
pub struct HttpQtumRpcClient {
    url: String,
    client: reqwest::Client,
    auth: Option<(String, String)>,
}

impl HttpQtumRpcClient {
    pub fn new(url: String, user: Option<String>, password: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        let auth = user
            .zip(password)
            .filter(|(u, p)| !u.is_empty() || !p.is_empty());
        Ok(Self { url, client, auth })
    }

    async fn call_value(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "qtum-eth-proxy",
            "method": method,
            "params": params
        });
        trace!(method, %body, "qtum rpc request");

        let mut req = self.client.post(&self.url).json(&body);
        if let Some((ref u, ref p)) = self.auth {
            req = req.basic_auth(u, Some(p));
        }
        let response = req.send().await?;
        let status = response.status();

        // Bitcoin-family nodes answer RPC errors with HTTP 500 and a JSON body,
        // so the body is inspected before the status.
        let text = response.text().await?;
        let json: Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(RpcError::InvalidResponse(format!("HTTP {}: {}", status, text)))
            }
            Err(e) => return Err(RpcError::InvalidResponse(format!("invalid JSON: {}", e))),
        };

        if let Some(err) = json.get("error").filter(|err| !err.is_null()) {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }
        if !status.is_success() {
            return Err(RpcError::InvalidResponse(format!("HTTP {}", status)));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("no result in RPC response".to_string()))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        let result = self.call_value(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("failed to parse {} result: {}", method, e)))
    }
}

#[async_trait]
impl QtumRpcReadClient for HttpQtumRpcClient {
    async fn get_block_count(&self) -> Result<u64, RpcError> {
        self.call("getblockcount", vec![]).await
    }

    async fn get_block_hash(&self, height: u64) -> Result<String, RpcError> {
        self.call("getblockhash", vec![Value::from(height)]).await
    }

    async fn get_block_header(&self, hash: &str) -> Result<BlockHeader, RpcError> {
        self.call("getblockheader", vec![Value::from(hash), Value::from(true)])
            .await
    }

    async fn get_block(&self, hash: &str) -> Result<Block, RpcError> {
        self.call("getblock", vec![Value::from(hash), Value::from(1)])
            .await
    }

    async fn get_transaction(&self, txid: &str) -> Result<WalletTransaction, RpcError> {
        self.call("gettransaction", vec![Value::from(txid)]).await
    }

    async fn get_raw_transaction(
        &self,
        txid: &str,
        verbose: bool,
    ) -> Result<RawTransaction, RpcError> {
        let result = self
            .call_value("getrawtransaction", vec![Value::from(txid), Value::from(verbose)])
            .await?;
        match result {
            Value::String(hex) => Ok(RawTransaction {
                txid: txid.to_string(),
                hex,
                ..Default::default()
            }),
            other => serde_json::from_value(other).map_err(|e| {
                RpcError::InvalidResponse(format!("failed to parse getrawtransaction result: {}", e))
            }),
        }
    }

    async fn decode_raw_transaction(&self, hex: &str) -> Result<DecodedRawTransaction, RpcError> {
        self.call("decoderawtransaction", vec![Value::from(hex)])
            .await
    }

    async fn get_transaction_out(
        &self,
        txid: &str,
        vout: u32,
        include_mempool: bool,
    ) -> Result<Option<TxOut>, RpcError> {
        self.call(
            "gettxout",
            vec![
                Value::from(txid),
                Value::from(vout),
                Value::from(include_mempool),
            ],
        )
        .await
    }
}

/// Build the shared read client.
pub fn create_qtum_read_client(
    url: &str,
    user: &str,
    password: &str,
) -> anyhow::Result<Arc<dyn QtumRpcReadClient>> {
    let client = HttpQtumRpcClient::new(
        url.to_string(),
        Some(user.to_string()),
        Some(password.to_string()),
    )?;
    Ok(Arc::new(client) as Arc<dyn QtumRpcReadClient>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_code_minus_five() {
        let err = RpcError::Rpc {
            code: -5,
            message: "Invalid or non-wallet transaction id".to_string(),
        };
        assert!(err.is_not_found());

        let err = RpcError::Rpc {
            code: -8,
            message: "Block height out of range".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(!RpcError::InvalidResponse("x".to_string()).is_not_found());
    }

    #[test]
    fn empty_credentials_disable_auth() {
        let client =
            HttpQtumRpcClient::new("http://127.0.0.1:3889".to_string(), Some(String::new()), Some(String::new()))
                .unwrap();
        assert!(client.auth.is_none());

        let client = HttpQtumRpcClient::new(
            "http://127.0.0.1:3889".to_string(),
            Some("qtum".to_string()),
            Some("secret".to_string()),
        )
        .unwrap();
        assert_eq!(client.auth, Some(("qtum".to_string(), "secret".to_string())));
    }

    /// Loopback node that answers like qtumd: errors come back as HTTP 500 with a JSON body.
    async fn spawn_node() -> String {
        use axum::{http::StatusCode, routing::post, Json, Router};

        async fn node(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            match body["method"].as_str() {
                Some("getblockcount") => (
                    StatusCode::OK,
                    Json(json!({ "result": 42, "error": null, "id": body["id"] })),
                ),
                Some("getrawtransaction") => (
                    StatusCode::OK,
                    Json(json!({ "result": "0200ab", "error": null, "id": body["id"] })),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "result": null,
                        "error": { "code": -5, "message": "Invalid or non-wallet transaction id" },
                        "id": body["id"]
                    })),
                ),
            }
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", post(node));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn http_500_error_body_keeps_node_code() {
        let url = spawn_node().await;
        let client = HttpQtumRpcClient::new(url, None, None).unwrap();

        assert_eq!(client.get_block_count().await.unwrap(), 42);

        let err = client.get_transaction("ab").await.unwrap_err();
        match &err {
            RpcError::Rpc { code, message } => {
                assert_eq!(*code, -5);
                assert_eq!(message, "Invalid or non-wallet transaction id");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn non_verbose_raw_transaction_fills_hex() {
        let url = spawn_node().await;
        let client = HttpQtumRpcClient::new(url, None, None).unwrap();

        let raw = client.get_raw_transaction("ab", false).await.unwrap();
        assert_eq!(raw.txid, "ab");
        assert_eq!(raw.hex, "0200ab");
        assert!(raw.vout.is_empty());
    }
}
