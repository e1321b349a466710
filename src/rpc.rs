use axum::{
    extract::Json, http::StatusCode, response::Json as JsonResponse, routing::post, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::eth_types::BlockNumber;
use crate::proxy::EthProxy;

pub const JSONRPC_METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

pub struct RpcServer {
    proxy: EthProxy,
}

impl RpcServer {
    pub fn new(proxy: EthProxy) -> Self {
        Self { proxy }
    }

    pub fn router(self) -> Router {
        Router::new()
            // JSON-RPC endpoint (POST)
            .route("/", post(Self::handle_request))
            .route("/health", axum::routing::get(Self::handle_health))
            .with_state(Arc::new(self))
    }

    async fn handle_request(
        axum::extract::State(state): axum::extract::State<Arc<Self>>,
        Json(request): Json<JsonRpcRequest>,
    ) -> Result<JsonResponse<JsonRpcResponse>, StatusCode> {
        Ok(JsonResponse::from(state.dispatch(request).await))
    }

    async fn handle_health() -> JsonResponse<Value> {
        JsonResponse::from(json!({ "status": "ok" }))
    }

    /// Routes one request to its transformer and wraps the outcome.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, params = ?request.params, "rpc request");

        let result = match request.method.as_str() {
            "eth_getBlockByHash" => self.handle_get_block_by_hash(&request.params).await,
            "eth_getBlockByNumber" => self.handle_get_block_by_number(&request.params).await,
            "eth_getTransactionByHash" => {
                self.handle_get_transaction_by_hash(&request.params).await
            }
            _ => {
                return JsonRpcResponse::error(
                    request.id,
                    JSONRPC_METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                )
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::result(request.id, value),
            Err(err) => {
                warn!(method = %request.method, error = %err.chain_message(), "rpc request failed");
                JsonRpcResponse::error(request.id, err.code(), err.chain_message())
            }
        }
    }

    async fn handle_get_block_by_hash(&self, params: &[Value]) -> Result<Value, TransformError> {
        let (hash, full) = block_params(params)?;
        let block = self.proxy.get_block_by_hash(hash, full).await?;
        to_value(&block)
    }

    async fn handle_get_block_by_number(&self, params: &[Value]) -> Result<Value, TransformError> {
        let (number, full) = block_params(params)?;
        let number: BlockNumber = number.parse()?;
        let block = self.proxy.get_block_by_number(number, full).await?;
        to_value(&block)
    }

    async fn handle_get_transaction_by_hash(
        &self,
        params: &[Value],
    ) -> Result<Value, TransformError> {
        if params.len() != 1 {
            return Err(invalid_params("expected [txHash]"));
        }
        let hash = params[0]
            .as_str()
            .ok_or_else(|| invalid_params("transaction hash must be a string"))?;
        let tx = self.proxy.get_transaction_by_hash(hash).await?;
        to_value(&tx)
    }
}

/// `[selector, fullTransaction?]`; the flag defaults to false.
fn block_params(params: &[Value]) -> Result<(&str, bool), TransformError> {
    if params.is_empty() || params.len() > 2 {
        return Err(invalid_params("expected [block, fullTransaction]"));
    }
    let selector = params[0]
        .as_str()
        .ok_or_else(|| invalid_params("block selector must be a string"))?;
    let full = match params.get(1) {
        None | Some(Value::Null) => false,
        Some(value) => value
            .as_bool()
            .ok_or_else(|| invalid_params("fullTransaction must be a boolean"))?,
    };
    Ok((selector, full))
}

fn invalid_params(message: &str) -> TransformError {
    TransformError::InvalidParams(message.to_string())
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, TransformError> {
    serde_json::to_value(value).map_err(|e| TransformError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JSONRPC_INVALID_PARAMS;

    #[test]
    fn block_params_default_to_hashes_only() {
        let params = vec![json!("latest")];
        assert_eq!(block_params(&params).unwrap(), ("latest", false));

        let params = vec![json!("0x1"), json!(true)];
        assert_eq!(block_params(&params).unwrap(), ("0x1", true));
    }

    #[test]
    fn block_params_are_validated() {
        assert_eq!(block_params(&[]).unwrap_err().code(), JSONRPC_INVALID_PARAMS);
        assert_eq!(
            block_params(&[json!(1), json!(true)]).unwrap_err().code(),
            JSONRPC_INVALID_PARAMS
        );
        assert_eq!(
            block_params(&[json!("0x1"), json!("yes")]).unwrap_err().code(),
            JSONRPC_INVALID_PARAMS
        );
    }
}
