use crate::qtum_rpc_client::RpcError;

pub const JSONRPC_INVALID_PARAMS: i64 = -32602;
pub const JSONRPC_INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A source-node lookup failed; `context` names the lookup.
    #[error("{context}")]
    Upstream {
        context: String,
        #[source]
        source: RpcError,
    },

    #[error("couldn't decode transaction: {0}")]
    Decode(String),

    #[error("couldn't resolve address: {0}")]
    AddressResolution(String),

    #[error("couldn't format value: {0}")]
    Format(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// One inlined transaction of a full block failed.
    #[error("couldn't get transaction {txid} at index {index}")]
    BlockTransaction {
        index: usize,
        txid: String,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// Adapter for `map_err` on collaborator calls.
    pub fn upstream(context: impl Into<String>) -> impl FnOnce(RpcError) -> TransformError {
        let context = context.into();
        move |source| TransformError::Upstream { context, source }
    }

    /// JSON-RPC error code reported to the caller.
    pub fn code(&self) -> i64 {
        match self {
            TransformError::InvalidParams(_) => JSONRPC_INVALID_PARAMS,
            TransformError::Upstream {
                source: RpcError::Rpc { code, .. },
                ..
            } => *code,
            TransformError::BlockTransaction { source, .. } => source.code(),
            _ => JSONRPC_INTERNAL_ERROR,
        }
    }

    /// Full `outer: inner: root` message chain.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_code_is_forwarded() {
        let err = TransformError::upstream("couldn't get block header")(RpcError::Rpc {
            code: -8,
            message: "Block height out of range".to_string(),
        });
        assert_eq!(err.code(), -8);
        assert_eq!(
            err.chain_message(),
            "couldn't get block header: RPC error -8: Block height out of range"
        );
    }

    #[test]
    fn nested_block_transaction_error() {
        let inner = TransformError::AddressResolution("no output address".to_string());
        let err = TransformError::BlockTransaction {
            index: 3,
            txid: "ab".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(err.code(), JSONRPC_INTERNAL_ERROR);
        assert_eq!(
            err.chain_message(),
            "couldn't get transaction ab at index 3: couldn't resolve address: no output address"
        );
    }

    #[test]
    fn invalid_params_code() {
        let err = TransformError::InvalidParams("transaction hash is empty".to_string());
        assert_eq!(err.code(), JSONRPC_INVALID_PARAMS);
    }
}
