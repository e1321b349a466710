use std::sync::Arc;

use crate::qtum_rpc_client::QtumRpcReadClient;

/// Default number of transaction lookups in flight for a full block.
pub const DEFAULT_TX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upper bound on concurrent per-transaction lookups when inlining a block.
    pub tx_concurrency: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            tx_concurrency: DEFAULT_TX_CONCURRENCY,
        }
    }
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tx_concurrency == 0 {
            return Err("tx_concurrency must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Translates Ethereum block/transaction queries into Qtum node lookups.
///
/// Holds no per-request state; every call fetches fresh snapshots from the node.
#[derive(Clone)]
pub struct EthProxy {
    client: Arc<dyn QtumRpcReadClient>,
    config: ProxyConfig,
}

impl EthProxy {
    pub fn new(client: Arc<dyn QtumRpcReadClient>, config: ProxyConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &dyn QtumRpcReadClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
