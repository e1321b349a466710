//! qtum-eth-proxy - Ethereum JSON-RPC facade over a Qtum node
//!
//! Translates `eth_getBlockByHash`, `eth_getBlockByNumber` and
//! `eth_getTransactionByHash` into Qtum RPC lookups and rebuilds
//! Ethereum-shaped responses from the UTXO data.
//!
//! # Usage
//!
//! ```no_run
//! use qtum_eth_proxy::{create_qtum_read_client, EthProxy, ProxyConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = create_qtum_read_client("http://127.0.0.1:3889", "qtum", "testpasswd")?;
//! let proxy = EthProxy::new(client, ProxyConfig::default()).map_err(anyhow::Error::msg)?;
//! let block = proxy.get_block_by_number("latest".parse()?, false).await?;
//! println!("{}", serde_json::to_string_pretty(&block)?);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod block;
pub mod error;
pub mod eth_types;
pub mod hex_format;
pub mod proxy;
pub mod qtum_rpc_client;
pub mod qtum_types;
pub mod rpc;
pub mod transaction;


pub use error::TransformError;
pub use eth_types::{BlockNumber, BlockTransactions, EthBlockResponse, EthTransactionResponse};
pub use proxy::{EthProxy, ProxyConfig};
pub use qtum_rpc_client::{create_qtum_read_client, HttpQtumRpcClient, QtumRpcReadClient, RpcError};
pub use rpc::RpcServer;
pub use transaction::TransactionKind;
