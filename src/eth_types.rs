//! Ethereum-shaped response records and request parameters.

use alloy_primitives::{Address, B256};
use serde::Serialize;
use std::str::FromStr;

use crate::error::TransformError;
use crate::hex_format::parse_quantity;

/// Keccak of the RLP empty list: the uncle hash of a block without uncles.
pub const EMPTY_UNCLES_HASH: &str =
    "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";

/// Logs are not indexed by the source chain.
pub const EMPTY_LOGS_BLOOM: [u8; 256] = [0u8; 256];

pub const EXTRA_DATA: &str = "0x00";

/// Default node gas limit for a block (5,000,000).
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 0x4c4b40;

pub const ZERO_QUANTITY: &str = "0x0";

pub fn zero_hash() -> String {
    format!("0x{:x}", B256::ZERO)
}

pub fn zero_address() -> String {
    format!("0x{:x}", Address::ZERO)
}

pub fn empty_logs_bloom() -> String {
    format!("0x{}", hex::encode(EMPTY_LOGS_BLOOM))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBlockResponse {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub nonce: String,
    pub sha3_uncles: String,
    pub logs_bloom: String,
    pub transactions_root: String,
    pub state_root: String,
    pub receipts_root: String,
    pub miner: String,
    pub difficulty: String,
    pub total_difficulty: String,
    pub extra_data: String,
    pub size: String,
    /// Only known when transactions are inlined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    pub gas_used: String,
    pub timestamp: String,
    pub transactions: BlockTransactions,
    pub uncles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Hashes(Vec<String>),
    Full(Vec<EthTransactionResponse>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Hashes(hashes) => hashes.len(),
            BlockTransactions::Full(txs) => txs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthTransactionResponse {
    pub hash: String,
    pub nonce: String,
    /// `None` while pending; serialized as `null`.
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub transaction_index: Option<String>,
    pub from: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    pub value: String,
    pub gas_price: String,
    pub gas: String,
    pub input: String,
    pub v: String,
    pub r: String,
    pub s: String,
}

/// Block selector of `eth_getBlockByNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNumber {
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl FromStr for BlockNumber {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(BlockNumber::Latest),
            "earliest" => Ok(BlockNumber::Earliest),
            "pending" => Ok(BlockNumber::Pending),
            other => parse_quantity(other).map(BlockNumber::Number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_widths() {
        assert_eq!(zero_hash().len(), 2 + 64);
        assert_eq!(zero_address().len(), 2 + 40);
        assert_eq!(empty_logs_bloom().len(), 2 + 512);
        assert!(zero_address()[2..].chars().all(|c| c == '0'));
        assert_eq!(format!("0x{:x}", DEFAULT_BLOCK_GAS_LIMIT), "0x4c4b40");
    }

    #[test]
    fn block_number_tags() {
        assert_eq!("latest".parse::<BlockNumber>().unwrap(), BlockNumber::Latest);
        assert_eq!("earliest".parse::<BlockNumber>().unwrap(), BlockNumber::Earliest);
        assert_eq!("pending".parse::<BlockNumber>().unwrap(), BlockNumber::Pending);
        assert_eq!("0x10".parse::<BlockNumber>().unwrap(), BlockNumber::Number(16));
        assert!("safe".parse::<BlockNumber>().is_err());
        assert!("0x".parse::<BlockNumber>().is_err());
    }

    #[test]
    fn pending_transaction_serializes_nulls() {
        let tx = EthTransactionResponse {
            hash: "0xaa".to_string(),
            nonce: "0x0".to_string(),
            block_hash: None,
            block_number: None,
            transaction_index: None,
            from: zero_address(),
            to: None,
            value: "0x0".to_string(),
            gas_price: "0x0".to_string(),
            gas: "0x0".to_string(),
            input: "0x".to_string(),
            v: String::new(),
            r: String::new(),
            s: String::new(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["blockHash"], json!(null));
        assert_eq!(value["blockNumber"], json!(null));
        assert_eq!(value["transactionIndex"], json!(null));
        assert_eq!(value["gasPrice"], json!("0x0"));
    }
}
