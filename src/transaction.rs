//! `eth_getTransactionByHash`: classification and Ethereum transaction assembly.

use tracing::{debug, trace, warn};

use crate::address::{receiver_address, sender_address};
use crate::error::TransformError;
use crate::eth_types::{zero_address, EthTransactionResponse, ZERO_QUANTITY};
use crate::hex_format::{add_hex_prefix, encode_u64, normalize_hash};
use crate::proxy::EthProxy;
use crate::qtum_rpc_client::RpcError;
use crate::qtum_types::{ContractInfo, DecodedRawTransaction, WalletTransaction};

/// How a wallet-visible transaction maps onto Ethereum fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// Carries an OP_CALL / OP_CREATE output.
    Contract(ContractInfo),
    /// Coinbase / coinstake output flagged `generated` by the wallet.
    Reward,
    Transfer,
}

impl TransactionKind {
    pub fn classify(
        tx: &WalletTransaction,
        decoded: &DecodedRawTransaction,
    ) -> Result<Self, TransformError> {
        if let Some(info) = decoded.contract_info()? {
            return Ok(TransactionKind::Contract(info));
        }
        if tx.generated {
            Ok(TransactionKind::Reward)
        } else {
            Ok(TransactionKind::Transfer)
        }
    }
}

/// Position of a transaction inside a block the caller already fetched.
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub hash: String,
    pub height: u64,
    pub index: usize,
}

#[derive(Debug, Clone)]
struct BlockLinkage {
    hash: String,
    number: String,
    index: String,
}

impl From<&BlockContext> for BlockLinkage {
    fn from(ctx: &BlockContext) -> Self {
        BlockLinkage {
            hash: add_hex_prefix(&ctx.hash),
            number: encode_u64(ctx.height),
            index: encode_u64(ctx.index as u64),
        }
    }
}

struct Fields {
    from: String,
    to: Option<String>,
    input: String,
    gas: String,
    gas_price: String,
    value: String,
}

fn assemble(hash: &str, linkage: Option<BlockLinkage>, fields: Fields) -> EthTransactionResponse {
    let (block_hash, block_number, transaction_index) = match linkage {
        Some(link) => (Some(link.hash), Some(link.number), Some(link.index)),
        None => (None, None, None),
    };
    EthTransactionResponse {
        hash: add_hex_prefix(hash),
        nonce: ZERO_QUANTITY.to_string(),
        block_hash,
        block_number,
        transaction_index,
        from: fields.from,
        to: fields.to,
        value: fields.value,
        gas_price: fields.gas_price,
        gas: fields.gas,
        input: fields.input,
        v: String::new(),
        r: String::new(),
        s: String::new(),
    }
}

/// Wallet labels are the only free-form payload a non-contract transaction has.
fn label_input(tx: &WalletTransaction) -> String {
    tx.first_label()
        .map(str::to_string)
        .unwrap_or_else(|| "0x".to_string())
}

impl EthProxy {
    pub async fn get_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<EthTransactionResponse, TransformError> {
        if hash.trim().is_empty() {
            return Err(TransformError::InvalidParams(
                "transaction hash is empty".to_string(),
            ));
        }
        let txid = normalize_hash(hash)?;
        self.transaction(&txid, None).await
    }

    /// Builds the response for `txid`. With a `block` context the linkage
    /// fields come from the caller instead of another header lookup.
    pub(crate) async fn transaction(
        &self,
        txid: &str,
        block: Option<&BlockContext>,
    ) -> Result<EthTransactionResponse, TransformError> {
        let client = self.client();

        let wallet_tx = match client.get_transaction(txid).await {
            Ok(tx) => tx,
            Err(err) if err.is_not_found() => {
                debug!(txid, "wallet lookup missed, using raw transaction lookup");
                return self.reward_transaction(txid, block).await;
            }
            Err(err) => return Err(TransformError::upstream("couldn't get transaction")(err)),
        };

        let decoded = client
            .decode_raw_transaction(&wallet_tx.hex)
            .await
            .map_err(|e| TransformError::Decode(format!("{}: {}", txid, e)))?;

        let linkage = match block {
            Some(ctx) => Some(BlockLinkage::from(ctx)),
            None if wallet_tx.is_pending() => None,
            None => Some(
                self.block_linkage(&wallet_tx.blockhash, wallet_tx.blockindex)
                    .await?,
            ),
        };

        let value = encode_u64(decoded.total_amount()?);
        let kind = TransactionKind::classify(&wallet_tx, &decoded)?;
        trace!(txid, ?kind, "classified transaction");

        let fields = match kind {
            TransactionKind::Contract(info) => Fields {
                from: info
                    .from
                    .as_deref()
                    .map(add_hex_prefix)
                    .unwrap_or_else(zero_address),
                to: info.to.as_deref().map(add_hex_prefix),
                input: add_hex_prefix(&info.user_input),
                gas: encode_u64(info.gas_used),
                gas_price: ZERO_QUANTITY.to_string(),
                value,
            },
            TransactionKind::Reward => Fields {
                from: zero_address(),
                to: Some(receiver_address(&decoded.vout)?),
                input: label_input(&wallet_tx),
                gas: ZERO_QUANTITY.to_string(),
                gas_price: ZERO_QUANTITY.to_string(),
                value,
            },
            TransactionKind::Transfer => Fields {
                from: sender_address(client, &decoded).await?,
                to: Some(receiver_address(&decoded.vout)?),
                input: label_input(&wallet_tx),
                gas: ZERO_QUANTITY.to_string(),
                gas_price: ZERO_QUANTITY.to_string(),
                value,
            },
        };

        Ok(assemble(&decoded.txid, linkage, fields))
    }

    /// Some reward transactions are invisible to the wallet lookup but can
    /// still be fetched raw. Their beneficiary isn't exposed on this path.
    async fn reward_transaction(
        &self,
        txid: &str,
        block: Option<&BlockContext>,
    ) -> Result<EthTransactionResponse, TransformError> {
        let client = self.client();
        let raw = client
            .get_raw_transaction(txid, true)
            .await
            .map_err(TransformError::upstream(
                "couldn't get reward transaction by hash: couldn't get raw transaction",
            ))?;

        let linkage = match block {
            Some(ctx) => Some(BlockLinkage::from(ctx)),
            None if raw.is_pending() => None,
            None => {
                let index = self.transaction_index_in_block(txid, &raw.blockhash).await?;
                Some(self.block_linkage(&raw.blockhash, index).await?)
            }
        };

        for vout in &raw.vout {
            match client
                .get_transaction_out(txid, vout.n, raw.is_pending())
                .await
            {
                Ok(out) => trace!(txid, n = vout.n, unspent = out.is_some(), "reward output"),
                Err(err) => warn!(txid, n = vout.n, error = %err, "couldn't get transaction out"),
            }
        }

        let fields = Fields {
            from: zero_address(),
            to: Some(zero_address()),
            input: "0x".to_string(),
            gas: ZERO_QUANTITY.to_string(),
            gas_price: ZERO_QUANTITY.to_string(),
            value: ZERO_QUANTITY.to_string(),
        };
        Ok(assemble(txid, linkage, fields))
    }

    async fn block_linkage(&self, block_hash: &str, index: u64) -> Result<BlockLinkage, TransformError> {
        let header = self
            .client()
            .get_block_header(block_hash)
            .await
            .map_err(TransformError::upstream("couldn't get block number by hash"))?;
        Ok(BlockLinkage {
            hash: add_hex_prefix(block_hash),
            number: encode_u64(header.height),
            index: encode_u64(index),
        })
    }

    async fn transaction_index_in_block(
        &self,
        txid: &str,
        block_hash: &str,
    ) -> Result<u64, TransformError> {
        let block = self
            .client()
            .get_block(block_hash)
            .await
            .map_err(TransformError::upstream("couldn't get transaction index in block"))?;
        block
            .tx
            .iter()
            .position(|id| id.eq_ignore_ascii_case(txid))
            .map(|index| index as u64)
            .ok_or_else(|| TransformError::Upstream {
                context: "couldn't get transaction index in block".to_string(),
                source: RpcError::InvalidResponse(format!(
                    "block {} doesn't list transaction {}",
                    block_hash, txid
                )),
            })
    }
}
