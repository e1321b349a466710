//! `eth_getBlockByHash` / `eth_getBlockByNumber`.

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use tracing::{debug, info};

use crate::error::TransformError;
use crate::eth_types::{
    empty_logs_bloom, zero_address, zero_hash, BlockNumber, BlockTransactions, EthBlockResponse,
    EthTransactionResponse, DEFAULT_BLOCK_GAS_LIMIT, EMPTY_UNCLES_HASH, EXTRA_DATA, ZERO_QUANTITY,
};
use crate::hex_format::{
    add_hex_prefix, encode_u64, format_difficulty, format_nonce, normalize_hash, strip_hex_prefix,
};
use crate::proxy::EthProxy;
use crate::qtum_types::{Block, BlockHeader};
use crate::transaction::BlockContext;

impl EthProxy {
    pub async fn get_block_by_hash(
        &self,
        hash: &str,
        full_transactions: bool,
    ) -> Result<EthBlockResponse, TransformError> {
        let hash = normalize_hash(hash)?;
        self.block_response(&hash, full_transactions).await
    }

    pub async fn get_block_by_number(
        &self,
        number: BlockNumber,
        full_transactions: bool,
    ) -> Result<EthBlockResponse, TransformError> {
        let height = self.resolve_block_number(number).await?;
        let hash = self
            .client()
            .get_block_hash(height)
            .await
            .map_err(TransformError::upstream(format!(
                "couldn't get block hash at height {}",
                height
            )))?;
        self.block_response(strip_hex_prefix(&hash), full_transactions)
            .await
    }

    pub async fn resolve_block_number(&self, number: BlockNumber) -> Result<u64, TransformError> {
        match number {
            BlockNumber::Number(height) => Ok(height),
            BlockNumber::Earliest => Ok(0),
            BlockNumber::Latest => self
                .client()
                .get_block_count()
                .await
                .map_err(TransformError::upstream("couldn't get block count")),
            BlockNumber::Pending => Err(TransformError::InvalidParams(
                "pending block is not supported".to_string(),
            )),
        }
    }

    async fn block_response(
        &self,
        hash: &str,
        full_transactions: bool,
    ) -> Result<EthBlockResponse, TransformError> {
        let client = self.client();
        let (header, block) = futures::try_join!(
            async {
                client
                    .get_block_header(hash)
                    .await
                    .map_err(TransformError::upstream("couldn't get block header"))
            },
            async {
                client
                    .get_block(hash)
                    .await
                    .map_err(TransformError::upstream("couldn't get block"))
            },
        )?;

        // No beneficiary is exposed at block level, so the miner is always zero.
        let parent_hash = if header.is_genesis() || header.previous_block_hash.is_empty() {
            zero_hash()
        } else {
            add_hex_prefix(&header.previous_block_hash)
        };

        let (transactions, gas_limit) = if full_transactions {
            let txs = self.block_transactions(&header, &block).await?;
            (
                BlockTransactions::Full(txs),
                Some(encode_u64(DEFAULT_BLOCK_GAS_LIMIT)),
            )
        } else {
            let hashes = block.tx.iter().map(|txid| add_hex_prefix(txid)).collect();
            (BlockTransactions::Hashes(hashes), None)
        };

        let difficulty = format_difficulty(header.difficulty)?;

        info!(
            height = header.height,
            hash = %header.hash,
            txs = transactions.len(),
            full_transactions,
            "served block"
        );

        Ok(EthBlockResponse {
            number: encode_u64(header.height),
            hash: add_hex_prefix(&header.hash),
            parent_hash,
            nonce: format_nonce(block.nonce),
            sha3_uncles: EMPTY_UNCLES_HASH.to_string(),
            logs_bloom: empty_logs_bloom(),
            transactions_root: add_hex_prefix(&block.merkleroot),
            state_root: add_hex_prefix(&header.hash_state_root),
            receipts_root: add_hex_prefix(&block.merkleroot),
            miner: zero_address(),
            total_difficulty: difficulty.clone(),
            difficulty,
            extra_data: EXTRA_DATA.to_string(),
            size: encode_u64(block.size),
            gas_limit,
            gas_used: ZERO_QUANTITY.to_string(),
            timestamp: encode_u64(header.time),
            transactions,
            uncles: Vec::new(),
        })
    }

    /// Looks up every transaction of the block with bounded parallelism and
    /// returns them in block order.
    async fn block_transactions(
        &self,
        header: &BlockHeader,
        block: &Block,
    ) -> Result<Vec<EthTransactionResponse>, TransformError> {
        // The genesis coinbase has no retrievable transaction context.
        if header.is_genesis() {
            debug!(hash = %header.hash, "skipping transaction lookups for genesis block");
            return Ok(Vec::new());
        }

        // Each lookup owns its inputs so the boxed futures are 'static + Send.
        let block_hash = header.hash.clone();
        let height = header.height;
        let mut tagged: Vec<(usize, EthTransactionResponse)> =
            stream::iter(block.tx.clone().into_iter().enumerate())
                .map(|(index, txid)| {
                    let this = self.clone();
                    let context = BlockContext {
                        hash: block_hash.clone(),
                        height,
                        index,
                    };
                    async move {
                        let result = this
                            .transaction(strip_hex_prefix(&txid), Some(&context))
                            .await;
                        result
                            .map(|tx| (index, tx))
                            .map_err(|source| TransformError::BlockTransaction {
                                index,
                                txid,
                                source: Box::new(source),
                            })
                    }
                    .boxed()
                })
                .buffer_unordered(self.config().tx_concurrency.max(1))
                .try_collect()
                .await?;

        tagged.sort_unstable_by_key(|(index, _)| *index);
        Ok(tagged.into_iter().map(|(_, tx)| tx).collect())
    }
}
