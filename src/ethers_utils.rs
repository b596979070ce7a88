use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{TransactionReceipt, H256, U256};
use eyre::Context;

use crate::types::ChainId;

/// The read-only chain queries a deployment needs.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    async fn chain_id(&self) -> eyre::Result<ChainId>;

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> eyre::Result<Option<TransactionReceipt>>;

    async fn block_number(&self) -> eyre::Result<u64>;
}

impl ChainClient for Provider<Http> {
    async fn chain_id(&self) -> eyre::Result<ChainId> {
        let chain_id = self.get_chainid().await.context("eth_chainId")?;

        if chain_id > U256::from(u64::MAX) {
            eyre::bail!("Chain id {chain_id} does not fit in 64 bits");
        }

        Ok(ChainId(chain_id.as_u64()))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> eyre::Result<Option<TransactionReceipt>> {
        self.get_transaction_receipt(tx_hash)
            .await
            .context("eth_getTransactionReceipt")
    }

    async fn block_number(&self) -> eyre::Result<u64> {
        let block_number =
            self.get_block_number().await.context("eth_blockNumber")?;

        Ok(block_number.as_u64())
    }
}

/// Fails unless the receipt reports successful execution.
pub fn ensure_succeeded(
    receipt: &TransactionReceipt,
    gas_limit: Option<u64>,
) -> eyre::Result<()> {
    if receipt.status == Some(1.into()) {
        return Ok(());
    }

    let out_of_gas = match (gas_limit, receipt.gas_used) {
        (Some(limit), Some(used)) => used >= U256::from(limit),
        _ => false,
    };

    if out_of_gas {
        eyre::bail!(
            "Transaction {:?} ran out of gas (limit {})",
            receipt.transaction_hash,
            gas_limit.unwrap_or_default()
        );
    }

    eyre::bail!("Transaction {:?} reverted", receipt.transaction_hash);
}
