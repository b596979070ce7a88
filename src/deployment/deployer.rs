use std::path::PathBuf;

use ethers::abi::Abi;
use ethers::types::{Address, TransactionReceipt, H256};
use eyre::ContextCompat;
use indicatif::ProgressStyle;
use reqwest::Url;
use tracing::{debug, info, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::constructor::encode_constructor_args;
use crate::cli::PrivateKey;
use crate::config::{DeployPolicy, DeploymentConfig};
use crate::error::DeployError;
use crate::ethers_utils::{self, ChainClient};
use crate::forge_utils::{
    ContractSpec, ForgeCreate, ForgeInspectAbi, ForgeOutput,
};
use crate::network::NetworkIdentity;
use crate::params::DeploymentParameters;
use crate::report::DeploymentRecord;
use crate::utils;

/// Compiles and broadcasts contract creations.
#[allow(async_fn_in_trait)]
pub trait ContractDeployer {
    async fn constructor_abi(&self, contract: &ContractSpec)
        -> eyre::Result<Abi>;

    /// Sends the creation transaction. Never retried.
    async fn submit(
        &self,
        contract: &ContractSpec,
        parameters: &DeploymentParameters,
    ) -> eyre::Result<ForgeOutput>;
}

#[derive(Debug)]
pub struct ForgeDeployer {
    project_root: PathBuf,
    rpc_url: Url,
    private_key: PrivateKey,
    gas_limit: Option<u64>,
    gas_price: Option<u64>,
}

impl ForgeDeployer {
    pub fn new(config: &DeploymentConfig, private_key: PrivateKey) -> Self {
        Self {
            project_root: config.project_root.clone(),
            rpc_url: config.network.rpc_url.clone(),
            private_key,
            gas_limit: config.deploy.gas_limit,
            gas_price: config.deploy.gas_price,
        }
    }

    pub fn forge_create(&self, contract_spec: ContractSpec) -> ForgeCreate {
        ForgeCreate::new(contract_spec)
            .with_cwd(&self.project_root)
            .with_private_key(self.private_key.clone())
            .with_rpc_url(self.rpc_url.to_string())
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price)
    }
}

impl ContractDeployer for ForgeDeployer {
    async fn constructor_abi(
        &self,
        contract: &ContractSpec,
    ) -> eyre::Result<Abi> {
        ForgeInspectAbi::new(contract.clone())
            .with_cwd(&self.project_root)
            .run()
            .await
    }

    async fn submit(
        &self,
        contract: &ContractSpec,
        parameters: &DeploymentParameters,
    ) -> eyre::Result<ForgeOutput> {
        parameters
            .iter()
            .fold(self.forge_create(contract.clone()), |create, arg| {
                create.with_constructor_arg(arg)
            })
            .run()
            .await
    }
}

/// Polls until `tx_hash` is mined and buried under enough blocks.
///
/// A mined but reverted transaction fails right away, without waiting
/// for confirmations.
#[instrument(skip(client, policy))]
pub async fn await_confirmation<C: ChainClient>(
    client: &C,
    tx_hash: H256,
    policy: &DeployPolicy,
) -> eyre::Result<TransactionReceipt> {
    Span::current().pb_set_style(&ProgressStyle::default_spinner());

    let receipt = loop {
        let receipt =
            utils::retry(&policy.rpc_retry, "Fetching receipt", || {
                client.transaction_receipt(tx_hash)
            })
            .await?;

        if let Some(receipt) = receipt {
            break receipt;
        }

        tokio::time::sleep(policy.poll_interval).await;
    };

    ethers_utils::ensure_succeeded(&receipt, policy.gas_limit)?;

    let mined_in = receipt
        .block_number
        .context("Receipt without block number")?
        .as_u64();
    let confirmed_at = mined_in + policy.confirmations.saturating_sub(1);

    loop {
        let head =
            utils::retry(&policy.rpc_retry, "Fetching block number", || {
                client.block_number()
            })
            .await?;

        if head >= confirmed_at {
            debug!(mined_in, head, "Transaction confirmed");
            return Ok(receipt);
        }

        debug!(
            "{} of {} confirmations",
            (head + 1).saturating_sub(mined_in),
            *policy.confirmations
        );

        tokio::time::sleep(policy.poll_interval).await;
    }
}

/// Deploys `contract` and waits for it to confirm.
///
/// The constructor arguments are encoded before anything is broadcast, so
/// a value that doesn't fit its parameter type costs no gas.
#[instrument(skip_all, fields(contract = %contract))]
pub async fn deploy_contract<C, D>(
    client: &C,
    deployer: &D,
    contract: &ContractSpec,
    parameters: DeploymentParameters,
    network: &NetworkIdentity,
    policy: &DeployPolicy,
) -> Result<DeploymentRecord, DeployError>
where
    C: ChainClient,
    D: ContractDeployer,
{
    let abi = deployer
        .constructor_abi(contract)
        .await
        .map_err(|err| DeployError::deployment(contract, err))?;

    let constructor_args = encode_constructor_args(&abi, &parameters)
        .map_err(|err| DeployError::deployment(contract, err))?;

    info!(?parameters, "Deploying {contract} on {network}");

    let confirmed = tokio::time::timeout(policy.timeout, async {
        let output = deployer.submit(contract, &parameters).await?;

        info!(
            tx_hash = ?output.transaction_hash,
            "Deployment submitted, awaiting {} confirmation(s)",
            *policy.confirmations
        );

        let receipt =
            await_confirmation(client, output.transaction_hash, policy)
                .await?;

        eyre::Ok((output, receipt))
    })
    .await;

    let (output, receipt) = match confirmed {
        Ok(result) => {
            result.map_err(|err| DeployError::deployment(contract, err))?
        }
        Err(_) => {
            return Err(DeployError::deployment(
                contract,
                format!("not confirmed within {:?}", policy.timeout),
            ))
        }
    };

    ensure_deployed_address(&output, &receipt)
        .map_err(|err| DeployError::deployment(contract, err))?;

    let block_number = receipt
        .block_number
        .map(|block| block.as_u64())
        .unwrap_or_default();

    Ok(DeploymentRecord {
        contract_name: contract.to_string(),
        address: output.deployed_to,
        transaction_hash: output.transaction_hash,
        deployer: output.deployer,
        block_number,
        parameters,
        constructor_args,
        network: network.clone(),
    })
}

fn ensure_deployed_address(
    output: &ForgeOutput,
    receipt: &TransactionReceipt,
) -> eyre::Result<()> {
    if output.deployed_to == Address::zero() {
        eyre::bail!("Deployment reported the zero address");
    }

    if let Some(created) = receipt.contract_address {
        if created != output.deployed_to {
            eyre::bail!(
                "Receipt created {created:?} but forge reported {:?}",
                output.deployed_to
            );
        }
    }

    Ok(())
}
