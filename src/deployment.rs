use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::DeploymentConfig;
use crate::error::{DeployError, Stage};
use crate::ethers_utils::ChainClient;
use crate::network;
use crate::params::{self, PRESALE_CONSTRUCTOR_KEYS};
use crate::report::{self, DeploymentRecord};

pub mod constructor;
pub mod deployer;
pub mod verification;

pub use self::deployer::{ContractDeployer, ForgeDeployer};
pub use self::verification::{
    ForgeVerifier, SourceVerifier, VerificationOutcome,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deployment {
    pub record: DeploymentRecord,
    pub verification: VerificationOutcome,
}

/// Runs one deployment from assembled parameters to verified source.
///
/// Parameters are assembled before the endpoint is contacted, so missing
/// configuration never costs a network round trip, and verification
/// settings are checked before any gas is spent. The record is emitted
/// as soon as the contract confirms, a failed verification leaves it in
/// the operator's hands.
#[instrument(skip_all, fields(contract = %config.contract))]
pub async fn execute<C, D, V>(
    config: &DeploymentConfig,
    client: &C,
    deployer: &D,
    verifier: &V,
) -> Result<Deployment, DeployError>
where
    C: ChainClient,
    D: ContractDeployer,
    V: SourceVerifier,
{
    info!(stage = %Stage::Assembling, "Assembling constructor parameters");
    let parameters =
        params::assemble(&PRESALE_CONSTRUCTOR_KEYS, &config.constructor)?;

    info!(stage = %Stage::Resolving, "Resolving network");
    let network = network::resolve(
        client,
        &config.network,
        &config.registry,
        &config.deploy.rpc_retry,
    )
    .await?;

    if !network.is_local {
        verifier.preflight(&network)?;
    }

    info!(stage = %Stage::Deploying, "Deploying {}", config.contract);
    let record = deployer::deploy_contract(
        client,
        deployer,
        &config.contract,
        parameters,
        &network,
        &config.deploy,
    )
    .await?;

    if let Err(err) =
        report::emit(&record, config.report_path.as_deref()).await
    {
        tracing::error!("Failed to print deployment record: {err:?}");
    }

    if !network.is_local {
        info!(stage = %Stage::Delaying, "Waiting before verification");
    }

    let verification =
        verification::verification_gate(verifier, &record, &config.verify)
            .await?;

    info!(%verification, "Deployment of {} finished", config.contract);

    Ok(Deployment {
        record,
        verification,
    })
}
