use std::path::Path;

use ethers::types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::network::NetworkIdentity;
use crate::params::DeploymentParameters;
use crate::serde_utils;

/// A confirmed contract creation.
///
/// Written for the operator only, a later invocation never reads it back
/// and always deploys a fresh instance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Address,
    pub transaction_hash: H256,
    pub deployer: Address,
    pub block_number: u64,
    pub parameters: DeploymentParameters,
    pub constructor_args: Bytes,
    pub network: NetworkIdentity,
}

/// Announces the deployed address and hands the record to the operator.
///
/// A failed file write only gets logged, the contract is on chain either
/// way.
pub async fn emit(
    record: &DeploymentRecord,
    path: Option<&Path>,
) -> eyre::Result<()> {
    info!("{} deployed to: {:?}", record.contract_name, record.address);

    let yaml = serde_yaml::to_string(record)?;
    println!("{yaml}");

    if let Some(path) = path {
        match serde_utils::write_serialize(path, record).await {
            Ok(()) => info!("Deployment record written to {}", path.display()),
            Err(err) => error!("Failed to write deployment record: {err:?}"),
        }
    }

    Ok(())
}
