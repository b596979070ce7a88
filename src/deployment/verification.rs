use std::collections::BTreeMap;
use std::path::PathBuf;

use eyre::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument};

use crate::config::VerifyPolicy;
use crate::error::DeployError;
use crate::forge_utils::{ContractSpec, ForgeVerify, MissingSetting};
use crate::network::{NetworkIdentity, NetworkRegistry};
use crate::report::DeploymentRecord;
use crate::types::ChainId;
use crate::utils;

/// Environment variable named when no explorer key is known at all.
const FALLBACK_API_KEY_ENV: &str = "VERIFIER_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Skipped,
    Verified,
}

/// Submits the source of a deployed contract to a block explorer.
#[allow(async_fn_in_trait)]
pub trait SourceVerifier {
    /// Fails if verification on `network` could never succeed.
    ///
    /// Runs before anything is deployed.
    fn preflight(
        &self,
        _network: &NetworkIdentity,
    ) -> Result<(), DeployError> {
        Ok(())
    }

    async fn verify(&self, record: &DeploymentRecord) -> eyre::Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExplorerSettings {
    api_key: Option<String>,
    api_key_env: Option<String>,
    verifier_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct ForgeVerifier {
    project_root: PathBuf,
    /// Operator flags and the selected network, ahead of chain id lookups.
    overrides: ExplorerSettings,
    by_chain_id: BTreeMap<ChainId, ExplorerSettings>,
}

impl ForgeVerifier {
    /// `env` fills the explorer key variables of registry entries, so an
    /// endpoint given only by url still verifies with its network's key.
    pub fn new(
        project_root: impl Into<PathBuf>,
        policy: &VerifyPolicy,
        registry: &NetworkRegistry,
        env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        let mut by_chain_id = BTreeMap::new();

        for entry in registry.networks.values() {
            let settings = ExplorerSettings {
                api_key: entry.etherscan_api_key(&env),
                api_key_env: entry
                    .explorer
                    .as_ref()
                    .and_then(|explorer| explorer.api_key_env.clone()),
                verifier_url: entry.verifier_url()?,
            };

            by_chain_id.entry(entry.chain_id).or_insert(settings);
        }

        Ok(Self {
            project_root: project_root.into(),
            overrides: ExplorerSettings {
                api_key: policy.etherscan_api_key.clone(),
                api_key_env: None,
                verifier_url: policy.verifier_url.clone(),
            },
            by_chain_id,
        })
    }

    fn settings(&self, chain_id: ChainId) -> ExplorerSettings {
        let known = self
            .by_chain_id
            .get(&chain_id)
            .cloned()
            .unwrap_or_default();

        ExplorerSettings {
            api_key: self.overrides.api_key.clone().or(known.api_key),
            api_key_env: known.api_key_env,
            verifier_url: self
                .overrides
                .verifier_url
                .clone()
                .or(known.verifier_url),
        }
    }
}

impl SourceVerifier for ForgeVerifier {
    fn preflight(
        &self,
        network: &NetworkIdentity,
    ) -> Result<(), DeployError> {
        let settings = self.settings(network.chain_id);

        if settings.api_key.is_none() {
            let env = settings
                .api_key_env
                .unwrap_or_else(|| FALLBACK_API_KEY_ENV.to_string());

            return Err(DeployError::Configuration { missing: vec![env] });
        }

        Ok(())
    }

    async fn verify(&self, record: &DeploymentRecord) -> eyre::Result<()> {
        let spec: ContractSpec = record
            .contract_name
            .parse()
            .context("Parsing contract name of the record")?;

        let settings = self.settings(record.network.chain_id);

        ForgeVerify::new(spec, record.address)
            .with_root(&self.project_root)
            .with_chain(record.network.chain_id)
            .with_etherscan_api_key(settings.api_key)
            .with_verifier_url(settings.verifier_url)
            .with_constructor_args(record.constructor_args.clone())
            .run()
            .await
    }
}

/// Verifies `record` unless it lives on a local development chain.
///
/// Explorers index new contracts with some lag, so the first attempt waits
/// out the propagation delay and later ones back off.
#[instrument(skip_all, fields(address = ?record.address))]
pub async fn verification_gate<V: SourceVerifier>(
    verifier: &V,
    record: &DeploymentRecord,
    policy: &VerifyPolicy,
) -> Result<VerificationOutcome, DeployError> {
    if record.network.is_local {
        info!("Skipping verification on local network {}", record.network);
        return Ok(VerificationOutcome::Skipped);
    }

    info!(
        "Waiting {:?} for the explorer to index {:?}",
        policy.propagation_delay, record.address
    );
    tokio::time::sleep(policy.propagation_delay).await;

    utils::retry_when(
        &policy.retry,
        "Verification",
        || verifier.verify(record),
        |err| err.downcast_ref::<MissingSetting>().is_none(),
    )
    .await
    .map_err(|err| DeployError::verification(record.address, err))?;

    info!("Verified {} at {:?}", record.contract_name, record.address);

    Ok(VerificationOutcome::Verified)
}
