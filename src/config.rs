use std::path::PathBuf;
use std::time::Duration;

use eyre::ContextCompat;
use reqwest::Url;
use tracing::info;

use crate::cli::{Args, CredentialArgs};
use crate::credentials::Credentials;
use crate::forge_utils::ContractSpec;
use crate::network::registry::{CredentialSource, DEFAULT_NETWORK};
use crate::network::{NetworkRegistry, NetworkSelection};
use crate::params::ConstructorConfig;
use crate::types::Confirmations;
use crate::utils::RetryPolicy;

pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(10);

/// Everything an invocation needs, built once at startup.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub contract: ContractSpec,
    pub project_root: PathBuf,
    pub constructor: ConstructorConfig,
    pub registry: NetworkRegistry,
    pub network: NetworkSelection,
    pub credential_source: Option<CredentialSource>,
    pub deploy: DeployPolicy,
    pub verify: VerifyPolicy,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPolicy {
    pub confirmations: Confirmations,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
    /// Applies to reads only, a deployment is never resubmitted.
    pub rpc_retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPolicy {
    pub propagation_delay: Duration,
    pub retry: RetryPolicy,
    pub etherscan_api_key: Option<String>,
    pub verifier_url: Option<Url>,
}

impl Default for DeployPolicy {
    fn default() -> Self {
        Self {
            confirmations: Confirmations(1),
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            gas_limit: None,
            gas_price: None,
            rpc_retry: RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            propagation_delay: DEFAULT_VERIFY_DELAY,
            retry: RetryPolicy::new(5, Duration::from_secs(5)),
            etherscan_api_key: None,
            verifier_url: None,
        }
    }
}

impl From<CredentialArgs> for Credentials {
    fn from(args: CredentialArgs) -> Self {
        Self {
            private_key: args.private_key,
            mnemonic: args.mnemonic,
            mnemonic_index: args.mnemonic_index,
        }
    }
}

impl DeploymentConfig {
    /// Combines the command line with the registry entry of the network.
    ///
    /// `env` fills the `${VAR}` placeholders and explorer key variables of
    /// registry entries.
    pub fn from_args(
        args: Args,
        registry: NetworkRegistry,
        env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        let name = match (&args.network, &args.rpc_url) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(_)) => None,
            (None, None) => Some(DEFAULT_NETWORK.to_string()),
        };

        let entry = name
            .as_deref()
            .map(|name| registry.get(name))
            .transpose()?
            .cloned();

        let rpc_url = match args.rpc_url {
            Some(rpc_url) => rpc_url,
            None => entry
                .as_ref()
                .context("Either a network or an RPC url is required")?
                .rpc_url(&env)?,
        };

        let network = NetworkSelection {
            name,
            expected_chain_id: entry.as_ref().map(|entry| entry.chain_id),
            rpc_url,
        };

        let gas = entry
            .as_ref()
            .map(|entry| entry.gas.clone())
            .unwrap_or_default();

        let deploy = DeployPolicy {
            confirmations: Confirmations(args.deploy.confirmations.max(1)),
            timeout: Duration::from_secs(args.deploy.timeout_secs),
            poll_interval: Duration::from_secs(args.deploy.poll_interval_secs),
            gas_limit: args.deploy.gas_limit.or(gas.gas_limit),
            gas_price: args.deploy.gas_price.or(gas.gas_price),
            rpc_retry: RetryPolicy::new(
                args.deploy.rpc_retries,
                Duration::from_secs(1),
            ),
        };

        let propagation_delay = args
            .verify
            .verify_delay_secs
            .or_else(|| {
                entry.as_ref().and_then(|entry| entry.verify_delay_secs)
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_VERIFY_DELAY);

        let registry_verifier_url = match &entry {
            Some(entry) => entry.verifier_url()?,
            None => None,
        };

        let verify = VerifyPolicy {
            propagation_delay,
            retry: RetryPolicy::new(
                args.verify.verify_retries,
                Duration::from_secs(5),
            ),
            etherscan_api_key: args.verify.etherscan_api_key.or_else(|| {
                entry.as_ref().and_then(|entry| entry.etherscan_api_key(&env))
            }),
            verifier_url: args.verify.verifier_url.or(registry_verifier_url),
        };

        info!(
            network = ?network.name,
            rpc_url = %network.rpc_url,
            contract = %args.contract,
            "Loaded deployment configuration"
        );

        Ok(Self {
            contract: args.contract,
            project_root: args.root,
            constructor: args.constructor.into(),
            credential_source: entry.map(|entry| entry.credentials),
            registry,
            network,
            deploy,
            verify,
            report_path: args.report,
        })
    }
}
