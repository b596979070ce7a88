use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::DeployError;
use crate::ethers_utils::ChainClient;
use crate::types::ChainId;
use crate::utils::{self, RetryPolicy};

pub mod registry;

pub use self::registry::NetworkRegistry;

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{} (chain id {})", name, chain_id)]
pub struct NetworkIdentity {
    pub chain_id: ChainId,
    pub name: String,
    pub is_local: bool,
}

impl NetworkIdentity {
    pub fn new(chain_id: ChainId, name: impl ToString) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            is_local: chain_id.is_local(),
        }
    }
}

/// The network the operator asked for, before the endpoint was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSelection {
    /// Registry name, `None` when only a raw RPC url was given.
    pub name: Option<String>,
    pub expected_chain_id: Option<ChainId>,
    pub rpc_url: Url,
}

/// Asks the endpoint for its chain id and names the network after it.
#[instrument(skip_all, fields(rpc_url = %selection.rpc_url))]
pub async fn resolve<C: ChainClient>(
    client: &C,
    selection: &NetworkSelection,
    registry: &NetworkRegistry,
    retry_policy: &RetryPolicy,
) -> Result<NetworkIdentity, DeployError> {
    let chain_id = utils::retry(retry_policy, "Fetching chain id", || {
        client.chain_id()
    })
    .await
    .map_err(DeployError::network)?;

    if let Some(expected) = selection.expected_chain_id {
        if expected != chain_id {
            return Err(DeployError::network(format!(
                "endpoint reports chain id {chain_id} but network {} expects {expected}",
                selection.name.as_deref().unwrap_or("<custom>"),
            )));
        }
    }

    let name = match selection.name.as_deref() {
        Some(name) => name.to_string(),
        None => registry
            .find_by_chain_id(chain_id)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| format!("chain-{chain_id}")),
    };

    let network = NetworkIdentity::new(chain_id, name);

    info!("network name: {}", network.name);
    info!("network id: {}", network.chain_id);

    Ok(network)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::MockChain;

    fn selection(name: Option<&str>, expected: Option<u64>) -> NetworkSelection {
        NetworkSelection {
            name: name.map(str::to_string),
            expected_chain_id: expected.map(ChainId),
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn local_chain_is_flagged() -> eyre::Result<()> {
        let chain = MockChain::new(31337);

        let network = resolve(
            &chain,
            &selection(Some("localhost"), Some(31337)),
            &NetworkRegistry::builtin(),
            &RetryPolicy::none(),
        )
        .await?;

        assert_eq!(network, NetworkIdentity::new(ChainId(31337), "localhost"));
        assert!(network.is_local);

        Ok(())
    }

    #[tokio::test]
    async fn remote_chain_is_not_local() -> eyre::Result<()> {
        let chain = MockChain::new(56);

        let network = resolve(
            &chain,
            &selection(Some("bsc"), Some(56)),
            &NetworkRegistry::builtin(),
            &RetryPolicy::none(),
        )
        .await?;

        assert!(!network.is_local);
        assert_eq!(network.to_string(), "bsc (chain id 56)");

        Ok(())
    }

    #[tokio::test]
    async fn names_raw_endpoints_from_the_registry() -> eyre::Result<()> {
        let registry = NetworkRegistry::builtin();

        let known =
            resolve(&MockChain::new(137), &selection(None, None), &registry, &RetryPolicy::none())
                .await?;
        assert_eq!(known.name, "polygon");

        let unknown =
            resolve(&MockChain::new(7777), &selection(None, None), &registry, &RetryPolicy::none())
                .await?;
        assert_eq!(unknown.name, "chain-7777");

        Ok(())
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_a_network_error() {
        let chain = MockChain::new(97);

        let err = resolve(
            &chain,
            &selection(Some("bsc"), Some(56)),
            &NetworkRegistry::builtin(),
            &RetryPolicy::none(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_endpoint_fails_after_retries() {
        let chain = MockChain::new(56).with_chain_id_failures(usize::MAX);

        let err = resolve(
            &chain,
            &selection(Some("bsc"), None),
            &NetworkRegistry::builtin(),
            &RetryPolicy::new(2, Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Network(_)));
        assert_eq!(chain.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() -> eyre::Result<()> {
        let chain = MockChain::new(56).with_chain_id_failures(1);

        let network = resolve(
            &chain,
            &selection(Some("bsc"), Some(56)),
            &NetworkRegistry::builtin(),
            &RetryPolicy::new(2, Duration::from_secs(1)),
        )
        .await?;

        assert_eq!(network.chain_id, ChainId(56));

        Ok(())
    }
}
