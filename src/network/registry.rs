use std::collections::BTreeMap;
use std::path::Path;

use eyre::{Context, ContextCompat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::serde_utils;
use crate::types::{ChainId, LOCAL_CHAIN_ID};

pub const DEFAULT_NETWORK: &str = "localhost";

const GWEI: u64 = 1_000_000_000;

/// Where the deploying account's key comes from on a given network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CredentialSource {
    PrivateKey,
    Mnemonic,
    /// The first well-known development account, unless a key is given.
    DevAccount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Environment variable holding the explorer API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Literal key, for explorers that accept any placeholder.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Etherscan-compatible API of chains forge doesn't know about.
    #[serde(default)]
    pub verifier_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub chain_id: ChainId,
    /// May contain `${VAR}` placeholders filled from the environment.
    pub rpc_url: String,
    pub credentials: CredentialSource,
    #[serde(default)]
    pub gas: GasPolicy,
    #[serde(default)]
    pub explorer: Option<ExplorerConfig>,
    #[serde(default)]
    pub verify_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkEntry>,
}

impl NetworkEntry {
    fn new(
        chain_id: u64,
        rpc_url: &str,
        credentials: CredentialSource,
    ) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            rpc_url: rpc_url.to_string(),
            credentials,
            gas: GasPolicy::default(),
            explorer: None,
            verify_delay_secs: None,
        }
    }

    fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas.gas_price = Some(gas_price);
        self
    }

    fn with_explorer_key_env(mut self, api_key_env: &str) -> Self {
        self.explorer.get_or_insert_with(Default::default).api_key_env =
            Some(api_key_env.to_string());
        self
    }

    fn with_explorer_key(mut self, api_key: &str) -> Self {
        self.explorer.get_or_insert_with(Default::default).api_key =
            Some(api_key.to_string());
        self
    }

    fn with_verifier_url(mut self, verifier_url: &str) -> Self {
        self.explorer.get_or_insert_with(Default::default).verifier_url =
            Some(verifier_url.to_string());
        self
    }

    pub fn rpc_url(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Url> {
        let expanded = expand_env_template(&self.rpc_url, env)?;

        expanded
            .parse()
            .with_context(|| format!("Invalid RPC url {}", self.rpc_url))
    }

    pub fn etherscan_api_key(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let explorer = self.explorer.as_ref()?;

        explorer
            .api_key_env
            .as_deref()
            .and_then(env)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| explorer.api_key.clone())
    }

    pub fn verifier_url(&self) -> eyre::Result<Option<Url>> {
        let Some(url) = self
            .explorer
            .as_ref()
            .and_then(|explorer| explorer.verifier_url.as_deref())
        else {
            return Ok(None);
        };

        let url = url
            .parse()
            .with_context(|| format!("Invalid verifier url {url}"))?;

        Ok(Some(url))
    }
}

impl NetworkRegistry {
    pub fn builtin() -> Self {
        use CredentialSource::*;

        let networks = maplit::btreemap! {
            DEFAULT_NETWORK.to_string() => NetworkEntry::new(
                LOCAL_CHAIN_ID.0,
                "http://127.0.0.1:8545",
                DevAccount,
            )
            .with_gas_price(70 * GWEI),
            "mumbai".to_string() => NetworkEntry::new(
                80001,
                "https://polygon-mumbai.infura.io/v3/${ALCHEMY_MUMBAI_KEY}",
                Mnemonic,
            )
            .with_explorer_key_env("POLYGONSCAN_API_KEY"),
            "polygon".to_string() => NetworkEntry::new(
                137,
                "https://polygon-mainnet.infura.io/v3/${ALCHEMY_POLYGON_KEY}",
                Mnemonic,
            )
            .with_explorer_key_env("POLYGONSCAN_API_KEY"),
            "bsc".to_string() => NetworkEntry::new(
                56,
                "https://bsc-dataseed1.bnbchain.org",
                PrivateKey,
            )
            .with_explorer_key_env("BSCSCAN_API_KEY"),
            "bscTestnet".to_string() => NetworkEntry::new(
                97,
                "https://bsc-testnet.blockpi.network/v1/rpc/public",
                Mnemonic,
            )
            .with_explorer_key_env("BSCSCAN_API_KEY"),
            "ethereum".to_string() => NetworkEntry::new(
                1,
                "https://mainnet.infura.io/v3/${ALCHEMY_ETHEREUM_KEY}",
                PrivateKey,
            )
            .with_explorer_key_env("ETHERSCAN_API_KEY"),
            "sepolia".to_string() => NetworkEntry::new(
                11155111,
                "https://eth-sepolia.g.alchemy.com/v2/${ALCHEMY_ETHEREUM_SEPOLIA_KEY}",
                PrivateKey,
            )
            .with_explorer_key_env("ETHERSCAN_API_KEY"),
            "arbitrum".to_string() => NetworkEntry::new(
                42161,
                "https://arbitrum-mainnet.infura.io/v3/${ALCHEMY_ARBITRUM_KEY}",
                PrivateKey,
            )
            .with_explorer_key_env("ARBISCAN_API_KEY"),
            "linea".to_string() => NetworkEntry::new(
                59144,
                "https://linea-mainnet.infura.io/v3/${ALCHEMY_LINEA_KEY}",
                PrivateKey,
            )
            .with_explorer_key_env("LINEA_EXPLORER_API_KEY")
            .with_verifier_url("https://api.lineascan.build/api"),
            "blastSepolia".to_string() => NetworkEntry::new(
                168587773,
                "https://sepolia.blast.io",
                PrivateKey,
            )
            .with_explorer_key("blast_sepolia")
            .with_verifier_url(
                "https://api.routescan.io/v2/network/testnet/evm/168587773/etherscan",
            ),
        };

        Self { networks }
    }

    /// Built-in networks, extended or overridden by the entries of `path`.
    pub async fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let mut registry = Self::builtin();

        if let Some(path) = path {
            let overrides: NetworkRegistry =
                serde_utils::read_deserialize_toml(path).await?;

            registry.networks.extend(overrides.networks);
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> eyre::Result<&NetworkEntry> {
        self.networks.get(name).with_context(|| {
            let known: Vec<&str> =
                self.networks.keys().map(String::as_str).collect();
            format!(
                "Unknown network {name:?}, known networks: {}",
                known.join(", ")
            )
        })
    }

    pub fn find_by_chain_id(
        &self,
        chain_id: ChainId,
    ) -> Option<(&str, &NetworkEntry)> {
        self.networks
            .iter()
            .find(|(_, entry)| entry.chain_id == chain_id)
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

/// Substitutes every `${VAR}` in `template`, failing with all the unset ones.
pub fn expand_env_template(
    template: &str,
    env: impl Fn(&str) -> Option<String>,
) -> eyre::Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut missing = vec![];
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);

        let placeholder = &rest[start + 2..];
        let end = placeholder.find('}').with_context(|| {
            format!("Unterminated placeholder in {template}")
        })?;

        let var = &placeholder[..end];
        match env(var).filter(|value| !value.is_empty()) {
            Some(value) => expanded.push_str(&value),
            None => missing.push(var),
        }

        rest = &placeholder[end + 1..];
    }

    expanded.push_str(rest);

    if !missing.is_empty() {
        eyre::bail!(
            "Missing environment variables: {}",
            missing.join(", ")
        );
    }

    Ok(expanded)
}
