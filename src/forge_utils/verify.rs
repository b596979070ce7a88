use std::path::PathBuf;

use ethers::types::{Address, Bytes};
use reqwest::Url;
use tracing::{info, instrument};

use super::common::{check_output, ContractSpec};
use crate::types::ChainId;

/// A verification input that was never provided, retrying cannot help.
#[derive(Debug, thiserror::Error)]
#[error("Missing {0}")]
pub struct MissingSetting(pub &'static str);

pub struct ForgeVerify {
    spec: ContractSpec,
    address: Address,
    root: Option<PathBuf>,
    chain: Option<ChainId>,
    etherscan_api_key: Option<String>,
    verifier_url: Option<Url>,
    constructor_args: Option<Bytes>,
}

impl ForgeVerify {
    pub fn new(spec: ContractSpec, address: Address) -> Self {
        Self {
            spec,
            address,
            root: None,
            chain: None,
            etherscan_api_key: None,
            verifier_url: None,
            constructor_args: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_chain(mut self, chain: ChainId) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_etherscan_api_key(
        mut self,
        etherscan_api_key: Option<String>,
    ) -> Self {
        self.etherscan_api_key = etherscan_api_key;
        self
    }

    pub fn with_verifier_url(mut self, verifier_url: Option<Url>) -> Self {
        self.verifier_url = verifier_url;
        self
    }

    /// ABI-encoded constructor arguments, without the creation code.
    pub fn with_constructor_args(mut self, constructor_args: Bytes) -> Self {
        self.constructor_args = Some(constructor_args);
        self
    }

    #[instrument(name = "forge_verify", skip_all, fields(address = ?self.address))]
    pub async fn run(&self) -> eyre::Result<()> {
        let mut cmd = tokio::process::Command::new("forge");
        cmd.arg("verify-contract");
        cmd.kill_on_drop(true);

        cmd.arg("--watch");

        let root = self.root.as_ref().ok_or(MissingSetting("root"))?;

        cmd.arg("--root");
        cmd.arg(root);

        let chain = self.chain.as_ref().ok_or(MissingSetting("chain"))?;

        cmd.arg("--chain");
        cmd.arg(chain.to_string());

        let etherscan_api_key = self
            .etherscan_api_key
            .as_ref()
            .ok_or(MissingSetting("etherscan api key"))?;

        cmd.arg("--etherscan-api-key");
        cmd.arg(etherscan_api_key);

        if let Some(verifier_url) = &self.verifier_url {
            cmd.arg("--verifier-url");
            cmd.arg(verifier_url.as_str());
        }

        if let Some(constructor_args) = &self.constructor_args {
            if !constructor_args.is_empty() {
                cmd.arg("--constructor-args");
                cmd.arg(constructor_args.to_string());
            }
        }

        cmd.arg(format!("{:?}", self.address));
        cmd.arg(self.spec.to_string());

        info!(chain = %chain, verifier_url = ?self.verifier_url, "Verifying contract");

        let output = cmd.output().await?;

        check_output("forge verify-contract", &output)?;

        Ok(())
    }
}
