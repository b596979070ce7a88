use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

use crate::forge_utils::ContractSpec;
use crate::params::{self, ConstructorConfig};

pub mod private_key;

pub use private_key::PrivateKey;

#[derive(Debug, Clone, Parser)]
#[clap(
    rename_all = "kebab-case",
    version,
    about = "Deploys the presale contract and verifies it on the block explorer"
)]
pub struct Args {
    /// Name of the target network in the network registry
    ///
    /// Defaults to 'localhost' unless only an RPC url is given
    #[clap(short, long, env = "DEPLOY_NETWORK")]
    pub network: Option<String>,

    /// Overrides the RPC url of the network registry entry
    #[clap(short, long, env = "RPC_URL")]
    pub rpc_url: Option<Url>,

    /// TOML file with additional or overriding network entries
    #[clap(long, env = "NETWORKS_FILE")]
    pub networks: Option<PathBuf>,

    /// Contract to deploy, as '[path:]Name'
    #[clap(short, long, env = "DEPLOY_CONTRACT", default_value = "PresaleBSC")]
    pub contract: ContractSpec,

    /// Root of the foundry project holding the contract
    #[clap(long, env = "FOUNDRY_ROOT", default_value = ".")]
    pub root: PathBuf,

    #[clap(flatten)]
    pub constructor: ConstructorArgs,

    #[clap(flatten)]
    pub credentials: CredentialArgs,

    #[clap(flatten)]
    pub deploy: DeployArgs,

    #[clap(flatten)]
    pub verify: VerifyArgs,

    /// Also write the deployment record to this YAML file
    #[clap(long, env = "DEPLOY_REPORT")]
    pub report: Option<PathBuf>,
}

/// Constructor arguments of the presale contract
#[derive(Debug, Clone, Default, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct ConstructorArgs {
    /// Price feed oracle of the chain's native coin
    #[clap(long, env = "COIN_PRICE_FEED")]
    pub coin_price_feed: Option<String>,

    /// USDC token address
    #[clap(long, env = "USDC_TOKEN")]
    pub usdc_token: Option<String>,

    /// USDT token address
    #[clap(long, env = "USDT_TOKEN")]
    pub usdt_token: Option<String>,

    /// Treasury wallet receiving the protocol's funds
    #[clap(long, env = "PROTOCOL_WALLET")]
    pub protocol_wallet: Option<String>,

    /// Admin account of the presale
    #[clap(long, env = "PUBLIC_KEY_ADMIN")]
    pub public_key_admin: Option<String>,
}

impl From<ConstructorArgs> for ConstructorConfig {
    fn from(args: ConstructorArgs) -> Self {
        let mut config = ConstructorConfig::new();

        config.set(params::COIN_PRICE_FEED, args.coin_price_feed);
        config.set(params::USDC_TOKEN, args.usdc_token);
        config.set(params::USDT_TOKEN, args.usdt_token);
        config.set(params::PROTOCOL_WALLET, args.protocol_wallet);
        config.set(params::PUBLIC_KEY_ADMIN, args.public_key_admin);

        config
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct CredentialArgs {
    /// Private key of the deployer
    #[clap(long, env = "PRIVATE_KEY_DEPLOYER", hide_env_values = true)]
    pub private_key: Option<PrivateKey>,

    /// Mnemonic of the deployer
    #[clap(long, env = "SEED_PHRASE_DEPLOYER", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Account index derived from the mnemonic
    #[clap(long, env = "MNEMONIC_INDEX", default_value_t = 0)]
    pub mnemonic_index: u32,
}

#[derive(Debug, Clone, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct DeployArgs {
    /// Blocks to wait for on top of the deployment block, counting it
    #[clap(long, env = "DEPLOY_CONFIRMATIONS", default_value_t = 1)]
    pub confirmations: u64,

    /// Seconds to wait for the deployment to confirm
    #[clap(long, env = "DEPLOY_TIMEOUT", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Seconds between receipt polls
    #[clap(long, env = "DEPLOY_POLL_INTERVAL", default_value_t = 2)]
    pub poll_interval_secs: u64,

    /// Gas limit of the deployment, overrides the network's policy
    #[clap(long, env = "DEPLOY_GAS_LIMIT")]
    pub gas_limit: Option<u64>,

    /// Gas price in wei, overrides the network's policy
    #[clap(long, env = "DEPLOY_GAS_PRICE")]
    pub gas_price: Option<u64>,

    /// Retries of failed RPC reads
    #[clap(long, env = "RPC_RETRIES", default_value_t = 3)]
    pub rpc_retries: usize,
}

#[derive(Debug, Clone, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct VerifyArgs {
    /// Seconds to let the explorer index the contract before verifying
    ///
    /// Defaults to the network's setting, or 10 seconds
    #[clap(long, env = "VERIFY_DELAY")]
    pub verify_delay_secs: Option<u64>,

    /// Retries of a failed verification request
    #[clap(long, env = "VERIFY_RETRIES", default_value_t = 5)]
    pub verify_retries: usize,

    /// The etherscan API key to use, overrides the network's key variable
    #[clap(short, long, env = "VERIFIER_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Etherscan-compatible API to verify against
    #[clap(long, env = "VERIFIER_URL")]
    pub verifier_url: Option<Url>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::params::{assemble, PRESALE_CONSTRUCTOR_KEYS};

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_map_to_constructor_keys() -> eyre::Result<()> {
        let args = Args::try_parse_from([
            "presale-deployer",
            "--coin-price-feed",
            "0x01",
            "--usdc-token",
            "0x02",
            "--usdt-token",
            "0x03",
            "--protocol-wallet",
            "0x04",
            "--public-key-admin",
            "0x05",
        ])?;

        let params = assemble(
            &PRESALE_CONSTRUCTOR_KEYS,
            &ConstructorConfig::from(args.constructor),
        )?;

        assert_eq!(params.0, vec!["0x01", "0x02", "0x03", "0x04", "0x05"]);

        Ok(())
    }

    #[test]
    fn contract_spec_is_parsed() -> eyre::Result<()> {
        let args = Args::try_parse_from([
            "presale-deployer",
            "--contract",
            "src/Presale.sol:Presale",
        ])?;

        assert_eq!(args.contract.name, "Presale");

        Ok(())
    }
}
