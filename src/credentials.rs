use ethers::prelude::k256::SecretKey;
use ethers::signers::coins_bip39::English;
use ethers::signers::MnemonicBuilder;
use eyre::{Context, ContextCompat};
use tracing::info;

use crate::cli::PrivateKey;
use crate::network::registry::CredentialSource;

/// Account #0 of the `test test ... junk` mnemonic used by hardhat and anvil.
pub const DEV_ACCOUNT_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub private_key: Option<PrivateKey>,
    pub mnemonic: Option<String>,
    pub mnemonic_index: u32,
}

impl Credentials {
    /// Picks the deploying account the way `source` prescribes.
    ///
    /// Networks outside the registry take whichever credential is present,
    /// preferring the private key.
    pub fn resolve(
        &self,
        source: Option<CredentialSource>,
    ) -> eyre::Result<PrivateKey> {
        let key = match source {
            Some(CredentialSource::PrivateKey) => self
                .private_key
                .clone()
                .context("PRIVATE_KEY_DEPLOYER is required on this network")?,
            Some(CredentialSource::Mnemonic) => {
                let mnemonic = self
                    .mnemonic
                    .as_deref()
                    .context("SEED_PHRASE_DEPLOYER is required on this network")?;
                derive_from_mnemonic(mnemonic, self.mnemonic_index)?
            }
            Some(CredentialSource::DevAccount) => match &self.private_key {
                Some(private_key) => private_key.clone(),
                None => {
                    info!("No deployer key given, using the development account");
                    DEV_ACCOUNT_PRIVATE_KEY.parse()?
                }
            },
            None => match (&self.private_key, self.mnemonic.as_deref()) {
                (Some(private_key), _) => private_key.clone(),
                (None, Some(mnemonic)) => {
                    derive_from_mnemonic(mnemonic, self.mnemonic_index)?
                }
                (None, None) => eyre::bail!(
                    "Either PRIVATE_KEY_DEPLOYER or SEED_PHRASE_DEPLOYER is required"
                ),
            },
        };

        info!(deployer = ?key.address(), "Resolved deployer account");

        Ok(key)
    }
}

/// Derives the key at `m/44'/60'/0'/0/{index}`.
pub fn derive_from_mnemonic(
    mnemonic: &str,
    index: u32,
) -> eyre::Result<PrivateKey> {
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(mnemonic.trim())
        .index(index)?
        .build()
        .context("Deriving deployer key from mnemonic")?;

    let key = SecretKey::from_slice(&wallet.signer().to_bytes())?;

    Ok(PrivateKey { key })
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use super::*;

    const DEV_MNEMONIC: &str =
        "test test test test test test test test test test test junk";

    fn address(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn mnemonic_index_zero_is_the_dev_account() -> eyre::Result<()> {
        let derived = derive_from_mnemonic(DEV_MNEMONIC, 0)?;
        let dev: PrivateKey = DEV_ACCOUNT_PRIVATE_KEY.parse()?;

        assert_eq!(derived.address(), dev.address());

        Ok(())
    }

    #[test]
    fn mnemonic_index_selects_the_account() -> eyre::Result<()> {
        let derived = derive_from_mnemonic(DEV_MNEMONIC, 1)?;

        assert_eq!(
            derived.address(),
            address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );

        Ok(())
    }

    #[test]
    fn private_key_networks_require_a_key() {
        let credentials = Credentials {
            mnemonic: Some(DEV_MNEMONIC.to_string()),
            ..Default::default()
        };

        assert!(credentials
            .resolve(Some(CredentialSource::PrivateKey))
            .is_err());
        assert!(credentials.resolve(Some(CredentialSource::Mnemonic)).is_ok());
    }

    #[test]
    fn dev_account_is_the_local_fallback() -> eyre::Result<()> {
        let key = Credentials::default()
            .resolve(Some(CredentialSource::DevAccount))?;

        assert_eq!(
            key.address(),
            address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );

        Ok(())
    }

    #[test]
    fn custom_networks_need_some_credential() {
        assert!(Credentials::default().resolve(None).is_err());
    }
}
