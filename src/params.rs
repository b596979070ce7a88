use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;
use tracing::instrument;

use crate::error::DeployError;

pub const COIN_PRICE_FEED: &str = "COIN_PRICE_FEED";
pub const USDC_TOKEN: &str = "USDC_TOKEN";
pub const USDT_TOKEN: &str = "USDT_TOKEN";
pub const PROTOCOL_WALLET: &str = "PROTOCOL_WALLET";
pub const PUBLIC_KEY_ADMIN: &str = "PUBLIC_KEY_ADMIN";

/// Constructor parameters of the presale contract, in declaration order.
pub const PRESALE_CONSTRUCTOR_KEYS: [&str; 5] = [
    COIN_PRICE_FEED,
    USDC_TOKEN,
    USDT_TOKEN,
    PROTOCOL_WALLET,
    PUBLIC_KEY_ADMIN,
];

/// Named constructor values as the operator supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorConfig {
    values: BTreeMap<String, String>,
}

impl ConstructorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_value(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn set(&mut self, key: impl ToString, value: Option<String>) {
        match value {
            Some(value) => self.values.insert(key.to_string(), value),
            None => self.values.remove(&key.to_string()),
        };
    }

    /// Empty and whitespace-only values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for ConstructorConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shrinkwrap,
)]
#[serde(transparent)]
pub struct DeploymentParameters(pub Vec<String>);

/// Orders the values of `keys` into constructor arguments.
///
/// Every absent key is reported at once. Values pass through untouched,
/// their ABI types are only checked when the arguments get encoded.
#[instrument(skip(config))]
pub fn assemble(
    keys: &[&str],
    config: &ConstructorConfig,
) -> Result<DeploymentParameters, DeployError> {
    let mut values = Vec::with_capacity(keys.len());
    let mut missing = vec![];

    for key in keys {
        match config.get(key) {
            Some(value) => values.push(value.to_string()),
            None => missing.push(key.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(DeployError::Configuration { missing });
    }

    Ok(DeploymentParameters(values))
}
