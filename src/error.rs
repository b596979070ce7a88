use ethers::types::Address;
use strum::Display;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The step of an invocation an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Assembling,
    Resolving,
    Deploying,
    Delaying,
    Verifying,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(
        "configuration error: missing required values: {}",
        .missing.join(", ")
    )]
    Configuration { missing: Vec<String> },

    #[error("network error: could not resolve the chain identity")]
    Network(#[source] BoxError),

    #[error("deployment of {contract} failed")]
    Deployment {
        contract: String,
        #[source]
        source: BoxError,
    },

    #[error("verification of {address:?} failed")]
    Verification {
        address: Address,
        #[source]
        source: BoxError,
    },
}

impl DeployError {
    pub fn network(source: impl Into<BoxError>) -> Self {
        Self::Network(source.into())
    }

    pub fn deployment(
        contract: impl ToString,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Deployment {
            contract: contract.to_string(),
            source: source.into(),
        }
    }

    pub fn verification(
        address: Address,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Verification {
            address,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration { .. } => Stage::Assembling,
            Self::Network(_) => Stage::Resolving,
            Self::Deployment { .. } => Stage::Deploying,
            Self::Verification { .. } => Stage::Verifying,
        }
    }
}
