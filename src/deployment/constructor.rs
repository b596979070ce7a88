use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Abi, ParamType, Token};
use ethers::types::Bytes;
use eyre::Context;

use crate::params::DeploymentParameters;

/// ABI-encodes `parameters` against the constructor of `abi`, in order.
///
/// The encoding is what explorers compare against when verifying, so the
/// deployment and the verification request both use its output.
pub fn encode_constructor_args(
    abi: &Abi,
    parameters: &DeploymentParameters,
) -> eyre::Result<Bytes> {
    let inputs = abi
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();

    if inputs.len() != parameters.len() {
        eyre::bail!(
            "Constructor takes {} arguments but {} were assembled",
            inputs.len(),
            parameters.len()
        );
    }

    let tokens = inputs
        .iter()
        .zip(parameters.iter())
        .enumerate()
        .map(|(position, (param, value))| {
            tokenize(&param.kind, value).with_context(|| {
                format!(
                    "Argument #{position} `{}` is not a valid {}: {value:?}",
                    param.name, param.kind
                )
            })
        })
        .collect::<eyre::Result<Vec<Token>>>()?;

    Ok(ethers::abi::encode(&tokens).into())
}

fn tokenize(kind: &ParamType, value: &str) -> eyre::Result<Token> {
    let value = value.trim();

    let value = match kind {
        ParamType::Address | ParamType::Bytes | ParamType::FixedBytes(_) => {
            value.strip_prefix("0x").unwrap_or(value)
        }
        _ => value,
    };

    Ok(LenientTokenizer::tokenize(kind, value)?)
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use super::*;
    use crate::test_utils::{presale_abi, presale_parameters};

    #[test]
    fn encodes_addresses_in_order() -> eyre::Result<()> {
        let parameters = presale_parameters();

        let encoded = encode_constructor_args(&presale_abi(), &parameters)?;

        assert_eq!(encoded.len(), 5 * 32);

        for (word, value) in encoded.chunks(32).zip(parameters.iter()) {
            let address: Address = value.parse()?;
            assert_eq!(&word[12..], address.as_bytes());
        }

        Ok(())
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut parameters = presale_parameters();
        parameters.0.pop();

        let err = encode_constructor_args(&presale_abi(), &parameters)
            .unwrap_err();

        assert!(err.to_string().contains("takes 5 arguments but 4"));
    }

    #[test]
    fn invalid_address_names_the_argument() {
        let mut parameters = presale_parameters();
        parameters.0[3] = "treasury.eth".to_string();

        let err = encode_constructor_args(&presale_abi(), &parameters)
            .unwrap_err();

        assert!(err.to_string().contains("#3 `_protocolWallet`"));
    }

    #[test]
    fn no_constructor_takes_no_arguments() -> eyre::Result<()> {
        let abi: Abi = serde_json::from_str("[]")?;

        let encoded =
            encode_constructor_args(&abi, &DeploymentParameters::default())?;

        assert!(encoded.is_empty());
        assert!(encode_constructor_args(&abi, &presale_parameters()).is_err());

        Ok(())
    }
}
