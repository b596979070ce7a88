use clap::Parser;
use cli::Args;
use config::DeploymentConfig;
use credentials::Credentials;
use deployment::{ForgeDeployer, ForgeVerifier};
use ethers::providers::{Http, Provider};
use eyre::Context;
use network::NetworkRegistry;
use params::{ConstructorConfig, PRESALE_CONSTRUCTOR_KEYS};
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod ethers_utils;
pub mod forge_utils;
pub mod serde_utils;
pub mod utils;

mod cli;
mod config;
mod credentials;
mod error;
mod network;
mod params;
mod report;
mod types;

mod deployment;

#[cfg(test)]
mod test_utils;

/// Exit code of a run cut short by Ctrl-C.
const INTERRUPTED: i32 = 130;

#[derive(Debug)]
enum Outcome {
    Finished(eyre::Result<()>),
    Interrupted,
}

fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Finished(Ok(())) => 0,
        Outcome::Finished(Err(_)) => 1,
        Outcome::Interrupted => INTERRUPTED,
    }
}

async fn start(args: Args) -> eyre::Result<()> {
    // Missing constructor values are reported ahead of any other setup error
    let constructor = ConstructorConfig::from(args.constructor.clone());
    params::assemble(&PRESALE_CONSTRUCTOR_KEYS, &constructor)?;

    let registry = NetworkRegistry::load(args.networks.as_deref()).await?;
    let credentials = Credentials::from(args.credentials.clone());

    let config = DeploymentConfig::from_args(args, registry, |key| {
        std::env::var(key).ok()
    })?;

    let private_key = credentials.resolve(config.credential_source)?;

    let provider = Provider::<Http>::try_from(config.network.rpc_url.as_str())
        .context("Creating RPC provider")?;

    let deployer = ForgeDeployer::new(&config, private_key);
    let verifier = ForgeVerifier::new(
        &config.project_root,
        &config.verify,
        &config.registry,
        |key| std::env::var(key).ok(),
    )?;

    deployment::execute(&config, &provider, &deployer, &verifier)
        .await
        .map_err(|err| {
            tracing::error!(stage = %err.stage(), "Deployment failed");
            err
        })?;

    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    dotenv::dotenv().ok();

    let indicatif_layer = IndicatifLayer::new();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(indicatif_layer)
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();

    let outcome = tokio::select! {
        result = start(args) => Outcome::Finished(result),
        _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
    };

    match &outcome {
        Outcome::Finished(Ok(())) => {}
        Outcome::Finished(Err(err)) => tracing::error!("{:?}", err),
        Outcome::Interrupted => tracing::warn!(
            "Interrupted, a submitted deployment may still confirm"
        ),
    }

    let code = exit_code(&outcome);
    if code != 0 {
        std::process::exit(code)
    }

    Ok(())
}
