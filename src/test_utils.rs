use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use ethers::abi::Abi;
use ethers::types::{Address, TransactionReceipt, H256};
use tokio::time::Instant;

use crate::deployment::{ContractDeployer, SourceVerifier};
use crate::error::DeployError;
use crate::ethers_utils::ChainClient;
use crate::forge_utils::{ContractSpec, ForgeOutput};
use crate::network::NetworkIdentity;
use crate::params::DeploymentParameters;
use crate::report::DeploymentRecord;
use crate::types::ChainId;

pub fn presale_abi() -> Abi {
    serde_json::from_str(indoc::indoc! {r#"
        [
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "_coinPriceFeed", "type": "address", "internalType": "address" },
                    { "name": "_usdcToken", "type": "address", "internalType": "address" },
                    { "name": "_usdtToken", "type": "address", "internalType": "address" },
                    { "name": "_protocolWallet", "type": "address", "internalType": "address" },
                    { "name": "_admin", "type": "address", "internalType": "address" }
                ]
            }
        ]
    "#})
    .unwrap()
}

pub fn presale_parameters() -> DeploymentParameters {
    DeploymentParameters(vec![
        "0x0567F2323251f0Aab15c8dFb1967E4e8A7D42aeE".to_string(),
        "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d".to_string(),
        "0x55d398326f99059fF775485246999027B3197955".to_string(),
        "0x1111111111111111111111111111111111111111".to_string(),
        "0x2222222222222222222222222222222222222222".to_string(),
    ])
}

#[derive(Debug)]
struct ChainState {
    chain_id_failures: usize,
    calls: usize,
    head: u64,
    receipts: HashMap<H256, TransactionReceipt>,
}

/// In-memory chain whose head advances one block per `block_number` call.
#[derive(Debug)]
pub struct MockChain {
    chain_id: ChainId,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            state: Mutex::new(ChainState {
                chain_id_failures: 0,
                calls: 0,
                head: 1,
                receipts: HashMap::new(),
            }),
        }
    }

    pub fn with_chain_id_failures(self, failures: usize) -> Self {
        self.state.lock().unwrap().chain_id_failures = failures;
        self
    }

    pub fn with_head(self, head: u64) -> Self {
        self.state.lock().unwrap().head = head;
        self
    }

    /// RPC calls served so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        self.state
            .lock()
            .unwrap()
            .receipts
            .insert(receipt.transaction_hash, receipt);
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> eyre::Result<ChainId> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;

        if state.chain_id_failures > 0 {
            state.chain_id_failures -= 1;
            eyre::bail!("connection refused");
        }

        Ok(self.chain_id)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> eyre::Result<Option<TransactionReceipt>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;

        Ok(state.receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> eyre::Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;

        let head = state.head;
        state.head += 1;

        Ok(head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBehavior {
    Mine,
    Revert,
    /// Broadcast but never mined.
    Pending,
}

/// Deploys onto a [`MockChain`], one fresh address per submission.
#[derive(Debug)]
pub struct MockDeployer<'a> {
    chain: &'a MockChain,
    behavior: SubmitBehavior,
    submitted: Mutex<Vec<DeploymentParameters>>,
}

impl<'a> MockDeployer<'a> {
    pub fn new(chain: &'a MockChain) -> Self {
        Self {
            chain,
            behavior: SubmitBehavior::Mine,
            submitted: Mutex::new(vec![]),
        }
    }

    pub fn with_behavior(mut self, behavior: SubmitBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn submitted(&self) -> Vec<DeploymentParameters> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ContractDeployer for MockDeployer<'_> {
    async fn constructor_abi(
        &self,
        _contract: &ContractSpec,
    ) -> eyre::Result<Abi> {
        Ok(presale_abi())
    }

    async fn submit(
        &self,
        _contract: &ContractSpec,
        parameters: &DeploymentParameters,
    ) -> eyre::Result<ForgeOutput> {
        let nonce = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(parameters.clone());
            submitted.len() as u64
        };

        let output = ForgeOutput {
            deployer: Address::from_low_u64_be(0xdead),
            deployed_to: Address::from_low_u64_be(0x1000 + nonce),
            transaction_hash: H256::from_low_u64_be(nonce),
        };

        let status: u64 = match self.behavior {
            SubmitBehavior::Mine => 1,
            SubmitBehavior::Revert => 0,
            SubmitBehavior::Pending => return Ok(output),
        };

        self.chain.insert_receipt(TransactionReceipt {
            transaction_hash: output.transaction_hash,
            block_number: Some(self.chain.head().into()),
            contract_address: Some(output.deployed_to),
            gas_used: Some(21_000.into()),
            status: Some(status.into()),
            ..Default::default()
        });

        Ok(output)
    }
}

/// Explorer that rejects the first `failures` requests.
#[derive(Debug)]
pub struct MockVerifier {
    started: Instant,
    missing_setting: Option<String>,
    failures: Mutex<usize>,
    calls: Mutex<Vec<Duration>>,
    verified: Mutex<Vec<Address>>,
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            missing_setting: None,
            failures: Mutex::new(0),
            calls: Mutex::new(vec![]),
            verified: Mutex::new(vec![]),
        }
    }
}

impl MockVerifier {
    pub fn with_failures(self, failures: usize) -> Self {
        *self.failures.lock().unwrap() = failures;
        self
    }

    pub fn with_missing_setting(mut self, name: impl ToString) -> Self {
        self.missing_setting = Some(name.to_string());
        self
    }

    /// Time since creation at which each request arrived.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }

    pub fn verified(&self) -> Vec<Address> {
        self.verified.lock().unwrap().clone()
    }
}

impl SourceVerifier for MockVerifier {
    fn preflight(
        &self,
        _network: &NetworkIdentity,
    ) -> Result<(), DeployError> {
        match &self.missing_setting {
            Some(name) => Err(DeployError::Configuration {
                missing: vec![name.clone()],
            }),
            None => Ok(()),
        }
    }

    async fn verify(&self, record: &DeploymentRecord) -> eyre::Result<()> {
        self.calls.lock().unwrap().push(self.started.elapsed());

        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            eyre::bail!(
                "Unable to locate contract code at {:?}",
                record.address
            );
        }

        self.verified.lock().unwrap().push(record.address);

        Ok(())
    }
}
