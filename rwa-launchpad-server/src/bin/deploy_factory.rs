//! Deploys the RWA factory contract.
//!
//! Reads the compiled artifact (ABI + bytecode JSON), deploys it through a
//! node-managed signer, verifies the configured owner took effect, and
//! writes a deployment record under `deployments/`.
//!
//! # Environment Variables
//!
//! - `RPC_URL` (required): JSON-RPC endpoint of the target chain
//! - `FACTORY_ARTIFACT` (required): path to the compiled factory artifact
//! - `INITIAL_OWNER_ADDRESS` (optional): factory owner; defaults to the
//!   deployer account

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, utils::format_ether};
use serde::Deserialize;

use rwa_launchpad::chain::abi::{self, Token};
use rwa_launchpad::chain::factory::FactoryClient;
use rwa_launchpad::chain::rpc::{EvmRpc, HttpRpc, TransactionRequest};
use rwa_launchpad::config::parse_address;
use rwa_launchpad_server::deployments::write_record;
use rwa_launchpad_server::{LogFormat, init_observability};

const CONTRACT_NAME: &str = "RWAFactory";
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);
const RECEIPT_POLL: Duration = Duration::from_secs(2);

/// The slice of a compiled contract artifact this tool needs.
#[derive(Debug, Deserialize)]
struct ContractArtifact {
    bytecode: Bytes,
}

fn require_env(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|_| format!("required environment variable {name} is not set"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability(LogFormat::from_env());

    let rpc_url = require_env("RPC_URL")?;
    let artifact_path = require_env("FACTORY_ARTIFACT")?;

    let artifact: ContractArtifact =
        serde_json::from_str(&std::fs::read_to_string(&artifact_path)?)?;
    if artifact.bytecode.is_empty() {
        return Err(format!("artifact {artifact_path} has empty bytecode").into());
    }

    let rpc = Arc::new(HttpRpc::new(&rpc_url)?);
    let deployer = *rpc
        .accounts()
        .await?
        .first()
        .ok_or("node exposes no managed accounts; cannot sign the deployment")?;
    let balance = rpc.balance(deployer).await?;

    println!("Deploying {CONTRACT_NAME}...");
    println!("Deployer Address: {deployer}");
    println!("Deployer Balance: {} ETH", format_ether(balance));

    let initial_owner = match std::env::var("INITIAL_OWNER_ADDRESS") {
        Ok(raw) => parse_address(&raw)?,
        Err(_) => deployer,
    };
    println!("Initial Owner Address: {initial_owner}");

    let mut init_code = artifact.bytecode.to_vec();
    init_code.extend_from_slice(&abi::encode(&[Token::Address(initial_owner)]));

    let tx_hash = rpc
        .send_transaction(TransactionRequest {
            from: deployer,
            to: None,
            value: None,
            data: Some(Bytes::from(init_code)),
        })
        .await?;
    println!("Deployment transaction sent: {tx_hash}");

    let receipt = rpc.wait_for_receipt(tx_hash, RECEIPT_TIMEOUT, RECEIPT_POLL).await?;
    if !receipt.is_success() {
        return Err(format!("deployment transaction {tx_hash} reverted").into());
    }
    let factory_address: Address =
        receipt.contract_address.ok_or("deployment receipt carries no contract address")?;
    println!("Deployed {CONTRACT_NAME} Contract Address: {factory_address}");

    let factory = FactoryClient::new(Arc::clone(&rpc), factory_address);
    let owner = factory.owner().await?;
    println!("Owner set to: {owner}");
    if owner != initial_owner {
        return Err(format!("owner mismatch: expected {initial_owner}, got {owner}").into());
    }

    let chain_id = rpc.chain_id().await?;
    let record = serde_json::json!({
        "contractName": CONTRACT_NAME,
        "address": factory_address,
        "deployer": deployer,
        "owner": owner,
        "chainId": chain_id.to_string(),
        "transactionHash": tx_hash,
        "blockNumber": receipt.block_number.map(|n| n.to_string()),
        "gasUsed": receipt.gas_used.map(|g| g.to_string()),
        "deployedAt": chrono::Utc::now().to_rfc3339(),
    });
    let path = write_record(CONTRACT_NAME, &record)?;
    println!("Deployment info saved to: {}", path.display());

    Ok(())
}
