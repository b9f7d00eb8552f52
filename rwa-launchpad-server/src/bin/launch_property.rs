//! Launches a tokenized property through a deployed RWA factory.
//!
//! Collects property parameters from the environment (with demo defaults),
//! calls `launchProperty` through a node-managed signer, recovers the new
//! property contract address from the `PropertyLaunched` event (falling
//! back to the factory's count-indexed getter), echoes the recorded
//! property information, and writes a launch record under `deployments/`.
//!
//! # Environment Variables
//!
//! - `RPC_URL` (required): JSON-RPC endpoint of the target chain
//! - `FACTORY_ADDRESS` (required): deployed factory contract
//! - `ASSET_NAME`, `ASSET_TYPE`, `DESCRIPTION`, `APPROXIMATED_VALUE_USD`,
//!   `TOTAL_SUPPLY`, `PROPERTY_ADDRESS`, `SQUARE_METERS`, `METADATA_URI`
//!   (optional): property parameters, with demo defaults

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{U256, utils::format_ether};
use rust_decimal::Decimal;

use rwa_launchpad::chain::factory::{FactoryClient, LaunchPropertyParams};
use rwa_launchpad::chain::rpc::{EvmRpc, HttpRpc};
use rwa_launchpad::config::parse_address;
use rwa_launchpad::payments::to_wei;
use rwa_launchpad_server::deployments::write_record;
use rwa_launchpad_server::{LogFormat, init_observability};

const BANNER: &str =
    "================================================================================";

const DEFAULT_METADATA_URI: &str =
    "https://gateway.pinata.cloud/ipfs/bafkreihm7v5io3okn6cfwfds265jvv3euyokcoeesf42cap7owpspovvu4";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_uint(name: &str, default: &str) -> Result<U256, String> {
    let raw = env_or(name, default);
    U256::from_str_radix(raw.trim(), 10).map_err(|e| format!("invalid {name} '{raw}': {e}"))
}

/// Collects launch parameters from the environment.
fn property_params() -> Result<LaunchPropertyParams, Box<dyn std::error::Error>> {
    let value_usd = Decimal::from_str(env_or("APPROXIMATED_VALUE_USD", "1000000").trim())?;

    Ok(LaunchPropertyParams {
        asset_name: env_or("ASSET_NAME", "Real Estate Property"),
        asset_type: env_or("ASSET_TYPE", "Real Estate"),
        description: env_or("DESCRIPTION", "A tokenized real estate property"),
        is_owner: true,
        // USD value carried with 18 decimals, like the native token.
        approximated_value: to_wei(value_usd)?,
        total_supply: env_uint("TOTAL_SUPPLY", "1000000")?,
        property_address: env_or("PROPERTY_ADDRESS", "123 Main St, City, Country"),
        square_meters: env_uint("SQUARE_METERS", "10000")?,
        uri: env_or("METADATA_URI", DEFAULT_METADATA_URI),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability(LogFormat::from_env());

    let rpc_url = std::env::var("RPC_URL")
        .map_err(|_| "required environment variable RPC_URL is not set")?;
    let factory_address = parse_address(&std::env::var("FACTORY_ADDRESS").map_err(|_| {
        "invalid or missing FACTORY_ADDRESS environment variable; \
         set FACTORY_ADDRESS to a valid contract address"
    })?)?;

    println!("{BANNER}");
    println!("Launching RWA Property via Factory Contract");
    println!("{BANNER}");

    let rpc = Arc::new(HttpRpc::new(&rpc_url)?);
    let deployer = *rpc
        .accounts()
        .await?
        .first()
        .ok_or("node exposes no managed accounts; cannot sign the launch")?;
    let balance = rpc.balance(deployer).await?;

    println!("\nDeployer Information:");
    println!("  Address: {deployer}");
    println!("  Balance: {} ETH", format_ether(balance));

    println!("\nFactory Contract Address: {factory_address}");
    let factory = FactoryClient::new(Arc::clone(&rpc), factory_address);
    let owner = factory.owner().await.map_err(|e| {
        format!(
            "failed to connect to factory contract at {factory_address}: {e}; \
             verify the address is correct and the contract is deployed"
        )
    })?;
    println!("  Factory Owner: {owner}");

    let params = property_params()?;

    println!("\n{BANNER}");
    println!("Property Parameters:");
    println!("{BANNER}");
    println!("  Asset Name: {}", params.asset_name);
    println!("  Asset Type: {}", params.asset_type);
    println!("  Description: {}", params.description);
    println!("  Is Owner: {}", params.is_owner);
    println!("  Approximated Value: {} USD", format_ether(params.approximated_value));
    println!("  Total Supply: {} tokens", params.total_supply);
    println!("  Property Address: {}", params.property_address);
    println!("  Square Meters: {} sqm", params.square_meters);
    println!("  Metadata URI: {}", params.uri);

    println!("\n{BANNER}");
    println!("Launching Property...");
    println!("{BANNER}");

    let launch = factory.launch_property(deployer, &params).await?;

    println!("\n{BANNER}");
    println!("SUCCESS");
    println!("{BANNER}");
    println!("Transaction Hash: {}", launch.tx_hash);
    if let Some(block) = launch.block_number {
        println!("Block Number: {block}");
    }
    if let Some(gas) = launch.gas_used {
        println!("Gas Used: {gas}");
    }
    match launch.property {
        Some(property) => println!("\nProperty Contract Address: {property}"),
        None => println!("\nProperty Contract Address: N/A"),
    }

    if let Some(property) = launch.property {
        match factory.get_property_info(property).await {
            Ok(info) => {
                println!("\nProperty Information:");
                println!("  Asset Name: {}", info.asset_name);
                println!("  Asset Type: {}", info.asset_type);
                println!("  Description: {}", info.description);
                println!("  Is Owner: {}", info.is_owner);
                println!("  Approximated Value: {} USD", format_ether(info.approximated_value));
                println!("  Total Supply: {} tokens", info.total_supply);
                println!("  Property Address: {}", info.property_address);
                println!("  Square Meters: {} sqm", info.square_meters);
            }
            Err(e) => {
                println!(
                    "\nCould not fetch property info (property may still be initializing): {e}"
                );
            }
        }
    }

    let chain_id = rpc.chain_id().await?;
    let record = serde_json::json!({
        "propertyAddress": launch.property.map(|a| a.to_string()),
        "propertyId": launch.property_id.map(|id| id.to_string()),
        "factoryAddress": factory_address,
        "issuer": deployer,
        "params": params,
        "transactionHash": launch.tx_hash,
        "blockNumber": launch.block_number.map(|n| n.to_string()),
        "gasUsed": launch.gas_used.map(|g| g.to_string()),
        "chainId": chain_id.to_string(),
        "launchedAt": chrono::Utc::now().to_rfc3339(),
    });
    let path = write_record("RWAProperty", &record)?;
    println!("\nLaunch info saved to: {}", path.display());

    Ok(())
}
