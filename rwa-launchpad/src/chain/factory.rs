//! Typed clients for the RWA factory and property contracts.
//!
//! [`FactoryClient`] wraps the factory's launch and query surface;
//! [`PropertyClient`] wraps the per-asset ERC1155 token contract. Both are
//! thin: calldata in, decoded tokens out, over an [`EvmRpc`].
//!
//! The launch path recovers the newly created property address from the
//! `PropertyLaunched` event in the receipt; when no log decodes (providers
//! occasionally structure receipts differently), it falls back to the
//! factory's count-indexed getter for the most recently added property.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::chain::abi::{self, ParamType, Token};
use crate::chain::logs::{PROPERTY_LAUNCHED, extract_event_arg};
use crate::chain::rpc::{EvmRpc, TransactionRequest};
use crate::error::{LaunchpadError, Result};

/// How long to poll for a launch or deployment receipt.
const RECEIPT_TIMEOUT_SECS: u64 = 180;

/// Poll interval while waiting for a receipt.
const RECEIPT_POLL_SECS: u64 = 2;

/// Parameters for launching a new tokenized property.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPropertyParams {
    /// Asset display name.
    pub asset_name: String,
    /// Asset category (e.g. "Real Estate").
    pub asset_type: String,
    /// Free-form description.
    pub description: String,
    /// Whether the issuer is the legal owner.
    pub is_owner: bool,
    /// Appraised value in USD with 18 decimals.
    pub approximated_value: U256,
    /// Total fractional token supply.
    pub total_supply: U256,
    /// Physical address of the property.
    pub property_address: String,
    /// Surface area in square meters.
    pub square_meters: U256,
    /// Metadata URI for the token.
    pub uri: String,
}

impl LaunchPropertyParams {
    /// Validates the launch parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::InvalidLaunchParams`] for empty strings or
    /// non-positive value/supply.
    pub fn validate(&self) -> Result<()> {
        if self.asset_name.is_empty() {
            return Err(LaunchpadError::InvalidLaunchParams("asset name cannot be empty".into()));
        }
        if self.asset_type.is_empty() {
            return Err(LaunchpadError::InvalidLaunchParams("asset type cannot be empty".into()));
        }
        if self.description.is_empty() {
            return Err(LaunchpadError::InvalidLaunchParams("description cannot be empty".into()));
        }
        if self.approximated_value.is_zero() {
            return Err(LaunchpadError::InvalidLaunchParams(
                "approximated value must be positive".into(),
            ));
        }
        if self.total_supply.is_zero() {
            return Err(LaunchpadError::InvalidLaunchParams(
                "total supply must be positive".into(),
            ));
        }
        if self.uri.is_empty() {
            return Err(LaunchpadError::InvalidLaunchParams("metadata URI cannot be empty".into()));
        }
        Ok(())
    }

    fn tokens(&self) -> Vec<Token> {
        vec![
            Token::String(self.asset_name.clone()),
            Token::String(self.asset_type.clone()),
            Token::String(self.description.clone()),
            Token::Bool(self.is_owner),
            Token::Uint(self.approximated_value),
            Token::Uint(self.total_supply),
            Token::String(self.property_address.clone()),
            Token::Uint(self.square_meters),
            Token::String(self.uri.clone()),
        ]
    }
}

/// Property information as recorded by the factory.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyInfo {
    /// Asset display name.
    pub asset_name: String,
    /// Asset category.
    pub asset_type: String,
    /// Free-form description.
    pub description: String,
    /// Whether the issuer is the legal owner.
    pub is_owner: bool,
    /// Appraised value in USD with 18 decimals.
    pub approximated_value: U256,
    /// Total fractional token supply.
    pub total_supply: U256,
    /// Physical address of the property.
    pub property_address: String,
    /// Surface area in square meters.
    pub square_meters: U256,
}

impl PropertyInfo {
    fn from_tokens(tokens: Vec<Token>) -> Result<Self> {
        let mut tokens = tokens.into_iter();
        let mut next = || {
            tokens
                .next()
                .ok_or_else(|| LaunchpadError::Abi("property info tuple too short".to_owned()))
        };

        let asset_name = next()?
            .as_str()
            .ok_or_else(|| LaunchpadError::Abi("assetName is not a string".to_owned()))?
            .to_owned();
        let asset_type = next()?
            .as_str()
            .ok_or_else(|| LaunchpadError::Abi("assetType is not a string".to_owned()))?
            .to_owned();
        let description = next()?
            .as_str()
            .ok_or_else(|| LaunchpadError::Abi("description is not a string".to_owned()))?
            .to_owned();
        let is_owner = next()?
            .as_bool()
            .ok_or_else(|| LaunchpadError::Abi("isOwner is not a bool".to_owned()))?;
        let approximated_value = next()?
            .as_uint()
            .ok_or_else(|| LaunchpadError::Abi("approximatedValue is not a uint".to_owned()))?;
        let total_supply = next()?
            .as_uint()
            .ok_or_else(|| LaunchpadError::Abi("totalSupply is not a uint".to_owned()))?;
        let property_address = next()?
            .as_str()
            .ok_or_else(|| LaunchpadError::Abi("propertyAddress is not a string".to_owned()))?
            .to_owned();
        let square_meters = next()?
            .as_uint()
            .ok_or_else(|| LaunchpadError::Abi("squareMeters is not a uint".to_owned()))?;

        Ok(Self {
            asset_name,
            asset_type,
            description,
            is_owner,
            approximated_value,
            total_supply,
            property_address,
            square_meters,
        })
    }
}

/// ABI layout of the 8-field property info tuple.
const PROPERTY_INFO_TYPES: [ParamType; 8] = [
    ParamType::String,
    ParamType::String,
    ParamType::String,
    ParamType::Bool,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::String,
    ParamType::Uint,
];

/// Outcome of a property launch.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyLaunch {
    /// Address of the newly deployed property contract, when it could be
    /// recovered from the event or the count fallback.
    pub property: Option<Address>,
    /// Sequential property id from the event, when the event decoded.
    pub property_id: Option<U256>,
    /// Launch transaction hash.
    pub tx_hash: B256,
    /// Containing block number.
    pub block_number: Option<u64>,
    /// Gas consumed by the launch.
    pub gas_used: Option<U256>,
}

/// Client for the RWA factory contract.
#[derive(Debug, Clone)]
pub struct FactoryClient<R> {
    rpc: Arc<R>,
    address: Address,
}

impl<R: EvmRpc> FactoryClient<R> {
    /// Creates a client for the factory at `address`.
    pub fn new(rpc: Arc<R>, address: Address) -> Self {
        Self { rpc, address }
    }

    /// Returns the factory contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Launches a new tokenized property and resolves its contract address.
    ///
    /// Sends `launchProperty` from `from` (a node-managed account), waits
    /// for the receipt, and recovers the property address from the
    /// `PropertyLaunched` event. If no log decodes, falls back to the
    /// factory's count-indexed getter for the most recently added property.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::InvalidLaunchParams`] for invalid
    /// parameters, or [`LaunchpadError::Rpc`] if the transaction reverts or
    /// the receipt never arrives.
    #[instrument(skip(self, params), fields(asset_name = %params.asset_name))]
    pub async fn launch_property(
        &self,
        from: Address,
        params: &LaunchPropertyParams,
    ) -> Result<PropertyLaunch> {
        params.validate()?;

        let data = abi::encode_call(
            "launchProperty(string,string,string,bool,uint256,uint256,string,uint256,string)",
            &params.tokens(),
        );
        let tx_hash = self
            .rpc
            .send_transaction(TransactionRequest {
                from,
                to: Some(self.address),
                value: None,
                data: Some(Bytes::from(data)),
            })
            .await?;
        info!(%tx_hash, "launch transaction sent");

        let receipt = self
            .rpc
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(RECEIPT_TIMEOUT_SECS),
                Duration::from_secs(RECEIPT_POLL_SECS),
            )
            .await?;
        if !receipt.is_success() {
            return Err(LaunchpadError::Rpc(format!("launch transaction {tx_hash} reverted")));
        }

        let mut property = extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "propertyContract")
            .and_then(|token| token.as_address());
        let property_id = extract_event_arg(&receipt, &PROPERTY_LAUNCHED, "propertyId")
            .and_then(|token| token.as_uint());

        if property.is_none() {
            warn!("no PropertyLaunched log decoded, falling back to count-indexed lookup");
            property = self.latest_property().await?;
        }

        Ok(PropertyLaunch {
            property,
            property_id,
            tx_hash,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
            gas_used: receipt.gas_used,
        })
    }

    /// Returns the most recently added property, if any exist.
    ///
    /// # Errors
    ///
    /// Returns RPC or codec errors from the underlying calls.
    pub async fn latest_property(&self) -> Result<Option<Address>> {
        let count = self.get_property_count().await?;
        if count.is_zero() {
            return Ok(None);
        }
        Ok(Some(self.get_property(count - U256::from(1u64)).await?))
    }

    /// Returns all property contract addresses.
    pub async fn get_all_properties(&self) -> Result<Vec<Address>> {
        let output = self.call("getAllProperties()", &[]).await?;
        let tokens = abi::decode(&[ParamType::AddressArray], &output)?;
        tokens
            .first()
            .and_then(|t| t.as_address_array().map(<[Address]>::to_vec))
            .ok_or_else(|| LaunchpadError::Abi("getAllProperties returned no array".to_owned()))
    }

    /// Returns the total number of launched properties.
    pub async fn get_property_count(&self) -> Result<U256> {
        self.call_uint("getPropertyCount()", &[]).await
    }

    /// Returns the property contract address at `index`.
    pub async fn get_property(&self, index: U256) -> Result<Address> {
        self.call_address("getProperty(uint256)", &[Token::Uint(index)]).await
    }

    /// Returns the recorded information for a property contract.
    pub async fn get_property_info(&self, property: Address) -> Result<PropertyInfo> {
        let output =
            self.call("getPropertyInfo(address)", &[Token::Address(property)]).await?;
        PropertyInfo::from_tokens(abi::decode(&PROPERTY_INFO_TYPES, &output)?)
    }

    /// Returns the properties launched by `user`.
    pub async fn get_user_properties(&self, user: Address) -> Result<Vec<Address>> {
        let output = self.call("getUserProperties(address)", &[Token::Address(user)]).await?;
        let tokens = abi::decode(&[ParamType::AddressArray], &output)?;
        tokens
            .first()
            .and_then(|t| t.as_address_array().map(<[Address]>::to_vec))
            .ok_or_else(|| LaunchpadError::Abi("getUserProperties returned no array".to_owned()))
    }

    /// Whether `property` was deployed by this factory.
    pub async fn is_valid_property(&self, property: Address) -> Result<bool> {
        let output = self.call("isValidProperty(address)", &[Token::Address(property)]).await?;
        abi::decode(&[ParamType::Bool], &output)?
            .first()
            .and_then(Token::as_bool)
            .ok_or_else(|| LaunchpadError::Abi("isValidProperty returned no bool".to_owned()))
    }

    /// Returns the factory owner.
    pub async fn owner(&self) -> Result<Address> {
        self.call_address("owner()", &[]).await
    }

    /// Transfers factory ownership. Sent from a node-managed account.
    pub async fn transfer_ownership(&self, from: Address, new_owner: Address) -> Result<B256> {
        self.send("transferOwnership(address)", &[Token::Address(new_owner)], from).await
    }

    /// Renounces factory ownership. Sent from a node-managed account.
    pub async fn renounce_ownership(&self, from: Address) -> Result<B256> {
        self.send("renounceOwnership()", &[], from).await
    }

    async fn call(&self, signature: &str, args: &[Token]) -> Result<Vec<u8>> {
        self.rpc.call(self.address, abi::encode_call(signature, args)).await
    }

    async fn call_uint(&self, signature: &str, args: &[Token]) -> Result<U256> {
        let output = self.call(signature, args).await?;
        abi::decode(&[ParamType::Uint], &output)?
            .first()
            .and_then(Token::as_uint)
            .ok_or_else(|| LaunchpadError::Abi(format!("{signature} returned no uint")))
    }

    async fn call_address(&self, signature: &str, args: &[Token]) -> Result<Address> {
        let output = self.call(signature, args).await?;
        abi::decode(&[ParamType::Address], &output)?
            .first()
            .and_then(Token::as_address)
            .ok_or_else(|| LaunchpadError::Abi(format!("{signature} returned no address")))
    }

    async fn send(&self, signature: &str, args: &[Token], from: Address) -> Result<B256> {
        self.rpc
            .send_transaction(TransactionRequest {
                from,
                to: Some(self.address),
                value: None,
                data: Some(Bytes::from(abi::encode_call(signature, args))),
            })
            .await
    }
}

/// Client for a per-asset ERC1155 property contract.
#[derive(Debug, Clone)]
pub struct PropertyClient<R> {
    rpc: Arc<R>,
    address: Address,
}

impl<R: EvmRpc> PropertyClient<R> {
    /// Creates a client for the property contract at `address`.
    pub fn new(rpc: Arc<R>, address: Address) -> Self {
        Self { rpc, address }
    }

    /// Returns the property contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the property's recorded details.
    pub async fn get_all_details(&self) -> Result<PropertyInfo> {
        let output = self.call("getAllDetails()", &[]).await?;
        PropertyInfo::from_tokens(abi::decode(&PROPERTY_INFO_TYPES, &output)?)
    }

    /// Returns `account`'s balance of token `id`.
    pub async fn balance_of(&self, account: Address, id: U256) -> Result<U256> {
        let output = self
            .call("balanceOf(address,uint256)", &[Token::Address(account), Token::Uint(id)])
            .await?;
        abi::decode(&[ParamType::Uint], &output)?
            .first()
            .and_then(Token::as_uint)
            .ok_or_else(|| LaunchpadError::Abi("balanceOf returned no uint".to_owned()))
    }

    /// Returns balances for several (account, id) pairs at once.
    pub async fn balance_of_batch(
        &self,
        accounts: Vec<Address>,
        ids: Vec<U256>,
    ) -> Result<Vec<U256>> {
        let output = self
            .call("balanceOfBatch(address[],uint256[])", &[
                Token::AddressArray(accounts),
                Token::UintArray(ids),
            ])
            .await?;
        abi::decode(&[ParamType::UintArray], &output)?
            .first()
            .and_then(|t| t.as_uint_array().map(<[U256]>::to_vec))
            .ok_or_else(|| LaunchpadError::Abi("balanceOfBatch returned no array".to_owned()))
    }

    /// Returns the metadata URI for token `id`.
    pub async fn uri(&self, id: U256) -> Result<String> {
        let output = self.call("uri(uint256)", &[Token::Uint(id)]).await?;
        abi::decode(&[ParamType::String], &output)?
            .first()
            .and_then(|t| t.as_str().map(str::to_owned))
            .ok_or_else(|| LaunchpadError::Abi("uri returned no string".to_owned()))
    }

    /// Returns the property contract owner.
    pub async fn owner(&self) -> Result<Address> {
        let output = self.call("owner()", &[]).await?;
        abi::decode(&[ParamType::Address], &output)?
            .first()
            .and_then(Token::as_address)
            .ok_or_else(|| LaunchpadError::Abi("owner returned no address".to_owned()))
    }

    /// Whether `operator` may transfer on behalf of `account`.
    pub async fn is_approved_for_all(&self, account: Address, operator: Address) -> Result<bool> {
        let output = self
            .call("isApprovedForAll(address,address)", &[
                Token::Address(account),
                Token::Address(operator),
            ])
            .await?;
        abi::decode(&[ParamType::Bool], &output)?
            .first()
            .and_then(Token::as_bool)
            .ok_or_else(|| LaunchpadError::Abi("isApprovedForAll returned no bool".to_owned()))
    }

    /// ERC165 interface support check.
    pub async fn supports_interface(&self, interface_id: [u8; 4]) -> Result<bool> {
        let output = self
            .call("supportsInterface(bytes4)", &[Token::FixedBytes4(interface_id)])
            .await?;
        abi::decode(&[ParamType::Bool], &output)?
            .first()
            .and_then(Token::as_bool)
            .ok_or_else(|| LaunchpadError::Abi("supportsInterface returned no bool".to_owned()))
    }

    /// Transfers `amount` of token `id` from `from` to `to`. Sent from
    /// `sender`, a node-managed account.
    pub async fn safe_transfer_from(
        &self,
        sender: Address,
        from: Address,
        to: Address,
        id: U256,
        amount: U256,
        data: Vec<u8>,
    ) -> Result<B256> {
        self.send(
            "safeTransferFrom(address,address,uint256,uint256,bytes)",
            &[
                Token::Address(from),
                Token::Address(to),
                Token::Uint(id),
                Token::Uint(amount),
                Token::Bytes(data),
            ],
            sender,
        )
        .await
    }

    /// Batch variant of [`Self::safe_transfer_from`].
    pub async fn safe_batch_transfer_from(
        &self,
        sender: Address,
        from: Address,
        to: Address,
        ids: Vec<U256>,
        amounts: Vec<U256>,
        data: Vec<u8>,
    ) -> Result<B256> {
        self.send(
            "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
            &[
                Token::Address(from),
                Token::Address(to),
                Token::UintArray(ids),
                Token::UintArray(amounts),
                Token::Bytes(data),
            ],
            sender,
        )
        .await
    }

    /// Grants or revokes `operator`'s approval for all of `sender`'s
    /// tokens.
    pub async fn set_approval_for_all(
        &self,
        sender: Address,
        operator: Address,
        approved: bool,
    ) -> Result<B256> {
        self.send(
            "setApprovalForAll(address,bool)",
            &[Token::Address(operator), Token::Bool(approved)],
            sender,
        )
        .await
    }

    async fn call(&self, signature: &str, args: &[Token]) -> Result<Vec<u8>> {
        self.rpc.call(self.address, abi::encode_call(signature, args)).await
    }

    async fn send(&self, signature: &str, args: &[Token], from: Address) -> Result<B256> {
        self.rpc
            .send_transaction(TransactionRequest {
                from,
                to: Some(self.address),
                value: None,
                data: Some(Bytes::from(abi::encode_call(signature, args))),
            })
            .await
    }
}
