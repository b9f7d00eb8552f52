//! Launchpad configuration.
//!
//! This module defines TOML-deserializable configuration for the data
//! service and chain connections. Configuration is resolved and validated
//! once, at construction time: a missing data-service URL or key is a
//! startup failure, never a deferred first-use failure.

use alloy_primitives::Address;
use serde::Deserialize;
use url::Url;

use crate::error::{LaunchpadError, Result};

/// Root launchpad configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchpadConfig {
    /// Relational data service connection.
    pub data_service: DataServiceConfig,

    /// Chain RPC and contract addresses.
    pub chain: ChainConfig,
}

impl LaunchpadConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] if the TOML is malformed or any
    /// value fails validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use rwa_launchpad::config::LaunchpadConfig;
    ///
    /// let toml = r#"
    ///     [data_service]
    ///     base_url = "https://db.example.com"
    ///     service_key = "service-role-key"
    ///
    ///     [chain]
    ///     rpc_url = "https://api.avax-test.network/ext/bc/C/rpc"
    ///     payments_contract = "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf"
    /// "#;
    ///
    /// let config = LaunchpadConfig::from_toml(toml).unwrap();
    /// assert!(config.chain.factory_contract.is_none());
    /// ```
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml).map_err(|e| LaunchpadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from environment variables.
    ///
    /// Required: `DATA_SERVICE_URL`, `DATA_SERVICE_KEY`, `RPC_URL`,
    /// `PAYMENTS_CONTRACT`. Optional: `FACTORY_CONTRACT`.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] naming the missing variable, or
    /// any validation failure.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            data_service: DataServiceConfig {
                base_url: require_env("DATA_SERVICE_URL")?,
                service_key: require_env("DATA_SERVICE_KEY")?,
            },
            chain: ChainConfig {
                rpc_url: require_env("RPC_URL")?,
                payments_contract: require_env("PAYMENTS_CONTRACT")?,
                factory_contract: std::env::var("FACTORY_CONTRACT").ok(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] if any value is invalid.
    pub fn validate(&self) -> Result<()> {
        self.data_service.validate()?;
        self.chain.validate()?;
        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        LaunchpadError::Config(format!("required environment variable {name} is not set"))
    })
}

/// Relational data service connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DataServiceConfig {
    /// Base URL of the data service (e.g. `https://xyz.supabase.co`).
    pub base_url: String,

    /// Service-role key, sent as both `apikey` and bearer token.
    pub service_key: String,
}

impl DataServiceConfig {
    /// Validates the connection settings.
    ///
    /// The base URL must be HTTPS except for loopback hosts (local
    /// development stacks serve plain HTTP), and the service key must be
    /// non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] if any value is invalid.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            LaunchpadError::Config(format!("invalid data service URL '{}': {e}", self.base_url))
        })?;

        let is_loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
        match url.scheme() {
            "https" => {}
            "http" if is_loopback => {}
            scheme => {
                return Err(LaunchpadError::Config(format!(
                    "data service URL must use HTTPS (got {scheme}): {}",
                    self.base_url
                )));
            }
        }

        if self.service_key.is_empty() {
            return Err(LaunchpadError::Config("data service key is empty".to_owned()));
        }

        Ok(())
    }
}

/// Chain RPC and contract address settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint. Plain HTTP is accepted (local development nodes).
    pub rpc_url: String,

    /// Address of the payments contract that `pay(merchant)` calls target.
    pub payments_contract: String,

    /// Address of the RWA factory contract, when factory operations are
    /// used.
    #[serde(default)]
    pub factory_contract: Option<String>,
}

impl ChainConfig {
    /// Validates the RPC URL and contract addresses.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] if any value is invalid.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.rpc_url).map_err(|e| {
            LaunchpadError::Config(format!("invalid RPC URL '{}': {e}", self.rpc_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LaunchpadError::Config(format!(
                "RPC URL must be http or https: {}",
                self.rpc_url
            )));
        }

        parse_address(&self.payments_contract)
            .map_err(|e| LaunchpadError::Config(e.to_string()))?;
        if let Some(factory) = &self.factory_contract {
            parse_address(factory).map_err(|e| LaunchpadError::Config(e.to_string()))?;
        }

        Ok(())
    }

    /// Returns the payments contract address, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::InvalidAddress`] if the configured value
    /// does not parse (validation normally rules this out).
    pub fn payments_address(&self) -> Result<Address> {
        parse_address(&self.payments_contract)
    }

    /// Returns the factory contract address, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] if no factory address is
    /// configured, or [`LaunchpadError::InvalidAddress`] if it does not
    /// parse.
    pub fn factory_address(&self) -> Result<Address> {
        let raw = self.factory_contract.as_deref().ok_or_else(|| {
            LaunchpadError::Config("no factory contract address configured".to_owned())
        })?;
        parse_address(raw)
    }
}

/// Parses a `0x`-prefixed hex wallet or contract address.
///
/// # Errors
///
/// Returns [`LaunchpadError::InvalidAddress`] for malformed input.
pub fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| LaunchpadError::InvalidAddress(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENTS: &str = "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf";

    fn valid_toml() -> String {
        format!(
            r#"
            [data_service]
            base_url = "https://db.example.com"
            service_key = "service-key"

            [chain]
            rpc_url = "https://rpc.example.com"
            payments_contract = "{PAYMENTS}"
            "#
        )
    }

    #[test]
    fn test_config_from_toml() {
        let config = LaunchpadConfig::from_toml(&valid_toml()).unwrap();
        assert_eq!(config.data_service.base_url, "https://db.example.com");
        assert_eq!(config.chain.payments_contract, PAYMENTS);
    }

    #[test]
    fn test_http_data_service_rejected() {
        let toml = valid_toml().replace("https://db.example.com", "http://db.example.com");
        let result = LaunchpadConfig::from_toml(&toml);
        assert!(matches!(result, Err(LaunchpadError::Config(_))));
    }

    #[test]
    fn test_http_localhost_data_service_accepted() {
        let toml = valid_toml().replace("https://db.example.com", "http://localhost:54321");
        assert!(LaunchpadConfig::from_toml(&toml).is_ok());
    }

    #[test]
    fn test_empty_service_key_rejected() {
        let toml = valid_toml().replace("service-key", "");
        let result = LaunchpadConfig::from_toml(&toml);
        assert!(matches!(result, Err(LaunchpadError::Config(_))));
    }

    #[test]
    fn test_bad_payments_address_rejected() {
        let toml = valid_toml().replace(PAYMENTS, "0xnot-an-address");
        let result = LaunchpadConfig::from_toml(&toml);
        assert!(matches!(result, Err(LaunchpadError::Config(_))));
    }

    #[test]
    fn test_http_rpc_url_accepted() {
        let toml = valid_toml().replace("https://rpc.example.com", "http://127.0.0.1:8545");
        assert!(LaunchpadConfig::from_toml(&toml).is_ok());
    }

    #[test]
    fn test_parse_address_roundtrip() {
        let parsed = parse_address(PAYMENTS).unwrap();
        assert_eq!(parsed, PAYMENTS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(matches!(
            parse_address("52a5"),
            Err(LaunchpadError::InvalidAddress(_))
        ));
    }
}
