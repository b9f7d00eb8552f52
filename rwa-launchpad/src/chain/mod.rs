//! EVM chain plumbing.
//!
//! - [`rpc`]: JSON-RPC client seam and HTTP adapter
//! - [`abi`]: minimal calldata/return-data codec
//! - [`logs`]: receipt event-log extraction
//! - [`factory`]: typed factory and property contract clients

pub mod abi;
pub mod factory;
pub mod logs;
pub mod rpc;

pub use factory::{FactoryClient, LaunchPropertyParams, PropertyClient, PropertyInfo};
pub use logs::{EventDescriptor, PROPERTY_LAUNCHED, decode_log, extract_event_arg};
pub use rpc::{EvmRpc, HttpRpc, LogEntry, Transaction, TransactionReceipt, TransactionRequest};
