//! RWA Launchpad: off-chain core for a real-world-asset tokenization
//! platform.
//!
//! The launchpad gates premium tooling behind on-chain micropayments and
//! ships the operational tooling for the asset factory itself. This crate
//! is the off-chain half of that system:
//!
//! - **Billing** ([`billing`]): subscription plans, the lifecycle state
//!   machine (create / renew / cancel / expire sweep), and wallet access
//!   evaluation, over a relational data service.
//! - **Payments** ([`payments`]): fail-closed verification that a
//!   user-submitted transaction hash is a real, mined, sufficient payment
//!   to the expected merchant through the payments contract.
//! - **Chain** ([`chain`]): a JSON-RPC client, a minimal ABI codec,
//!   receipt event-log extraction with a count-indexed fallback, and typed
//!   clients for the factory and per-asset ERC1155 property contracts.
//! - **Webhooks** ([`webhooks`]): best-effort, timeout-bounded delivery of
//!   lifecycle events to merchant-configured URLs.
//! - **Config** ([`config`]): fail-fast configuration for the data service
//!   and chain connections.
//!
//! # Flow
//!
//! ```text
//! ┌──────────────┐  tx hash   ┌──────────────────┐
//! │  client app  ├───────────►│ PaymentVerifier  │──► chain RPC
//! └──────────────┘            └────────┬─────────┘
//!                                      │ create / renew
//!                             ┌────────▼─────────┐
//!                             │ LifecycleManager │──► SubscriptionStore
//!                             └────────┬─────────┘        ▲
//!                                      │ events           │ reads
//!                             ┌────────▼─────────┐ ┌──────┴──────────┐
//!                             │ WebhookNotifier  │ │ AccessEvaluator │
//!                             └──────────────────┘ └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rwa_launchpad::billing::{AccessEvaluator, MemoryStore};
//!
//! # async fn example() {
//! let store = Arc::new(MemoryStore::new());
//! let evaluator = AccessEvaluator::new(store);
//!
//! let result = evaluator
//!     .check_access(
//!         "0x8ba1f109551bD432803012645Ac136ddd64DBA72",
//!         "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf",
//!     )
//!     .await;
//! println!("access: {}", result.access);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod billing;
pub mod chain;
pub mod config;
pub mod error;
pub mod payments;
pub mod webhooks;

pub use config::LaunchpadConfig;
pub use error::{LaunchpadError, Result};
