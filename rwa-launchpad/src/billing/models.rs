//! Billing domain rows.
//!
//! These structs mirror the data service's `merchants`, `plans`,
//! `subscriptions`, and `payments` tables column for column; serde names
//! are the wire column names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::clock::BillingInterval;
use crate::error::Result;

/// Merchant identity row.
///
/// Registration is out of scope for this core; merchant rows are read,
/// never written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    /// Unique merchant identifier.
    pub id: String,
    /// Payout wallet address (unique).
    pub wallet: String,
    /// API key issued to the merchant.
    pub api_key: String,
    /// Webhook delivery URL, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Subscription plan row.
///
/// Immutable once referenced by a subscription; no update path exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan identifier.
    pub id: String,
    /// Owning merchant.
    pub merchant_id: String,
    /// Display name.
    pub name: String,
    /// Price as a decimal string in the token's smallest unit.
    pub amount: String,
    /// Billing interval as stored (`weekly` / `monthly` / `yearly`).
    pub interval: String,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Parses the stored interval string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LaunchpadError::UnknownInterval`] if the row
    /// carries an unsupported interval.
    pub fn billing_interval(&self) -> Result<BillingInterval> {
        BillingInterval::parse(&self.interval)
    }
}

/// Runtime subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid up; access is granted while the period has not ended.
    Active,
    /// Canceled by the merchant or customer.
    Canceled,
    /// Past its period end and swept.
    Expired,
    /// Reserved for a dunning/retry flow; no transition in this core
    /// produces it.
    PaymentRequired,
}

impl SubscriptionStatus {
    /// Returns the wire string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::PaymentRequired => "payment_required",
        }
    }
}

/// Subscription row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: String,
    /// Owning merchant.
    pub merchant_id: String,
    /// Customer label supplied at creation.
    pub customer: String,
    /// Paying wallet, lowercase-normalized.
    pub payer_wallet: String,
    /// Referenced plan.
    pub plan_id: String,
    /// Current lifecycle status.
    pub status: SubscriptionStatus,
    /// Unix seconds after which the subscription is due for renewal or
    /// expiry. Always set for any subscription that has ever been active.
    pub current_period_end: i64,
    /// Hash of the most recent verified payment transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_tx: Option<String>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Compact subscription view returned inside verification results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    /// Subscription identifier.
    pub subscription_id: String,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Period end in Unix seconds.
    pub current_period_end: i64,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(sub: &Subscription) -> Self {
        Self {
            subscription_id: sub.id.clone(),
            status: sub.status,
            current_period_end: sub.current_period_end,
        }
    }
}

/// Insert payload for a new subscription row.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    /// Owning merchant.
    pub merchant_id: String,
    /// Customer label.
    pub customer: String,
    /// Paying wallet, lowercase-normalized by the caller.
    pub payer_wallet: String,
    /// Referenced plan.
    pub plan_id: String,
    /// Initial status.
    pub status: SubscriptionStatus,
    /// Initial period end.
    pub current_period_end: i64,
    /// Creating payment transaction, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_tx: Option<String>,
}

/// Partial update for a subscription row.
///
/// Only set fields are written; the store sends exactly these columns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionPatch {
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    /// New period end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<i64>,
    /// New last-payment hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_tx: Option<String>,
    /// Mutation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payment verification record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Submitted, not yet checked against the chain.
    Pending,
    /// Confirmed on-chain.
    Verified,
    /// Could not be confirmed.
    Failed,
}

/// Payment verification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier.
    pub id: String,
    /// Receiving merchant.
    pub merchant_id: String,
    /// Paying wallet, lowercase-normalized.
    pub payer: String,
    /// Amount as a decimal string in the token's smallest unit.
    pub amount: String,
    /// Transaction hash; unique per verified payment.
    pub tx_hash: String,
    /// Time the payment was observed.
    pub timestamp: DateTime<Utc>,
    /// Verification status.
    pub status: PaymentStatus,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new payment record.
#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    /// Receiving merchant.
    pub merchant_id: String,
    /// Paying wallet, lowercase-normalized by the caller.
    pub payer: String,
    /// Amount as a decimal string in the token's smallest unit.
    pub amount: String,
    /// Transaction hash.
    pub tx_hash: String,
    /// Time the payment was observed.
    pub timestamp: DateTime<Utc>,
    /// Initial status.
    pub status: PaymentStatus,
}

/// Lowercase-normalizes a wallet address string.
///
/// Subscription rows always store the payer wallet lowercased so lookups
/// are case-insensitive regardless of how the wallet arrives (checksummed
/// or not).
#[must_use]
pub fn normalize_wallet(wallet: &str) -> String {
    wallet.trim().to_lowercase()
}
