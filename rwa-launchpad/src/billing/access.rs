//! Access evaluation for gated tools.
//!
//! Answers one question: does this wallet currently hold a live
//! subscription with this merchant? The evaluator never trusts a row's
//! `status` alone — a subscription can still read `active` after its period
//! ended if the expiry sweep has not run yet, so the period end is always
//! re-checked against the current time. That double-check is the
//! correctness-critical invariant of this module.
//!
//! Unlike the lifecycle operations, evaluation degrades instead of
//! propagating: any internal failure yields a deny, because the surrounding
//! surface must always render a definitive allow/deny.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::billing::models::{Subscription, SubscriptionStatus, normalize_wallet};
use crate::billing::store::SubscriptionStore;
use crate::error::Result;

/// Result of an access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResult {
    /// Whether access is currently granted.
    pub access: bool,
    /// Denial reason (`no_subscription`, `expired`, `canceled`,
    /// `payment_required`, `unavailable`); absent on grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The granting subscription; present only on grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<AccessSubscription>,
}

impl AccessResult {
    fn deny(reason: &str) -> Self {
        Self { access: false, reason: Some(reason.to_owned()), subscription: None }
    }

    fn grant(subscription: &Subscription) -> Self {
        Self {
            access: true,
            reason: None,
            subscription: Some(AccessSubscription {
                id: subscription.id.clone(),
                plan: subscription.plan_id.clone(),
                expires: subscription.current_period_end,
            }),
        }
    }
}

/// Granting subscription details included in an allow result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSubscription {
    /// Subscription id.
    pub id: String,
    /// Plan id the subscription bills against.
    pub plan: String,
    /// Unix seconds the current period ends.
    pub expires: i64,
}

/// Evaluates wallet access against the subscription store.
#[derive(Debug, Clone)]
pub struct AccessEvaluator<S> {
    store: Arc<S>,
}

impl<S: SubscriptionStore> AccessEvaluator<S> {
    /// Creates an evaluator over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Checks whether `wallet` currently has access with the merchant
    /// identified by `merchant_wallet`.
    ///
    /// Internal errors never propagate: the result is a deny with reason
    /// `unavailable` and a logged warning.
    #[instrument(skip(self))]
    pub async fn check_access(&self, wallet: &str, merchant_wallet: &str) -> AccessResult {
        self.check_access_at(wallet, merchant_wallet, Utc::now().timestamp()).await
    }

    /// [`Self::check_access`] with an explicit clock.
    pub async fn check_access_at(
        &self,
        wallet: &str,
        merchant_wallet: &str,
        now: i64,
    ) -> AccessResult {
        match self.evaluate(wallet, merchant_wallet, now).await {
            Ok(result) => result,
            Err(e) => {
                warn!(wallet, merchant_wallet, error = %e, "access evaluation failed");
                AccessResult::deny("unavailable")
            }
        }
    }

    async fn evaluate(&self, wallet: &str, merchant_wallet: &str, now: i64) -> Result<AccessResult> {
        let Some(merchant) = self.store.merchant_by_wallet(merchant_wallet).await? else {
            return Ok(AccessResult::deny("no_subscription"));
        };

        let wallet = normalize_wallet(wallet);
        let Some(subscription) =
            self.store.subscription_for_wallet(&wallet, &merchant.id).await?
        else {
            return Ok(AccessResult::deny("no_subscription"));
        };

        Ok(match subscription.status {
            SubscriptionStatus::Active if subscription.current_period_end >= now => {
                AccessResult::grant(&subscription)
            }
            // Active on paper, past its period end: the sweep just has not
            // run yet.
            SubscriptionStatus::Active | SubscriptionStatus::Expired => {
                AccessResult::deny("expired")
            }
            SubscriptionStatus::Canceled => AccessResult::deny("canceled"),
            SubscriptionStatus::PaymentRequired => AccessResult::deny("payment_required"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::lifecycle::{CreateSubscription, LifecycleManager};
    use crate::billing::store::MemoryStore;

    const WALLET: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";
    const MERCHANT_WALLET: &str = "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf";
    const MONTH_SECS: i64 = 2_592_000;

    struct Fixture {
        evaluator: AccessEvaluator<MemoryStore>,
        manager: LifecycleManager<MemoryStore>,
        merchant_id: String,
        plan_id: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let merchant = store.add_merchant(MERCHANT_WALLET, None).unwrap();
        let plan = store.add_plan(&merchant.id, "Pro", "10000000000000000", "monthly").unwrap();
        Fixture {
            evaluator: AccessEvaluator::new(Arc::clone(&store)),
            manager: LifecycleManager::new(store).unwrap(),
            merchant_id: merchant.id,
            plan_id: plan.id,
        }
    }

    async fn subscribe(fx: &Fixture, now: i64) -> String {
        fx.manager
            .create_at(
                CreateSubscription {
                    merchant_id: fx.merchant_id.clone(),
                    customer: "customer-1".to_owned(),
                    wallet: WALLET.to_owned(),
                    plan_id: fx.plan_id.clone(),
                    tx_hash: None,
                },
                now,
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_then_check_grants_access() {
        let fx = fixture();
        subscribe(&fx, 1_700_000_000).await;

        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, 1_700_000_001).await;
        assert!(result.access);
        let sub = result.subscription.unwrap();
        assert_eq!(sub.expires, 1_700_000_000 + MONTH_SECS);
    }

    #[tokio::test]
    async fn test_wallet_match_is_case_insensitive() {
        let fx = fixture();
        subscribe(&fx, 0).await;

        let result = fx
            .evaluator
            .check_access_at(&WALLET.to_uppercase().replace("0X", "0x"), MERCHANT_WALLET, 1)
            .await;
        assert!(result.access);
    }

    #[tokio::test]
    async fn test_no_subscription() {
        let fx = fixture();
        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, 0).await;
        assert!(!result.access);
        assert_eq!(result.reason.as_deref(), Some("no_subscription"));
    }

    #[tokio::test]
    async fn test_unknown_merchant() {
        let fx = fixture();
        subscribe(&fx, 0).await;
        let result = fx.evaluator.check_access_at(WALLET, "0x0000000000000000000000000000000000000000", 1).await;
        assert!(!result.access);
        assert_eq!(result.reason.as_deref(), Some("no_subscription"));
    }

    #[tokio::test]
    async fn test_stale_active_row_is_denied_before_sweep() {
        let fx = fixture();
        subscribe(&fx, 0).await;

        // No sweep has run; the row still says active.
        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, MONTH_SECS + 1).await;
        assert!(!result.access);
        assert_eq!(result.reason.as_deref(), Some("expired"));
    }

    #[tokio::test]
    async fn test_swept_row_is_denied() {
        let fx = fixture();
        subscribe(&fx, 0).await;
        fx.manager.expire_sweep(MONTH_SECS + 1).await.unwrap();

        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, MONTH_SECS + 2).await;
        assert!(!result.access);
        assert_eq!(result.reason.as_deref(), Some("expired"));
    }

    #[tokio::test]
    async fn test_canceled_row_is_denied() {
        let fx = fixture();
        let id = subscribe(&fx, 0).await;
        fx.manager.cancel(&id).await.unwrap();

        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, 1).await;
        assert!(!result.access);
        assert_eq!(result.reason.as_deref(), Some("canceled"));
    }

    #[tokio::test]
    async fn test_access_at_exact_period_end_is_granted() {
        let fx = fixture();
        subscribe(&fx, 0).await;
        let result = fx.evaluator.check_access_at(WALLET, MERCHANT_WALLET, MONTH_SECS).await;
        assert!(result.access);
    }
}
