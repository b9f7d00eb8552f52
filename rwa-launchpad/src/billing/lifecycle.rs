//! Subscription lifecycle manager.
//!
//! The only writer of subscription state. Four operations exist: `create`,
//! `renew`, `cancel`, and the bulk `expire_sweep`. Store failures propagate
//! to the caller uncaught; webhook delivery is best-effort and never
//! affects the outcome.
//!
//! # State machine
//!
//! ```text
//!           create()                 renew()/create() after lapse
//!  (none) ───────────► active ───────────────────────────────┐
//!                        │  cancel()                         │
//!                        ▼                                   │
//!                    canceled                                │
//!
//!  active ── expire_sweep() when current_period_end < now ──► expired
//!  expired ── renew() ──► active
//! ```
//!
//! `payment_required` is a declared status with no producing transition
//! here; it is reserved for a payment-retry flow outside this core.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::billing::clock::next_period_end;
use crate::billing::models::{
    NewSubscription, Subscription, SubscriptionPatch, SubscriptionStatus, normalize_wallet,
};
use crate::billing::store::SubscriptionStore;
use crate::error::{LaunchpadError, Result};
use crate::webhooks::WebhookNotifier;

/// Parameters for creating a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    /// Owning merchant id.
    pub merchant_id: String,
    /// Customer label.
    pub customer: String,
    /// Paying wallet; normalized to lowercase before storage.
    pub wallet: String,
    /// Plan to subscribe to.
    pub plan_id: String,
    /// Creating payment transaction, when known.
    pub tx_hash: Option<String>,
}

/// Orchestrates subscription state transitions over a [`SubscriptionStore`].
#[derive(Debug, Clone)]
pub struct LifecycleManager<S> {
    store: Arc<S>,
    notifier: WebhookNotifier<S>,
}

impl<S: SubscriptionStore> LifecycleManager<S> {
    /// Creates a manager over the given store.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook notifier's HTTP client cannot be
    /// constructed.
    pub fn new(store: Arc<S>) -> Result<Self> {
        let notifier = WebhookNotifier::new(Arc::clone(&store))?;
        Ok(Self { store, notifier })
    }

    /// Creates a new active subscription.
    ///
    /// The billing period starts now; its end comes from the plan's
    /// interval via the billing clock.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::PlanNotFound`] if the plan does not
    /// resolve, [`LaunchpadError::UnknownInterval`] if the plan row carries
    /// an unsupported interval, or a store error.
    #[instrument(skip(self, params), fields(plan_id = %params.plan_id))]
    pub async fn create(&self, params: CreateSubscription) -> Result<Subscription> {
        self.create_at(params, Utc::now().timestamp()).await
    }

    /// [`Self::create`] with an explicit clock, for deterministic billing
    /// arithmetic.
    pub async fn create_at(&self, params: CreateSubscription, now: i64) -> Result<Subscription> {
        let plan = self
            .store
            .plan(&params.plan_id)
            .await?
            .ok_or_else(|| LaunchpadError::PlanNotFound(params.plan_id.clone()))?;
        let interval = plan.billing_interval()?;

        let subscription = self
            .store
            .insert_subscription(NewSubscription {
                merchant_id: params.merchant_id,
                customer: params.customer,
                payer_wallet: normalize_wallet(&params.wallet),
                plan_id: params.plan_id,
                status: SubscriptionStatus::Active,
                current_period_end: next_period_end(interval, now),
                last_payment_tx: params.tx_hash,
            })
            .await?;

        info!(subscription_id = %subscription.id, "subscription created");
        self.emit("subscription.created", &subscription).await;
        Ok(subscription)
    }

    /// Renews a subscription: resets it to active with a fresh billing
    /// period starting now.
    ///
    /// Renewal does not stack unused time from the previous period; the new
    /// period always starts at the current time. `last_payment_tx` is
    /// replaced only when a new hash is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::SubscriptionNotFound`] if the id or its
    /// associated plan does not resolve, or a store error.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn renew(&self, id: &str, tx_hash: Option<&str>) -> Result<Subscription> {
        self.renew_at(id, tx_hash, Utc::now().timestamp()).await
    }

    /// [`Self::renew`] with an explicit clock.
    pub async fn renew_at(
        &self,
        id: &str,
        tx_hash: Option<&str>,
        now: i64,
    ) -> Result<Subscription> {
        let subscription = self
            .store
            .subscription(id)
            .await?
            .ok_or_else(|| LaunchpadError::SubscriptionNotFound(id.to_owned()))?;
        let plan = self.store.plan(&subscription.plan_id).await?.ok_or_else(|| {
            LaunchpadError::SubscriptionNotFound(format!(
                "{id} references missing plan {}",
                subscription.plan_id
            ))
        })?;
        let interval = plan.billing_interval()?;

        let renewed = self
            .store
            .update_subscription(id, SubscriptionPatch {
                status: Some(SubscriptionStatus::Active),
                current_period_end: Some(next_period_end(interval, now)),
                last_payment_tx: tx_hash.map(str::to_owned),
                updated_at: Some(Utc::now()),
            })
            .await?;

        info!(subscription_id = %renewed.id, "subscription renewed");
        self.emit("subscription.renewed", &renewed).await;
        Ok(renewed)
    }

    /// Cancels a subscription.
    ///
    /// Idempotent: canceling an already-canceled subscription re-affirms
    /// the same status and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::SubscriptionNotFound`] if the id does not
    /// resolve, or a store error.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn cancel(&self, id: &str) -> Result<Subscription> {
        let canceled = self
            .store
            .update_subscription(id, SubscriptionPatch {
                status: Some(SubscriptionStatus::Canceled),
                updated_at: Some(Utc::now()),
                ..Default::default()
            })
            .await?;

        info!(subscription_id = %canceled.id, "subscription canceled");
        self.emit("subscription.canceled", &canceled).await;
        Ok(canceled)
    }

    /// Transitions every active subscription whose period ended before
    /// `now` to `expired`, returning the transitioned rows.
    ///
    /// Safe to call repeatedly: already-expired rows are excluded from the
    /// selection, so an immediate re-run returns an empty list. Designed to
    /// be invoked by an external cron-style trigger.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing is partially applied beyond what the
    /// store itself committed.
    #[instrument(skip(self))]
    pub async fn expire_sweep(&self, now: i64) -> Result<Vec<Subscription>> {
        let expired = self.store.expired_active(now).await?;
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = expired.iter().map(|s| s.id.clone()).collect();
        self.store.mark_expired(&ids).await?;
        info!(count = expired.len(), "subscriptions expired");

        let mut transitioned = Vec::with_capacity(expired.len());
        for mut subscription in expired {
            subscription.status = SubscriptionStatus::Expired;
            self.emit("subscription.expired", &subscription).await;
            transitioned.push(subscription);
        }
        Ok(transitioned)
    }

    /// Returns the notifier sharing this manager's store.
    #[must_use]
    pub fn notifier(&self) -> &WebhookNotifier<S> {
        &self.notifier
    }

    async fn emit(&self, event: &str, subscription: &Subscription) {
        match serde_json::to_value(subscription) {
            Ok(data) => self.notifier.notify(event, &data).await,
            Err(e) => tracing::warn!(event, error = %e, "webhook payload serialization failed"),
        }
    }
}
