//! Subscription store: the single seam for all billing reads and writes.
//!
//! [`SubscriptionStore`] is the only path to subscription rows; every
//! mutation flows through the lifecycle manager and lands here. Two
//! adapters are provided: [`DataServiceStore`] speaks the relational data
//! service's REST dialect over HTTP, and [`MemoryStore`] is an in-process
//! adapter for tests and local development.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::billing::models::{
    Merchant, NewPayment, NewSubscription, Payment, PaymentStatus, Plan, Subscription,
    SubscriptionPatch, SubscriptionStatus,
};
use crate::config::DataServiceConfig;
use crate::error::{LaunchpadError, Result};

/// Total timeout for data service requests in seconds.
const STORE_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout for data service requests in seconds.
const STORE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Storage seam for merchants, plans, subscriptions, and payments.
///
/// Subscription rows are exclusively owned by this seam: components other
/// than the lifecycle manager read through it but never write around it.
/// Adapters must treat a write that matches no row as
/// [`LaunchpadError::SubscriptionNotFound`], not as success.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetches a plan by id.
    async fn plan(&self, plan_id: &str) -> Result<Option<Plan>>;

    /// Fetches a merchant by id.
    async fn merchant(&self, merchant_id: &str) -> Result<Option<Merchant>>;

    /// Fetches a merchant by payout wallet (case-insensitive).
    async fn merchant_by_wallet(&self, wallet: &str) -> Result<Option<Merchant>>;

    /// Fetches a subscription by id.
    async fn subscription(&self, id: &str) -> Result<Option<Subscription>>;

    /// Fetches the most recent subscription for a (wallet, merchant) pair.
    ///
    /// `payer_wallet` must already be lowercase-normalized; rows are stored
    /// that way.
    async fn subscription_for_wallet(
        &self,
        payer_wallet: &str,
        merchant_id: &str,
    ) -> Result<Option<Subscription>>;

    /// Lists all subscriptions for a merchant, newest first.
    async fn subscriptions_for_merchant(&self, merchant_id: &str) -> Result<Vec<Subscription>>;

    /// Inserts a new subscription row and returns it.
    async fn insert_subscription(&self, row: NewSubscription) -> Result<Subscription>;

    /// Applies a partial update to a subscription row and returns the
    /// updated row.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::SubscriptionNotFound`] if no row matches.
    async fn update_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Subscription>;

    /// Selects active subscriptions whose period ended before `now`.
    async fn expired_active(&self, now: i64) -> Result<Vec<Subscription>>;

    /// Bulk-transitions the given subscription ids to `expired`.
    async fn mark_expired(&self, ids: &[String]) -> Result<()>;

    /// Inserts a new payment record and returns it.
    async fn insert_payment(&self, row: NewPayment) -> Result<Payment>;

    /// Updates a payment record's status and returns the updated record.
    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Payment>;

    /// Lists all payment records for a merchant, newest first.
    async fn payments_for_merchant(&self, merchant_id: &str) -> Result<Vec<Payment>>;
}

// ============================================================================
// Data service adapter
// ============================================================================

/// REST adapter for the relational data service.
///
/// Speaks the service's PostgREST-style dialect: column filters as
/// `column=op.value` query parameters, writes with
/// `Prefer: return=representation` so mutated rows come back in the
/// response body. The service key travels as both `apikey` and bearer
/// token.
#[derive(Debug, Clone)]
pub struct DataServiceStore {
    base_url: Url,
    service_key: String,
    client: Client,
}

impl DataServiceStore {
    /// Creates a store from validated connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Config`] for invalid settings or
    /// [`LaunchpadError::Http`] if client construction fails. Construction
    /// is the configuration check: nothing is deferred to first use.
    pub fn new(config: &DataServiceConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LaunchpadError::Config(format!("invalid data service URL: {e}")))?;
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(STORE_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(STORE_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(LaunchpadError::Http)?;
        Ok(Self { base_url, service_key: config.service_key.clone(), client })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| LaunchpadError::Config(format!("invalid table URL: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Content-Type", "application/json")
    }

    async fn read_rows<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<Vec<T>> {
        let status = response.status();
        let body = response.text().await.map_err(LaunchpadError::Http)?;
        if !status.is_success() {
            return Err(LaunchpadError::Store(format!("data service returned {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| LaunchpadError::Store(format!("malformed data service response: {e}")))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.table_url(table, filters)?;
        let response = self.authed(self.client.get(url)).send().await?;
        self.read_rows(response).await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<T>> {
        let mut filters = filters.to_vec();
        filters.push(("limit", "1".to_owned()));
        Ok(self.select(table, &filters).await?.into_iter().next())
    }

    async fn insert<T: DeserializeOwned, B: Serialize>(&self, table: &str, body: &B) -> Result<T> {
        let url = self.table_url(table, &[])?;
        let response = self
            .authed(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        self.read_rows::<T>(response).await?.into_iter().next().ok_or_else(|| {
            LaunchpadError::Store(format!("insert into {table} returned no rows"))
        })
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>> {
        let url = self.table_url(table, filters)?;
        let response = self
            .authed(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        self.read_rows(response).await
    }
}

#[async_trait]
impl SubscriptionStore for DataServiceStore {
    async fn plan(&self, plan_id: &str) -> Result<Option<Plan>> {
        self.select_one("plans", &[("id", format!("eq.{plan_id}"))]).await
    }

    async fn merchant(&self, merchant_id: &str) -> Result<Option<Merchant>> {
        self.select_one("merchants", &[("id", format!("eq.{merchant_id}"))]).await
    }

    async fn merchant_by_wallet(&self, wallet: &str) -> Result<Option<Merchant>> {
        self.select_one("merchants", &[("wallet", format!("ilike.{wallet}"))]).await
    }

    async fn subscription(&self, id: &str) -> Result<Option<Subscription>> {
        self.select_one("subscriptions", &[("id", format!("eq.{id}"))]).await
    }

    async fn subscription_for_wallet(
        &self,
        payer_wallet: &str,
        merchant_id: &str,
    ) -> Result<Option<Subscription>> {
        self.select_one(
            "subscriptions",
            &[
                ("payer_wallet", format!("eq.{payer_wallet}")),
                ("merchant_id", format!("eq.{merchant_id}")),
                ("order", "created_at.desc".to_owned()),
            ],
        )
        .await
    }

    async fn subscriptions_for_merchant(&self, merchant_id: &str) -> Result<Vec<Subscription>> {
        self.select(
            "subscriptions",
            &[
                ("merchant_id", format!("eq.{merchant_id}")),
                ("order", "created_at.desc".to_owned()),
            ],
        )
        .await
    }

    async fn insert_subscription(&self, row: NewSubscription) -> Result<Subscription> {
        self.insert("subscriptions", &row).await
    }

    async fn update_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Subscription> {
        self.patch("subscriptions", &[("id", format!("eq.{id}"))], &patch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LaunchpadError::SubscriptionNotFound(id.to_owned()))
    }

    async fn expired_active(&self, now: i64) -> Result<Vec<Subscription>> {
        self.select(
            "subscriptions",
            &[
                ("status", "eq.active".to_owned()),
                ("current_period_end", format!("lt.{now}")),
            ],
        )
        .await
    }

    async fn mark_expired(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let patch = SubscriptionPatch {
            status: Some(SubscriptionStatus::Expired),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let filter = format!("in.({})", ids.join(","));
        self.patch::<Subscription, _>("subscriptions", &[("id", filter)], &patch).await?;
        Ok(())
    }

    async fn insert_payment(&self, row: NewPayment) -> Result<Payment> {
        self.insert("payments", &row).await
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Payment> {
        self.patch("payments", &[("id", format!("eq.{id}"))], &serde_json::json!({
            "status": status,
        }))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| LaunchpadError::Store(format!("payment {id} not found")))
    }

    async fn payments_for_merchant(&self, merchant_id: &str) -> Result<Vec<Payment>> {
        self.select(
            "payments",
            &[
                ("merchant_id", format!("eq.{merchant_id}")),
                ("order", "created_at.desc".to_owned()),
            ],
        )
        .await
    }
}

// ============================================================================
// In-memory adapter
// ============================================================================

#[derive(Debug, Default)]
struct MemoryTables {
    merchants: Vec<Merchant>,
    plans: Vec<Plan>,
    subscriptions: Vec<Subscription>,
    payments: Vec<Payment>,
}

/// In-process store adapter.
///
/// Backs tests and local development; rows live in a mutex-guarded set of
/// vectors and ids are generated UUIDs. Behavior matches
/// [`DataServiceStore`] observable-result for observable-result.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a merchant row and returns its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Store`] if the table lock is poisoned.
    pub fn add_merchant(&self, wallet: &str, webhook_url: Option<&str>) -> Result<Merchant> {
        let merchant = Merchant {
            id: Uuid::new_v4().to_string(),
            wallet: wallet.to_owned(),
            api_key: Uuid::new_v4().to_string(),
            webhook_url: webhook_url.map(str::to_owned),
            created_at: Utc::now(),
        };
        self.lock()?.merchants.push(merchant.clone());
        Ok(merchant)
    }

    /// Seeds a plan row and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::Store`] if the table lock is poisoned.
    pub fn add_plan(
        &self,
        merchant_id: &str,
        name: &str,
        amount: &str,
        interval: &str,
    ) -> Result<Plan> {
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            merchant_id: merchant_id.to_owned(),
            name: name.to_owned(),
            amount: amount.to_owned(),
            interval: interval.to_owned(),
            created_at: Utc::now(),
        };
        self.lock()?.plans.push(plan.clone());
        Ok(plan)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryTables>> {
        self.tables
            .lock()
            .map_err(|_| LaunchpadError::Store("memory store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn plan(&self, plan_id: &str) -> Result<Option<Plan>> {
        Ok(self.lock()?.plans.iter().find(|p| p.id == plan_id).cloned())
    }

    async fn merchant(&self, merchant_id: &str) -> Result<Option<Merchant>> {
        Ok(self.lock()?.merchants.iter().find(|m| m.id == merchant_id).cloned())
    }

    async fn merchant_by_wallet(&self, wallet: &str) -> Result<Option<Merchant>> {
        let wallet = wallet.to_lowercase();
        Ok(self
            .lock()?
            .merchants
            .iter()
            .find(|m| m.wallet.to_lowercase() == wallet)
            .cloned())
    }

    async fn subscription(&self, id: &str) -> Result<Option<Subscription>> {
        Ok(self.lock()?.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn subscription_for_wallet(
        &self,
        payer_wallet: &str,
        merchant_id: &str,
    ) -> Result<Option<Subscription>> {
        Ok(self
            .lock()?
            .subscriptions
            .iter()
            .filter(|s| s.payer_wallet == payer_wallet && s.merchant_id == merchant_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn subscriptions_for_merchant(&self, merchant_id: &str) -> Result<Vec<Subscription>> {
        let mut rows: Vec<Subscription> = self
            .lock()?
            .subscriptions
            .iter()
            .filter(|s| s.merchant_id == merchant_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(rows)
    }

    async fn insert_subscription(&self, row: NewSubscription) -> Result<Subscription> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4().to_string(),
            merchant_id: row.merchant_id,
            customer: row.customer,
            payer_wallet: row.payer_wallet,
            plan_id: row.plan_id,
            status: row.status,
            current_period_end: row.current_period_end,
            last_payment_tx: row.last_payment_tx,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn update_subscription(
        &self,
        id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Subscription> {
        let mut tables = self.lock()?;
        let row = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| LaunchpadError::SubscriptionNotFound(id.to_owned()))?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(end) = patch.current_period_end {
            row.current_period_end = end;
        }
        if let Some(tx) = patch.last_payment_tx {
            row.last_payment_tx = Some(tx);
        }
        if let Some(updated_at) = patch.updated_at {
            row.updated_at = updated_at;
        }
        Ok(row.clone())
    }

    async fn expired_active(&self, now: i64) -> Result<Vec<Subscription>> {
        Ok(self
            .lock()?
            .subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active && s.current_period_end < now)
            .cloned()
            .collect())
    }

    async fn mark_expired(&self, ids: &[String]) -> Result<()> {
        let now = Utc::now();
        let mut tables = self.lock()?;
        for row in &mut tables.subscriptions {
            if ids.contains(&row.id) {
                row.status = SubscriptionStatus::Expired;
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn insert_payment(&self, row: NewPayment) -> Result<Payment> {
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            merchant_id: row.merchant_id,
            payer: row.payer,
            amount: row.amount,
            tx_hash: row.tx_hash,
            timestamp: row.timestamp,
            status: row.status,
            created_at: Utc::now(),
        };
        self.lock()?.payments.push(payment.clone());
        Ok(payment)
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Payment> {
        let mut tables = self.lock()?;
        let row = tables
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LaunchpadError::Store(format!("payment {id} not found")))?;
        row.status = status;
        Ok(row.clone())
    }

    async fn payments_for_merchant(&self, merchant_id: &str) -> Result<Vec<Payment>> {
        let mut rows: Vec<Payment> = self
            .lock()?
            .payments
            .iter()
            .filter(|p| p.merchant_id == merchant_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(rows)
    }
}
