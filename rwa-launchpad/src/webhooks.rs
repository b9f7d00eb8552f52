//! Best-effort webhook delivery for lifecycle events.
//!
//! Delivery is fire-and-forget from the caller's perspective: the notifier
//! resolves the merchant's configured URL, POSTs once with a hard timeout,
//! and swallows every failure. Nothing here is retried and nothing
//! propagates to the operation that triggered the event.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::billing::store::SubscriptionStore;
use crate::error::Result;

/// Hard timeout for webhook delivery in seconds.
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Header carrying the event name alongside the JSON body.
const WEBHOOK_EVENT_HEADER: &str = "X-Webhook-Event";

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    data: &'a serde_json::Value,
    timestamp: String,
}

/// Delivers lifecycle events to merchant-configured webhook URLs.
#[derive(Debug, Clone)]
pub struct WebhookNotifier<S> {
    store: Arc<S>,
    client: Client,
}

impl<S: SubscriptionStore> WebhookNotifier<S> {
    /// Creates a notifier over the given store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LaunchpadError::Http`] if the HTTP client
    /// cannot be constructed.
    pub fn new(store: Arc<S>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self { store, client })
    }

    /// Delivers `event` with `data` to the owning merchant's webhook URL.
    ///
    /// The merchant is resolved from `data.merchant_id`; if the field is
    /// absent, the merchant is unknown, or no webhook URL is configured,
    /// this is a no-op. Timeouts and non-2xx responses are logged and
    /// swallowed.
    #[instrument(skip(self, data), fields(event))]
    pub async fn notify(&self, event: &str, data: &serde_json::Value) {
        let Some(merchant_id) = data.get("merchant_id").and_then(|v| v.as_str()) else {
            return;
        };

        let merchant = match self.store.merchant(merchant_id).await {
            Ok(Some(merchant)) => merchant,
            Ok(None) => return,
            Err(e) => {
                warn!(merchant_id, error = %e, "webhook merchant lookup failed");
                return;
            }
        };
        let Some(webhook_url) = merchant.webhook_url else {
            return;
        };

        let payload = WebhookPayload { event, data, timestamp: Utc::now().to_rfc3339() };

        let result = self
            .client
            .post(&webhook_url)
            .header(WEBHOOK_EVENT_HEADER, event)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(event, webhook_url, "webhook delivered");
            }
            Ok(response) => {
                warn!(event, webhook_url, status = %response.status(), "webhook failed");
            }
            Err(e) if e.is_timeout() => {
                warn!(event, webhook_url, "webhook request timeout");
            }
            Err(e) => {
                warn!(event, webhook_url, error = %e, "error sending webhook");
            }
        }
    }
}
