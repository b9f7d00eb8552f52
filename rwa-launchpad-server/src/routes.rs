//! HTTP API surface.
//!
//! Routes:
//! - `POST /api/payments/verify` — verify an on-chain payment, optionally
//!   creating or renewing a subscription
//! - `POST /api/access/verify` — check whether a wallet has live access
//!   with a merchant
//! - `GET /api/payments/list?merchant=…` — payment records for a merchant
//! - `GET /api/subscriptions/list?merchant=…` — subscriptions for a
//!   merchant
//! - `POST /api/subscriptions/sweep` — externally-triggered expiry sweep
//! - `GET /health`

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use rwa_launchpad::billing::access::AccessResult;
use rwa_launchpad::billing::models::{Payment, Subscription, normalize_wallet};
use rwa_launchpad::billing::store::SubscriptionStore;
use rwa_launchpad::billing::{AccessEvaluator, LifecycleManager};
use rwa_launchpad::chain::rpc::EvmRpc;
use rwa_launchpad::payments::{PaymentVerifier, VerificationResult, VerifyRequest};
use rwa_launchpad::{LaunchpadError, Result};

/// Shared application state behind every handler.
#[derive(Debug)]
pub struct AppState<S, R> {
    /// Subscription lifecycle operations.
    pub lifecycle: LifecycleManager<S>,
    /// Wallet access evaluation.
    pub evaluator: AccessEvaluator<S>,
    /// On-chain payment verification.
    pub verifier: PaymentVerifier<S, R>,
    /// Direct store reads for the listing endpoints.
    pub store: Arc<S>,
}

impl<S: SubscriptionStore, R: EvmRpc> AppState<S, R> {
    /// Builds application state over a store and RPC client.
    ///
    /// # Errors
    ///
    /// Returns an error if any component's HTTP client cannot be
    /// constructed.
    pub fn new(
        store: Arc<S>,
        rpc: Arc<R>,
        payments_contract: alloy_primitives::Address,
    ) -> Result<Self> {
        Ok(Self {
            lifecycle: LifecycleManager::new(Arc::clone(&store))?,
            evaluator: AccessEvaluator::new(Arc::clone(&store)),
            verifier: PaymentVerifier::new(Arc::clone(&store), rpc, payments_contract)?,
            store,
        })
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error wrapper mapping core errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(LaunchpadError);

impl From<LaunchpadError> for ApiError {
    fn from(e: LaunchpadError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LaunchpadError::PlanNotFound(_) | LaunchpadError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            LaunchpadError::UnknownInterval(_)
            | LaunchpadError::InvalidAddress(_)
            | LaunchpadError::InvalidAmount(_)
            | LaunchpadError::InvalidLaunchParams(_) => StatusCode::BAD_REQUEST,
            LaunchpadError::Store(_) | LaunchpadError::Http(_) | LaunchpadError::Rpc(_) => {
                StatusCode::BAD_GATEWAY
            }
            LaunchpadError::Config(_) | LaunchpadError::Abi(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Builds the API router over the given state.
pub fn router<S, R>(state: Arc<AppState<S, R>>) -> Router
where
    S: SubscriptionStore + 'static,
    R: EvmRpc + 'static,
{
    Router::new()
        .route("/api/payments/verify", post(verify_payment))
        .route("/api/access/verify", post(verify_access))
        .route("/api/payments/list", get(list_payments))
        .route("/api/subscriptions/list", get(list_subscriptions))
        .route("/api/subscriptions/sweep", post(sweep_subscriptions))
        .route("/health", get(health))
        .with_state(state)
}

async fn verify_payment<S: SubscriptionStore, R: EvmRpc>(
    State(state): State<Arc<AppState<S, R>>>,
    Json(request): Json<VerifyRequest>,
) -> std::result::Result<Json<VerificationResult>, ApiError> {
    Ok(Json(state.verifier.verify(&request).await?))
}

/// Access check request body.
#[derive(Debug, Deserialize)]
struct AccessRequest {
    wallet: String,
    merchant: String,
}

async fn verify_access<S: SubscriptionStore, R: EvmRpc>(
    State(state): State<Arc<AppState<S, R>>>,
    Json(request): Json<AccessRequest>,
) -> Json<AccessResult> {
    Json(state.evaluator.check_access(&request.wallet, &request.merchant).await)
}

/// Query string for the listing endpoints: the merchant's payout wallet.
#[derive(Debug, Deserialize)]
struct MerchantQuery {
    merchant: String,
}

#[derive(Debug, Serialize)]
struct PaymentList {
    payments: Vec<Payment>,
}

async fn list_payments<S: SubscriptionStore, R: EvmRpc>(
    State(state): State<Arc<AppState<S, R>>>,
    Query(query): Query<MerchantQuery>,
) -> std::result::Result<Json<PaymentList>, ApiError> {
    let wallet = normalize_wallet(&query.merchant);
    let payments = match state.store.merchant_by_wallet(&wallet).await? {
        Some(merchant) => state.store.payments_for_merchant(&merchant.id).await?,
        None => Vec::new(),
    };
    Ok(Json(PaymentList { payments }))
}

#[derive(Debug, Serialize)]
struct SubscriptionList {
    subscriptions: Vec<Subscription>,
}

async fn list_subscriptions<S: SubscriptionStore, R: EvmRpc>(
    State(state): State<Arc<AppState<S, R>>>,
    Query(query): Query<MerchantQuery>,
) -> std::result::Result<Json<SubscriptionList>, ApiError> {
    let wallet = normalize_wallet(&query.merchant);
    let subscriptions = match state.store.merchant_by_wallet(&wallet).await? {
        Some(merchant) => state.store.subscriptions_for_merchant(&merchant.id).await?,
        None => Vec::new(),
    };
    Ok(Json(SubscriptionList { subscriptions }))
}

#[derive(Debug, Serialize)]
struct SweepResult {
    expired: Vec<Subscription>,
    count: usize,
}

async fn sweep_subscriptions<S: SubscriptionStore, R: EvmRpc>(
    State(state): State<Arc<AppState<S, R>>>,
) -> std::result::Result<Json<SweepResult>, ApiError> {
    let expired = state.lifecycle.expire_sweep(Utc::now().timestamp()).await?;
    let count = expired.len();
    Ok(Json(SweepResult { expired, count }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
