//! HTTP-level tests using tower::ServiceExt::oneshot to exercise the full
//! Axum router without starting a real TCP server.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U64, U256};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use rwa_launchpad::Result;
use rwa_launchpad::billing::lifecycle::CreateSubscription;
use rwa_launchpad::billing::{LifecycleManager, MemoryStore};
use rwa_launchpad::chain::rpc::{
    EvmRpc, Transaction, TransactionReceipt, TransactionRequest,
};
use rwa_launchpad_server::{AppState, router};

const MERCHANT_WALLET: &str = "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf";
const WALLET: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

// ─── Test RPC ────────────────────────────────────────────────────────────

/// A stub chain for API tests: knows no transactions, signs nothing.
///
/// Payment verification over this stub always fails closed with
/// "transaction not found", which is exactly what the HTTP layer should
/// relay.
struct EmptyChain;

#[async_trait::async_trait]
impl EvmRpc for EmptyChain {
    async fn transaction_by_hash(&self, _hash: B256) -> Result<Option<Transaction>> {
        Ok(None)
    }
    async fn transaction_receipt(&self, _hash: B256) -> Result<Option<TransactionReceipt>> {
        Ok(None)
    }
    async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
    async fn send_transaction(&self, _tx: TransactionRequest) -> Result<B256> {
        Ok(B256::ZERO)
    }
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(Vec::new())
    }
    async fn balance(&self, _address: Address) -> Result<U256> {
        Ok(U256::ZERO)
    }
    async fn chain_id(&self) -> Result<U64> {
        Ok(U64::from(31_337))
    }
}

struct World {
    store: Arc<MemoryStore>,
    merchant_id: String,
    plan_id: String,
    app: axum::Router,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let merchant = store.add_merchant(MERCHANT_WALLET, None).expect("seed merchant");
    let plan = store
        .add_plan(&merchant.id, "Pro", "10000000000000000", "monthly")
        .expect("seed plan");

    let state = AppState::new(
        Arc::clone(&store),
        Arc::new(EmptyChain),
        Address::from([0x77; 20]),
    )
    .expect("state");

    World { store, merchant_id: merchant.id, plan_id: plan.id, app: router(Arc::new(state)) }
}

async fn subscribe(world: &World) {
    let manager = LifecycleManager::new(Arc::clone(&world.store)).expect("manager");
    manager
        .create(CreateSubscription {
            merchant_id: world.merchant_id.clone(),
            customer: WALLET.to_lowercase(),
            wallet: WALLET.to_owned(),
            plan_id: world.plan_id.clone(),
            tx_hash: None,
        })
        .await
        .expect("subscribe");
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health() {
    let w = world();
    let response = w
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_access_verify_without_subscription() {
    let w = world();
    let response = w
        .app
        .oneshot(post_json(
            "/api/access/verify",
            serde_json::json!({"wallet": WALLET, "merchant": MERCHANT_WALLET}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["access"], false);
    assert_eq!(body["reason"], "no_subscription");
}

#[tokio::test]
async fn test_access_verify_with_subscription() {
    let w = world();
    subscribe(&w).await;

    let response = w
        .app
        .clone()
        .oneshot(post_json(
            "/api/access/verify",
            serde_json::json!({"wallet": WALLET, "merchant": MERCHANT_WALLET}),
        ))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["access"], true);
    assert!(body["subscription"]["id"].is_string());
}

#[tokio::test]
async fn test_payment_verify_fails_closed_over_empty_chain() {
    let w = world();
    let response = w
        .app
        .oneshot(post_json(
            "/api/payments/verify",
            serde_json::json!({
                "txHash": format!("0x{}", "ab".repeat(32)),
                "merchant": MERCHANT_WALLET,
                "amount": 0.01,
                "plan_id": w.plan_id,
                "create_subscription": true,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["verified"], false);
    assert_eq!(body["reason"], "transaction not found");
}

#[tokio::test]
async fn test_subscription_listing() {
    let w = world();
    subscribe(&w).await;

    let response = w
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/api/subscriptions/list?merchant={MERCHANT_WALLET}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 1);
    assert_eq!(body["subscriptions"][0]["payer_wallet"], WALLET.to_lowercase());
}

#[tokio::test]
async fn test_listing_for_unknown_merchant_is_empty() {
    let w = world();
    let response = w
        .app
        .oneshot(
            Request::builder()
                .uri("/api/payments/list?merchant=0x0000000000000000000000000000000000000001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["payments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_sweep_endpoint_reports_transitions() {
    let w = world();
    subscribe(&w).await;

    // Nothing has lapsed yet; the sweep is a harmless no-op.
    let response =
        w.app.oneshot(post_json("/api/subscriptions/sweep", serde_json::json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["expired"].as_array().unwrap().len(), 0);
}
