//! On-chain payment verification.
//!
//! Given a user-submitted transaction hash, confirms that a real, mined,
//! sufficient payment to the expected merchant went through the payments
//! contract. Verification fails closed: any inability to confirm — unknown
//! hash, pending transaction, reverted execution, wrong contract, wrong
//! merchant, short value, unreachable node — produces a `verified: false`
//! result with a reason, never a silent pass and never an exception for an
//! expected outcome. Only store failures surface as hard errors.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::billing::lifecycle::{CreateSubscription, LifecycleManager};
use crate::billing::models::{
    NewPayment, PaymentStatus, SubscriptionSummary, normalize_wallet,
};
use crate::billing::store::SubscriptionStore;
use crate::chain::abi::{self, ParamType, Token};
use crate::chain::rpc::EvmRpc;
use crate::config::parse_address;
use crate::error::{LaunchpadError, Result};
use crate::webhooks::WebhookNotifier;

/// Wei per whole native token (18 decimals).
const WEI_DECIMALS: u32 = 18;

/// Payment verification request.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    /// Hash of the payment transaction.
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    /// Merchant payout wallet the payment should reach.
    pub merchant: String,
    /// Expected amount in native units (e.g. `0.01`).
    pub amount: Decimal,
    /// Plan to subscribe to when `create_subscription` is set.
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Whether a successful verification should also create or renew a
    /// subscription.
    #[serde(default)]
    pub create_subscription: bool,
}

/// Payment verification outcome.
///
/// `verified: false` carries a `reason`; `verified: true` carries the payer
/// and payment details, plus the subscription summary when one was created
/// or renewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the payment was confirmed on-chain.
    pub verified: bool,
    /// Human-readable failure reason; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Paying wallet, lowercase-normalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Merchant payout wallet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    /// Paid amount in wei, as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Verification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Recorded payment id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Created or renewed subscription, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSummary>,
}

impl VerificationResult {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            reason: Some(reason.into()),
            payer: None,
            merchant: None,
            amount: None,
            timestamp: None,
            payment_id: None,
            subscription: None,
        }
    }
}

/// Converts a native-unit decimal amount to wei.
///
/// # Errors
///
/// Returns [`LaunchpadError::InvalidAmount`] for negative amounts or more
/// than 18 decimal places of precision.
pub fn to_wei(amount: Decimal) -> Result<U256> {
    if amount.is_sign_negative() {
        return Err(LaunchpadError::InvalidAmount(format!("{amount} is negative")));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > WEI_DECIMALS {
        return Err(LaunchpadError::InvalidAmount(format!(
            "{amount} has more than {WEI_DECIMALS} decimal places"
        )));
    }
    let mantissa = normalized.mantissa().unsigned_abs();
    Ok(U256::from(mantissa) * U256::from(10u64).pow(U256::from(WEI_DECIMALS - scale)))
}

/// Verifies user-submitted payment transactions against the chain.
#[derive(Debug, Clone)]
pub struct PaymentVerifier<S, R> {
    store: Arc<S>,
    rpc: Arc<R>,
    payments_contract: Address,
    lifecycle: LifecycleManager<S>,
    notifier: WebhookNotifier<S>,
}

impl<S: SubscriptionStore, R: EvmRpc> PaymentVerifier<S, R> {
    /// Creates a verifier checking payments against `payments_contract`.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook notifier's HTTP client cannot be
    /// constructed.
    pub fn new(store: Arc<S>, rpc: Arc<R>, payments_contract: Address) -> Result<Self> {
        let lifecycle = LifecycleManager::new(Arc::clone(&store))?;
        let notifier = WebhookNotifier::new(Arc::clone(&store))?;
        Ok(Self { store, rpc, payments_contract, lifecycle, notifier })
    }

    /// Verifies a payment and optionally creates or renews a subscription.
    ///
    /// At most one payment record and at most one subscription create/renew
    /// happen per call.
    ///
    /// # Errors
    ///
    /// Returns store errors (hard failures) and subscription lifecycle
    /// errors ([`LaunchpadError::PlanNotFound`] and friends). Everything
    /// that merely prevents confirming the transaction yields
    /// `Ok(VerificationResult { verified: false, .. })`.
    #[instrument(skip(self, request), fields(tx_hash = %request.tx_hash))]
    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerificationResult> {
        let merchant_wallet = normalize_wallet(&request.merchant);
        let Some(merchant) = self.store.merchant_by_wallet(&merchant_wallet).await? else {
            return Ok(VerificationResult::failed("unknown merchant"));
        };
        let Ok(merchant_address) = parse_address(&request.merchant) else {
            return Ok(VerificationResult::failed("malformed merchant address"));
        };
        let Ok(tx_hash) = request.tx_hash.trim().parse::<B256>() else {
            return Ok(VerificationResult::failed("malformed transaction hash"));
        };
        let expected_wei = match to_wei(request.amount) {
            Ok(wei) => wei,
            Err(e) => return Ok(VerificationResult::failed(e.to_string())),
        };

        let tx = match self.rpc.transaction_by_hash(tx_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return Ok(VerificationResult::failed("transaction not found")),
            Err(e) => {
                warn!(error = %e, "chain lookup failed during verification");
                return Ok(VerificationResult::failed("chain lookup failed"));
            }
        };
        let receipt = match self.rpc.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => return Ok(VerificationResult::failed("transaction not mined")),
            Err(e) => {
                warn!(error = %e, "receipt lookup failed during verification");
                return Ok(VerificationResult::failed("chain lookup failed"));
            }
        };

        // The payer is known from here on; record the attempt before
        // judging it so the payment row's status tells the whole story.
        let payer = normalize_wallet(&tx.from.to_string());
        let timestamp = Utc::now();
        let payment = self
            .store
            .insert_payment(NewPayment {
                merchant_id: merchant.id.clone(),
                payer: payer.clone(),
                amount: tx.value.to_string(),
                tx_hash: request.tx_hash.trim().to_owned(),
                timestamp,
                status: PaymentStatus::Pending,
            })
            .await?;

        if let Some(reason) =
            self.confirm(&tx, &receipt, merchant_address, expected_wei)
        {
            self.store.set_payment_status(&payment.id, PaymentStatus::Failed).await?;
            return Ok(VerificationResult::failed(reason));
        }

        let payment = self.store.set_payment_status(&payment.id, PaymentStatus::Verified).await?;
        info!(payment_id = %payment.id, %payer, "payment verified");

        let subscription = if request.create_subscription {
            self.upsert_subscription(request, &merchant.id, &payer).await?
        } else {
            None
        };

        if let Ok(data) = serde_json::to_value(&payment) {
            self.notifier.notify("payment.verified", &data).await;
        }

        Ok(VerificationResult {
            verified: true,
            reason: None,
            payer: Some(payer),
            merchant: Some(merchant_wallet),
            amount: Some(tx.value.to_string()),
            timestamp: Some(timestamp),
            payment_id: Some(payment.id),
            subscription,
        })
    }

    /// Runs the on-chain checks; `None` means confirmed.
    fn confirm(
        &self,
        tx: &crate::chain::rpc::Transaction,
        receipt: &crate::chain::rpc::TransactionReceipt,
        merchant_address: Address,
        expected_wei: U256,
    ) -> Option<&'static str> {
        if !receipt.is_success() {
            return Some("transaction reverted");
        }
        if tx.to != Some(self.payments_contract) {
            return Some("transaction not directed at payments contract");
        }

        let input = tx.input.as_ref();
        if input.len() < 4 || input[..4] != abi::selector("pay(address)") {
            return Some("transaction is not a pay call");
        }
        let paid_merchant = abi::decode(&[ParamType::Address], &input[4..])
            .ok()
            .and_then(|tokens| tokens.first().and_then(Token::as_address));
        if paid_merchant != Some(merchant_address) {
            return Some("payment not directed at expected merchant");
        }

        if tx.value < expected_wei {
            return Some("insufficient payment amount");
        }
        None
    }

    async fn upsert_subscription(
        &self,
        request: &VerifyRequest,
        merchant_id: &str,
        payer: &str,
    ) -> Result<Option<SubscriptionSummary>> {
        let Some(plan_id) = request.plan_id.as_deref() else {
            return Ok(None);
        };

        let existing = self.store.subscription_for_wallet(payer, merchant_id).await?;
        let subscription = match existing {
            Some(subscription) => {
                self.lifecycle.renew(&subscription.id, Some(request.tx_hash.trim())).await?
            }
            None => {
                self.lifecycle
                    .create(CreateSubscription {
                        merchant_id: merchant_id.to_owned(),
                        customer: payer.to_owned(),
                        wallet: payer.to_owned(),
                        plan_id: plan_id.to_owned(),
                        tx_hash: Some(request.tx_hash.trim().to_owned()),
                    })
                    .await?
            }
        };
        Ok(Some(SubscriptionSummary::from(&subscription)))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, U64};

    use super::*;
    use crate::billing::models::SubscriptionStatus;
    use crate::billing::store::MemoryStore;
    use crate::chain::rpc::mock::MockRpc;
    use crate::chain::rpc::{Transaction, TransactionReceipt};

    const MERCHANT_WALLET: &str = "0x52a55dD74Ac5C4Bc33d1a9ccd4fB1d1a4E89dDdf";
    const PAYER: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

    fn payments_contract() -> Address {
        Address::from([0x77; 20])
    }

    fn tx_hash() -> B256 {
        B256::from([0xab; 32])
    }

    fn pay_input(merchant: &str) -> Bytes {
        Bytes::from(abi::encode_call("pay(address)", &[Token::Address(
            merchant.parse().unwrap(),
        )]))
    }

    fn payment_tx(value_wei: u64, to: Option<Address>, input: Bytes) -> Transaction {
        Transaction {
            hash: tx_hash(),
            from: PAYER.parse().unwrap(),
            to,
            value: U256::from(value_wei),
            input,
            block_number: Some(U64::from(10)),
        }
    }

    fn success_receipt() -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash(),
            status: Some(U64::from(1)),
            block_number: Some(U64::from(10)),
            gas_used: Some(U256::from(21_000u64)),
            contract_address: None,
            logs: Vec::new(),
        }
    }

    struct Fixture {
        verifier: PaymentVerifier<MemoryStore, MockRpc>,
        store: Arc<MemoryStore>,
        rpc: Arc<MockRpc>,
        merchant_id: String,
        plan_id: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let rpc = Arc::new(MockRpc::new());
        let merchant = store.add_merchant(MERCHANT_WALLET, None).unwrap();
        let plan = store.add_plan(&merchant.id, "Pro", "10000000000000000", "monthly").unwrap();
        let verifier =
            PaymentVerifier::new(Arc::clone(&store), Arc::clone(&rpc), payments_contract())
                .unwrap();
        Fixture { verifier, store, rpc, merchant_id: merchant.id, plan_id: plan.id }
    }

    fn request(amount: Decimal, create: bool, plan_id: Option<String>) -> VerifyRequest {
        VerifyRequest {
            tx_hash: tx_hash().to_string(),
            merchant: MERCHANT_WALLET.to_owned(),
            amount,
            plan_id,
            create_subscription: create,
        }
    }

    // 0.01 native units in wei.
    const CENTITOKEN_WEI: u64 = 10_000_000_000_000_000;

    #[tokio::test]
    async fn test_verify_success_creates_subscription() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(payments_contract()),
            pay_input(MERCHANT_WALLET),
        ));
        fx.rpc.insert_receipt(success_receipt());

        let result = fx
            .verifier
            .verify(&request(Decimal::new(1, 2), true, Some(fx.plan_id.clone())))
            .await
            .unwrap();

        assert!(result.verified);
        assert_eq!(result.payer.as_deref(), Some(PAYER.to_lowercase().as_str()));
        let subscription = result.subscription.unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);

        let payments = fx.store.payments_for_merchant(&fx.merchant_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Verified);
    }

    #[tokio::test]
    async fn test_verify_renews_existing_subscription() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(payments_contract()),
            pay_input(MERCHANT_WALLET),
        ));
        fx.rpc.insert_receipt(success_receipt());

        let first = fx
            .verifier
            .verify(&request(Decimal::new(1, 2), true, Some(fx.plan_id.clone())))
            .await
            .unwrap();
        let second = fx
            .verifier
            .verify(&request(Decimal::new(1, 2), true, Some(fx.plan_id.clone())))
            .await
            .unwrap();

        // Same logical subscription renewed, not a duplicate row.
        assert_eq!(
            first.subscription.unwrap().subscription_id,
            second.subscription.unwrap().subscription_id
        );
    }

    #[tokio::test]
    async fn test_verify_underpaid() {
        let fx = fixture();
        // Paid 0.001, expected 0.01.
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI / 10,
            Some(payments_contract()),
            pay_input(MERCHANT_WALLET),
        ));
        fx.rpc.insert_receipt(success_receipt());

        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("insufficient payment amount"));

        let payments = fx.store.payments_for_merchant(&fx.merchant_id).await.unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_verify_unknown_transaction() {
        let fx = fixture();
        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("transaction not found"));
    }

    #[tokio::test]
    async fn test_verify_unmined_transaction() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(payments_contract()),
            pay_input(MERCHANT_WALLET),
        ));
        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("transaction not mined"));
    }

    #[tokio::test]
    async fn test_verify_reverted_transaction() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(payments_contract()),
            pay_input(MERCHANT_WALLET),
        ));
        let mut receipt = success_receipt();
        receipt.status = Some(U64::from(0));
        fx.rpc.insert_receipt(receipt);

        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("transaction reverted"));
    }

    #[tokio::test]
    async fn test_verify_wrong_contract() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(Address::from([0x99; 20])),
            pay_input(MERCHANT_WALLET),
        ));
        fx.rpc.insert_receipt(success_receipt());

        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(
            result.reason.as_deref(),
            Some("transaction not directed at payments contract")
        );
    }

    #[tokio::test]
    async fn test_verify_wrong_merchant_argument() {
        let fx = fixture();
        fx.rpc.insert_transaction(payment_tx(
            CENTITOKEN_WEI,
            Some(payments_contract()),
            pay_input(PAYER),
        ));
        fx.rpc.insert_receipt(success_receipt());

        let result =
            fx.verifier.verify(&request(Decimal::new(1, 2), false, None)).await.unwrap();
        assert!(!result.verified);
        assert_eq!(
            result.reason.as_deref(),
            Some("payment not directed at expected merchant")
        );
    }

    #[tokio::test]
    async fn test_verify_unknown_merchant() {
        let fx = fixture();
        let mut req = request(Decimal::new(1, 2), false, None);
        req.merchant = PAYER.to_owned();
        let result = fx.verifier.verify(&req).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("unknown merchant"));
    }

    #[tokio::test]
    async fn test_verify_malformed_hash() {
        let fx = fixture();
        let mut req = request(Decimal::new(1, 2), false, None);
        req.tx_hash = "0xnothex".to_owned();
        let result = fx.verifier.verify(&req).await.unwrap();
        assert!(!result.verified);
        assert_eq!(result.reason.as_deref(), Some("malformed transaction hash"));
    }

    #[test]
    fn test_to_wei_centitoken() {
        assert_eq!(to_wei(Decimal::new(1, 2)).unwrap(), U256::from(CENTITOKEN_WEI));
    }

    #[test]
    fn test_to_wei_whole_token() {
        assert_eq!(
            to_wei(Decimal::new(1, 0)).unwrap(),
            U256::from(10u64).pow(U256::from(18u64))
        );
    }

    #[test]
    fn test_to_wei_smallest_unit() {
        assert_eq!(to_wei(Decimal::new(1, 18)).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_to_wei_zero() {
        assert_eq!(to_wei(Decimal::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_wei_rejects_negative() {
        assert!(matches!(
            to_wei(Decimal::new(-1, 2)),
            Err(LaunchpadError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_to_wei_rejects_excess_precision() {
        assert!(matches!(
            to_wei(Decimal::new(1, 19)),
            Err(LaunchpadError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_request_wire_names() {
        let json = serde_json::json!({
            "txHash": "0xabc",
            "merchant": MERCHANT_WALLET,
            "amount": 0.01,
            "plan_id": "plan-1",
            "create_subscription": true,
        });
        let request: VerifyRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.tx_hash, "0xabc");
        assert!(request.create_subscription);
    }
}
