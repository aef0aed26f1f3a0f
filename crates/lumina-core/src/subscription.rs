// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription activation with an optimistic tier.
//!
//! The purchased tier is visible to guards as soon as `activate` is called.
//! The patch is confirmed once the backend reports a modified record and
//! rolled back otherwise.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::entitlement::{EntitlementFetcher, PendingTier};
use crate::error::{MutationError, MutationResult};
use crate::types::Tier;

/// Transaction id used when activating the free plan.
pub const FREE_PLAN_TRANSACTION: &str = "free_plan_no_payment";

/// Outcome of a completed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Amount charged, in whole currency units.
    pub amount: u64,
    /// Payment processor transaction id.
    pub transaction_id: String,
}

impl PaymentReceipt {
    /// A paid receipt.
    pub fn paid(amount: u64, transaction_id: impl Into<String>) -> Self {
        Self {
            amount,
            transaction_id: transaction_id.into(),
        }
    }

    /// The free plan: no charge and a fixed transaction id.
    pub fn free() -> Self {
        Self::paid(0, FREE_PLAN_TRANSACTION)
    }

    /// Returns `true` for the free plan.
    pub fn is_free(&self) -> bool {
        self.amount == 0 && self.transaction_id == FREE_PLAN_TRANSACTION
    }
}

/// Body of `PATCH /users/premium`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReceipt {
    /// Account email.
    pub email: String,
    /// Amount charged.
    pub amount: u64,
    /// Payment processor transaction id.
    pub transaction_id: String,
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// What was paid for.
    #[serde(rename = "pay_for")]
    pub pay_for: String,
    /// Account email.
    pub email: String,
    /// Amount charged.
    pub amount: u64,
    /// Payment processor transaction id.
    pub transaction_id: String,
    /// When the payment completed.
    pub date: DateTime<Utc>,
}

/// Subscription endpoints.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Stores a completed payment.
    async fn record_payment(&self, record: &PaymentRecord) -> MutationResult<()>;

    /// Upgrades the account. Returns the backend's modified count.
    async fn activate_premium(&self, receipt: &ActivationReceipt) -> MutationResult<u64>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "subscription-api"
    }
}

/// Activates subscriptions against the shared entitlement cache.
pub struct SubscriptionService {
    api: Arc<dyn SubscriptionApi>,
    entitlements: Arc<EntitlementFetcher>,
}

impl SubscriptionService {
    /// Creates a service.
    pub fn new(api: Arc<dyn SubscriptionApi>, entitlements: Arc<EntitlementFetcher>) -> Self {
        Self { api, entitlements }
    }

    /// Activates `tier` for `email`, which must be the active email.
    ///
    /// Paid receipts are recorded before the upgrade. Returns the modified
    /// count on success.
    pub async fn activate(
        &self,
        email: &str,
        tier: Tier,
        receipt: PaymentReceipt,
    ) -> MutationResult<u64> {
        if self.entitlements.active_email().as_deref() != Some(email) {
            return Err(MutationError::NotSignedIn);
        }
        let patch = self
            .entitlements
            .apply_optimistic_tier(tier)
            .ok_or(MutationError::NotSignedIn)?;
        // Dropping the guard without a commit rolls the tier back.
        let pending = PendingTier::new(&self.entitlements, Some(patch));

        let result = self.submit(email, &receipt).await;
        match result {
            Ok(modified) if modified > 0 => {
                pending.commit();
                self.entitlements.invalidate(email);
                info!(email, %tier, modified, "Subscription activated");
                Ok(modified)
            }
            Ok(_) => {
                warn!(email, %tier, "Subscription update changed nothing");
                Err(MutationError::not_applied("Subscription update failed"))
            }
            Err(e) => {
                warn!(email, %tier, error = %e, "Subscription activation failed");
                Err(e)
            }
        }
    }

    async fn submit(&self, email: &str, receipt: &PaymentReceipt) -> MutationResult<u64> {
        if !receipt.is_free() {
            let record = PaymentRecord {
                pay_for: "subscription".to_string(),
                email: email.to_string(),
                amount: receipt.amount,
                transaction_id: receipt.transaction_id.clone(),
                date: Utc::now(),
            };
            self.api.record_payment(&record).await?;
        }

        let activation = ActivationReceipt {
            email: email.to_string(),
            amount: receipt.amount,
            transaction_id: receipt.transaction_id.clone(),
        };
        self.api.activate_premium(&activation).await
    }
}

impl fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("api", &self.api.name())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::entitlement::{EntitlementConfig, UserRecord};
    use crate::test_support::FakeEntitlementApi;
    use crate::types::Role;

    struct FakeSubscriptionApi {
        stall: AtomicBool,
        modified: Mutex<MutationResult<u64>>,
        payments: Mutex<Vec<PaymentRecord>>,
        activations: Mutex<Vec<ActivationReceipt>>,
    }

    impl FakeSubscriptionApi {
        fn returning(result: MutationResult<u64>) -> Arc<Self> {
            Arc::new(Self {
                stall: AtomicBool::new(false),
                modified: Mutex::new(result),
                payments: Mutex::new(Vec::new()),
                activations: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SubscriptionApi for FakeSubscriptionApi {
        async fn record_payment(&self, record: &PaymentRecord) -> MutationResult<()> {
            self.payments.lock().push(record.clone());
            Ok(())
        }

        async fn activate_premium(&self, receipt: &ActivationReceipt) -> MutationResult<u64> {
            self.activations.lock().push(receipt.clone());
            if self.stall.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.modified.lock().clone()
        }
    }

    async fn explorer() -> (Arc<FakeEntitlementApi>, Arc<EntitlementFetcher>) {
        let api = Arc::new(FakeEntitlementApi::new());
        api.insert("a@x.com", UserRecord::new(Role::User, Tier::Explorer));
        let fetcher = Arc::new(EntitlementFetcher::new(
            api.clone(),
            EntitlementConfig::default(),
        ));
        fetcher.set_active_email(Some("a@x.com".to_string()));
        fetcher.fetch(Some("a@x.com")).await;
        (api, fetcher)
    }

    #[tokio::test]
    async fn test_activation_commits_and_invalidates() {
        let (_api, fetcher) = explorer().await;
        let backend = FakeSubscriptionApi::returning(Ok(1));
        let service = SubscriptionService::new(backend.clone(), fetcher.clone());

        let modified = service
            .activate("a@x.com", Tier::Artist, PaymentReceipt::paid(19, "pi_123"))
            .await
            .unwrap();
        assert_eq!(modified, 1);

        let snapshot = fetcher.snapshot();
        assert_eq!(snapshot.tier, Some(Tier::Artist));
        assert!(!snapshot.patched);
        assert!(!fetcher.is_fresh("a@x.com"));

        assert_eq!(backend.payments.lock().len(), 1);
        assert_eq!(backend.activations.lock()[0].transaction_id, "pi_123");
    }

    #[tokio::test]
    async fn test_free_plan_skips_payment_record() {
        let (_api, fetcher) = explorer().await;
        let backend = FakeSubscriptionApi::returning(Ok(1));
        let service = SubscriptionService::new(backend.clone(), fetcher);

        service
            .activate("a@x.com", Tier::Explorer, PaymentReceipt::free())
            .await
            .unwrap();
        assert!(backend.payments.lock().is_empty());
        let activation = backend.activations.lock()[0].clone();
        assert_eq!(activation.amount, 0);
        assert_eq!(activation.transaction_id, FREE_PLAN_TRANSACTION);
    }

    #[tokio::test]
    async fn test_zero_modified_rolls_back() {
        let (_api, fetcher) = explorer().await;
        let service = SubscriptionService::new(FakeSubscriptionApi::returning(Ok(0)), fetcher.clone());

        let err = service
            .activate("a@x.com", Tier::Creator, PaymentReceipt::paid(49, "pi_9"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotApplied { .. }));
        assert_eq!(fetcher.snapshot().tier, Some(Tier::Explorer));
        assert!(fetcher.is_fresh("a@x.com"));
    }

    #[tokio::test]
    async fn test_backend_error_rolls_back() {
        let (_api, fetcher) = explorer().await;
        let service = SubscriptionService::new(
            FakeSubscriptionApi::returning(Err(MutationError::transport("reset"))),
            fetcher.clone(),
        );

        let err = service
            .activate("a@x.com", Tier::Creator, PaymentReceipt::paid(49, "pi_9"))
            .await
            .unwrap_err();
        assert_eq!(err, MutationError::transport("reset"));
        assert_eq!(fetcher.snapshot().tier, Some(Tier::Explorer));
    }

    #[tokio::test]
    async fn test_cancelled_activation_rolls_back() {
        let (_api, fetcher) = explorer().await;
        let backend = FakeSubscriptionApi::returning(Ok(1));
        backend.stall.store(true, Ordering::SeqCst);
        let service = SubscriptionService::new(backend.clone(), fetcher.clone());

        let activation = service.activate("a@x.com", Tier::Artist, PaymentReceipt::free());
        let cancelled = tokio::time::timeout(std::time::Duration::from_millis(10), activation).await;
        assert!(cancelled.is_err());
        assert_eq!(backend.activations.lock().len(), 1);

        let snapshot = fetcher.snapshot();
        assert_eq!(snapshot.tier, Some(Tier::Explorer));
        assert!(!snapshot.patched);
    }

    #[tokio::test]
    async fn test_activation_requires_active_email() {
        let (_api, fetcher) = explorer().await;
        let service = SubscriptionService::new(FakeSubscriptionApi::returning(Ok(1)), fetcher);

        let err = service
            .activate("b@x.com", Tier::Artist, PaymentReceipt::free())
            .await
            .unwrap_err();
        assert_eq!(err, MutationError::NotSignedIn);
    }

    #[test]
    fn test_activation_wire_format() {
        let receipt = ActivationReceipt {
            email: "a@x.com".to_string(),
            amount: 0,
            transaction_id: FREE_PLAN_TRANSACTION.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            serde_json::json!({
                "email": "a@x.com",
                "amount": 0,
                "transactionId": "free_plan_no_payment"
            })
        );
    }
}
