// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Download gating for the image details view.
//!
//! The download button is resolved in a fixed order:
//!
//! 1. The viewer already downloaded or bought the image: nothing to do.
//! 2. The viewer owns the image: nothing to do.
//! 3. The final price is zero: record a free download.
//! 4. Otherwise the image must be purchased first.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MutationError, MutationResult};
use crate::subscription::PaymentReceipt;
use crate::types::{Identity, ImageId};

/// Endpoint recording a free download.
pub const FREE_DOWNLOAD_PATH: &str = "/download-free-image";

/// Endpoint recording a purchase.
pub const PURCHASE_PATH: &str = "/purchase-image";

/// One completed download or sale of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Email of the buyer.
    #[serde(rename = "buyerEmail")]
    pub buyer_email: String,
}

/// Image fields the details view gates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListing {
    /// Backend id.
    #[serde(rename = "_id")]
    pub id: ImageId,
    /// Title.
    #[serde(default)]
    pub name: String,
    /// Unwatermarked image URL.
    #[serde(default)]
    pub original_image: String,
    /// Uploader email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// Price after discount.
    #[serde(default)]
    pub final_price: u64,
    /// Completed downloads and sales.
    #[serde(default)]
    pub sold: Vec<Sale>,
}

impl ImageListing {
    /// Returns `true` if `email` already downloaded or bought the image.
    pub fn downloaded_by(&self, email: &str) -> bool {
        self.sold.iter().any(|sale| sale.buyer_email == email)
    }

    /// Returns `true` if `email` uploaded the image.
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.user_email.as_deref() == Some(email)
    }

    /// Resolves the download button for `email`.
    pub fn decide(&self, email: &str) -> DownloadDecision {
        if self.downloaded_by(email) {
            DownloadDecision::AlreadyDownloaded
        } else if self.is_owned_by(email) {
            DownloadDecision::OwnImage
        } else if self.final_price == 0 {
            DownloadDecision::Free
        } else {
            DownloadDecision::Purchase {
                price: self.final_price,
            }
        }
    }
}

/// What pressing "download" does for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum DownloadDecision {
    /// Already downloaded or bought.
    AlreadyDownloaded,
    /// The viewer's own upload.
    OwnImage,
    /// Free download.
    Free,
    /// Payment required.
    Purchase {
        /// Amount to charge.
        price: u64,
    },
}

impl DownloadDecision {
    /// Backend endpoint this decision posts to, if any.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            DownloadDecision::Free => Some(FREE_DOWNLOAD_PATH),
            DownloadDecision::Purchase { .. } => Some(PURCHASE_PATH),
            DownloadDecision::AlreadyDownloaded | DownloadDecision::OwnImage => None,
        }
    }

    /// Returns the label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadDecision::AlreadyDownloaded => "already_downloaded",
            DownloadDecision::OwnImage => "own_image",
            DownloadDecision::Free => "free",
            DownloadDecision::Purchase { .. } => "purchase",
        }
    }
}

impl fmt::Display for DownloadDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /download-free-image` and `POST /purchase-image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Image id.
    pub image_id: ImageId,
    /// Image title.
    pub image_name: String,
    /// Unwatermarked image URL.
    pub image_link: String,
    /// Buyer email.
    pub buyer_email: String,
    /// Buyer display name.
    pub buyer_name: String,
    /// Uploader email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_email: Option<String>,
    /// Amount charged. Purchases only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    /// Payment processor transaction id. Purchases only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl DownloadRecord {
    fn new(image: &ImageListing, buyer: &Identity) -> Self {
        Self {
            image_id: image.id.clone(),
            image_name: image.name.clone(),
            image_link: image.original_image.clone(),
            buyer_email: buyer.email.clone(),
            buyer_name: buyer.display_name.clone(),
            seller_email: image.user_email.clone(),
            price: None,
            transaction_id: None,
        }
    }
}

/// Download and purchase endpoints.
#[async_trait]
pub trait DownloadApi: Send + Sync {
    /// Records a free download.
    async fn record_free_download(&self, record: &DownloadRecord) -> MutationResult<()>;

    /// Records a paid purchase.
    async fn record_purchase(&self, record: &DownloadRecord) -> MutationResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "download-api"
    }
}

/// Applies download gating and records the result with the backend.
pub struct DownloadService {
    api: Arc<dyn DownloadApi>,
}

impl DownloadService {
    /// Creates a service.
    pub fn new(api: Arc<dyn DownloadApi>) -> Self {
        Self { api }
    }

    /// Presses "download" on `image`.
    ///
    /// Free images are recorded right away. For a paid image nothing is sent
    /// and `Purchase` is returned, so the caller can collect payment and then
    /// call [`purchase`](Self::purchase).
    pub async fn download(
        &self,
        image: &ImageListing,
        viewer: Option<&Identity>,
    ) -> MutationResult<DownloadDecision> {
        let viewer = viewer.ok_or(MutationError::NotSignedIn)?;
        let decision = image.decide(&viewer.email);
        debug!(image = %image.id, email = %viewer.email, %decision, "Download resolved");

        if decision == DownloadDecision::Free {
            let record = DownloadRecord::new(image, viewer);
            if let Err(e) = self.api.record_free_download(&record).await {
                warn!(image = %image.id, error = %e, "Free download failed");
                return Err(e);
            }
            info!(image = %image.id, email = %viewer.email, "Free download recorded");
        }
        Ok(decision)
    }

    /// Records a purchase of `image` paid with `receipt`.
    ///
    /// Fails with `NotApplied` when the image needs no purchase for the
    /// viewer or the receipt does not cover the final price.
    pub async fn purchase(
        &self,
        image: &ImageListing,
        viewer: Option<&Identity>,
        receipt: &PaymentReceipt,
    ) -> MutationResult<u64> {
        let viewer = viewer.ok_or(MutationError::NotSignedIn)?;
        let price = match image.decide(&viewer.email) {
            DownloadDecision::Purchase { price } => price,
            other => {
                return Err(MutationError::not_applied(format!(
                    "Image needs no purchase: {other}"
                )))
            }
        };
        if receipt.amount != price {
            return Err(MutationError::not_applied(format!(
                "Payment of {} does not match price {price}",
                receipt.amount
            )));
        }

        let record = DownloadRecord {
            price: Some(price),
            transaction_id: Some(receipt.transaction_id.clone()),
            ..DownloadRecord::new(image, viewer)
        };
        match self.api.record_purchase(&record).await {
            Ok(()) => {
                info!(image = %image.id, email = %viewer.email, price, "Purchase recorded");
                Ok(price)
            }
            Err(e) => {
                warn!(image = %image.id, error = %e, "Purchase failed");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadService")
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

    #[derive(Default)]
    struct FakeDownloadApi {
        free: Mutex<Vec<DownloadRecord>>,
        purchases: Mutex<Vec<DownloadRecord>>,
    }

    #[async_trait]
    impl DownloadApi for FakeDownloadApi {
        async fn record_free_download(&self, record: &DownloadRecord) -> MutationResult<()> {
            self.free.lock().push(record.clone());
            Ok(())
        }

        async fn record_purchase(&self, record: &DownloadRecord) -> MutationResult<()> {
            self.purchases.lock().push(record.clone());
            Ok(())
        }
    }

    fn listing(price: u64) -> ImageListing {
        ImageListing {
            id: ImageId::new("img-1"),
            name: "Dune".to_string(),
            original_image: "https://cdn.test/dune.jpg".to_string(),
            user_email: Some("owner@x.com".to_string()),
            final_price: price,
            sold: vec![Sale {
                buyer_email: "buyer@x.com".to_string(),
            }],
        }
    }

    #[test]
    fn test_decision_order() {
        // A bought image stays "downloaded" even for its owner.
        let mut image = listing(0);
        image.sold.push(Sale {
            buyer_email: "owner@x.com".to_string(),
        });
        assert_eq!(image.decide("owner@x.com"), DownloadDecision::AlreadyDownloaded);

        let image = listing(0);
        assert_eq!(image.decide("buyer@x.com"), DownloadDecision::AlreadyDownloaded);
        assert_eq!(image.decide("owner@x.com"), DownloadDecision::OwnImage);
        assert_eq!(image.decide("new@x.com"), DownloadDecision::Free);
        assert_eq!(
            listing(30).decide("new@x.com"),
            DownloadDecision::Purchase { price: 30 }
        );
    }

    #[test]
    fn test_decision_endpoints() {
        assert_eq!(DownloadDecision::Free.endpoint(), Some(FREE_DOWNLOAD_PATH));
        assert_eq!(
            DownloadDecision::Purchase { price: 5 }.endpoint(),
            Some(PURCHASE_PATH)
        );
        assert_eq!(DownloadDecision::OwnImage.endpoint(), None);
        assert_eq!(DownloadDecision::AlreadyDownloaded.endpoint(), None);
    }

    #[tokio::test]
    async fn test_free_download_is_recorded() {
        let api = Arc::new(FakeDownloadApi::default());
        let service = DownloadService::new(api.clone());
        let viewer = Identity::new("new@x.com").with_display_name("New");

        let decision = service.download(&listing(0), Some(&viewer)).await.unwrap();
        assert_eq!(decision, DownloadDecision::Free);

        let free = api.free.lock();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].buyer_email, "new@x.com");
        assert_eq!(free[0].seller_email.as_deref(), Some("owner@x.com"));
        assert_eq!(free[0].price, None);
    }

    #[tokio::test]
    async fn test_gated_downloads_send_nothing() {
        let api = Arc::new(FakeDownloadApi::default());
        let service = DownloadService::new(api.clone());

        let owner = Identity::new("owner@x.com");
        let buyer = Identity::new("buyer@x.com");
        let viewer = Identity::new("new@x.com");
        assert_eq!(
            service.download(&listing(0), Some(&owner)).await.unwrap(),
            DownloadDecision::OwnImage
        );
        assert_eq!(
            service.download(&listing(0), Some(&buyer)).await.unwrap(),
            DownloadDecision::AlreadyDownloaded
        );
        assert_eq!(
            service.download(&listing(12), Some(&viewer)).await.unwrap(),
            DownloadDecision::Purchase { price: 12 }
        );
        assert_eq!(
            service.download(&listing(0), None).await.unwrap_err(),
            MutationError::NotSignedIn
        );
        assert!(api.free.lock().is_empty());
        assert!(api.purchases.lock().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_checks_price() {
        let api = Arc::new(FakeDownloadApi::default());
        let service = DownloadService::new(api.clone());
        let viewer = Identity::new("new@x.com");

        let err = service
            .purchase(&listing(12), Some(&viewer), &PaymentReceipt::paid(10, "pi_low"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotApplied { .. }));

        let err = service
            .purchase(&listing(0), Some(&viewer), &PaymentReceipt::paid(0, "pi_zero"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotApplied { .. }));
        assert!(api.purchases.lock().is_empty());

        let price = service
            .purchase(&listing(12), Some(&viewer), &PaymentReceipt::paid(12, "pi_ok"))
            .await
            .unwrap();
        assert_eq!(price, 12);
        let purchases = api.purchases.lock();
        assert_eq!(purchases[0].price, Some(12));
        assert_eq!(purchases[0].transaction_id.as_deref(), Some("pi_ok"));
    }

    #[test]
    fn test_record_wire_format() {
        let record = DownloadRecord::new(&listing(0), &Identity::new("new@x.com"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "imageId": "img-1",
                "imageName": "Dune",
                "imageLink": "https://cdn.test/dune.jpg",
                "buyerEmail": "new@x.com",
                "buyerName": "",
                "sellerEmail": "owner@x.com"
            })
        );
    }
}
