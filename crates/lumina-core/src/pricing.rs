// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Listing price and discount arithmetic.
//!
//! The uploader enters a list price and a discount percentage. The price
//! buyers pay is `floor(price - price * discount / 100)`, in whole currency
//! units. A price of zero makes the image a free download.
//!
//! ```
//! use lumina_core::pricing::ListingPrice;
//!
//! let price = ListingPrice::new(49.0, 15.0).unwrap();
//! assert_eq!(price.final_price(), 41);
//! ```

use serde::Serialize;

use crate::error::{PricingError, PricingResult};

/// Price fields of an image listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPrice {
    price: f64,
    discount_percent: f64,
    final_price: u64,
}

impl ListingPrice {
    /// Validates a list price and discount.
    pub fn new(price: f64, discount_percent: f64) -> PricingResult<Self> {
        check_price(price)?;
        check_discount(discount_percent)?;
        Ok(Self {
            price,
            discount_percent,
            final_price: final_price(price, discount_percent),
        })
    }

    /// A free listing.
    pub fn free() -> Self {
        Self::default()
    }

    /// Replaces the list price from form input, keeping the discount.
    ///
    /// Invalid input leaves the listing unchanged and is reported.
    pub fn with_price_input(self, input: &str) -> PricingResult<Self> {
        let trimmed = input.trim();
        let price = trimmed
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| PricingError::NotANumber {
                input: trimmed.to_string(),
            })?;
        Self::new(price, self.discount_percent)
    }

    /// Replaces the discount, keeping the list price.
    pub fn with_discount(self, discount_percent: f64) -> PricingResult<Self> {
        Self::new(self.price, discount_percent)
    }

    /// List price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Discount percentage.
    pub fn discount_percent(&self) -> f64 {
        self.discount_percent
    }

    /// Price after discount, rounded down.
    pub fn final_price(&self) -> u64 {
        self.final_price
    }

    /// Returns `true` when buyers pay nothing.
    pub fn is_free(&self) -> bool {
        self.final_price == 0
    }
}

/// `floor(price - price * discount / 100)` for validated inputs.
pub fn final_price(price: f64, discount_percent: f64) -> u64 {
    let discounted = price - (price * discount_percent) / 100.0;
    // Float-to-int casts saturate: negatives clamp to zero.
    discounted.floor() as u64
}

fn check_price(price: f64) -> PricingResult<()> {
    if price.is_nan() || price.is_infinite() {
        return Err(PricingError::NotANumber {
            input: price.to_string(),
        });
    }
    if price < 0.0 {
        return Err(PricingError::Negative { price });
    }
    Ok(())
}

fn check_discount(percent: f64) -> PricingResult<()> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(PricingError::DiscountOutOfRange { percent });
    }
    Ok(())
}
