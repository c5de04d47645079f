//! Write side used by the collection step: turns scraped offers into
//! price observations and appends them to the store.

use crate::error::{AppError, AppResult};
use crate::models::{Price, PriceObservation, Source};
use crate::repositories::PriceStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Marker stored when a scraped field could not be read
pub const NOT_AVAILABLE: &str = "N/A";

/// One competitor offer as scraped from a product page
#[derive(Debug, Clone, Default)]
pub struct ScrapedOffer {
    pub product_name: Option<String>,
    pub seller: Option<String>,
    pub price_text: Option<String>,
}

/// A product we list, with our current price
#[derive(Debug, Clone)]
pub struct ListedProduct {
    pub product_id: String,
    pub product_name: String,
    pub our_price: Price,
}

pub struct ObservationRecorder {
    store: Arc<dyn PriceStore>,
    our_company: String,
}

impl ObservationRecorder {
    pub fn new(store: Arc<dyn PriceStore>, our_company: impl Into<String>) -> Self {
        Self {
            store,
            our_company: our_company.into(),
        }
    }

    /// Convert scraped offers into observations.
    ///
    /// Price text is parsed in German or canonical format and the source's
    /// delivery surcharge is added. Missing fields fall back to `N/A`, and
    /// a missing product name falls back to our listing's name.
    pub fn offers_to_observations(
        &self,
        product: &ListedProduct,
        source: &Source,
        offers: &[ScrapedOffer],
        date: NaiveDate,
    ) -> Vec<PriceObservation> {
        offers
            .iter()
            .map(|offer| {
                let price = match offer.price_text.as_deref() {
                    Some(text) => Price::parse_localized(text).with_surcharge(source.delivery_surcharge()),
                    None => Price::Invalid(NOT_AVAILABLE.to_string()),
                };

                PriceObservation::new(
                    product.product_id.clone(),
                    non_blank(offer.product_name.as_deref()).unwrap_or(&product.product_name),
                    non_blank(offer.seller.as_deref()).unwrap_or(NOT_AVAILABLE),
                    price,
                    date,
                    source.clone(),
                )
            })
            .collect()
    }

    /// Observation for our own listing
    pub fn own_observation(&self, product: &ListedProduct, date: NaiveDate) -> PriceObservation {
        PriceObservation::new(
            product.product_id.clone(),
            product.product_name.clone(),
            self.our_company.clone(),
            product.our_price.clone(),
            date,
            Source::OurCompany,
        )
    }

    /// Append competitor offers for one product and source
    pub async fn record_offers(
        &self,
        product: &ListedProduct,
        source: &Source,
        offers: &[ScrapedOffer],
        date: NaiveDate,
    ) -> AppResult<u64> {
        let observations = self.offers_to_observations(product, source, offers, date);
        self.append(observations).await
    }

    /// Append competitor offers together with our own price
    pub async fn record_with_own_price(
        &self,
        product: &ListedProduct,
        source: &Source,
        offers: &[ScrapedOffer],
        date: NaiveDate,
    ) -> AppResult<u64> {
        let mut observations = self.offers_to_observations(product, source, offers, date);
        observations.push(self.own_observation(product, date));
        self.append(observations).await
    }

    async fn append(&self, observations: Vec<PriceObservation>) -> AppResult<u64> {
        if observations.is_empty() {
            debug!("No observations to record");
            return Ok(0);
        }

        let written = self.store.append(&observations).await.map_err(|e| {
            AppError::PriceStore(format!("failed to append observations: {}", e))
        })?;

        info!(
            "Recorded {} observations for product {}",
            written, observations[0].product_id
        );
        Ok(written)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
