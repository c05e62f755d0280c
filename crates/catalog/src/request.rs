use url::{form_urlencoded::byte_serialize, Url};

use crate::{
    error::{CatalogError, Result},
    types::ListingKind,
};

/// Parameters of one logical catalog listing.
///
/// The listing kind follows from which of publisher/offer/sku are set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogRequest {
    pub subscription: String,
    pub location: String,
    pub publisher: Option<String>,
    pub offer: Option<String>,
    pub sku: Option<String>,
}

impl CatalogRequest {
    pub fn publishers(subscription: &str, location: &str) -> Self {
        Self {
            subscription: subscription.to_string(),
            location: location.to_string(),
            publisher: None,
            offer: None,
            sku: None,
        }
    }

    pub fn offers(subscription: &str, location: &str, publisher: &str) -> Self {
        Self { publisher: Some(publisher.to_string()), ..Self::publishers(subscription, location) }
    }

    pub fn skus(subscription: &str, location: &str, publisher: &str, offer: &str) -> Self {
        Self { offer: Some(offer.to_string()), ..Self::offers(subscription, location, publisher) }
    }

    pub fn versions(
        subscription: &str,
        location: &str,
        publisher: &str,
        offer: &str,
        sku: &str,
    ) -> Self {
        Self { sku: Some(sku.to_string()), ..Self::skus(subscription, location, publisher, offer) }
    }

    pub fn kind(&self) -> ListingKind {
        match (&self.publisher, &self.offer, &self.sku) {
            (None, _, _) => ListingKind::Publishers,
            (Some(_), None, _) => ListingKind::Offers,
            (Some(_), Some(_), None) => ListingKind::Skus,
            (Some(_), Some(_), Some(_)) => ListingKind::Versions,
        }
    }

    /// Key prefix shared by every request under `subscription`
    pub fn subscription_scope(subscription: &str) -> String {
        format!("{}/", encode(subscription))
    }

    /// Deterministic fingerprint:
    /// `{subscription}/{kind}/{location}[/{publisher}[/{offer}[/{sku}]]]`
    ///
    /// Components are percent-encoded so a `/` inside a name cannot collide
    /// with the separator.
    pub fn cache_key(&self) -> String {
        let mut key = Self::subscription_scope(&self.subscription);
        key.push_str(self.kind().as_str());
        key.push('/');
        key.push_str(&encode(&self.location));

        for part in [&self.publisher, &self.offer, &self.sku].into_iter().flatten() {
            key.push('/');
            key.push_str(&encode(part));
        }
        key
    }

    /// Full endpoint URL under `base`, with the pinned `api-version`
    pub fn endpoint(&self, base: &Url, api_version: &str) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CatalogError::Configuration(format!("Base URL '{base}' cannot carry a path"))
            })?;
            segments.pop_if_empty().extend([
                "subscriptions",
                self.subscription.as_str(),
                "providers",
                "Microsoft.Compute",
                "locations",
                self.location.as_str(),
                "publishers",
            ]);

            if let Some(publisher) = &self.publisher {
                segments.extend([publisher.as_str(), "artifacttypes", "vmimage", "offers"]);
            }
            if let Some(offer) = &self.offer {
                segments.extend([offer.as_str(), "skus"]);
            }
            if let Some(sku) = &self.sku {
                segments.extend([sku.as_str(), "versions"]);
            }
        }

        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }
}

fn encode(component: &str) -> String {
    byte_serialize(component.as_bytes()).collect()
}
