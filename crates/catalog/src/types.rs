use std::fmt;

use serde::{Deserialize, Serialize};

/// Image publisher available in a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub name: String,
    pub display_name: String,
    pub location: String,
}

impl Publisher {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        let name = name.into();
        Self { display_name: name.clone(), name, location: location.into() }
    }
}

/// Offer published by `publisher`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub name: String,
    pub display_name: String,
    pub publisher: String,
    pub location: String,
}

impl Offer {
    pub fn new(
        name: impl Into<String>,
        publisher: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            publisher: publisher.into(),
            location: location.into(),
        }
    }
}

/// SKU with its image versions, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
    pub display_name: String,
    pub publisher: String,
    pub offer: String,
    pub location: String,
    pub versions: Vec<String>,
}

impl Sku {
    pub fn new(
        name: impl Into<String>,
        publisher: impl Into<String>,
        offer: impl Into<String>,
        location: impl Into<String>,
        versions: Vec<String>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            publisher: publisher.into(),
            offer: offer.into(),
            location: location.into(),
            versions,
        }
    }

    pub fn latest_version(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }
}

/// Body shape shared by every listing endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub value: Option<Vec<NameRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameRecord {
    pub name: String,
}

/// Which level of the catalog a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    Publishers,
    Offers,
    Skus,
    Versions,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publishers => "publishers",
            Self::Offers => "offers",
            Self::Skus => "skus",
            Self::Versions => "versions",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
