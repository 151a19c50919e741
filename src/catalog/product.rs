//! Catalog product records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CsError, Result};
use crate::search::types::{SearchRecommendation, SearchResultProduct};

/// A marketplace product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

const fn default_available() -> bool {
    true
}

impl Product {
    /// Reject records that cannot be indexed.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CsError::ValidationFailed("product id is empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(CsError::ValidationFailed(format!(
                "product {} has an empty title",
                self.id
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CsError::ValidationFailed(format!(
                "product {} has an invalid price {}",
                self.id, self.price
            )));
        }
        Ok(())
    }

    /// Text submitted to the embedder for this product.
    ///
    /// Title first, then category and vendor, then the description, joined
    /// so each part reads as its own sentence.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        [
            Some(self.title.as_str()),
            self.category_name.as_deref(),
            self.vendor_name.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
    }

    /// SHA-256 of [`Self::embedding_text`], hex encoded.
    #[must_use]
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.embedding_text().as_bytes()))
    }

    #[must_use]
    pub fn into_result(self, relevance_score: f64) -> SearchResultProduct {
        SearchResultProduct {
            id: self.id,
            title: self.title,
            description: self.description,
            price: self.price,
            category_id: self.category_id,
            category_name: self.category_name,
            university_id: self.university_id,
            vendor_id: self.vendor_id,
            vendor_name: self.vendor_name,
            image_url: self.image_url,
            created_at: self.created_at,
            relevance_score,
        }
    }

    #[must_use]
    pub fn to_recommendation(&self) -> SearchRecommendation {
        SearchRecommendation {
            id: self.id.clone(),
            title: self.title.clone(),
            category_name: self.category_name.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
        }
    }
}
