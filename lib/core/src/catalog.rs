use serde::{Deserialize, Serialize};
use crate::vector::Vector;

/// A raw catalog row as read from the source table, before cleaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display name returned to callers
    pub name: String,
    /// Text that gets normalized and embedded
    pub raw_text: String,
    pub carbon_rating: String,
}

impl CatalogEntry {
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        raw_text: impl Into<String>,
        carbon_rating: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
            carbon_rating: carbon_rating.into(),
        }
    }
}

/// One indexed catalog row.
///
/// Position in the catalog sequence is the row index into the
/// similarity index; records never move once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    pub cleaned: String,
    /// Raw (un-normalized) embedding of `cleaned`
    pub embedding: Vector,
    pub carbon_rating: String,
}

impl CatalogRecord {
    #[inline]
    #[must_use]
    pub fn new(name: String, cleaned: String, embedding: Vector, carbon_rating: String) -> Self {
        Self {
            name,
            cleaned,
            embedding,
            carbon_rating,
        }
    }
}

/// Output of a single match call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchResult {
    pub input_product: String,
    pub matched_product: String,
    pub carbon_rating: String,
}
