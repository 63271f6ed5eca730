//! Product lookup for resolved codes.
//!
//! The scanner hands the normalized code to a [`ProductLookup`] once an
//! attempt succeeds. Transport is up to the implementor; [`StaticCatalog`]
//! serves records already in memory or on disk.

mod catalog;

pub use catalog::{CatalogProduct, CatalogResponse, StaticCatalog};

use serde::Serialize;
use thiserror::Error;

/// Errors from a product lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Nutrition facts per 100 g.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Nutrition {
    pub energy_kj: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub proteins: Option<f64>,
}

/// A catalog entry for one barcode. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductRecord {
    pub barcode: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub categories: Option<String>,
    pub ingredients: Option<String>,
    pub nutrition: Nutrition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ProductRecord),
    NotFound,
}

impl LookupOutcome {
    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            LookupOutcome::Found(record) => Some(record),
            LookupOutcome::NotFound => None,
        }
    }
}

/// Resolves a normalized numeric code to a product.
pub trait ProductLookup {
    fn lookup_product(&self, code: &str) -> Result<LookupOutcome, LookupError>;
}
