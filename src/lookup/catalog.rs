//! Catalog response mapping and an in-memory catalog.

use super::{LookupError, LookupOutcome, Nutrition, ProductLookup, ProductRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// A product document as returned by the public food catalog API.
///
/// `status` is 1 when the product exists.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub product: Option<CatalogProduct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogProduct {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_url: Option<String>,
    pub categories: Option<String>,
    pub ingredients_text: Option<String>,
    pub nutriments: HashMap<String, Value>,
}

impl CatalogProduct {
    /// Nutriment values arrive as numbers or numeric strings.
    fn per_100g(&self, nutrient: &str) -> Option<f64> {
        match self.nutriments.get(&format!("{nutrient}_100g"))? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl CatalogResponse {
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Maps the document onto a record for `barcode`.
    pub fn into_outcome(self, barcode: &str) -> LookupOutcome {
        let product = match self.product {
            Some(product) if self.status == 1 => product,
            _ => return LookupOutcome::NotFound,
        };

        LookupOutcome::Found(ProductRecord {
            barcode: barcode.to_string(),
            name: non_empty(&product.product_name),
            brand: non_empty(&product.brands),
            image_url: non_empty(&product.image_url),
            categories: non_empty(&product.categories),
            ingredients: non_empty(&product.ingredients_text),
            nutrition: Nutrition {
                energy_kj: product.per_100g("energy"),
                fat: product.per_100g("fat"),
                carbohydrates: product.per_100g("carbohydrates"),
                proteins: product.per_100g("proteins"),
            },
        })
    }
}

/// Serves products from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashMap<String, ProductRecord>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ProductRecord) {
        self.products.insert(record.barcode.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Parses a JSON object mapping barcodes to catalog documents.
    ///
    /// Documents whose status marks the product as missing are skipped.
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let documents: HashMap<String, CatalogResponse> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (barcode, document) in documents {
            if let LookupOutcome::Found(record) = document.into_outcome(&barcode) {
                catalog.insert(record);
            }
        }
        tracing::debug!(products = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl ProductLookup for StaticCatalog {
    fn lookup_product(&self, code: &str) -> Result<LookupOutcome, LookupError> {
        Ok(match self.products.get(code) {
            Some(record) => LookupOutcome::Found(record.clone()),
            None => LookupOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAFERS: &str = r#"{
        "status": 1,
        "product": {
            "product_name": "Prince Polo",
            "brands": "Olza",
            "image_url": "",
            "ingredients_text": "sugar, wheat flour, cocoa",
            "nutriments": {
                "energy_100g": 2201,
                "fat_100g": "28.5",
                "carbohydrates_100g": 60.1,
                "proteins_unit": "g"
            }
        }
    }"#;

    #[test]
    fn test_catalog_document_mapping() {
        let outcome = CatalogResponse::from_json(WAFERS)
            .unwrap()
            .into_outcome("5900059000103");
        let record = outcome.record().unwrap();

        assert_eq!(record.barcode, "5900059000103");
        assert_eq!(record.name.as_deref(), Some("Prince Polo"));
        assert_eq!(record.brand.as_deref(), Some("Olza"));
        assert_eq!(record.image_url, None);
        assert_eq!(record.categories, None);
        assert_eq!(record.nutrition.energy_kj, Some(2201.0));
        assert_eq!(record.nutrition.fat, Some(28.5));
        assert_eq!(record.nutrition.proteins, None);
    }

    #[test]
    fn test_missing_product_status() {
        let outcome = CatalogResponse::from_json(r#"{"status": 0, "status_verbose": "product not found"}"#)
            .unwrap()
            .into_outcome("0000000000000");
        assert_eq!(outcome, LookupOutcome::NotFound);
    }

    #[test]
    fn test_static_catalog_from_json() {
        let json = format!(
            r#"{{"5900059000103": {WAFERS}, "12345678": {{"status": 0}}}}"#
        );
        let catalog = StaticCatalog::from_json(&json).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(matches!(
            catalog.lookup_product("5900059000103").unwrap(),
            LookupOutcome::Found(_)
        ));
        assert_eq!(
            catalog.lookup_product("12345678").unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn test_malformed_catalog() {
        assert!(matches!(
            StaticCatalog::from_json("[1, 2"),
            Err(LookupError::Parse(_))
        ));
    }
}
