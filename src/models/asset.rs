//! Asset model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A registered piece of equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Primary identifier, unique, used in all cross-references
    pub asset_id: String,
    /// Secondary human-facing code, unique
    pub id_code: String,
    pub name: String,
    pub brand: String,
    /// Model name; meaningful within the models registered under `brand`
    pub model: String,
    pub vendor: String,
    /// Serial number, unique
    pub serial: String,
    pub purchase_date: Option<NaiveDate>,
    pub price: Option<Decimal>,
}

/// Asset registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAsset {
    #[validate(length(min = 1, message = "Asset ID is required"))]
    pub asset_id: String,
    #[validate(length(min = 1, message = "ID code is required"))]
    pub id_code: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub vendor: String,
    #[validate(length(min = 1, message = "Serial number is required"))]
    pub serial: String,
    pub purchase_date: Option<NaiveDate>,
    /// Accepted as free text from the form; normalized to a decimal or
    /// dropped when it does not parse.
    pub price: Option<String>,
}

/// Asset update request; `None` fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetPatch {
    pub asset_id: Option<String>,
    pub id_code: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub serial: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub price: Option<String>,
}

impl CreateAsset {
    /// Price as entered on the form, normalized to a decimal or `None`.
    pub fn normalized_price(&self) -> Option<Decimal> {
        normalize_price(self.price.as_deref())
    }
}

/// Parse a free-text price into a decimal; anything unparseable becomes
/// `None` rather than an error.
pub fn normalize_price(raw: Option<&str>) -> Option<Decimal> {
    raw.and_then(|s| s.trim().parse::<Decimal>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_price() {
        assert_eq!(
            normalize_price(Some("1299.50")),
            Some(Decimal::new(129950, 2))
        );
        assert_eq!(normalize_price(Some(" 42 ")), Some(Decimal::new(42, 0)));
        assert_eq!(normalize_price(Some("n/a")), None);
        assert_eq!(normalize_price(Some("")), None);
        assert_eq!(normalize_price(None), None);
    }
}
