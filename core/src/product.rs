//! Product entity and its input types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;

/// Maximum length of a product name.
pub const NAME_MAX: usize = 255;

/// A product row. `average_rating` is maintained asynchronously by the
/// rating worker; `version` increases by one on every mutation, including the
/// worker's recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Server-generated identifier.
    pub id: Uuid,
    /// Display name, 1–255 characters.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Non-negative price with two fractional digits.
    pub price: Decimal,
    /// Mean rating of the live reviews, rounded to one fractional digit,
    /// 0 when the product has no live reviews.
    pub average_rating: Decimal,
    /// Monotonic version counter used for optimistic concurrency.
    pub version: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp; the row is live while this is `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// A product is live while it has not been soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Display name, 1–255 characters.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Non-negative price.
    pub price: Decimal,
}

impl NewProduct {
    /// Check the product invariants, returning `InvalidInput` on the first
    /// violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.name, self.price)
    }
}

/// Input for updating a product. `version` must match the version observed at
/// read time or the update is rejected with `Conflict`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    /// New display name.
    pub name: String,
    /// New description (absent clears it).
    pub description: Option<String>,
    /// New price.
    pub price: Decimal,
    /// Version observed by the caller at read time.
    pub version: i32,
}

impl ProductUpdate {
    /// Check the product invariants, returning `InvalidInput` on the first
    /// violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.name, self.price)
    }
}

fn validate_fields(name: &str, price: Decimal) -> Result<(), CatalogError> {
    if name.is_empty() || name.chars().count() > NAME_MAX {
        return Err(CatalogError::InvalidInput(format!(
            "name must be 1-{NAME_MAX} characters"
        )));
    }
    if price < Decimal::ZERO {
        return Err(CatalogError::InvalidInput(
            "price must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(name: &str, price: Decimal) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price,
        }
    }

    #[test]
    fn accepts_valid_product() {
        assert!(new_product("Laptop", Decimal::new(99999, 2)).validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(
            new_product("", Decimal::ONE).validate(),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_overlong_name() {
        let name = "x".repeat(NAME_MAX + 1);
        assert!(new_product(&name, Decimal::ONE).validate().is_err());
    }

    #[test]
    fn rejects_negative_price() {
        assert!(new_product("Laptop", Decimal::new(-1, 2)).validate().is_err());
    }

    #[test]
    fn zero_price_is_allowed() {
        assert!(new_product("Freebie", Decimal::ZERO).validate().is_ok());
    }
}
