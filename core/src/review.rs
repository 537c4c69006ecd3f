//! Review entity and its input types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;

/// Maximum length of the reviewer name fields.
pub const NAME_MAX: usize = 100;
/// Maximum length of the review body.
pub const TEXT_MAX: usize = 5000;
/// Inclusive rating bounds.
pub const RATING_MIN: i16 = 1;
/// Inclusive rating bounds.
pub const RATING_MAX: i16 = 5;

/// A review row. Soft-deleted like products; only live reviews contribute to
/// the owning product's average rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Server-generated identifier.
    pub id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Reviewer first name, 1–100 characters.
    pub first_name: String,
    /// Reviewer last name, 1–100 characters.
    pub last_name: String,
    /// Free-text body, 1–5000 characters.
    pub review_text: String,
    /// Star rating in 1..=5.
    pub rating: i16,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp; the row is live while this is `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Review {
    /// A review is live while it has not been soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for creating a review. The owning product must be live at creation
/// time; the write service enforces this through the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    /// Owning product.
    pub product_id: Uuid,
    /// Reviewer first name.
    pub first_name: String,
    /// Reviewer last name.
    pub last_name: String,
    /// Free-text body.
    pub review_text: String,
    /// Star rating in 1..=5.
    pub rating: i16,
}

impl NewReview {
    /// Check the review invariants, returning `InvalidInput` on the first
    /// violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.first_name, &self.last_name, &self.review_text, self.rating)
    }
}

/// Input for updating a review. The product id is not part of the request;
/// the write service looks it up from the stored row.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUpdate {
    /// Reviewer first name.
    pub first_name: String,
    /// Reviewer last name.
    pub last_name: String,
    /// Free-text body.
    pub review_text: String,
    /// Star rating in 1..=5.
    pub rating: i16,
}

impl ReviewUpdate {
    /// Check the review invariants, returning `InvalidInput` on the first
    /// violation.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.first_name, &self.last_name, &self.review_text, self.rating)
    }
}

fn validate_fields(
    first_name: &str,
    last_name: &str,
    review_text: &str,
    rating: i16,
) -> Result<(), CatalogError> {
    if first_name.is_empty() || first_name.chars().count() > NAME_MAX {
        return Err(CatalogError::InvalidInput(format!(
            "first_name must be 1-{NAME_MAX} characters"
        )));
    }
    if last_name.is_empty() || last_name.chars().count() > NAME_MAX {
        return Err(CatalogError::InvalidInput(format!(
            "last_name must be 1-{NAME_MAX} characters"
        )));
    }
    if review_text.is_empty() || review_text.chars().count() > TEXT_MAX {
        return Err(CatalogError::InvalidInput(format!(
            "review_text must be 1-{TEXT_MAX} characters"
        )));
    }
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        return Err(CatalogError::InvalidInput(format!(
            "rating must be between {RATING_MIN} and {RATING_MAX}"
        )));
    }
    Ok(())
}
