//! Business services for the product review catalog.
//!
//! [`ReviewService`] owns the write-side contract that keeps the rating
//! pipeline sound: persist through the repository, invalidate the owning
//! product's cache best-effort, publish a durable event detached from the
//! request, and only then return. [`ProductService`] covers product CRUD with
//! optimistic concurrency and the cached-rating read-through.
//!
//! Both services hold their collaborators as trait objects from
//! `catalog-core`, so tests run against in-memory fakes and binaries wire in
//! Postgres, Redis and JetStream.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod product;
mod review;

#[cfg(test)]
pub(crate) mod mocks;

pub use product::ProductService;
pub use review::ReviewService;

/// Default page size when the caller asks for none or nonsense.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;
/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp caller-supplied pagination to sane bounds.
#[must_use]
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    let limit = if limit <= 0 || limit > MAX_PAGE_LIMIT {
        DEFAULT_PAGE_LIMIT
    } else {
        limit
    };
    (limit, offset.max(0))
}
