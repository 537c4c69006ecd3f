//! Core domain types and seam traits for the product review catalog.
//!
//! This crate defines the domain model ([`Product`], [`Review`]), the input
//! types with their validation rules, the [`CatalogError`] error enum shared
//! across the workspace, the [`ReviewEvent`] wire type, and the traits that
//! infrastructure crates implement:
//!
//! - [`ProductRepository`] / [`ReviewRepository`]: durable storage
//! - [`ProductCache`]: TTL'd read cache with tracked invalidation
//! - [`EventPublisher`]: durable event publication
//!
//! Services depend only on these traits; the Postgres, Redis and NATS
//! implementations live in their own crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod cache;
pub mod error;
pub mod event;
pub mod product;
pub mod repository;
pub mod review;

pub use bus::EventPublisher;
pub use cache::ProductCache;
pub use error::CatalogError;
pub use event::{EventKind, ReviewEvent, REVIEW_EVENTS_SUBJECT};
pub use product::{NewProduct, Product, ProductUpdate};
pub use repository::{ProductRepository, ReviewRepository};
pub use review::{NewReview, Review, ReviewUpdate};
