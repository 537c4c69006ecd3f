//! In-memory fakes of the core seams for service tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use catalog_core::{
    CatalogError, EventPublisher, NewProduct, NewReview, Product, ProductCache,
    ProductRepository, ProductUpdate, Review, ReviewRepository, ReviewUpdate,
};

/// Review repository holding rows in a vec, with an injectable create error
/// and a counter for list calls.
#[derive(Default)]
pub struct FakeReviewRepository {
    rows: Mutex<Vec<Review>>,
    create_error: Mutex<Option<CatalogError>>,
    list_calls: Mutex<usize>,
}

impl FakeReviewRepository {
    pub fn insert(&self, review: Review) {
        self.rows.lock().unwrap().push(review);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_next_create(&self, err: CatalogError) {
        *self.create_error.lock().unwrap() = Some(err);
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl ReviewRepository for FakeReviewRepository {
    async fn create(&self, review: &NewReview) -> Result<Review, CatalogError> {
        if let Some(err) = self.create_error.lock().unwrap().take() {
            return Err(err);
        }
        let now = Utc::now();
        let stored = Review {
            id: Uuid::new_v4(),
            product_id: review.product_id,
            first_name: review.first_name.clone(),
            last_name: review.last_name.clone(),
            review_text: review.review_text.clone(),
            rating: review.rating,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Review, CatalogError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn list_for_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, CatalogError> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_for_product(&self, product_id: Uuid) -> Result<i64, CatalogError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.product_id == product_id)
            .count() as i64)
    }

    async fn update(&self, id: Uuid, update: &ReviewUpdate) -> Result<Review, CatalogError> {
        let mut rows = self.rows.lock().unwrap();
        let review = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(CatalogError::NotFound)?;
        review.first_name = update.first_name.clone();
        review.last_name = update.last_name.clone();
        review.review_text = update.review_text.clone();
        review.rating = update.rating;
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}

/// Product repository holding rows in a vec with a real version check.
#[derive(Default)]
pub struct FakeProductRepository {
    rows: Mutex<Vec<Product>>,
}

impl FakeProductRepository {
    pub fn set_rating(&self, id: Uuid, rating: Decimal) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(product) = rows.iter_mut().find(|p| p.id == id) {
            product.average_rating = rating;
        }
    }
}

#[async_trait]
impl ProductRepository for FakeProductRepository {
    async fn create(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        let now = Utc::now();
        let stored = Product {
            id: Uuid::new_v4(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            average_rating: Decimal::ZERO,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Product, CatalogError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, CatalogError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn update(&self, id: Uuid, update: &ProductUpdate) -> Result<Product, CatalogError> {
        let mut rows = self.rows.lock().unwrap();
        let product = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::Conflict)?;
        if product.version != update.version {
            return Err(CatalogError::Conflict);
        }
        product.name = update.name.clone();
        product.description = update.description.clone();
        product.price = update.price;
        product.version += 1;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_with_reviews(&self, id: Uuid) -> Result<(), CatalogError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}

/// Cache fake recording invalidations, with a switch simulating an outage.
#[derive(Default)]
pub struct FakeCache {
    ratings: Mutex<std::collections::HashMap<Uuid, Decimal>>,
    pages: Mutex<std::collections::HashMap<(Uuid, i64, i64), Vec<Review>>>,
    invalidated: Mutex<Vec<Uuid>>,
    unavailable: AtomicBool,
}

impl FakeCache {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn invalidated(&self) -> Vec<Uuid> {
        self.invalidated.lock().unwrap().clone()
    }

    pub fn seed_rating(&self, product_id: Uuid, rating: Decimal) {
        self.ratings.lock().unwrap().insert(product_id, rating);
    }

    pub fn rating_entry(&self, product_id: Uuid) -> Option<Decimal> {
        self.ratings.lock().unwrap().get(&product_id).copied()
    }

    pub fn seed_page(&self, product_id: Uuid, limit: i64, offset: i64, reviews: Vec<Review>) {
        self.pages
            .lock()
            .unwrap()
            .insert((product_id, limit, offset), reviews);
    }

    pub fn page(&self, product_id: Uuid, limit: i64, offset: i64) -> Option<Vec<Review>> {
        self.pages
            .lock()
            .unwrap()
            .get(&(product_id, limit, offset))
            .cloned()
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::Cache("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductCache for FakeCache {
    async fn rating(&self, product_id: Uuid) -> Result<Option<Decimal>, CatalogError> {
        self.check_available()?;
        Ok(self.ratings.lock().unwrap().get(&product_id).copied())
    }

    async fn set_rating(&self, product_id: Uuid, rating: Decimal) -> Result<(), CatalogError> {
        self.check_available()?;
        self.ratings.lock().unwrap().insert(product_id, rating);
        Ok(())
    }

    async fn invalidate_rating(&self, product_id: Uuid) -> Result<(), CatalogError> {
        self.check_available()?;
        self.invalidated.lock().unwrap().push(product_id);
        self.ratings.lock().unwrap().remove(&product_id);
        Ok(())
    }

    async fn reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Option<Vec<Review>>, CatalogError> {
        self.check_available()?;
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&(product_id, limit, offset))
            .cloned())
    }

    async fn set_reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
        reviews: &[Review],
    ) -> Result<(), CatalogError> {
        self.check_available()?;
        self.pages
            .lock()
            .unwrap()
            .insert((product_id, limit, offset), reviews.to_vec());
        Ok(())
    }

    async fn invalidate_reviews(&self, product_id: Uuid) -> Result<(), CatalogError> {
        self.check_available()?;
        self.pages
            .lock()
            .unwrap()
            .retain(|(id, _, _), _| *id != product_id);
        Ok(())
    }
}

/// Publisher handing every accepted payload to the test over a channel.
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<(String, Vec<u8>)>,
    failing: AtomicBool,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Vec<u8>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                failing: AtomicBool::new(false),
            },
            rx,
        )
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CatalogError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Bus("connection refused".to_string()));
        }
        self.tx
            .send((subject.to_string(), payload))
            .map_err(|_| CatalogError::Bus("test receiver dropped".to_string()))
    }
}
