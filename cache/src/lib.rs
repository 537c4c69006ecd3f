//! Redis cache for the product review catalog.
//!
//! Implements [`ProductCache`] with two key families per product plus a
//! tracking set:
//!
//! - `product:{id}:rating`: the cached average rating (rating TTL)
//! - `product:{id}:reviews:limit:{l}:offset:{o}`: one cached page (list TTL)
//! - `product:{id}:cache_keys`: set of all live page keys for the product
//!
//! Page writes go through one atomic pipeline (`SET` + `SADD` + `EXPIRE`) so
//! the tracking set stays in step with the pages it names. Invalidation reads
//! the set and unlinks every member plus the set itself; pagination creates an
//! unbounded keyspace, so there is deliberately no wildcard scan.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use rust_decimal::Decimal;
use uuid::Uuid;

use catalog_core::{CatalogError, ProductCache, Review};

/// [`ProductCache`] implementation on a Redis connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn_manager: ConnectionManager,
    rating_ttl: Duration,
    list_ttl: Duration,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Cache`] when the URL is invalid or the server
    /// is unreachable.
    pub async fn connect(
        redis_url: &str,
        rating_ttl: Duration,
        list_ttl: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::open(redis_url).map_err(cache_err)?;
        let mut conn_manager = ConnectionManager::new(client).await.map_err(cache_err)?;

        let _: () = redis::cmd("PING")
            .query_async(&mut conn_manager)
            .await
            .map_err(cache_err)?;

        Ok(Self {
            conn_manager,
            rating_ttl,
            list_ttl,
        })
    }

    /// Connect to Redis, retrying while the server comes up.
    ///
    /// # Errors
    ///
    /// Returns the last connection error once every attempt is exhausted.
    pub async fn connect_with_retry(
        redis_url: &str,
        rating_ttl: Duration,
        list_ttl: Duration,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<Self, CatalogError> {
        let mut last_err = CatalogError::Cache("no connection attempt made".to_string());

        for attempt in 1..=max_attempts {
            match Self::connect(redis_url, rating_ttl, list_ttl).await {
                Ok(cache) => return Ok(cache),
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "Redis not ready, retrying"
                    );
                    last_err = err;
                    if attempt < max_attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    fn rating_key(product_id: Uuid) -> String {
        format!("product:{product_id}:rating")
    }

    fn page_key(product_id: Uuid, limit: i64, offset: i64) -> String {
        format!("product:{product_id}:reviews:limit:{limit}:offset:{offset}")
    }

    fn tracking_key(product_id: Uuid) -> String {
        format!("product:{product_id}:cache_keys")
    }
}

#[async_trait]
impl ProductCache for RedisCache {
    async fn rating(&self, product_id: Uuid) -> Result<Option<Decimal>, CatalogError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn
            .get(Self::rating_key(product_id))
            .await
            .map_err(cache_err)?;

        match value {
            Some(raw) => {
                let rating = raw
                    .parse::<Decimal>()
                    .map_err(|e| CatalogError::Cache(format!("corrupt rating entry: {e}")))?;
                Ok(Some(rating))
            }
            None => Ok(None),
        }
    }

    async fn set_rating(&self, product_id: Uuid, rating: Decimal) -> Result<(), CatalogError> {
        let mut conn = self.conn_manager.clone();
        let () = conn
            .set_ex(
                Self::rating_key(product_id),
                rating.to_string(),
                self.rating_ttl.as_secs(),
            )
            .await
            .map_err(cache_err)?;
        Ok(())
    }

    async fn invalidate_rating(&self, product_id: Uuid) -> Result<(), CatalogError> {
        let mut conn = self.conn_manager.clone();
        let _deleted: i64 = conn
            .del(Self::rating_key(product_id))
            .await
            .map_err(cache_err)?;
        Ok(())
    }

    async fn reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Option<Vec<Review>>, CatalogError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn
            .get(Self::page_key(product_id, limit, offset))
            .await
            .map_err(cache_err)?;

        match value {
            Some(raw) => {
                let reviews = serde_json::from_str(&raw)
                    .map_err(|e| CatalogError::Cache(format!("corrupt page entry: {e}")))?;
                Ok(Some(reviews))
            }
            None => Ok(None),
        }
    }

    async fn set_reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
        reviews: &[Review],
    ) -> Result<(), CatalogError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::page_key(product_id, limit, offset);
        let tracking_key = Self::tracking_key(product_id);
        let payload = serde_json::to_string(reviews)
            .map_err(|e| CatalogError::Cache(format!("failed to encode page: {e}")))?;

        // One pipeline keeps the page, its tracking entry and the set's TTL
        // in a single round trip.
        let ttl_secs = self.list_ttl.as_secs();
        let () = redis::pipe()
            .atomic()
            .set_ex(&key, payload, ttl_secs)
            .sadd(&tracking_key, &key)
            .ignore()
            .expire(&tracking_key, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(cache_err)?;

        Ok(())
    }

    async fn invalidate_reviews(&self, product_id: Uuid) -> Result<(), CatalogError> {
        let mut conn = self.conn_manager.clone();
        let tracking_key = Self::tracking_key(product_id);

        let mut keys: Vec<String> = conn.smembers(&tracking_key).await.map_err(cache_err)?;
        if keys.is_empty() {
            return Ok(());
        }
        keys.push(tracking_key);

        let _unlinked: i64 = conn.unlink(keys).await.map_err(cache_err)?;
        Ok(())
    }
}

fn cache_err(err: redis::RedisError) -> CatalogError {
    CatalogError::Cache(err.to_string())
}
