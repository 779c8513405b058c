//! In-process profile cache layered over any [`UserStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::discovery::DiscoveryPipeline;
use crate::models::{Candidate, User};
use crate::storage::{StoreError, UserStore};

/// Caches `get_by_id` hits; everything else passes straight through.
///
/// Writes invalidate so a freshly created profile never shadows a stale
/// miss. Discovery is never cached: exclusion results change with every
/// swipe.
pub struct CachedUsers {
    inner: Arc<dyn UserStore>,
    cache: moka::future::Cache<String, User>,
}

impl CachedUsers {
    pub fn new(inner: Arc<dyn UserStore>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl UserStore for CachedUsers {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        let created = self.inner.create(user).await?;
        self.cache.invalidate(&created.id).await;
        Ok(created)
    }

    async fn insert_users(&self, users: Vec<User>) -> Result<(), StoreError> {
        for user in &users {
            self.cache.invalidate(&user.id).await;
        }
        self.inner.insert_users(users).await
    }

    async fn get_by_id(&self, id: &str) -> Result<User, StoreError> {
        if let Some(user) = self.cache.get(id).await {
            tracing::trace!("profile cache hit: {}", id);
            return Ok(user);
        }

        let user = self.inner.get_by_id(id).await?;
        self.cache.insert(id.to_string(), user.clone()).await;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.inner.get_by_email(email).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    async fn discover(&self, pipeline: &DiscoveryPipeline) -> Result<Vec<Candidate>, StoreError> {
        self.inner.discover(pipeline).await
    }
}
