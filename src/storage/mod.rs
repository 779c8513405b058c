// Storage contracts and backends
pub mod cache;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::discovery::DiscoveryPipeline;
use crate::models::{Candidate, Match, Swipe, User};

pub use cache::CachedUsers;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors surfaced by any storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("duplicate found")]
    Duplicate,

    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Backend(err.into())
    }
}

/// User profile storage
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> Result<User, StoreError>;

    /// Bulk insert, used when seeding
    async fn insert_users(&self, users: Vec<User>) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Execute a discovery pipeline, stage order preserved, nearest first.
    async fn discover(&self, pipeline: &DiscoveryPipeline) -> Result<Vec<Candidate>, StoreError>;
}

/// Swipe storage.
///
/// `create` must reject a second swipe for the same ordered
/// (user_id, prospect_id) pair with [`StoreError::Duplicate`].
#[async_trait]
pub trait SwipeStore: Send + Sync {
    async fn create(&self, swipe: Swipe) -> Result<Swipe, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Swipe, StoreError>;

    /// Swipe recorded by `actor_id` against `target_id`, if any
    async fn get_by_actor_and_target(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Swipe>, StoreError>;

    async fn update(&self, swipe: Swipe) -> Result<Swipe, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Match storage.
///
/// `create` must be an atomic insert-if-absent keyed on the unordered
/// profile pair: under concurrent reciprocal swipes exactly one insert wins
/// and the loser observes [`StoreError::Duplicate`].
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn create(&self, m: Match) -> Result<Match, StoreError>;

    /// Lookup by unordered profile pair
    async fn get_by_profile_pair(
        &self,
        profile_a: &str,
        profile_b: &str,
    ) -> Result<Option<Match>, StoreError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError>;
}
