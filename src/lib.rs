//! Ember Match - swipe matching and discovery service for the Ember dating app
//!
//! This library provides the matching core used by the Ember dating app:
//! swipe recording with reciprocity detection, a declarative discovery
//! pipeline, the profile scoring formulas and the in-process event bus that
//! decouples match creation from downstream consumers.

pub mod config;
pub mod core;
pub mod models;
pub mod notify;
pub mod routes;
pub mod seed;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{
    perform_swipe, DiscoveryEngine, DiscoveryPipeline, EventBus, Publisher, SwipeMatcher,
    MATCH_CREATED_TOPIC,
};
pub use crate::models::{Candidate, Match, Preferences, Swipe, SwipePayload, User, UserFilter};
pub use crate::storage::{MatchStore, MemoryStore, StoreError, SwipeStore, UserStore};
