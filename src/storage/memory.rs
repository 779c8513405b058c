//! In-memory storage backend.
//!
//! Backs tests and local runs. Tables are plain vectors behind async
//! RwLocks; uniqueness checks run under the write lock, which makes the
//! insert-if-absent contracts atomic. Insertion order is the backend's
//! natural order, so equal-distance candidates keep a stable tie-break.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::core::discovery::{age_in_years, DiscoveryPipeline, PipelineStage};
use crate::core::distance::{bounding_box, haversine_distance_m, is_within_bounding_box};
use crate::models::{Candidate, Match, Swipe, User};
use crate::storage::{MatchStore, StoreError, SwipeStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    swipes: RwLock<Vec<Swipe>>,
    matches: RwLock<Vec<Match>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.id == user.id || u.email == user.email)
        {
            return Err(StoreError::Duplicate);
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn insert_users(&self, new_users: Vec<User>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        for user in new_users {
            if users
                .iter()
                .any(|u| u.id == user.id || u.email == user.email)
            {
                return Err(StoreError::Duplicate);
            }
            users.push(user);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn discover(&self, pipeline: &DiscoveryPipeline) -> Result<Vec<Candidate>, StoreError> {
        let users = self.users.read().await.clone();
        let swipes = self.swipes.read().await.clone();
        Ok(run_pipeline(users, &swipes, pipeline))
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn create(&self, swipe: Swipe) -> Result<Swipe, StoreError> {
        let mut swipes = self.swipes.write().await;
        if swipes
            .iter()
            .any(|s| s.user_id == swipe.user_id && s.prospect_id == swipe.prospect_id)
        {
            return Err(StoreError::Duplicate);
        }
        swipes.push(swipe.clone());
        Ok(swipe)
    }

    async fn get_by_id(&self, id: &str) -> Result<Swipe, StoreError> {
        self.swipes
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_actor_and_target(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Swipe>, StoreError> {
        Ok(self
            .swipes
            .read()
            .await
            .iter()
            .find(|s| s.user_id == actor_id && s.prospect_id == target_id)
            .cloned())
    }

    async fn update(&self, swipe: Swipe) -> Result<Swipe, StoreError> {
        let mut swipes = self.swipes.write().await;
        let Some(existing) = swipes.iter_mut().find(|s| s.id == swipe.id) else {
            return Err(StoreError::NotFound);
        };
        *existing = swipe.clone();
        Ok(swipe)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut swipes = self.swipes.write().await;
        let before = swipes.len();
        swipes.retain(|s| s.id != id);
        if swipes.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create(&self, m: Match) -> Result<Match, StoreError> {
        let key = Match::pair_key(&m.profiles[0], &m.profiles[1]);
        let mut matches = self.matches.write().await;
        if matches
            .iter()
            .any(|existing| Match::pair_key(&existing.profiles[0], &existing.profiles[1]) == key)
        {
            return Err(StoreError::Duplicate);
        }
        matches.push(m.clone());
        Ok(m)
    }

    async fn get_by_profile_pair(
        &self,
        profile_a: &str,
        profile_b: &str,
    ) -> Result<Option<Match>, StoreError> {
        let key = Match::pair_key(profile_a, profile_b);
        Ok(self
            .matches
            .read()
            .await
            .iter()
            .find(|m| Match::pair_key(&m.profiles[0], &m.profiles[1]) == key)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        Ok(self
            .matches
            .read()
            .await
            .iter()
            .filter(|m| m.contains(user_id))
            .cloned()
            .collect())
    }
}

/// Row flowing through the interpreted pipeline before projection
struct Row {
    user: User,
    distance_m: f64,
    viewer_swipes: usize,
}

/// Interpret the pipeline stage by stage over a table snapshot.
fn run_pipeline(users: Vec<User>, swipes: &[Swipe], pipeline: &DiscoveryPipeline) -> Vec<Candidate> {
    let now = Utc::now();
    let mut rows: Vec<Row> = users
        .into_iter()
        .map(|user| Row {
            user,
            distance_m: 0.0,
            viewer_swipes: 0,
        })
        .collect();
    let mut projected: Option<Vec<Candidate>> = None;

    for stage in pipeline.stages() {
        match stage {
            PipelineStage::Proximity {
                center,
                max_distance_m,
            } => {
                // Cheap bounding-box pass first, exact haversine after.
                if let Some(max_m) = max_distance_m {
                    let bbox = bounding_box(center, max_m / 1000.0);
                    rows.retain(|row| is_within_bounding_box(&row.user.location, &bbox));
                }
                for row in &mut rows {
                    row.distance_m = haversine_distance_m(center, &row.user.location);
                }
                if let Some(max_m) = max_distance_m {
                    rows.retain(|row| row.distance_m <= *max_m);
                }
                rows.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
            }
            PipelineStage::SwipeLookup { viewer_id } => {
                for row in &mut rows {
                    row.viewer_swipes = swipes
                        .iter()
                        .filter(|s| s.user_id == *viewer_id && s.prospect_id == row.user.id)
                        .count();
                }
            }
            PipelineStage::ExcludeSwiped { viewer_id } => {
                rows.retain(|row| row.viewer_swipes == 0 && row.user.id != *viewer_id);
            }
            PipelineStage::Project => {
                projected = Some(rows.drain(..).map(|row| project(row, now)).collect());
            }
            PipelineStage::AgeRange { min_age, max_age } => {
                if let Some(candidates) = projected.as_mut() {
                    candidates.retain(|c| c.age >= *min_age && c.age <= *max_age);
                } else {
                    rows.retain(|row| {
                        let age = age_in_years(row.user.date_of_birth, now);
                        age >= *min_age && age <= *max_age
                    });
                }
            }
        }
    }

    projected.unwrap_or_else(|| {
        // No projection stage requested; project with defaults so callers
        // still get the annotated shape.
        rows.into_iter().map(|row| project(row, now)).collect()
    })
}

fn project(row: Row, now: chrono::DateTime<Utc>) -> Candidate {
    let age = age_in_years(row.user.date_of_birth, now);
    let user = row.user;
    Candidate {
        id: user.id,
        name: user.name,
        gender: user.gender,
        age,
        location: user.location,
        height_cm: user.height_cm,
        ethnicity: user.ethnicity,
        pets: user.pets,
        religion: user.religion,
        drinking: user.drinking,
        smoking: user.smoking,
        dating_intentions: user.dating_intentions,
        attractiveness: user.attractiveness,
        bio: user.bio,
        distance_km: row.distance_m / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserFilter;

    /// Date of birth such that the computed age is `years` with roughly half
    /// a year of margin on either side of the boundary.
    fn dob_years_ago(years: u32) -> chrono::NaiveDate {
        Utc::now().date_naive() - chrono::Duration::days(i64::from(years) * 365 + 180)
    }

    fn user(id: &str, email: &str, lat: f64, lon: f64, age: u32) -> User {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("User {id}"),
            "email": email,
            "dateOfBirth": dob_years_ago(age).to_string(),
            "location": {"latitude": lat, "longitude": lon},
            "heightCm": 170.0,
            "gender": "female",
            "ethnicity": "black",
            "pets": "none",
            "religion": "muslim",
            "drinking": "no",
            "smoking": "no",
            "datingIntentions": "shorter time",
            "attractiveness": 6
        }))
        .unwrap()
    }

    fn viewer() -> User {
        user("viewer", "viewer@example.com", 51.60, 0.00, 34)
    }

    #[tokio::test]
    async fn test_email_lookup_and_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let user_store: &dyn UserStore = &store;

        user_store
            .create(user("u1", "shared@example.com", 51.60, 0.00, 30))
            .await
            .unwrap();
        let found = user_store.get_by_email("shared@example.com").await.unwrap();
        assert_eq!(found.id, "u1");

        let err = user_store
            .create(user("u2", "shared@example.com", 51.61, 0.01, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(user_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_swipe_pair_rejected() {
        let store = MemoryStore::new();
        let swipe_store: &dyn SwipeStore = &store;

        swipe_store
            .create(Swipe::new("a", "b", true))
            .await
            .unwrap();
        let err = swipe_store
            .create(Swipe::new("a", "b", false))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));

        // Reverse direction is a different ordered pair
        swipe_store
            .create(Swipe::new("b", "a", true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_match_pair_unique_in_either_order() {
        let store = MemoryStore::new();
        let match_store: &dyn MatchStore = &store;

        match_store.create(Match::new("a", "b")).await.unwrap();
        let err = match_store.create(Match::new("b", "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn test_swipe_update_and_delete_roundtrip() {
        let store = MemoryStore::new();
        let swipe_store: &dyn SwipeStore = &store;

        let created = swipe_store
            .create(Swipe::new("a", "b", false))
            .await
            .unwrap();

        let mut updated = created.clone();
        updated.interested = true;
        swipe_store.update(updated).await.unwrap();
        let fetched = swipe_store.get_by_id(&created.id).await.unwrap();
        assert!(fetched.interested);

        swipe_store.delete(&created.id).await.unwrap();
        assert!(matches!(
            swipe_store.get_by_id(&created.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_discover_orders_nearest_first() {
        let store = MemoryStore::new();
        let user_store: &dyn UserStore = &store;
        let v = viewer();
        user_store.create(v.clone()).await.unwrap();
        user_store
            .create(user("far", "far@example.com", 51.68, 0.05, 28))
            .await
            .unwrap();
        user_store
            .create(user("near", "near@example.com", 51.601, 0.001, 28))
            .await
            .unwrap();

        let pipeline = DiscoveryPipeline::near(&v, &UserFilter::default())
            .lookup_swipes(&v.id)
            .exclude_swiped(&v.id)
            .project()
            .age_filter(None, None);
        let candidates = user_store.discover(&pipeline).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(candidates[0].distance_km < candidates[1].distance_km);
    }

    #[tokio::test]
    async fn test_discover_excludes_swiped_and_self() {
        let store = MemoryStore::new();
        let user_store: &dyn UserStore = &store;
        let swipe_store: &dyn SwipeStore = &store;
        let v = viewer();
        user_store.create(v.clone()).await.unwrap();
        user_store
            .create(user("seen", "seen@example.com", 51.61, 0.01, 28))
            .await
            .unwrap();
        user_store
            .create(user("fresh", "fresh@example.com", 51.62, 0.02, 28))
            .await
            .unwrap();

        swipe_store
            .create(Swipe::new(&v.id, "seen", false))
            .await
            .unwrap();

        let pipeline = DiscoveryPipeline::near(&v, &UserFilter::default())
            .lookup_swipes(&v.id)
            .exclude_swiped(&v.id)
            .project()
            .age_filter(None, None);
        let candidates = user_store.discover(&pipeline).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_discover_distance_bound() {
        let store = MemoryStore::new();
        let user_store: &dyn UserStore = &store;
        let v = viewer();
        user_store.create(v.clone()).await.unwrap();
        user_store
            .create(user("close", "close@example.com", 51.605, 0.005, 28))
            .await
            .unwrap();
        // Roughly 90km north
        user_store
            .create(user("distant", "distant@example.com", 52.41, 0.00, 28))
            .await
            .unwrap();

        let filter = UserFilter {
            max_distance_km: Some(10),
            ..Default::default()
        };
        let pipeline = DiscoveryPipeline::near(&v, &filter)
            .lookup_swipes(&v.id)
            .exclude_swiped(&v.id)
            .project()
            .age_filter(None, None);
        let candidates = user_store.discover(&pipeline).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["close"]);
    }

    #[tokio::test]
    async fn test_discover_age_window() {
        let store = MemoryStore::new();
        let user_store: &dyn UserStore = &store;
        let v = viewer();
        user_store.create(v.clone()).await.unwrap();
        for (id, age) in [("age20", 20), ("age30", 30), ("age40", 40)] {
            user_store
                .create(user(id, &format!("{id}@example.com"), 51.61, 0.01, age))
                .await
                .unwrap();
        }

        let filter = UserFilter {
            min_age: Some(25),
            max_age: Some(35),
            ..Default::default()
        };
        let pipeline = DiscoveryPipeline::near(&v, &filter)
            .lookup_swipes(&v.id)
            .exclude_swiped(&v.id)
            .project()
            .age_filter(filter.min_age, filter.max_age);
        let candidates = user_store.discover(&pipeline).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["age30"]);
    }
}
