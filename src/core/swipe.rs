//! Swipe recording and reciprocity detection.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::core::events::Publisher;
use crate::models::{Match, Swipe, SwipePayload, SwipeResponse};
use crate::storage::{MatchStore, StoreError, SwipeStore, UserStore};

/// Topic published when a new match is established
pub const MATCH_CREATED_TOPIC: &str = "match-created";

#[derive(Debug, Error)]
pub enum SwipeError {
    #[error("prospect profile not found")]
    ProspectNotFound,

    #[error("swipe already recorded for this prospect")]
    DuplicateSwipe,

    #[error("failed to create match")]
    MatchCreationFailed(#[source] StoreError),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Records swipes, detects mutual interest and creates matches.
///
/// Collaborators are injected at wiring time; on a successful match a
/// `match-created` event is published for downstream consumers.
pub struct SwipeMatcher {
    users: Arc<dyn UserStore>,
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchStore>,
    events: Publisher,
}

impl SwipeMatcher {
    pub fn new(
        users: Arc<dyn UserStore>,
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        events: Publisher,
    ) -> Self {
        Self {
            users,
            swipes,
            matches,
            events,
        }
    }

    /// Swipe a user through a prospect profile for a possible match.
    pub async fn swipe(
        &self,
        acting_user_id: &str,
        payload: &SwipePayload,
    ) -> Result<SwipeResponse, SwipeError> {
        match self.users.get_by_id(&payload.prospect_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(SwipeError::ProspectNotFound),
            Err(e) => return Err(e.into()),
        }

        // Reciprocal direction: a swipe recorded by the prospect against us.
        let reciprocal = self
            .swipes
            .get_by_actor_and_target(&payload.prospect_id, acting_user_id)
            .await?;

        let swipe = Swipe::new(acting_user_id, &payload.prospect_id, payload.interested);
        let swipe = match self.swipes.create(swipe).await {
            Ok(s) => s,
            Err(StoreError::Duplicate) => return Err(SwipeError::DuplicateSwipe),
            Err(e) => return Err(e.into()),
        };

        let mutual = matches!(&reciprocal, Some(r) if r.interested) && swipe.interested;
        if !mutual {
            return Ok(SwipeResponse {
                matched: false,
                match_id: None,
            });
        }

        let matched = match self
            .matches
            .create(Match::new(acting_user_id, &payload.prospect_id))
            .await
        {
            Ok(m) => {
                self.publish_match_created(&m).await;
                m
            }
            // The concurrent reciprocal swipe won the insert; surface the
            // existing match so both sides report the same id.
            Err(StoreError::Duplicate) => self
                .matches
                .get_by_profile_pair(acting_user_id, &payload.prospect_id)
                .await?
                .ok_or(SwipeError::MatchCreationFailed(StoreError::NotFound))?,
            Err(e) => return Err(SwipeError::MatchCreationFailed(e)),
        };

        Ok(SwipeResponse {
            matched: true,
            match_id: Some(matched.id),
        })
    }

    async fn publish_match_created(&self, matched: &Match) {
        info!(
            match_id = %matched.id,
            "match established between {} and {}",
            matched.profiles[0],
            matched.profiles[1]
        );

        let payload = serde_json::json!({
            "matchId": matched.id,
            "profiles": matched.profiles,
        });
        if let Err(e) = self.events.publish(MATCH_CREATED_TOPIC, payload).await {
            warn!("failed to publish match-created event: {}", e);
        }
    }
}
