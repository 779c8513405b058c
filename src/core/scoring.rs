//! Pure scoring functions over already-fetched profile data.
//!
//! No I/O happens here; callers persist any returned rating themselves.

use crate::core::distance::haversine_distance_km;
use crate::models::{GeoPoint, Preferences, Religion, User};

/// Cost charged per swipe past the daily budget
const SWIPE_COST: f64 = 0.5;

const DRINKING_WEIGHT: f64 = 0.3;
const SMOKING_WEIGHT: f64 = 0.2;
const RELIGION_WEIGHT: f64 = 0.5;

/// Each component is scaled to [0, 2.5] before weighting
const COMPONENT_SCALE: f64 = 2.5;

const PROXIMITY_WEIGHT: f64 = 0.25;
const ATTRACTIVENESS_WEIGHT: f64 = 0.25;
const SWIPE_COST_WEIGHT: f64 = 0.25;
const COMPATIBILITY_WEIGHT: f64 = 0.25;

const SUCCESS_RATE_HIGH: f64 = 0.8;
const SUCCESS_RATE_LOW: f64 = 0.2;

/// Weighted attribute compatibility in [0, 1].
///
/// Drinking, smoking and religion each contribute their full weight when the
/// candidate matches the viewer's stated preference. A failed
/// dealbreaker-flagged attribute halves the normalized score, as does a
/// candidate of a named religion when the viewer's preference is "other".
pub fn compatibility_score(preferences: &Preferences, candidate: &User) -> f64 {
    let mut score = 0.0;
    let mut total_weight = 0.0;
    let mut deal_breaker_failed = false;

    if preferences.drinking.status == candidate.drinking {
        score += DRINKING_WEIGHT;
    } else if preferences.drinking.deal_breaker {
        deal_breaker_failed = true;
    }
    total_weight += DRINKING_WEIGHT;

    if preferences.smoking.status == candidate.smoking {
        score += SMOKING_WEIGHT;
    } else if preferences.smoking.deal_breaker {
        deal_breaker_failed = true;
    }
    total_weight += SMOKING_WEIGHT;

    if preferences.religion == candidate.religion {
        score += RELIGION_WEIGHT;
    } else if preferences.religion == Religion::Other && candidate.religion != Religion::Other {
        deal_breaker_failed = true;
    }
    total_weight += RELIGION_WEIGHT;

    let normalized = score / total_weight;

    if deal_breaker_failed {
        return normalized * 0.5;
    }
    normalized
}

/// Distance converted to a bounded score in (0, 1]
pub fn proximity_score(viewer: &GeoPoint, candidate: &GeoPoint) -> f64 {
    let distance = haversine_distance_km(viewer, candidate);
    1.0 / (1.0 + distance)
}

/// 0-10 attractiveness rating scaled to [0, 1]
pub fn attractiveness_score(candidate: &User) -> f64 {
    f64::from(candidate.attractiveness) / 10.0
}

/// Penalty proportional to how far the viewer is past their daily budget;
/// zero while under budget.
pub fn swipe_cost_score(viewer: &User) -> f64 {
    if viewer.swipe_count > viewer.daily_swipe_budget {
        return f64::from(viewer.swipe_count - viewer.daily_swipe_budget) * SWIPE_COST;
    }
    0.0
}

/// Composite swipe score in [0, 10].
///
/// Each component is normalized to [0, 2.5] and combined with equal weights.
pub fn swipe_score(viewer: &User, candidate: &User, compatibility: f64) -> f64 {
    let proximity = proximity_score(&viewer.location, &candidate.location) * COMPONENT_SCALE;
    let attractiveness = attractiveness_score(candidate) * COMPONENT_SCALE;
    let swipe_cost = (swipe_cost_score(viewer) / SWIPE_COST * COMPONENT_SCALE).min(COMPONENT_SCALE);
    let normalized_compatibility = compatibility * COMPONENT_SCALE;

    let total = proximity * PROXIMITY_WEIGHT
        + attractiveness * ATTRACTIVENESS_WEIGHT
        + swipe_cost * SWIPE_COST_WEIGHT
        + normalized_compatibility * COMPATIBILITY_WEIGHT;

    total.clamp(0.0, 10.0)
}

/// Adaptive rating update from a running success/failure tally.
///
/// Over-matching viewers (rate above 0.8) are dampened; under-matching
/// viewers (rate below 0.2) are boosted.
pub fn update_swipe_rating(current_rating: f64, successes: u32, failures: u32) -> f64 {
    let success_rate = f64::from(successes) / f64::from(failures).max(1.0);

    if success_rate > SUCCESS_RATE_HIGH {
        current_rating * 0.8
    } else if success_rate < SUCCESS_RATE_LOW {
        current_rating * 1.2
    } else {
        current_rating
    }
}

/// Result of scoring one viewed profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeOutcome {
    pub score: f64,
    pub updated_rating: f64,
}

/// Score a viewed profile and recompute the viewer's swipe rating.
///
/// The score is classified against `threshold` to bump the success/failure
/// tally before the rating update. Pure: callers persist the returned rating
/// if desired.
pub fn perform_swipe(
    viewer: &User,
    preferences: &Preferences,
    candidate: &User,
    mut successes: u32,
    mut failures: u32,
    threshold: f64,
) -> SwipeOutcome {
    let compatibility = compatibility_score(preferences, candidate);
    let score = swipe_score(viewer, candidate, compatibility);

    if score >= threshold {
        successes += 1;
    } else {
        failures += 1;
    }

    let updated_rating = update_swipe_rating(viewer.swiping_rate, successes, failures);

    SwipeOutcome {
        score,
        updated_rating,
    }
}
