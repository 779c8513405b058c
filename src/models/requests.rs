use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{
    DatingIntentions, DrinkingHabit, Ethnicity, Pet, Religion, SmokingHabit,
};

/// Request to swipe on a prospect profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipePayload {
    #[validate(length(min = 1, max = 255))]
    #[serde(alias = "user_id", rename = "prospectId")]
    pub prospect_id: String,
    pub interested: bool,
}

/// Transient discovery query.
///
/// Bounds are unsigned so negative values are rejected at decode time;
/// categorical fields are closed enums so out-of-set values never parse.
/// Cross-field bounds (max >= min) are checked before the pipeline is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserFilter {
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub min_height_cm: Option<u32>,
    pub max_height_cm: Option<u32>,
    pub max_distance_km: Option<u32>,
    pub desired_ethnicity: Option<Ethnicity>,
    pub desired_pets: Option<Pet>,
    pub desired_drinking: Option<DrinkingHabit>,
    pub desired_smoking: Option<SmokingHabit>,
    pub desired_intentions: Option<DatingIntentions>,
    pub desired_religion: Option<Religion>,
}

impl UserFilter {
    /// Check cross-field bounds; returns the first violation found.
    pub fn check_bounds(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_age, self.max_age) {
            if max < min {
                return Err("maxAge must be greater than or equal to minAge".to_string());
            }
        }
        if let (Some(min), Some(max)) = (self.min_height_cm, self.max_height_cm) {
            if max < min {
                return Err("maxHeightCm must be greater than or equal to minHeightCm".to_string());
            }
        }
        Ok(())
    }
}
