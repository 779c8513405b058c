// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    generate_id, BoundingBox, Candidate, DatingIntentions, DrinkingHabit, Ethnicity, Gender,
    GeoPoint, HabitPreference, Match, Pet, Preferences, RangePreference, Religion, SmokingHabit,
    Swipe, User,
};
pub use requests::{SwipePayload, UserFilter};
pub use responses::{
    DiscoverResponse, ErrorResponse, HealthResponse, MatchListResponse, SwipeResponse,
};
