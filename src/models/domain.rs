use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Generate a lowercase id for a new entity
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Geographic coordinate (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Geospatial bounding box used as a cheap pre-filter before exact distances
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "non-binary")]
    NonBinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non-binary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ethnicity {
    White,
    Black,
    Asian,
    Latino,
    Other,
}

impl Ethnicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ethnicity::White => "white",
            Ethnicity::Black => "black",
            Ethnicity::Asian => "asian",
            Ethnicity::Latino => "latino",
            Ethnicity::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pet {
    Dog,
    Cat,
    Bird,
    Reptile,
    #[serde(rename = "prefer not to say")]
    PreferNotToSay,
    None,
}

impl Pet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pet::Dog => "dog",
            Pet::Cat => "cat",
            Pet::Bird => "bird",
            Pet::Reptile => "reptile",
            Pet::PreferNotToSay => "prefer not to say",
            Pet::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Religion {
    Christian,
    Muslim,
    Hindu,
    Buddhist,
    Other,
}

impl Religion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Religion::Christian => "christian",
            Religion::Muslim => "muslim",
            Religion::Hindu => "hindu",
            Religion::Buddhist => "buddhist",
            Religion::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrinkingHabit {
    Yes,
    Sometimes,
    No,
    None,
}

impl DrinkingHabit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrinkingHabit::Yes => "yes",
            DrinkingHabit::Sometimes => "sometimes",
            DrinkingHabit::No => "no",
            DrinkingHabit::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmokingHabit {
    Yes,
    Sometimes,
    No,
    None,
}

impl SmokingHabit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingHabit::Yes => "yes",
            SmokingHabit::Sometimes => "sometimes",
            SmokingHabit::No => "no",
            SmokingHabit::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatingIntentions {
    #[serde(rename = "life partner")]
    LifePartner,
    #[serde(rename = "shorter time")]
    ShorterTime,
    None,
    #[serde(rename = "figuring out")]
    FiguringOut,
    Other,
}

impl DatingIntentions {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatingIntentions::LifePartner => "life partner",
            DatingIntentions::ShorterTime => "shorter time",
            DatingIntentions::None => "none",
            DatingIntentions::FiguringOut => "figuring out",
            DatingIntentions::Other => "other",
        }
    }
}

/// User profile with demographic, lifestyle and engagement data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub location: GeoPoint,
    pub height_cm: f64,
    pub gender: Gender,
    pub ethnicity: Ethnicity,
    pub pets: Pet,
    pub religion: Religion,
    pub drinking: DrinkingHabit,
    pub smoking: SmokingHabit,
    pub dating_intentions: DatingIntentions,
    /// 0-10 rating consumed by the scoring formula
    pub attractiveness: u8,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub swipe_count: u32,
    #[serde(default)]
    pub daily_swipe_budget: u32,
    #[serde(default = "default_swiping_rate")]
    pub swiping_rate: f64,
}

fn default_swiping_rate() -> f64 {
    1.0
}

/// Directional interest signal from one user toward another.
///
/// At most one swipe may exist per ordered (user_id, prospect_id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub id: String,
    pub user_id: String,
    pub prospect_id: String,
    pub interested: bool,
    pub swipe_time: DateTime<Utc>,
}

impl Swipe {
    pub fn new(user_id: &str, prospect_id: &str, interested: bool) -> Self {
        Self {
            id: generate_id(),
            user_id: user_id.to_string(),
            prospect_id: prospect_id.to_string(),
            interested,
            swipe_time: Utc::now(),
        }
    }
}

/// Mutual-interest relationship between exactly two users.
///
/// The pair is unordered: at most one match exists per profile pair,
/// whichever direction completed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub profiles: [String; 2],
    pub matched: bool,
}

impl Match {
    pub fn new(profile_a: &str, profile_b: &str) -> Self {
        Self {
            id: generate_id(),
            profiles: [profile_a.to_string(), profile_b.to_string()],
            matched: true,
        }
    }

    /// Normalized (sorted) key for the unordered profile pair
    pub fn pair_key(profile_a: &str, profile_b: &str) -> (String, String) {
        if profile_a <= profile_b {
            (profile_a.to_string(), profile_b.to_string())
        } else {
            (profile_b.to_string(), profile_a.to_string())
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.profiles[0] == user_id || self.profiles[1] == user_id
    }
}

/// Bounded preference with a dealbreaker flag
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangePreference {
    pub min: u32,
    pub max: u32,
    #[serde(default)]
    pub deal_breaker: bool,
}

/// Categorical preference with a dealbreaker flag
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HabitPreference<T> {
    pub status: T,
    #[serde(default)]
    pub deal_breaker: bool,
}

/// Desired-attribute preferences consumed by the scoring functions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub interested_in: Gender,
    pub max_distance_km: u32,
    pub age_range: RangePreference,
    pub height: RangePreference,
    pub religion: Religion,
    pub drinking: HabitPreference<DrinkingHabit>,
    pub smoking: HabitPreference<SmokingHabit>,
}

/// Discovery result: a user projection annotated with computed age and distance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    pub location: GeoPoint,
    pub height_cm: f64,
    pub ethnicity: Ethnicity,
    pub pets: Pet,
    pub religion: Religion,
    pub drinking: DrinkingHabit,
    pub smoking: SmokingHabit,
    pub dating_intentions: DatingIntentions,
    pub attractiveness: u8,
    pub bio: Option<String>,
    pub distance_km: f64,
}
