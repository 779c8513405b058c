//! Random profile generation for development seeding.

use chrono::{Datelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{
    generate_id, DatingIntentions, DrinkingHabit, Ethnicity, Gender, GeoPoint, Pet, Religion,
    SmokingHabit, User,
};
use crate::storage::{StoreError, UserStore};

// Seeded profiles are scattered over North London
const MIN_LAT: f64 = 51.5244;
const MAX_LAT: f64 = 51.6722;
const MIN_LON: f64 = -0.2076;
const MAX_LON: f64 = 0.1698;

const FIRST_NAMES: &[&str] = &[
    "Amara", "Ben", "Chloe", "Dev", "Elena", "Farah", "Gabriel", "Hana", "Idris", "Jasmine",
    "Kofi", "Leila", "Marcus", "Nadia", "Omar", "Priya", "Quinn", "Rosa", "Sam", "Tara",
];

const LAST_NAMES: &[&str] = &[
    "Ahmed", "Brown", "Chen", "Diallo", "Evans", "Fischer", "Garcia", "Hughes", "Iqbal", "Jones",
    "Khan", "Lewis", "Martin", "Novak", "Okafor", "Patel", "Quinn", "Rossi", "Singh", "Taylor",
];

fn random_location(rng: &mut impl Rng) -> GeoPoint {
    GeoPoint {
        latitude: rng.gen_range(MIN_LAT..MAX_LAT),
        longitude: rng.gen_range(MIN_LON..MAX_LON),
    }
}

/// Generate a random user profile, aged 18-48
pub fn random_user(rng: &mut impl Rng) -> User {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    let id = generate_id();

    let age_years = rng.gen_range(18..48);
    let today = Utc::now().date_naive();
    let date_of_birth = today
        .with_year(today.year() - age_years)
        .unwrap_or(today - chrono::Duration::days(i64::from(age_years) * 365));

    let genders = [Gender::Male, Gender::Female, Gender::NonBinary];
    let ethnicities = [
        Ethnicity::White,
        Ethnicity::Black,
        Ethnicity::Asian,
        Ethnicity::Latino,
        Ethnicity::Other,
    ];
    let pets = [
        Pet::Dog,
        Pet::Cat,
        Pet::Bird,
        Pet::Reptile,
        Pet::PreferNotToSay,
        Pet::None,
    ];
    let religions = [
        Religion::Christian,
        Religion::Muslim,
        Religion::Hindu,
        Religion::Buddhist,
        Religion::Other,
    ];
    let drinking = [
        DrinkingHabit::Yes,
        DrinkingHabit::Sometimes,
        DrinkingHabit::No,
        DrinkingHabit::None,
    ];
    let smoking = [
        SmokingHabit::Yes,
        SmokingHabit::Sometimes,
        SmokingHabit::No,
        SmokingHabit::None,
    ];
    let intentions = [
        DatingIntentions::LifePartner,
        DatingIntentions::ShorterTime,
        DatingIntentions::None,
        DatingIntentions::FiguringOut,
        DatingIntentions::Other,
    ];

    User {
        email: format!("{}.{}@example.com", first.to_lowercase(), &id[..8]),
        name: format!("{first} {last}"),
        id,
        date_of_birth,
        location: random_location(rng),
        height_cm: rng.gen_range(150.0..190.0),
        gender: *genders.choose(rng).unwrap_or(&Gender::NonBinary),
        ethnicity: *ethnicities.choose(rng).unwrap_or(&Ethnicity::Other),
        pets: *pets.choose(rng).unwrap_or(&Pet::None),
        religion: *religions.choose(rng).unwrap_or(&Religion::Other),
        drinking: *drinking.choose(rng).unwrap_or(&DrinkingHabit::None),
        smoking: *smoking.choose(rng).unwrap_or(&SmokingHabit::None),
        dating_intentions: *intentions.choose(rng).unwrap_or(&DatingIntentions::None),
        attractiveness: rng.gen_range(0..=10),
        bio: None,
        swipe_count: 0,
        daily_swipe_budget: 25,
        swiping_rate: 1.0,
    }
}

/// Top the store up to `target` profiles. Returns how many were inserted.
pub async fn seed_default_users(users: &dyn UserStore, target: u64) -> Result<u64, StoreError> {
    let current = users.count().await?;
    if current >= target {
        return Ok(0);
    }

    let missing = target - current;
    let mut rng = rand::thread_rng();
    let batch: Vec<User> = (0..missing).map(|_| random_user(&mut rng)).collect();
    users.insert_users(batch).await?;

    tracing::info!("seeded {} default users", missing);
    Ok(missing)
}
