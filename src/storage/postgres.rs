//! PostgreSQL storage backend.
//!
//! The discovery pipeline descriptors are folded into nested subqueries,
//! one wrapper per stage, so the declarative stage order is preserved in
//! the generated SQL. Uniqueness invariants live in the schema
//! (`migrations/`): the ordered swipe pair and the normalized match pair
//! both carry unique constraints, and `ON CONFLICT DO NOTHING` is the
//! atomic insert-if-absent primitive.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core::discovery::{DiscoveryPipeline, PipelineStage, GREGORIAN_YEAR_SECS};
use crate::models::{Candidate, GeoPoint, Match, Swipe, User};
use crate::storage::{MatchStore, StoreError, SwipeStore, UserStore};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(map_sqlx)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::backend(anyhow::Error::from(e)))?;

        Ok(Self { pool })
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Duplicate,
        _ => StoreError::backend(anyhow::Error::from(err)),
    }
}

/// Parse a TEXT column into one of the closed serde enums.
fn enum_from_text<T: DeserializeOwned>(column: &str, value: String) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(value))
        .map_err(|e| StoreError::backend(anyhow::anyhow!("bad {column} value: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id").map_err(map_sqlx)?,
        name: row.try_get("name").map_err(map_sqlx)?,
        email: row.try_get("email").map_err(map_sqlx)?,
        date_of_birth: row.try_get("date_of_birth").map_err(map_sqlx)?,
        location: GeoPoint {
            latitude: row.try_get("latitude").map_err(map_sqlx)?,
            longitude: row.try_get("longitude").map_err(map_sqlx)?,
        },
        height_cm: row.try_get("height_cm").map_err(map_sqlx)?,
        gender: enum_from_text("gender", row.try_get("gender").map_err(map_sqlx)?)?,
        ethnicity: enum_from_text("ethnicity", row.try_get("ethnicity").map_err(map_sqlx)?)?,
        pets: enum_from_text("pets", row.try_get("pets").map_err(map_sqlx)?)?,
        religion: enum_from_text("religion", row.try_get("religion").map_err(map_sqlx)?)?,
        drinking: enum_from_text("drinking", row.try_get("drinking").map_err(map_sqlx)?)?,
        smoking: enum_from_text("smoking", row.try_get("smoking").map_err(map_sqlx)?)?,
        dating_intentions: enum_from_text(
            "dating_intentions",
            row.try_get("dating_intentions").map_err(map_sqlx)?,
        )?,
        attractiveness: row
            .try_get::<i32, _>("attractiveness")
            .map_err(map_sqlx)? as u8,
        bio: row.try_get("bio").map_err(map_sqlx)?,
        swipe_count: row.try_get::<i32, _>("swipe_count").map_err(map_sqlx)? as u32,
        daily_swipe_budget: row
            .try_get::<i32, _>("daily_swipe_budget")
            .map_err(map_sqlx)? as u32,
        swiping_rate: row.try_get("swiping_rate").map_err(map_sqlx)?,
    })
}

fn swipe_from_row(row: &PgRow) -> Result<Swipe, StoreError> {
    Ok(Swipe {
        id: row.try_get("id").map_err(map_sqlx)?,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        prospect_id: row.try_get("prospect_id").map_err(map_sqlx)?,
        interested: row.try_get("interested").map_err(map_sqlx)?,
        swipe_time: row.try_get("swipe_time").map_err(map_sqlx)?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    Ok(Match {
        id: row.try_get("id").map_err(map_sqlx)?,
        profiles: [
            row.try_get("profile_a").map_err(map_sqlx)?,
            row.try_get("profile_b").map_err(map_sqlx)?,
        ],
        matched: row.try_get("matched").map_err(map_sqlx)?,
    })
}

const INSERT_USER: &str = r#"
    INSERT INTO users (
        id, name, email, date_of_birth, latitude, longitude, height_cm,
        gender, ethnicity, pets, religion, drinking, smoking,
        dating_intentions, attractiveness, bio, swipe_count,
        daily_swipe_budget, swiping_rate
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
"#;

fn bind_user<'q>(
    query: &'q str,
    user: &User,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(query)
        .bind(user.id.clone())
        .bind(user.name.clone())
        .bind(user.email.clone())
        .bind(user.date_of_birth)
        .bind(user.location.latitude)
        .bind(user.location.longitude)
        .bind(user.height_cm)
        .bind(user.gender.as_str())
        .bind(user.ethnicity.as_str())
        .bind(user.pets.as_str())
        .bind(user.religion.as_str())
        .bind(user.drinking.as_str())
        .bind(user.smoking.as_str())
        .bind(user.dating_intentions.as_str())
        .bind(i32::from(user.attractiveness))
        .bind(user.bio.clone())
        .bind(user.swipe_count as i32)
        .bind(user.daily_swipe_budget as i32)
        .bind(user.swiping_rate)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        bind_user(INSERT_USER, &user)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn insert_users(&self, users: Vec<User>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for user in &users {
            bind_user(INSERT_USER, user)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)
    }

    async fn get_by_id(&self, id: &str) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT count(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let total: i64 = row.try_get("total").map_err(map_sqlx)?;
        Ok(total as u64)
    }

    async fn discover(&self, pipeline: &DiscoveryPipeline) -> Result<Vec<Candidate>, StoreError> {
        let plan = DiscoverSql::translate(pipeline);

        let mut query = sqlx::query(&plan.sql);
        for param in &plan.params {
            query = match param {
                SqlParam::Float(v) => query.bind(*v),
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Text(v) => query.bind(v.clone()),
            };
        }

        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(candidate_from_row).collect()
    }
}

fn candidate_from_row(row: &PgRow) -> Result<Candidate, StoreError> {
    Ok(Candidate {
        id: row.try_get("id").map_err(map_sqlx)?,
        name: row.try_get("name").map_err(map_sqlx)?,
        gender: enum_from_text("gender", row.try_get("gender").map_err(map_sqlx)?)?,
        age: row.try_get::<i32, _>("age").map_err(map_sqlx)?.max(0) as u32,
        location: GeoPoint {
            latitude: row.try_get("latitude").map_err(map_sqlx)?,
            longitude: row.try_get("longitude").map_err(map_sqlx)?,
        },
        height_cm: row.try_get("height_cm").map_err(map_sqlx)?,
        ethnicity: enum_from_text("ethnicity", row.try_get("ethnicity").map_err(map_sqlx)?)?,
        pets: enum_from_text("pets", row.try_get("pets").map_err(map_sqlx)?)?,
        religion: enum_from_text("religion", row.try_get("religion").map_err(map_sqlx)?)?,
        drinking: enum_from_text("drinking", row.try_get("drinking").map_err(map_sqlx)?)?,
        smoking: enum_from_text("smoking", row.try_get("smoking").map_err(map_sqlx)?)?,
        dating_intentions: enum_from_text(
            "dating_intentions",
            row.try_get("dating_intentions").map_err(map_sqlx)?,
        )?,
        attractiveness: row
            .try_get::<i32, _>("attractiveness")
            .map_err(map_sqlx)? as u8,
        bio: row.try_get("bio").map_err(map_sqlx)?,
        distance_km: row.try_get("distance_km").map_err(map_sqlx)?,
    })
}

#[derive(Debug, Clone)]
enum SqlParam {
    Float(f64),
    Int(i64),
    Text(String),
}

/// SQL plan for a discovery pipeline: nested subqueries, one per stage.
#[derive(Debug)]
struct DiscoverSql {
    sql: String,
    params: Vec<SqlParam>,
}

impl DiscoverSql {
    fn translate(pipeline: &DiscoveryPipeline) -> Self {
        let mut params: Vec<SqlParam> = Vec::new();
        fn push(params: &mut Vec<SqlParam>, p: SqlParam) -> String {
            params.push(p);
            format!("${}", params.len())
        }

        let mut sql = String::from("SELECT users.* FROM users");
        let mut depth = 0usize;
        let mut projected = false;

        for stage in pipeline.stages() {
            depth += 1;
            let alias = format!("q{depth}");
            match stage {
                PipelineStage::Proximity {
                    center,
                    max_distance_m,
                } => {
                    let lat = push(&mut params, SqlParam::Float(center.latitude));
                    let lon = push(&mut params, SqlParam::Float(center.longitude));
                    let distance_expr = format!(
                        "2 * 6371000.0 * asin(sqrt( \
                         power(sin(radians(u.latitude - {lat}) / 2), 2) + \
                         cos(radians({lat})) * cos(radians(u.latitude)) * \
                         power(sin(radians(u.longitude - {lon}) / 2), 2) ))"
                    );
                    sql = format!("SELECT u.*, {distance_expr} AS distance FROM users u");
                    if let Some(max_m) = max_distance_m {
                        let max = push(&mut params, SqlParam::Float(*max_m));
                        sql = format!(
                            "SELECT {alias}.* FROM ({sql}) {alias} WHERE {alias}.distance <= {max}"
                        );
                    }
                }
                PipelineStage::SwipeLookup { viewer_id } => {
                    let viewer = push(&mut params, SqlParam::Text(viewer_id.clone()));
                    sql = format!(
                        "SELECT {alias}.*, \
                         (SELECT count(*) FROM swipes s \
                          WHERE s.user_id = {viewer} AND s.prospect_id = {alias}.id) \
                         AS viewer_swipes \
                         FROM ({sql}) {alias}"
                    );
                }
                PipelineStage::ExcludeSwiped { viewer_id } => {
                    let viewer = push(&mut params, SqlParam::Text(viewer_id.clone()));
                    sql = format!(
                        "SELECT {alias}.* FROM ({sql}) {alias} \
                         WHERE {alias}.viewer_swipes = 0 AND {alias}.id <> {viewer}"
                    );
                }
                PipelineStage::Project => {
                    projected = true;
                    sql = format!(
                        "SELECT {alias}.id, {alias}.name, {alias}.gender, \
                         floor(extract(epoch FROM (now() - ({alias}.date_of_birth)::timestamptz)) \
                               / {GREGORIAN_YEAR_SECS})::int AS age, \
                         {alias}.latitude, {alias}.longitude, {alias}.height_cm, \
                         {alias}.ethnicity, {alias}.pets, {alias}.religion, \
                         {alias}.drinking, {alias}.smoking, {alias}.dating_intentions, \
                         {alias}.attractiveness, {alias}.bio, \
                         {alias}.distance / 1000.0 AS distance_km \
                         FROM ({sql}) {alias}"
                    );
                }
                PipelineStage::AgeRange { min_age, max_age } => {
                    let min = push(&mut params, SqlParam::Int(i64::from(*min_age)));
                    // Clamp to i32 range so the comparison stays in SQL int bounds
                    let capped = (*max_age).min(i32::MAX as u32);
                    let max = push(&mut params, SqlParam::Int(i64::from(capped)));
                    sql = format!(
                        "SELECT {alias}.* FROM ({sql}) {alias} \
                         WHERE {alias}.age >= {min} AND {alias}.age <= {max}"
                    );
                }
            }
        }

        let order_column = if projected { "distance_km" } else { "distance" };
        depth += 1;
        let alias = format!("q{depth}");
        sql = format!(
            "SELECT {alias}.* FROM ({sql}) {alias} ORDER BY {alias}.{order_column} ASC, {alias}.id ASC"
        );

        Self { sql, params }
    }
}

#[async_trait]
impl SwipeStore for PgStore {
    async fn create(&self, swipe: Swipe) -> Result<Swipe, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO swipes (id, user_id, prospect_id, interested, swipe_time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, prospect_id) DO NOTHING
            "#,
        )
        .bind(swipe.id.clone())
        .bind(swipe.user_id.clone())
        .bind(swipe.prospect_id.clone())
        .bind(swipe.interested)
        .bind(swipe.swipe_time)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(swipe)
    }

    async fn get_by_id(&self, id: &str) -> Result<Swipe, StoreError> {
        let row = sqlx::query("SELECT * FROM swipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)?;
        swipe_from_row(&row)
    }

    async fn get_by_actor_and_target(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Swipe>, StoreError> {
        let row = sqlx::query("SELECT * FROM swipes WHERE user_id = $1 AND prospect_id = $2")
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(swipe_from_row).transpose()
    }

    async fn update(&self, swipe: Swipe) -> Result<Swipe, StoreError> {
        let result = sqlx::query(
            "UPDATE swipes SET interested = $2, swipe_time = $3 WHERE id = $1",
        )
        .bind(swipe.id.clone())
        .bind(swipe.interested)
        .bind(swipe.swipe_time)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(swipe)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM swipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn create(&self, m: Match) -> Result<Match, StoreError> {
        // Pair normalized on insert so the unordered uniqueness constraint
        // holds whichever direction completed the match.
        let (profile_a, profile_b) = Match::pair_key(&m.profiles[0], &m.profiles[1]);
        let result = sqlx::query(
            r#"
            INSERT INTO matches (id, profile_a, profile_b, matched)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (profile_a, profile_b) DO NOTHING
            "#,
        )
        .bind(m.id.clone())
        .bind(profile_a)
        .bind(profile_b)
        .bind(m.matched)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(m)
    }

    async fn get_by_profile_pair(
        &self,
        profile_a: &str,
        profile_b: &str,
    ) -> Result<Option<Match>, StoreError> {
        let (first, second) = Match::pair_key(profile_a, profile_b);
        let row = sqlx::query("SELECT * FROM matches WHERE profile_a = $1 AND profile_b = $2")
            .bind(first)
            .bind(second)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM matches WHERE profile_a = $1 OR profile_b = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.iter().map(match_from_row).collect()
    }
}
