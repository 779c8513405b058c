//! Candidate discovery: a declarative, ordered filtering pipeline executed
//! by the storage backend.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{Candidate, GeoPoint, User, UserFilter};
use crate::storage::{StoreError, UserStore};

/// Seconds in the average Gregorian year, used for integer age projection
pub const GREGORIAN_YEAR_SECS: i64 = 31_556_952;

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// One stage of the discovery pipeline.
///
/// Stages are abstract descriptors; each backend translates them into its
/// own execution plan. Order matters: every stage narrows the set produced
/// by the previous one.
#[derive(Debug, Clone)]
pub enum PipelineStage {
    /// Select users near the viewer, annotated with distance in meters,
    /// nearest first. Unbounded when no maximum is set.
    Proximity {
        center: GeoPoint,
        max_distance_m: Option<f64>,
    },
    /// Attach, per candidate, the swipes recorded by the viewer against
    /// that candidate, so the next stage can exclude them.
    SwipeLookup { viewer_id: String },
    /// Drop candidates the viewer already swiped, and the viewer's own
    /// profile.
    ExcludeSwiped { viewer_id: String },
    /// Compute integer age from date of birth, convert the distance
    /// annotation from meters to kilometers, and project candidate fields.
    Project,
    /// Keep candidates whose computed age falls in the closed range.
    AgeRange { min_age: u32, max_age: u32 },
}

/// Ordered list of pipeline stages, built fluently
#[derive(Debug, Clone, Default)]
pub struct DiscoveryPipeline {
    stages: Vec<PipelineStage>,
}

impl DiscoveryPipeline {
    /// Start the pipeline with the geospatial stage around the viewer.
    pub fn near(viewer: &User, filter: &UserFilter) -> Self {
        let max_distance_m = filter
            .max_distance_km
            .filter(|km| *km > 0)
            .map(|km| f64::from(km) * 1000.0);

        Self {
            stages: vec![PipelineStage::Proximity {
                center: viewer.location,
                max_distance_m,
            }],
        }
    }

    pub fn lookup_swipes(mut self, viewer_id: &str) -> Self {
        self.stages.push(PipelineStage::SwipeLookup {
            viewer_id: viewer_id.to_string(),
        });
        self
    }

    pub fn exclude_swiped(mut self, viewer_id: &str) -> Self {
        self.stages.push(PipelineStage::ExcludeSwiped {
            viewer_id: viewer_id.to_string(),
        });
        self
    }

    pub fn project(mut self) -> Self {
        self.stages.push(PipelineStage::Project);
        self
    }

    /// Add the age stage when either bound is present. A missing bound is
    /// unbounded on that side.
    pub fn age_filter(mut self, min_age: Option<u32>, max_age: Option<u32>) -> Self {
        if min_age.is_some() || max_age.is_some() {
            self.stages.push(PipelineStage::AgeRange {
                min_age: min_age.unwrap_or(0),
                max_age: max_age.unwrap_or(u32::MAX),
            });
        }
        self
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }
}

/// Integer age in whole Gregorian years at `now`
pub fn age_in_years(date_of_birth: NaiveDate, now: DateTime<Utc>) -> u32 {
    let born = date_of_birth
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    let elapsed = (now - born).num_seconds().max(0);
    (elapsed / GREGORIAN_YEAR_SECS) as u32
}

/// Builds and runs discovery queries against the user storage contract
pub struct DiscoveryEngine {
    users: Arc<dyn UserStore>,
}

impl DiscoveryEngine {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Surface discovery candidates for a viewer.
    ///
    /// The filter is validated before any storage work; an empty result set
    /// is a valid success.
    pub async fn discover(
        &self,
        viewer: &User,
        filter: &UserFilter,
    ) -> Result<Vec<Candidate>, DiscoverError> {
        filter.check_bounds().map_err(DiscoverError::InvalidFilter)?;

        let pipeline = DiscoveryPipeline::near(viewer, filter)
            .lookup_swipes(&viewer.id)
            .exclude_swiped(&viewer.id)
            .project()
            .age_filter(filter.min_age, filter.max_age);

        Ok(self.users.discover(&pipeline).await?)
    }
}
