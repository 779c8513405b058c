// Core engine exports
pub mod discovery;
pub mod distance;
pub mod events;
pub mod scoring;
pub mod swipe;

pub use discovery::{DiscoverError, DiscoveryEngine, DiscoveryPipeline, PipelineStage};
pub use distance::{bounding_box, haversine_distance_km, haversine_distance_m};
pub use events::{BusError, Event, EventBus, EventHandler, Publisher, RunningBus};
pub use scoring::{perform_swipe, SwipeOutcome};
pub use swipe::{SwipeError, SwipeMatcher, MATCH_CREATED_TOPIC};
